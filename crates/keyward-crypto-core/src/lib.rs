//! `keyward-crypto-core`: key derivation for secret-storage recovery.
//!
//! PBKDF2 and HKDF built on a primitive HMAC operation, plus the HMAC
//! engine and the boundary to the primitive provider they run on. No
//! network and no storage. Long PBKDF2 loops yield through
//! `tokio::task::yield_now`, which needs only the `rt` feature and wakes
//! itself, so the futures also run under other executors.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

pub mod error;
pub mod hash;
pub mod memory;

pub mod provider;
pub mod ring_provider;

pub mod hmac;
pub mod kdf;

pub use error::CryptoError;
pub use hash::HashAlgorithm;
pub use hmac::HmacEngine;
pub use kdf::{DerivationStrategy, KeyDerivation, Pbkdf2Params};
pub use memory::{SecretBuffer, SecretBytes};
pub use provider::{
    DeriveBits, PrimitiveProvider, AES_CTR_BLOCK_LEN, AES_CTR_COUNTER_BITS,
};
pub use ring_provider::RingProvider;
