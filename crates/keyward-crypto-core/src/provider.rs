//! Boundary to the primitive cryptography provider.
//!
//! Everything above this module (HMAC engine, PBKDF2, HKDF, secret
//! decryption) is written against [`PrimitiveProvider`], never against a
//! concrete library. Every method is `async`: a provider may be backed by a
//! platform API that completes out of band, so callers must treat each call
//! as a suspension point.
//!
//! [`RingProvider`](crate::ring_provider::RingProvider) is the default
//! implementation.

use crate::error::CryptoError;
use crate::hash::HashAlgorithm;
use crate::memory::SecretBuffer;
use async_trait::async_trait;
use std::num::NonZeroU32;

/// Counter width, in bits, used for AES-CTR counter blocks.
///
/// Only the low 64 bits of the 128-bit counter block are incremented.
pub const AES_CTR_COUNTER_BITS: u32 = 64;

/// AES-CTR counter block length in bytes (128 bits).
pub const AES_CTR_BLOCK_LEN: usize = 16;

/// Primitive operations this crate builds on.
#[async_trait]
pub trait PrimitiveProvider: Send + Sync {
    /// Hash `data` with `hash`.
    async fn digest(&self, hash: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>, CryptoError>;

    /// Digest output size in bytes for `hash`.
    fn digest_size(&self, hash: HashAlgorithm) -> usize {
        hash.digest_len()
    }

    /// Compute an HMAC tag over `data` with a raw `key`.
    async fn hmac_sign(
        &self,
        key: &[u8],
        data: &[u8],
        hash: HashAlgorithm,
    ) -> Result<Vec<u8>, CryptoError>;

    /// Check `tag` against the HMAC of `data`.
    ///
    /// Implementations must compare in constant time over the full tag.
    async fn hmac_verify(
        &self,
        key: &[u8],
        tag: &[u8],
        data: &[u8],
        hash: HashAlgorithm,
    ) -> Result<bool, CryptoError>;

    /// AES-CTR decrypt `ciphertext` starting at `counter`.
    ///
    /// `counter_bits` is the number of low-order counter bits that increment;
    /// see [`AES_CTR_COUNTER_BITS`].
    async fn aes_ctr_decrypt(
        &self,
        key: &[u8],
        counter: &[u8],
        counter_bits: u32,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// AES-CTR encrypt `plaintext` starting at `counter`.
    async fn aes_ctr_encrypt(
        &self,
        key: &[u8],
        counter: &[u8],
        counter_bits: u32,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError>;

    /// Native PBKDF2/HKDF support, if the provider has it.
    ///
    /// Providers returning `None` get the HMAC-based derivations from
    /// [`crate::kdf`].
    fn derive_bits(&self) -> Option<&dyn DeriveBits> {
        None
    }
}

/// Native key-derivation capability of a provider.
///
/// Callers validate parameters before reaching these methods; `out_len` is
/// always non-zero and within the construction's limit.
#[async_trait]
pub trait DeriveBits: Send + Sync {
    /// PBKDF2-HMAC producing `out_len` bytes.
    async fn pbkdf2(
        &self,
        password: &[u8],
        iterations: NonZeroU32,
        salt: &[u8],
        hash: HashAlgorithm,
        out_len: usize,
    ) -> Result<SecretBuffer, CryptoError>;

    /// HKDF (RFC 5869) producing `out_len` bytes.
    async fn hkdf(
        &self,
        key: &[u8],
        salt: &[u8],
        info: &[u8],
        hash: HashAlgorithm,
        out_len: usize,
    ) -> Result<SecretBuffer, CryptoError>;
}
