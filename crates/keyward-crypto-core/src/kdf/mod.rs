//! PBKDF2 and HKDF key derivation.
//!
//! This module provides:
//! - [`KeyDerivation`]: derivation front end; validates parameters and
//!   dispatches to the strategy chosen at construction
//! - [`DerivationStrategy`]: `Native` (provider's own PBKDF2/HKDF) or
//!   `Legacy` (RFC 8018 / RFC 5869 built on [`HmacEngine`])
//! - [`Pbkdf2Params`]: serializable PBKDF2 parameter set with the
//!   secret-storage defaults
//!
//! # Strategy selection
//!
//! [`KeyDerivation::new`] asks the provider for its [`DeriveBits`]
//! capability once. Providers without it get the legacy HMAC-based
//! constructions. Both strategies produce identical output for identical
//! inputs; the choice only affects speed.
//!
//! # Cancellation
//!
//! Derivation futures hold no state outside themselves. Dropping one (for
//! example on a timeout) discards all in-flight block computations and
//! never yields partial key material.

mod hkdf;
mod pbkdf2;

use crate::error::CryptoError;
use crate::hash::HashAlgorithm;
use crate::hmac::HmacEngine;
use crate::memory::SecretBuffer;
use crate::provider::{DeriveBits, PrimitiveProvider};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;

/// PBKDF2 iterations when none are given.
pub const DEFAULT_ITERATIONS: u32 = 500_000;

/// PBKDF2 output size in bits when none is given.
pub const DEFAULT_BITS: usize = 256;

/// Largest HKDF expansion, in blocks of `hLen` bytes (RFC 5869 §2.3).
pub const HKDF_MAX_BLOCKS: u64 = 255;

/// Largest PBKDF2 output, in blocks of `hLen` bytes (RFC 8018 §5.2).
pub const PBKDF2_MAX_BLOCKS: u64 = 0xFFFF_FFFF;

/// PBKDF2 iterations between cooperative yields.
pub(crate) const YIELD_INTERVAL: u32 = 1000;

/// PBKDF2 parameters for one derivation.
///
/// Checked when used, not when built: a zero iteration count or a
/// fractional byte length is reported by [`KeyDerivation::pbkdf2_with`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pbkdf2Params {
    pub salt: Vec<u8>,
    pub iterations: u32,
    pub hash: HashAlgorithm,
    pub output_bits: usize,
}

impl Pbkdf2Params {
    /// `salt` with [`DEFAULT_ITERATIONS`], SHA-512 and [`DEFAULT_BITS`].
    #[must_use]
    pub fn new(salt: impl Into<Vec<u8>>) -> Self {
        Self {
            salt: salt.into(),
            iterations: DEFAULT_ITERATIONS,
            hash: HashAlgorithm::Sha512,
            output_bits: DEFAULT_BITS,
        }
    }

    #[must_use]
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations;
        self
    }

    #[must_use]
    pub fn with_hash(mut self, hash: HashAlgorithm) -> Self {
        self.hash = hash;
        self
    }

    #[must_use]
    pub fn with_output_bits(mut self, output_bits: usize) -> Self {
        self.output_bits = output_bits;
        self
    }
}

/// How derivations are carried out, fixed when a [`KeyDerivation`] is built.
#[derive(Clone, Copy)]
pub enum DerivationStrategy<'p> {
    /// Delegate to the provider's native PBKDF2/HKDF.
    Native(&'p dyn DeriveBits),
    /// HMAC-based PBKDF2/HKDF computed by this crate.
    Legacy(HmacEngine<'p>),
}

impl DerivationStrategy<'_> {
    /// Short name for logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Native(_) => "native",
            Self::Legacy(_) => "legacy",
        }
    }
}

impl std::fmt::Debug for DerivationStrategy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// PBKDF2 / HKDF front end bound to one provider.
#[derive(Clone, Copy, Debug)]
pub struct KeyDerivation<'p> {
    strategy: DerivationStrategy<'p>,
}

impl<'p> KeyDerivation<'p> {
    /// Pick the native strategy if `provider` offers it, legacy otherwise.
    #[must_use]
    pub fn new(provider: &'p dyn PrimitiveProvider) -> Self {
        let strategy = provider.derive_bits().map_or_else(
            || DerivationStrategy::Legacy(HmacEngine::new(provider)),
            DerivationStrategy::Native,
        );
        tracing::debug!(strategy = strategy.name(), "key derivation strategy selected");
        Self { strategy }
    }

    /// Always use the HMAC-based constructions, even if `provider` has
    /// native derivation.
    #[must_use]
    pub fn legacy(provider: &'p dyn PrimitiveProvider) -> Self {
        Self {
            strategy: DerivationStrategy::Legacy(HmacEngine::new(provider)),
        }
    }

    /// The strategy in use.
    #[must_use]
    pub const fn strategy(&self) -> DerivationStrategy<'p> {
        self.strategy
    }

    /// PBKDF2 (RFC 8018 §5.2): stretch `password` into `output_bits / 8` bytes.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InvalidIterationCount` if `iterations` is zero
    /// - `CryptoError::InvalidDerivedKeyLength` if `output_bits` is zero or
    ///   not a multiple of 8
    /// - `CryptoError::DerivedKeyTooLong` if the output exceeds
    ///   `(2^32 - 1) * hLen` bytes
    /// - provider failures, propagated unchanged
    pub async fn pbkdf2(
        &self,
        password: &[u8],
        iterations: u32,
        salt: &[u8],
        hash: HashAlgorithm,
        output_bits: usize,
    ) -> Result<SecretBuffer, CryptoError> {
        let iterations = NonZeroU32::new(iterations).ok_or(CryptoError::InvalidIterationCount)?;
        let dk_len = output_len(output_bits)?;
        check_max_len(dk_len, hash, PBKDF2_MAX_BLOCKS)?;

        tracing::debug!(
            strategy = self.strategy.name(),
            iterations = iterations.get(),
            %hash,
            output_bits,
            "deriving PBKDF2 key"
        );

        let out = match self.strategy {
            DerivationStrategy::Native(native) => {
                native.pbkdf2(password, iterations, salt, hash, dk_len).await?
            }
            DerivationStrategy::Legacy(engine) => {
                pbkdf2::derive(&engine, password, iterations, salt, hash, dk_len).await?
            }
        };
        check_output_len(out, dk_len)
    }

    /// [`Self::pbkdf2`] with a parameter set.
    ///
    /// # Errors
    ///
    /// As [`Self::pbkdf2`].
    pub async fn pbkdf2_with(
        &self,
        password: &[u8],
        params: &Pbkdf2Params,
    ) -> Result<SecretBuffer, CryptoError> {
        self.pbkdf2(
            password,
            params.iterations,
            &params.salt,
            params.hash,
            params.output_bits,
        )
        .await
    }

    /// HKDF (RFC 5869): extract with `salt`, expand with `info` to
    /// `output_bits / 8` bytes. `info` may be empty.
    ///
    /// # Errors
    ///
    /// - `CryptoError::InvalidDerivedKeyLength` if `output_bits` is zero or
    ///   not a multiple of 8
    /// - `CryptoError::DerivedKeyTooLong` if the output exceeds `255 * hLen` bytes
    /// - provider failures, propagated unchanged
    pub async fn hkdf(
        &self,
        key: &[u8],
        salt: &[u8],
        info: &[u8],
        hash: HashAlgorithm,
        output_bits: usize,
    ) -> Result<SecretBuffer, CryptoError> {
        let dk_len = output_len(output_bits)?;
        check_max_len(dk_len, hash, HKDF_MAX_BLOCKS)?;

        let out = match self.strategy {
            DerivationStrategy::Native(native) => {
                native.hkdf(key, salt, info, hash, dk_len).await?
            }
            DerivationStrategy::Legacy(engine) => {
                hkdf::derive(&engine, key, salt, info, hash, dk_len).await?
            }
        };
        check_output_len(out, dk_len)
    }
}

/// Convert a bit count to a byte count, rejecting empty and fractional output.
fn output_len(output_bits: usize) -> Result<usize, CryptoError> {
    if output_bits == 0 || output_bits % 8 != 0 {
        return Err(CryptoError::InvalidDerivedKeyLength { bits: output_bits });
    }
    Ok(output_bits / 8)
}

fn check_max_len(dk_len: usize, hash: HashAlgorithm, max_blocks: u64) -> Result<(), CryptoError> {
    let max = max_blocks.saturating_mul(hash.digest_len() as u64);
    if dk_len as u64 > max {
        return Err(CryptoError::DerivedKeyTooLong {
            requested: dk_len,
            max,
        });
    }
    Ok(())
}

/// A provider returned a MAC of the wrong size for `hash`.
fn check_tag_len(tag: &[u8], h_len: usize) -> Result<(), CryptoError> {
    if tag.len() != h_len {
        return Err(CryptoError::PrimitiveFailure(format!(
            "HMAC returned {} bytes, expected {h_len}",
            tag.len()
        )));
    }
    Ok(())
}

/// Native providers are trusted for the value, not for the length.
fn check_output_len(out: SecretBuffer, dk_len: usize) -> Result<SecretBuffer, CryptoError> {
    if out.len() != dk_len {
        return Err(CryptoError::PrimitiveFailure(format!(
            "derived {} bytes, expected {dk_len}",
            out.len()
        )));
    }
    Ok(out)
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
