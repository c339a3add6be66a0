//! HMAC compute/verify over a [`PrimitiveProvider`].

use crate::error::CryptoError;
use crate::hash::HashAlgorithm;
use crate::provider::PrimitiveProvider;

/// Computes and verifies HMAC tags through a provider.
///
/// Key derivations are built on [`HmacEngine::compute`]; integrity checks
/// on ciphertext go through [`HmacEngine::verify`], which delegates to the
/// provider's constant-time comparison.
#[derive(Clone, Copy)]
pub struct HmacEngine<'p> {
    provider: &'p dyn PrimitiveProvider,
}

impl<'p> HmacEngine<'p> {
    /// Create an engine over `provider`.
    #[must_use]
    pub fn new(provider: &'p dyn PrimitiveProvider) -> Self {
        Self { provider }
    }

    /// The provider this engine delegates to.
    #[must_use]
    pub fn provider(&self) -> &'p dyn PrimitiveProvider {
        self.provider
    }

    /// Compute `HMAC(key, data)`. Deterministic for equal inputs.
    ///
    /// # Errors
    ///
    /// Propagates provider failures.
    pub async fn compute(
        &self,
        key: &[u8],
        data: &[u8],
        hash: HashAlgorithm,
    ) -> Result<Vec<u8>, CryptoError> {
        self.provider.hmac_sign(key, data, hash).await
    }

    /// Check `tag` against `HMAC(key, data)` without leaking the position of
    /// the first mismatching byte.
    ///
    /// # Errors
    ///
    /// Propagates provider failures. A wrong tag is `Ok(false)`, not an error.
    pub async fn verify(
        &self,
        key: &[u8],
        tag: &[u8],
        data: &[u8],
        hash: HashAlgorithm,
    ) -> Result<bool, CryptoError> {
        self.provider.hmac_verify(key, tag, data, hash).await
    }
}

impl std::fmt::Debug for HmacEngine<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HmacEngine").finish_non_exhaustive()
    }
}
