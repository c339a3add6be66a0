//! Default [`PrimitiveProvider`] backed by `ring` and RustCrypto's AES-CTR.
//!
//! `ring` supplies digests, HMAC (with constant-time verification) and the
//! native HKDF used by [`DeriveBits`]. Native PBKDF2 runs the RFC 8018 loop
//! over one precomputed `ring` HMAC key and yields to the executor every
//! 1000 iterations, so a long derivation can be cancelled. `ring` has no CTR
//! mode, so AES-256-CTR with a 64-bit big-endian counter comes from the
//! `aes` and `ctr` crates.

use crate::error::CryptoError;
use crate::hash::HashAlgorithm;
use crate::kdf::YIELD_INTERVAL;
use crate::memory::SecretBuffer;
use crate::provider::{
    DeriveBits, PrimitiveProvider, AES_CTR_BLOCK_LEN, AES_CTR_COUNTER_BITS,
};
use async_trait::async_trait;
use ctr::cipher::{KeyIvInit, StreamCipher};
use ring::{digest, hkdf, hmac};
use std::num::NonZeroU32;
use zeroize::Zeroizing;

/// AES-256 key length in bytes.
pub const AES_KEY_LEN: usize = 32;

/// AES-256 in CTR mode, incrementing only the low 64 bits of the counter block.
type Aes256Ctr64BE = ctr::Ctr64BE<aes::Aes256>;

/// Provider backed by `ring` (digest, HMAC, HKDF) and `aes`/`ctr`.
///
/// Stateless; one instance can be shared by any number of concurrent flows.
#[derive(Clone, Copy, Debug, Default)]
pub struct RingProvider;

impl RingProvider {
    /// Create a provider.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

const fn digest_algorithm(hash: HashAlgorithm) -> &'static digest::Algorithm {
    match hash {
        HashAlgorithm::Sha256 => &digest::SHA256,
        HashAlgorithm::Sha512 => &digest::SHA512,
    }
}

const fn hmac_algorithm(hash: HashAlgorithm) -> hmac::Algorithm {
    match hash {
        HashAlgorithm::Sha256 => hmac::HMAC_SHA256,
        HashAlgorithm::Sha512 => hmac::HMAC_SHA512,
    }
}

const fn hkdf_algorithm(hash: HashAlgorithm) -> hkdf::Algorithm {
    match hash {
        HashAlgorithm::Sha256 => hkdf::HKDF_SHA256,
        HashAlgorithm::Sha512 => hkdf::HKDF_SHA512,
    }
}

/// Output length marker for `ring`'s HKDF expand step.
struct OkmLen(usize);

impl hkdf::KeyType for OkmLen {
    fn len(&self) -> usize {
        self.0
    }
}

/// Run the AES-256-CTR keystream over `input`. Encryption and decryption are
/// the same operation.
fn apply_ctr_keystream(
    key: &[u8],
    counter: &[u8],
    counter_bits: u32,
    input: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if counter_bits != AES_CTR_COUNTER_BITS {
        return Err(CryptoError::PrimitiveFailure(format!(
            "unsupported AES-CTR counter length: {counter_bits} bits (expected {AES_CTR_COUNTER_BITS})"
        )));
    }
    if key.len() != AES_KEY_LEN {
        return Err(CryptoError::PrimitiveFailure(format!(
            "invalid AES key length: {} bytes (expected {AES_KEY_LEN})",
            key.len()
        )));
    }
    if counter.len() != AES_CTR_BLOCK_LEN {
        return Err(CryptoError::PrimitiveFailure(format!(
            "invalid AES-CTR counter block: {} bytes (expected {AES_CTR_BLOCK_LEN})",
            counter.len()
        )));
    }

    let mut cipher = Aes256Ctr64BE::new_from_slices(key, counter)
        .map_err(|_| CryptoError::PrimitiveFailure("failed to import AES-CTR key".into()))?;
    let mut buf = input.to_vec();
    cipher
        .try_apply_keystream(&mut buf)
        .map_err(|_| CryptoError::PrimitiveFailure("AES-CTR keystream exhausted".into()))?;
    Ok(buf)
}

#[async_trait]
impl PrimitiveProvider for RingProvider {
    async fn digest(&self, hash: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        Ok(digest::digest(digest_algorithm(hash), data).as_ref().to_vec())
    }

    async fn hmac_sign(
        &self,
        key: &[u8],
        data: &[u8],
        hash: HashAlgorithm,
    ) -> Result<Vec<u8>, CryptoError> {
        let key = hmac::Key::new(hmac_algorithm(hash), key);
        Ok(hmac::sign(&key, data).as_ref().to_vec())
    }

    async fn hmac_verify(
        &self,
        key: &[u8],
        tag: &[u8],
        data: &[u8],
        hash: HashAlgorithm,
    ) -> Result<bool, CryptoError> {
        let key = hmac::Key::new(hmac_algorithm(hash), key);
        Ok(hmac::verify(&key, data, tag).is_ok())
    }

    async fn aes_ctr_decrypt(
        &self,
        key: &[u8],
        counter: &[u8],
        counter_bits: u32,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        apply_ctr_keystream(key, counter, counter_bits, ciphertext)
    }

    async fn aes_ctr_encrypt(
        &self,
        key: &[u8],
        counter: &[u8],
        counter_bits: u32,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        apply_ctr_keystream(key, counter, counter_bits, plaintext)
    }

    fn derive_bits(&self) -> Option<&dyn DeriveBits> {
        Some(self)
    }
}

#[async_trait]
impl DeriveBits for RingProvider {
    async fn pbkdf2(
        &self,
        password: &[u8],
        iterations: NonZeroU32,
        salt: &[u8],
        hash: HashAlgorithm,
        out_len: usize,
    ) -> Result<SecretBuffer, CryptoError> {
        let key = hmac::Key::new(hmac_algorithm(hash), password);
        let h_len = hash.digest_len();
        let mut out = Zeroizing::new(Vec::with_capacity(out_len));
        let mut block_number: u32 = 1;

        while out.len() < out_len {
            let mut ctx = hmac::Context::with_key(&key);
            ctx.update(salt);
            ctx.update(&block_number.to_be_bytes());
            let mut u = Zeroizing::new(ctx.sign().as_ref().to_vec());
            let mut t = u.clone();

            for j in 1..iterations.get() {
                if j % YIELD_INTERVAL == 0 {
                    tracing::trace!(block = block_number, iteration = j, "native pbkdf2 progress");
                    tokio::task::yield_now().await;
                }
                let tag = hmac::sign(&key, &u);
                u.copy_from_slice(tag.as_ref());
                for (acc, byte) in t.iter_mut().zip(u.iter()) {
                    *acc ^= byte;
                }
            }

            let take = out_len.saturating_sub(out.len()).min(h_len);
            let block = t.get(..take).ok_or_else(|| {
                CryptoError::PrimitiveFailure(format!("PBKDF2 block shorter than {take} bytes"))
            })?;
            out.extend_from_slice(block);
            block_number = block_number.checked_add(1).ok_or_else(|| {
                CryptoError::PrimitiveFailure("PBKDF2 block counter overflow".into())
            })?;
        }
        Ok(SecretBuffer::from(out))
    }

    async fn hkdf(
        &self,
        key: &[u8],
        salt: &[u8],
        info: &[u8],
        hash: HashAlgorithm,
        out_len: usize,
    ) -> Result<SecretBuffer, CryptoError> {
        let prk = hkdf::Salt::new(hkdf_algorithm(hash), salt).extract(key);
        let info = [info];
        let okm = prk
            .expand(&info, OkmLen(out_len))
            .map_err(|_| CryptoError::PrimitiveFailure("HKDF expand rejected output length".into()))?;
        let mut out = Zeroizing::new(vec![0u8; out_len]);
        okm.fill(&mut out)
            .map_err(|_| CryptoError::PrimitiveFailure("HKDF fill failed".into()))?;
        Ok(SecretBuffer::from(out))
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
