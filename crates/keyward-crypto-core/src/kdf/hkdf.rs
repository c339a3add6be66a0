//! HMAC-based HKDF (RFC 5869).

use crate::error::CryptoError;
use crate::hash::HashAlgorithm;
use crate::hmac::HmacEngine;
use crate::memory::SecretBuffer;
use zeroize::Zeroizing;

/// Extract-then-expand to `dk_len` bytes. Parameters are already validated.
pub(super) async fn derive(
    engine: &HmacEngine<'_>,
    key: &[u8],
    salt: &[u8],
    info: &[u8],
    hash: HashAlgorithm,
    dk_len: usize,
) -> Result<SecretBuffer, CryptoError> {
    // Extract: the salt is the HMAC key and the input key is the message.
    let h_len = engine.provider().digest_size(hash);
    let prk = Zeroizing::new(engine.compute(salt, key, hash).await?);
    super::check_tag_len(&prk, h_len)?;

    let block_count = dk_len.div_ceil(h_len);

    let mut okm = Zeroizing::new(Vec::with_capacity(block_count.saturating_mul(h_len)));
    let mut t = Zeroizing::new(Vec::new());
    for counter in 1..=block_count {
        let counter = u8::try_from(counter).map_err(|_| CryptoError::DerivedKeyTooLong {
            requested: dk_len,
            max: super::HKDF_MAX_BLOCKS.saturating_mul(h_len as u64),
        })?;

        let mut input = Zeroizing::new(Vec::with_capacity(
            t.len().saturating_add(info.len()).saturating_add(1),
        ));
        input.extend_from_slice(&t);
        input.extend_from_slice(info);
        input.push(counter);

        t = Zeroizing::new(engine.compute(&prk, &input, hash).await?);
        super::check_tag_len(&t, h_len)?;
        okm.extend_from_slice(&t);
    }

    let okm = okm.get(..dk_len).ok_or_else(|| {
        CryptoError::PrimitiveFailure(format!("HKDF output too short: {} bytes", okm.len()))
    })?;
    Ok(SecretBuffer::new(okm))
}
