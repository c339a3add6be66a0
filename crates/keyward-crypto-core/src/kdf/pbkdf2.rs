//! HMAC-based PBKDF2 (RFC 8018 §5.2).
//!
//! Each output block `T_i` depends only on its own index, so all blocks are
//! started together and gathered before reassembly. Within a block the HMAC
//! chain is strictly sequential.

use crate::error::CryptoError;
use crate::hash::HashAlgorithm;
use crate::hmac::HmacEngine;
use crate::memory::SecretBuffer;
use super::YIELD_INTERVAL;
use futures::future::try_join_all;
use std::num::NonZeroU32;
use zeroize::Zeroizing;

/// Derive `dk_len` bytes. Parameters are already validated by the caller.
pub(super) async fn derive(
    engine: &HmacEngine<'_>,
    password: &[u8],
    iterations: NonZeroU32,
    salt: &[u8],
    hash: HashAlgorithm,
    dk_len: usize,
) -> Result<SecretBuffer, CryptoError> {
    let h_len = engine.provider().digest_size(hash);
    let block_count = u32::try_from(dk_len.div_ceil(h_len)).map_err(|_| {
        CryptoError::DerivedKeyTooLong {
            requested: dk_len,
            max: super::PBKDF2_MAX_BLOCKS.saturating_mul(h_len as u64),
        }
    })?;

    let blocks = try_join_all(
        (0..block_count).map(|index| block(engine, password, iterations, salt, hash, index)),
    )
    .await?;

    Ok(SecretBuffer::from(reassemble(blocks, h_len, dk_len)?))
}

/// Compute `T_{index+1}` = `U_1 ^ U_2 ^ ... ^ U_iterations`.
async fn block(
    engine: &HmacEngine<'_>,
    password: &[u8],
    iterations: NonZeroU32,
    salt: &[u8],
    hash: HashAlgorithm,
    index: u32,
) -> Result<(u32, Zeroizing<Vec<u8>>), CryptoError> {
    let mut seed = Vec::with_capacity(salt.len().saturating_add(4));
    seed.extend_from_slice(salt);
    seed.extend_from_slice(&block_number(index).to_be_bytes());

    let h_len = engine.provider().digest_size(hash);
    let mut u = Zeroizing::new(engine.compute(password, &seed, hash).await?);
    super::check_tag_len(&u, h_len)?;
    let mut t = u.clone();

    for j in 1..iterations.get() {
        if j % YIELD_INTERVAL == 0 {
            tracing::trace!(block = index, iteration = j, of = iterations.get(), "pbkdf2 progress");
            tokio::task::yield_now().await;
        }
        u = Zeroizing::new(engine.compute(password, &u, hash).await?);
        super::check_tag_len(&u, h_len)?;
        for (acc, byte) in t.iter_mut().zip(u.iter()) {
            *acc ^= byte;
        }
    }

    Ok((index, t))
}

/// 1-based block number written into the seed.
///
/// `index` is below the block count, which is at most `2^32 - 1`, so the
/// increment cannot overflow.
const fn block_number(index: u32) -> u32 {
    index.saturating_add(1)
}

/// Place every block at `index * h_len`; the last block contributes only the
/// bytes still missing. Placement is by index, not by arrival order.
fn reassemble(
    blocks: Vec<(u32, Zeroizing<Vec<u8>>)>,
    h_len: usize,
    dk_len: usize,
) -> Result<Zeroizing<Vec<u8>>, CryptoError> {
    let mut out = Zeroizing::new(vec![0u8; dk_len]);
    for (index, block) in blocks {
        let start = (index as usize).saturating_mul(h_len);
        let end = start.saturating_add(h_len).min(dk_len);
        let take = end.saturating_sub(start);
        let src = block.get(..take).ok_or_else(|| short_block(block.len(), take))?;
        let dst = out.get_mut(start..end).ok_or_else(|| short_block(dk_len, end))?;
        dst.copy_from_slice(src);
    }
    Ok(out)
}

fn short_block(have: usize, need: usize) -> CryptoError {
    CryptoError::PrimitiveFailure(format!("PBKDF2 block too short: {have} bytes, need {need}"))
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
