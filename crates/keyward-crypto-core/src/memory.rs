//! Zeroizing containers for derived key material.
//!
//! This module provides:
//! - [`SecretBuffer`]: variable-length key material (PBKDF2 / HKDF output)
//! - [`SecretBytes`]: fixed-size keys (the AES and MAC halves of a key split)
//!
//! Both wipe their contents on drop and mask themselves in `Debug`/`Display`
//! output, so derived keys never outlive the value that owns them.

use crate::error::CryptoError;
use secrecy::{ExposeSecret, SecretSlice};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

// ---------------------------------------------------------------------------
// SecretBuffer (variable-length)
// ---------------------------------------------------------------------------

/// Variable-length buffer for derived key material.
///
/// Wraps [`SecretSlice<u8>`] from the `secrecy` crate, which zeroizes the
/// allocation on drop.
pub struct SecretBuffer {
    inner: SecretSlice<u8>,
}

impl SecretBuffer {
    /// Copy `data` into a new buffer.
    ///
    /// The caller should zeroize the source afterwards.
    #[must_use]
    pub fn new(data: &[u8]) -> Self {
        Self::from_vec(data.to_vec())
    }

    /// Take ownership of `data` without copying.
    #[must_use]
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { inner: data.into() }
    }

    /// Expose the underlying bytes for a cryptographic operation.
    #[must_use]
    pub fn expose(&self) -> &[u8] {
        self.inner.expose_secret()
    }

    /// Returns the number of bytes in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.expose().len()
    }

    /// Returns `true` if the buffer is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Zeroizing<Vec<u8>>> for SecretBuffer {
    fn from(mut data: Zeroizing<Vec<u8>>) -> Self {
        Self::from_vec(std::mem::take(&mut *data))
    }
}

impl fmt::Debug for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

impl fmt::Display for SecretBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SecretBuffer(***)")
    }
}

// ---------------------------------------------------------------------------
// SecretBytes<N> (fixed-size)
// ---------------------------------------------------------------------------

/// Fixed-size key, erased when it goes out of scope.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SecretBytes<const N: usize> {
    bytes: [u8; N],
}

impl<const N: usize> SecretBytes<N> {
    /// Wrap a fixed-size array.
    #[must_use]
    pub const fn new(bytes: [u8; N]) -> Self {
        Self { bytes }
    }

    /// Copy exactly `N` bytes out of `slice`.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::PrimitiveFailure` if `slice` is not `N` bytes long.
    pub fn from_slice(slice: &[u8]) -> Result<Self, CryptoError> {
        let bytes: [u8; N] = slice.try_into().map_err(|_| {
            CryptoError::PrimitiveFailure(format!(
                "invalid key length: {} bytes (expected {N})",
                slice.len()
            ))
        })?;
        Ok(Self::new(bytes))
    }

    /// Expose the underlying bytes for a cryptographic operation.
    #[must_use]
    pub const fn expose(&self) -> &[u8; N] {
        &self.bytes
    }
}

impl<const N: usize> fmt::Debug for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{N}>(***)")
    }
}

impl<const N: usize> fmt::Display for SecretBytes<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretBytes<{N}>(***)")
    }
}

impl<const N: usize> From<[u8; N]> for SecretBytes<N> {
    fn from(bytes: [u8; N]) -> Self {
        Self::new(bytes)
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn secret_buffer_stores_content() {
        let buf = SecretBuffer::new(b"derived key");
        assert_eq!(buf.expose(), b"derived key");
        assert_eq!(buf.len(), 11);
        assert!(!buf.is_empty());
    }

    #[test]
    fn secret_buffer_from_zeroizing_moves_bytes() {
        let data = Zeroizing::new(vec![7u8; 48]);
        let buf = SecretBuffer::from(data);
        assert_eq!(buf.expose(), &[7u8; 48][..]);
    }

    #[test]
    fn secret_buffer_debug_is_masked() {
        let buf = SecretBuffer::new(b"super secret");
        assert_eq!(format!("{buf:?}"), "SecretBuffer(***)");
        assert_eq!(format!("{buf}"), "SecretBuffer(***)");
    }

    #[test]
    fn secret_bytes_from_slice_checks_length() {
        let key = SecretBytes::<32>::from_slice(&[0xAB; 32]).expect("32 bytes should fit");
        assert_eq!(key.expose(), &[0xAB; 32]);

        let err = SecretBytes::<32>::from_slice(&[0u8; 31]).expect_err("31 bytes should fail");
        assert!(err.to_string().contains("invalid key length"));
    }

    #[test]
    fn secret_bytes_debug_is_masked() {
        let key = SecretBytes::<16>::new([0xFF; 16]);
        assert_eq!(format!("{key:?}"), "SecretBytes<16>(***)");
        assert_eq!(format!("{key}"), "SecretBytes<16>(***)");
    }

    #[test]
    fn secret_bytes_zeroize_clears_bytes() {
        let mut key = SecretBytes::<8>::new([0x42; 8]);
        key.zeroize();
        assert_eq!(key.expose(), &[0u8; 8]);
    }
}
