//! Cryptographic error types for `keyward-crypto-core`.

use thiserror::Error;

/// Errors produced by key derivation and primitive operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CryptoError {
    /// PBKDF2 was asked to run zero iterations.
    #[error("invalid iteration count: must be greater than zero")]
    InvalidIterationCount,

    /// Requested output is empty or not a whole number of bytes.
    #[error("invalid derived key length: {bits} bits")]
    InvalidDerivedKeyLength {
        /// The requested output length in bits.
        bits: usize,
    },

    /// Requested output exceeds the construction's limit for this hash.
    #[error("derived key too long: {requested} bytes (maximum {max})")]
    DerivedKeyTooLong {
        /// Requested output length in bytes.
        requested: usize,
        /// Maximum output length in bytes for the chosen hash.
        max: u64,
    },

    /// Hash algorithm name is not one of `SHA-256` / `SHA-512`.
    #[error("unsupported hash algorithm: {0}")]
    UnsupportedHash(String),

    /// MAC verification failed: tampered payload or wrong key.
    #[error("bad MAC")]
    AuthenticationFailed,

    /// The primitive provider rejected an operation (key import, IV length, ...).
    #[error("primitive failure: {0}")]
    PrimitiveFailure(String),
}
