//! Error types for `keyward-secrets`.

use keyward_crypto_core::CryptoError;
use thiserror::Error;

/// Errors produced while recovering secrets and backup sessions.
#[derive(Debug, Error)]
pub enum SecretsError {
    /// Key derivation, MAC verification or a primitive failed
    /// (delegated from crypto-core). A bad MAC surfaces here as
    /// [`CryptoError::AuthenticationFailed`].
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    /// The public key derived from the backup private key differs from the
    /// one the server asserts (wrong recovery key or passphrase).
    #[error("bad backup key: public key does not match (calculated {calculated}, expected {expected})")]
    BackupKeyMismatch {
        /// Public key derived from the private key.
        calculated: String,
        /// Public key from the backup's `auth_data`.
        expected: String,
    },

    /// A base64 field could not be decoded.
    #[error("invalid base64 in {field}")]
    Base64 {
        /// Name of the offending field.
        field: &'static str,
    },

    /// Decrypted plaintext is not valid UTF-8.
    #[error("decrypted secret is not valid UTF-8")]
    InvalidUtf8,

    /// The encrypted secret has no entry for the requested key.
    #[error("secret is not encrypted with key {0}")]
    MissingSecret(String),

    /// Required account data is absent (default key, key description).
    #[error("account data not found: {0}")]
    MissingAccountData(String),

    /// The secret storage key was not created from a passphrase.
    #[error("secret storage key {0} has no passphrase")]
    NoPassphrase(String),

    /// An algorithm identifier this client does not implement.
    #[error("unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    /// Recovery key text is malformed (base58, length, header or parity).
    #[error("invalid recovery key: {0}")]
    InvalidRecoveryKey(&'static str),

    /// The supplied passphrase or recovery key does not match the key
    /// description's check MAC.
    #[error("wrong passphrase or recovery key")]
    WrongKey,

    /// Malformed JSON (account data, decrypted backup session).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Failure reported by an external collaborator (homeserver API,
    /// asymmetric decryption capability).
    #[error("backend error: {0}")]
    Backend(String),
}
