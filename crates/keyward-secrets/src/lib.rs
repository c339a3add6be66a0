//! `keyward-secrets`: recovering secrets from server-side secret storage.
//!
//! Passphrase and recovery-key unlocking, authenticated decryption of stored
//! secrets (MAC checked before the cipher runs) and access to the key backup
//! whose private key lives in secret storage. Primitives come from
//! `keyward-crypto-core`.

#![cfg_attr(test, allow(clippy::unwrap_used, clippy::arithmetic_side_effects))]

mod base64;

pub mod backup;
pub mod error;
pub mod recovery_key;
pub mod ssss;
pub mod storage;
pub mod telemetry;

pub use backup::{
    decrypt_session, verify_backup_key, BackupApi, BackupAuthData, BackupInfo, BackupSession,
    KeyBackupData, PkDecryption, PkDecryptionFactory, PkDecryptionGuard, SessionBackup,
    SessionData,
};
pub use error::SecretsError;
pub use recovery_key::{decode_recovery_key, encode_recovery_key};
pub use ssss::{
    EncryptedSecret, PassphraseInfo, SecretDecryptor, SecretKeys, SecretStorageKeyDescription,
};
pub use storage::{AccountDataSource, SecretStorage};
