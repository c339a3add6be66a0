//! Server-side key backup (`m.megolm_backup.v1.curve25519-aes-sha2`).
//!
//! The asymmetric decryption itself is an external capability behind
//! [`PkDecryption`]. This module checks that the backup private key matches
//! the public key the server advertises before any session is decrypted,
//! and releases every decryption handle on every exit path.

use crate::base64;
use crate::error::SecretsError;
use crate::storage::{AccountDataSource, SecretStorage};
use keyward_crypto_core::SecretBuffer;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use zeroize::Zeroizing;

/// Name of the secret holding the backup private key.
pub const MEGOLM_BACKUP_SECRET: &str = "m.megolm_backup.v1";

/// The only backup algorithm supported.
pub const BACKUP_ALGORITHM: &str = "m.megolm_backup.v1.curve25519-aes-sha2";

/// Public/private-key decryption handle.
pub trait PkDecryption {
    /// Load `private_key` and return the matching public key (base64).
    ///
    /// # Errors
    ///
    /// `Backend` if the key is rejected.
    fn init_with_private_key(&mut self, private_key: &[u8]) -> Result<String, SecretsError>;

    /// Decrypt one message to its plaintext.
    ///
    /// # Errors
    ///
    /// `Backend` on any decryption failure.
    fn decrypt(&self, ephemeral: &str, mac: &str, ciphertext: &str)
        -> Result<String, SecretsError>;

    /// Release resources held by the handle.
    fn free(&mut self);
}

/// Creates fresh [`PkDecryption`] handles.
pub trait PkDecryptionFactory {
    type Handle: PkDecryption;

    /// A new, uninitialised handle. The caller owns it until `free`.
    fn create(&self) -> Self::Handle;
}

/// Owns a handle and frees it when dropped.
pub struct PkDecryptionGuard<D: PkDecryption> {
    handle: D,
    public_key: String,
}

impl<D: PkDecryption> PkDecryptionGuard<D> {
    /// Create a handle from `factory` and load `private_key` into it. The
    /// handle is freed if loading fails.
    ///
    /// # Errors
    ///
    /// Whatever [`PkDecryption::init_with_private_key`] reports.
    pub fn acquire<F>(factory: &F, private_key: &[u8]) -> Result<Self, SecretsError>
    where
        F: PkDecryptionFactory<Handle = D>,
    {
        let mut guard = Self {
            handle: factory.create(),
            public_key: String::new(),
        };
        guard.public_key = guard.handle.init_with_private_key(private_key)?;
        Ok(guard)
    }

    /// Public key derived from the private key.
    #[must_use]
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// Decrypt `session_data` to its JSON plaintext.
    ///
    /// # Errors
    ///
    /// Whatever [`PkDecryption::decrypt`] reports.
    pub fn decrypt(&self, session_data: &SessionData) -> Result<Zeroizing<String>, SecretsError> {
        self.handle
            .decrypt(
                &session_data.ephemeral,
                &session_data.mac,
                &session_data.ciphertext,
            )
            .map(Zeroizing::new)
    }
}

impl<D: PkDecryption> Drop for PkDecryptionGuard<D> {
    fn drop(&mut self) {
        self.handle.free();
    }
}

/// `GET /room_keys/version` response.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupInfo {
    /// Backup algorithm; only `m.megolm_backup.v1.curve25519-aes-sha2`.
    pub algorithm: String,
    /// Algorithm-specific data, including the backup public key.
    pub auth_data: BackupAuthData,
    /// Server-assigned backup version.
    pub version: String,
    /// Number of stored sessions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<u64>,
    /// Changes whenever the stored sessions change.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
}

/// `auth_data` of a curve25519 backup.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupAuthData {
    /// Unpadded base64 curve25519 public key.
    pub public_key: String,
    /// Signatures over the auth data, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signatures: Option<serde_json::Value>,
}

/// One backed-up session as stored on the server.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBackupData {
    /// First message index the session key can decrypt.
    pub first_message_index: u64,
    /// How many times the key was forwarded.
    pub forwarded_count: u64,
    /// Whether the uploading device verified the sender.
    pub is_verified: bool,
    /// Encrypted session.
    pub session_data: SessionData,
}

/// Encrypted session payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionData {
    /// Sender's ephemeral public key.
    pub ephemeral: String,
    /// MAC checked by the decryption handle.
    pub mac: String,
    /// Encrypted session JSON.
    pub ciphertext: String,
}

/// A decrypted backup session.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSession {
    /// Session algorithm, normally `m.megolm.v1.aes-sha2`.
    pub algorithm: String,
    /// Curve25519 key of the device that created the session.
    pub sender_key: String,
    /// Keys of the devices the session was forwarded through.
    #[serde(default)]
    pub forwarding_curve25519_key_chain: Vec<String>,
    /// Exported session key. Zeroized on drop and masked in `Debug`.
    pub session_key: String,
    /// Keys the sender claims to own, by algorithm.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub sender_claimed_keys: BTreeMap<String, String>,
}

impl std::fmt::Debug for BackupSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackupSession")
            .field("algorithm", &self.algorithm)
            .field("sender_key", &self.sender_key)
            .field(
                "forwarding_curve25519_key_chain",
                &self.forwarding_curve25519_key_chain,
            )
            .field("session_key", &"***")
            .field("sender_claimed_keys", &self.sender_claimed_keys)
            .finish()
    }
}

impl Drop for BackupSession {
    fn drop(&mut self) {
        zeroize::Zeroize::zeroize(&mut self.session_key);
    }
}

/// Load `private_key` and check it against the key `backup_info` advertises.
///
/// # Errors
///
/// - `UnsupportedAlgorithm` for any other backup algorithm
/// - `BackupKeyMismatch` if the derived public key differs; the handle is
///   freed and never asked to decrypt
pub fn verify_backup_key<F: PkDecryptionFactory>(
    factory: &F,
    private_key: &[u8],
    backup_info: &BackupInfo,
) -> Result<PkDecryptionGuard<F::Handle>, SecretsError> {
    if backup_info.algorithm != BACKUP_ALGORITHM {
        return Err(SecretsError::UnsupportedAlgorithm(
            backup_info.algorithm.clone(),
        ));
    }
    let guard = PkDecryptionGuard::acquire(factory, private_key)?;
    let expected = &backup_info.auth_data.public_key;
    if guard.public_key() != expected.as_str() {
        tracing::warn!(version = %backup_info.version, "backup key does not match");
        return Err(SecretsError::BackupKeyMismatch {
            calculated: guard.public_key().to_owned(),
            expected: expected.clone(),
        });
    }
    Ok(guard)
}

/// Decrypt one backed-up session with `private_key`.
///
/// # Errors
///
/// Errors from [`verify_backup_key`], the decryption handle, or JSON
/// parsing of the plaintext.
pub fn decrypt_session<F: PkDecryptionFactory>(
    factory: &F,
    private_key: &[u8],
    backup_info: &BackupInfo,
    session_data: &SessionData,
) -> Result<BackupSession, SecretsError> {
    let guard = verify_backup_key(factory, private_key, backup_info)?;
    let plaintext = guard.decrypt(session_data)?;
    Ok(serde_json::from_str(&plaintext)?)
}

/// Homeserver room-key backup endpoints.
pub trait BackupApi: Send + Sync {
    /// Current backup version.
    fn backup_info(&self) -> impl Future<Output = Result<BackupInfo, SecretsError>> + Send;

    /// Backed-up data for one session.
    fn room_key(
        &self,
        version: &str,
        room_id: &str,
        session_id: &str,
    ) -> impl Future<Output = Result<KeyBackupData, SecretsError>> + Send;
}

/// Access to the current key backup with a verified private key.
pub struct SessionBackup<F, A> {
    factory: F,
    api: A,
    backup_info: BackupInfo,
    private_key: SecretBuffer,
}

impl<F: PkDecryptionFactory, A: BackupApi> SessionBackup<F, A> {
    /// Read the backup private key from secret storage and check it against
    /// the current backup.
    ///
    /// `Ok(None)` if secret storage holds no backup key.
    ///
    /// # Errors
    ///
    /// Secret storage errors, `Base64` for a malformed key, API errors and
    /// the errors of [`verify_backup_key`].
    pub async fn from_secret_storage<S: AccountDataSource>(
        factory: F,
        storage: &SecretStorage<'_, S>,
        api: A,
    ) -> Result<Option<Self>, SecretsError> {
        let Some(secret) = storage.read_secret(MEGOLM_BACKUP_SECRET).await? else {
            return Ok(None);
        };
        let private_key = SecretBuffer::from_vec(base64::decode(
            MEGOLM_BACKUP_SECRET,
            secret.expose_secret(),
        )?);

        let backup_info = api.backup_info().await?;
        verify_backup_key(&factory, private_key.expose(), &backup_info)?;
        tracing::info!(version = %backup_info.version, "key backup opened");

        Ok(Some(Self {
            factory,
            api,
            backup_info,
            private_key,
        }))
    }

    #[must_use]
    pub const fn backup_info(&self) -> &BackupInfo {
        &self.backup_info
    }

    /// Fetch and decrypt the backed-up session `session_id` of `room_id`.
    ///
    /// # Errors
    ///
    /// API errors and the errors of [`decrypt_session`].
    pub async fn get_session(
        &self,
        room_id: &str,
        session_id: &str,
    ) -> Result<BackupSession, SecretsError> {
        let data = self
            .api
            .room_key(&self.backup_info.version, room_id, session_id)
            .await?;
        tracing::debug!(room_id, session_id, "decrypting backed-up session");
        decrypt_session(
            &self.factory,
            self.private_key.expose(),
            &self.backup_info,
            &data.session_data,
        )
    }
}

impl<F, A> std::fmt::Debug for SessionBackup<F, A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBackup")
            .field("version", &self.backup_info.version)
            .finish_non_exhaustive()
    }
}
