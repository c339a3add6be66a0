//! Reading secrets out of account data with an unlocked storage key.

use crate::error::SecretsError;
use crate::recovery_key::decode_recovery_key;
use crate::ssss::{EncryptedSecret, SecretDecryptor, SecretStorageKeyDescription};
use keyward_crypto_core::SecretBuffer;
use secrecy::SecretString;
use serde::Deserialize;
use std::collections::HashMap;
use std::future::Future;

/// Account data event naming the default secret storage key.
pub const DEFAULT_KEY_EVENT: &str = "m.secret_storage.default_key";

/// Account data event type holding the description of `key_id`.
#[must_use]
pub fn key_event_type(key_id: &str) -> String {
    format!("m.secret_storage.key.{key_id}")
}

/// Where account data events come from (usually the homeserver).
pub trait AccountDataSource: Send + Sync {
    /// Content of the `event_type` account data event, or `None` if the
    /// account has none.
    fn account_data(
        &self,
        event_type: &str,
    ) -> impl Future<Output = Result<Option<serde_json::Value>, SecretsError>> + Send;
}

#[derive(Deserialize)]
struct DefaultKeyContent {
    key: String,
}

#[derive(Deserialize)]
struct EncryptedSecretContent {
    encrypted: HashMap<String, EncryptedSecret>,
}

/// Secret storage unlocked with one key.
pub struct SecretStorage<'p, S> {
    decryptor: SecretDecryptor<'p>,
    source: S,
    key_id: String,
    key: SecretBuffer,
}

impl<'p, S: AccountDataSource> SecretStorage<'p, S> {
    /// Wrap an already verified key.
    pub fn new(
        decryptor: SecretDecryptor<'p>,
        source: S,
        key_id: impl Into<String>,
        key: SecretBuffer,
    ) -> Self {
        Self {
            decryptor,
            source,
            key_id: key_id.into(),
            key,
        }
    }

    /// Unlock the default key with its passphrase.
    ///
    /// # Errors
    ///
    /// - `MissingAccountData` if there is no default key or no description
    /// - `NoPassphrase` if the key was not created from a passphrase
    /// - `WrongKey` if the derived key fails the description's check
    pub async fn unlock_with_passphrase(
        decryptor: SecretDecryptor<'p>,
        source: S,
        passphrase: &str,
    ) -> Result<Self, SecretsError> {
        let (key_id, description) = default_key(&source).await?;
        let info = description
            .passphrase
            .as_ref()
            .ok_or_else(|| SecretsError::NoPassphrase(key_id.clone()))?;
        let key = decryptor.derive_ssss_key(passphrase, info).await?;
        Self::verified(decryptor, source, key_id, &description, key).await
    }

    /// Unlock the default key with a recovery key.
    ///
    /// # Errors
    ///
    /// - `MissingAccountData` if there is no default key or no description
    /// - `InvalidRecoveryKey` if the text does not parse
    /// - `WrongKey` if the key fails the description's check
    pub async fn unlock_with_recovery_key(
        decryptor: SecretDecryptor<'p>,
        source: S,
        recovery_key: &str,
    ) -> Result<Self, SecretsError> {
        let (key_id, description) = default_key(&source).await?;
        let key = decode_recovery_key(recovery_key)?;
        let key = SecretBuffer::new(key.expose());
        Self::verified(decryptor, source, key_id, &description, key).await
    }

    async fn verified(
        decryptor: SecretDecryptor<'p>,
        source: S,
        key_id: String,
        description: &SecretStorageKeyDescription,
        key: SecretBuffer,
    ) -> Result<Self, SecretsError> {
        if !decryptor.check_key(key.expose(), description).await? {
            tracing::warn!(key_id = %key_id, "secret storage key check failed");
            return Err(SecretsError::WrongKey);
        }
        tracing::info!(key_id = %key_id, "secret storage unlocked");
        Ok(Self::new(decryptor, source, key_id, key))
    }

    /// Id of the unlocked key.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// The unlocked key.
    #[must_use]
    pub const fn key(&self) -> &SecretBuffer {
        &self.key
    }

    /// Decrypt the secret stored as the `name` account data event.
    ///
    /// `Ok(None)` if the account has no such event.
    ///
    /// # Errors
    ///
    /// - `MissingSecret` if the secret is not encrypted for this key
    /// - any decryption error from [`SecretDecryptor::decrypt_secret`]
    pub async fn read_secret(&self, name: &str) -> Result<Option<SecretString>, SecretsError> {
        let Some(content) = self.source.account_data(name).await? else {
            tracing::debug!(name, "secret not stored");
            return Ok(None);
        };
        let content: EncryptedSecretContent = serde_json::from_value(content)?;
        let secret = content
            .encrypted
            .get(&self.key_id)
            .ok_or_else(|| SecretsError::MissingSecret(self.key_id.clone()))?;
        let plaintext = self
            .decryptor
            .decrypt_secret(self.key.expose(), name, secret)
            .await?;
        Ok(Some(plaintext))
    }
}

impl<S> std::fmt::Debug for SecretStorage<'_, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretStorage")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Id and description of the account's default key.
async fn default_key<S: AccountDataSource>(
    source: &S,
) -> Result<(String, SecretStorageKeyDescription), SecretsError> {
    let content = source
        .account_data(DEFAULT_KEY_EVENT)
        .await?
        .ok_or_else(|| SecretsError::MissingAccountData(DEFAULT_KEY_EVENT.to_owned()))?;
    let DefaultKeyContent { key } = serde_json::from_value(content)?;

    let event_type = key_event_type(&key);
    let Some(content) = source.account_data(&event_type).await? else {
        return Err(SecretsError::MissingAccountData(event_type));
    };
    Ok((key, serde_json::from_value(content)?))
}
