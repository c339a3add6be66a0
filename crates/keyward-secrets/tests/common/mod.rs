//! Shared fakes for the integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use data_encoding::HEXLOWER;
use keyward_crypto_core::{
    CryptoError, DeriveBits, HashAlgorithm, PrimitiveProvider, RingProvider, SecretBuffer,
};
use keyward_secrets::{
    AccountDataSource, BackupApi, BackupInfo, KeyBackupData, PkDecryption, PkDecryptionFactory,
    SecretsError,
};
use serde_json::Value;
use std::collections::HashMap;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// `ring` primitives, counting cipher calls. No native derivation, so
/// PBKDF2 and HKDF take the HMAC-based path, unless `short_hkdf` is set: then
/// a native HKDF answers with only 16 bytes.
#[derive(Default)]
pub struct RecordingProvider {
    pub decrypts: AtomicUsize,
    pub encrypts: AtomicUsize,
    pub short_hkdf: bool,
}

impl RecordingProvider {
    pub fn decrypts(&self) -> usize {
        self.decrypts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PrimitiveProvider for RecordingProvider {
    async fn digest(&self, hash: HashAlgorithm, data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        RingProvider.digest(hash, data).await
    }

    async fn hmac_sign(
        &self,
        key: &[u8],
        data: &[u8],
        hash: HashAlgorithm,
    ) -> Result<Vec<u8>, CryptoError> {
        RingProvider.hmac_sign(key, data, hash).await
    }

    async fn hmac_verify(
        &self,
        key: &[u8],
        tag: &[u8],
        data: &[u8],
        hash: HashAlgorithm,
    ) -> Result<bool, CryptoError> {
        RingProvider.hmac_verify(key, tag, data, hash).await
    }

    async fn aes_ctr_decrypt(
        &self,
        key: &[u8],
        counter: &[u8],
        counter_bits: u32,
        ciphertext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.decrypts.fetch_add(1, Ordering::SeqCst);
        RingProvider
            .aes_ctr_decrypt(key, counter, counter_bits, ciphertext)
            .await
    }

    async fn aes_ctr_encrypt(
        &self,
        key: &[u8],
        counter: &[u8],
        counter_bits: u32,
        plaintext: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        self.encrypts.fetch_add(1, Ordering::SeqCst);
        RingProvider
            .aes_ctr_encrypt(key, counter, counter_bits, plaintext)
            .await
    }

    fn derive_bits(&self) -> Option<&dyn DeriveBits> {
        if self.short_hkdf {
            Some(self)
        } else {
            None
        }
    }
}

#[async_trait]
impl DeriveBits for RecordingProvider {
    async fn pbkdf2(
        &self,
        password: &[u8],
        iterations: NonZeroU32,
        salt: &[u8],
        hash: HashAlgorithm,
        out_len: usize,
    ) -> Result<SecretBuffer, CryptoError> {
        RingProvider
            .pbkdf2(password, iterations, salt, hash, out_len)
            .await
    }

    async fn hkdf(
        &self,
        _key: &[u8],
        _salt: &[u8],
        _info: &[u8],
        _hash: HashAlgorithm,
        _out_len: usize,
    ) -> Result<SecretBuffer, CryptoError> {
        Ok(SecretBuffer::new(&[0u8; 16]))
    }
}

/// In-memory account data.
#[derive(Default)]
pub struct MemoryAccountData {
    events: HashMap<String, Value>,
}

impl MemoryAccountData {
    pub fn insert(&mut self, event_type: impl Into<String>, content: Value) {
        self.events.insert(event_type.into(), content);
    }
}

impl AccountDataSource for MemoryAccountData {
    async fn account_data(&self, event_type: &str) -> Result<Option<Value>, SecretsError> {
        Ok(self.events.get(event_type).cloned())
    }
}

/// Lifecycle counters shared by a fake factory and its handles.
#[derive(Clone, Default)]
pub struct PkCounters {
    created: Arc<AtomicUsize>,
    freed: Arc<AtomicUsize>,
    decrypted: Arc<AtomicUsize>,
}

impl PkCounters {
    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn freed(&self) -> usize {
        self.freed.load(Ordering::SeqCst)
    }

    pub fn decrypted(&self) -> usize {
        self.decrypted.load(Ordering::SeqCst)
    }
}

/// Public key the fake handle reports for `private_key`.
pub fn fake_public_key(private_key: &[u8]) -> String {
    format!("pub:{}", HEXLOWER.encode(private_key))
}

/// MAC the fake handle accepts.
pub const FAKE_MAC: &str = "ok";

/// Fake asymmetric decryption: the "ciphertext" is the plaintext, accepted
/// only with [`FAKE_MAC`].
pub struct FakePk {
    counters: PkCounters,
    loaded: bool,
}

impl PkDecryption for FakePk {
    fn init_with_private_key(&mut self, private_key: &[u8]) -> Result<String, SecretsError> {
        if private_key.len() != 32 {
            return Err(SecretsError::Backend("bad private key length".into()));
        }
        self.loaded = true;
        Ok(fake_public_key(private_key))
    }

    fn decrypt(
        &self,
        _ephemeral: &str,
        mac: &str,
        ciphertext: &str,
    ) -> Result<String, SecretsError> {
        assert!(self.loaded, "decrypt before init");
        self.counters.decrypted.fetch_add(1, Ordering::SeqCst);
        if mac != FAKE_MAC {
            return Err(SecretsError::Backend("bad MAC".into()));
        }
        Ok(ciphertext.to_owned())
    }

    fn free(&mut self) {
        self.counters.freed.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Clone, Default)]
pub struct FakePkFactory {
    pub counters: PkCounters,
}

impl PkDecryptionFactory for FakePkFactory {
    type Handle = FakePk;

    fn create(&self) -> FakePk {
        self.counters.created.fetch_add(1, Ordering::SeqCst);
        FakePk {
            counters: self.counters.clone(),
            loaded: false,
        }
    }
}

/// In-memory backup endpoints.
pub struct MemoryBackupApi {
    pub info: BackupInfo,
    pub keys: HashMap<(String, String), KeyBackupData>,
}

impl BackupApi for MemoryBackupApi {
    async fn backup_info(&self) -> Result<BackupInfo, SecretsError> {
        Ok(self.info.clone())
    }

    async fn room_key(
        &self,
        version: &str,
        room_id: &str,
        session_id: &str,
    ) -> Result<KeyBackupData, SecretsError> {
        if version != self.info.version {
            return Err(SecretsError::Backend(format!("unknown version {version}")));
        }
        self.keys
            .get(&(room_id.to_owned(), session_id.to_owned()))
            .cloned()
            .ok_or_else(|| SecretsError::Backend("M_NOT_FOUND".into()))
    }
}
