//! Secret storage (SSSS) encryption: `m.secret_storage.v1.aes-hmac-sha2`.
//!
//! A secret stored under a key is encrypted with AES-256-CTR and
//! authenticated with HMAC-SHA-256. Both keys come from one HKDF-SHA-256
//! expansion of the secret storage key, using the secret's name as `info`.
//! Decryption checks the MAC before the cipher runs.

use crate::base64;
use crate::error::SecretsError;
use keyward_crypto_core::{
    CryptoError, HashAlgorithm, HmacEngine, KeyDerivation, Pbkdf2Params, PrimitiveProvider,
    SecretBuffer, SecretBytes, AES_CTR_BLOCK_LEN, AES_CTR_COUNTER_BITS,
};
use rand::RngCore;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// Key algorithm for AES-CTR + HMAC-SHA-256 secret storage.
pub const AES_HMAC_SHA2: &str = "m.secret_storage.v1.aes-hmac-sha2";

/// Passphrase algorithm identifier for PBKDF2.
pub const PBKDF2_ALGORITHM: &str = "m.pbkdf2";

pub use keyward_crypto_core::kdf::{DEFAULT_BITS, DEFAULT_ITERATIONS};

/// Hash used to stretch passphrases.
pub const PASSPHRASE_HASH: HashAlgorithm = HashAlgorithm::Sha512;

const KEY_LEN: usize = 32;
const HKDF_SALT: [u8; 8] = [0; 8];
const CHECK_PLAINTEXT: [u8; 32] = [0; 32];

/// Parameters for deriving a secret storage key from a passphrase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassphraseInfo {
    /// Derivation algorithm; only `m.pbkdf2` is supported.
    pub algorithm: String,
    /// Salt, used as its UTF-8 bytes.
    pub salt: String,
    /// PBKDF2 iterations; absent or `0` means [`DEFAULT_ITERATIONS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u32>,
    /// Key size in bits; absent or `0` means [`DEFAULT_BITS`].
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bits: Option<usize>,
}

impl PassphraseInfo {
    /// PBKDF2 parameters with the given salt and iteration count.
    #[must_use]
    pub fn pbkdf2(salt: impl Into<String>, iterations: u32) -> Self {
        Self {
            algorithm: PBKDF2_ALGORITHM.to_owned(),
            salt: salt.into(),
            iterations: Some(iterations),
            bits: None,
        }
    }

    /// Iteration count, falling back to [`DEFAULT_ITERATIONS`] when absent
    /// or zero.
    #[must_use]
    pub fn iterations(&self) -> u32 {
        self.iterations
            .filter(|&n| n != 0)
            .unwrap_or(DEFAULT_ITERATIONS)
    }

    /// Output size in bits, falling back to [`DEFAULT_BITS`] when absent or
    /// zero.
    #[must_use]
    pub fn bits(&self) -> usize {
        self.bits.filter(|&n| n != 0).unwrap_or(DEFAULT_BITS)
    }

    /// PBKDF2 parameters these settings stand for. The salt is used as its
    /// UTF-8 bytes.
    #[must_use]
    pub fn to_params(&self) -> Pbkdf2Params {
        Pbkdf2Params::new(self.salt.as_bytes())
            .with_iterations(self.iterations())
            .with_hash(PASSPHRASE_HASH)
            .with_output_bits(self.bits())
    }
}

/// Content of an `m.secret_storage.key.<id>` account data event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretStorageKeyDescription {
    /// Encryption algorithm, `m.secret_storage.v1.aes-hmac-sha2`.
    pub algorithm: String,
    /// Display name of the key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Present when the key can be derived from a passphrase.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passphrase: Option<PassphraseInfo>,
    /// Base64 IV used for the key check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iv: Option<String>,
    /// Base64 MAC of the encrypted zero block, for the key check.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac: Option<String>,
}

/// One encrypted secret, as stored under a key id. All fields are base64.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedSecret {
    /// AES-256-CTR ciphertext of the UTF-8 secret.
    pub ciphertext: String,
    /// HMAC-SHA-256 over the ciphertext.
    pub mac: String,
    /// 16-byte initial counter block.
    pub iv: String,
}

/// AES and HMAC keys for one secret name.
#[derive(Debug)]
pub struct SecretKeys {
    aes_key: SecretBytes<KEY_LEN>,
    mac_key: SecretBytes<KEY_LEN>,
}

impl SecretKeys {
    fn split(okm: &SecretBuffer) -> Result<Self, CryptoError> {
        let okm = okm.expose();
        let (Some(aes), Some(mac)) = (okm.get(..KEY_LEN), okm.get(KEY_LEN..)) else {
            return Err(CryptoError::PrimitiveFailure(format!(
                "HKDF returned {} bytes, expected {}",
                okm.len(),
                KEY_LEN.saturating_mul(2)
            )));
        };
        Ok(Self {
            aes_key: SecretBytes::from_slice(aes)?,
            mac_key: SecretBytes::from_slice(mac)?,
        })
    }

    #[must_use]
    pub const fn aes_key(&self) -> &[u8; KEY_LEN] {
        self.aes_key.expose()
    }

    #[must_use]
    pub const fn mac_key(&self) -> &[u8; KEY_LEN] {
        self.mac_key.expose()
    }
}

/// Encrypts, decrypts and checks keys for secret storage.
#[derive(Clone, Copy)]
pub struct SecretDecryptor<'p> {
    provider: &'p dyn PrimitiveProvider,
    hmac: HmacEngine<'p>,
    kdf: KeyDerivation<'p>,
}

impl<'p> SecretDecryptor<'p> {
    /// Use `provider` for every primitive, with native key derivation when
    /// it has one.
    #[must_use]
    pub fn new(provider: &'p dyn PrimitiveProvider) -> Self {
        Self::with_derivation(provider, KeyDerivation::new(provider))
    }

    /// Use `kdf` for PBKDF2 and HKDF instead of the provider's default.
    #[must_use]
    pub fn with_derivation(provider: &'p dyn PrimitiveProvider, kdf: KeyDerivation<'p>) -> Self {
        Self {
            provider,
            hmac: HmacEngine::new(provider),
            kdf,
        }
    }

    /// Stretch `passphrase` into a secret storage key.
    ///
    /// # Errors
    ///
    /// `UnsupportedAlgorithm` unless `info.algorithm` is `m.pbkdf2`; PBKDF2
    /// parameter errors otherwise.
    pub async fn derive_ssss_key(
        &self,
        passphrase: &str,
        info: &PassphraseInfo,
    ) -> Result<SecretBuffer, SecretsError> {
        if info.algorithm != PBKDF2_ALGORITHM {
            return Err(SecretsError::UnsupportedAlgorithm(info.algorithm.clone()));
        }
        Ok(self
            .kdf
            .pbkdf2_with(passphrase.as_bytes(), &info.to_params())
            .await?)
    }

    /// HKDF-SHA-256 of `ssss_key` with an 8-byte zero salt and `name` as
    /// info, split into AES and MAC keys.
    ///
    /// # Errors
    ///
    /// Provider failures.
    pub async fn derive_secret_keys(
        &self,
        ssss_key: &[u8],
        name: &str,
    ) -> Result<SecretKeys, SecretsError> {
        let okm = self
            .kdf
            .hkdf(
                ssss_key,
                &HKDF_SALT,
                name.as_bytes(),
                HashAlgorithm::Sha256,
                KEY_LEN.saturating_mul(2).saturating_mul(8),
            )
            .await?;
        Ok(SecretKeys::split(&okm)?)
    }

    /// Authenticate and decrypt the secret stored as `event_type`.
    ///
    /// # Errors
    ///
    /// - `Base64` if a field does not decode
    /// - `Crypto(AuthenticationFailed)` if the MAC does not match; the
    ///   cipher is never run in that case
    /// - `InvalidUtf8` if the plaintext is not UTF-8
    pub async fn decrypt_secret(
        &self,
        ssss_key: &[u8],
        event_type: &str,
        secret: &EncryptedSecret,
    ) -> Result<SecretString, SecretsError> {
        let keys = self.derive_secret_keys(ssss_key, event_type).await?;

        let ciphertext = base64::decode("ciphertext", &secret.ciphertext)?;
        let mac = base64::decode("mac", &secret.mac)?;
        let iv = base64::decode("iv", &secret.iv)?;

        let authentic = self
            .hmac
            .verify(keys.mac_key(), &mac, &ciphertext, HashAlgorithm::Sha256)
            .await?;
        if !authentic {
            tracing::warn!(event_type, "secret MAC mismatch");
            return Err(CryptoError::AuthenticationFailed.into());
        }

        let plaintext = Zeroizing::new(
            self.provider
                .aes_ctr_decrypt(keys.aes_key(), &iv, AES_CTR_COUNTER_BITS, &ciphertext)
                .await?,
        );
        let text = std::str::from_utf8(&plaintext).map_err(|_| SecretsError::InvalidUtf8)?;
        tracing::debug!(event_type, "secret decrypted");
        Ok(SecretString::from(text.to_owned()))
    }

    /// Encrypt `plaintext` for storage as `event_type` under a fresh IV.
    ///
    /// # Errors
    ///
    /// Provider failures.
    pub async fn encrypt_secret(
        &self,
        ssss_key: &[u8],
        event_type: &str,
        plaintext: &str,
    ) -> Result<EncryptedSecret, SecretsError> {
        self.encrypt_secret_with_iv(ssss_key, event_type, plaintext, random_iv())
            .await
    }

    /// Encrypt with a caller-chosen IV.
    ///
    /// # Errors
    ///
    /// Provider failures.
    pub async fn encrypt_secret_with_iv(
        &self,
        ssss_key: &[u8],
        event_type: &str,
        plaintext: &str,
        iv: [u8; AES_CTR_BLOCK_LEN],
    ) -> Result<EncryptedSecret, SecretsError> {
        let keys = self.derive_secret_keys(ssss_key, event_type).await?;
        let (ciphertext, mac) = self.seal(&keys, plaintext.as_bytes(), &iv).await?;
        Ok(EncryptedSecret {
            ciphertext: base64::encode(&ciphertext),
            mac: base64::encode(&mac),
            iv: base64::encode(&iv),
        })
    }

    /// Whether `ssss_key` is the key `description` was created for.
    ///
    /// The description's MAC is that of 32 zero bytes encrypted under the
    /// empty secret name with the description's IV. Descriptions without
    /// `iv` and `mac` cannot be checked and are accepted.
    ///
    /// # Errors
    ///
    /// `UnsupportedAlgorithm` for keys that are not `aes-hmac-sha2`,
    /// `Base64` for undecodable check fields.
    pub async fn check_key(
        &self,
        ssss_key: &[u8],
        description: &SecretStorageKeyDescription,
    ) -> Result<bool, SecretsError> {
        if description.algorithm != AES_HMAC_SHA2 {
            return Err(SecretsError::UnsupportedAlgorithm(
                description.algorithm.clone(),
            ));
        }
        let (Some(iv), Some(mac)) = (&description.iv, &description.mac) else {
            tracing::debug!("key description has no check MAC; accepting key");
            return Ok(true);
        };

        let iv = base64::decode("iv", iv)?;
        let mac = base64::decode("mac", mac)?;
        let keys = self.derive_secret_keys(ssss_key, "").await?;
        let ciphertext = self
            .provider
            .aes_ctr_encrypt(keys.aes_key(), &iv, AES_CTR_COUNTER_BITS, &CHECK_PLAINTEXT)
            .await?;
        Ok(self
            .hmac
            .verify(keys.mac_key(), &mac, &ciphertext, HashAlgorithm::Sha256)
            .await?)
    }

    /// Build a key description with a check MAC for `ssss_key`.
    ///
    /// # Errors
    ///
    /// Provider failures.
    pub async fn describe_key(
        &self,
        ssss_key: &[u8],
        name: Option<String>,
        passphrase: Option<PassphraseInfo>,
    ) -> Result<SecretStorageKeyDescription, SecretsError> {
        let iv = random_iv();
        let keys = self.derive_secret_keys(ssss_key, "").await?;
        let (_, mac) = self.seal(&keys, &CHECK_PLAINTEXT, &iv).await?;
        Ok(SecretStorageKeyDescription {
            algorithm: AES_HMAC_SHA2.to_owned(),
            name,
            passphrase,
            iv: Some(base64::encode(&iv)),
            mac: Some(base64::encode(&mac)),
        })
    }

    async fn seal(
        &self,
        keys: &SecretKeys,
        plaintext: &[u8],
        iv: &[u8],
    ) -> Result<(Vec<u8>, Vec<u8>), CryptoError> {
        let ciphertext = self
            .provider
            .aes_ctr_encrypt(keys.aes_key(), iv, AES_CTR_COUNTER_BITS, plaintext)
            .await?;
        let mac = self
            .hmac
            .compute(keys.mac_key(), &ciphertext, HashAlgorithm::Sha256)
            .await?;
        Ok((ciphertext, mac))
    }
}

impl std::fmt::Debug for SecretDecryptor<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SecretDecryptor")
            .field("kdf", &self.kdf)
            .finish_non_exhaustive()
    }
}

/// Random IV with bit 63 cleared, so the 64-bit counter half cannot wrap
/// for any secret this size.
fn random_iv() -> [u8; AES_CTR_BLOCK_LEN] {
    let mut iv = [0u8; AES_CTR_BLOCK_LEN];
    rand::thread_rng().fill_bytes(&mut iv);
    iv[8] &= 0x7f;
    iv
}
