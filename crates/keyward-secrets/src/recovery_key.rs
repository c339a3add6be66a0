//! Recovery keys: a 32-byte secret storage key in human-typable form.
//!
//! Layout before base58: `0x8B 0x01 || key || parity`, where the parity
//! byte makes the XOR of all 35 bytes zero. The encoded text is grouped in
//! fours for display; whitespace is ignored on input.

use crate::error::SecretsError;
use keyward_crypto_core::SecretBytes;
use secrecy::SecretString;
use zeroize::Zeroizing;

pub const RECOVERY_KEY_LEN: usize = 32;

const HEADER: [u8; 2] = [0x8B, 0x01];
const KEY_END: usize = HEADER.len() + RECOVERY_KEY_LEN;
const ENCODED_LEN: usize = KEY_END + 1;
const GROUP_LEN: usize = 4;

/// Parse a recovery key.
///
/// # Errors
///
/// `InvalidRecoveryKey` if the text is not base58, has the wrong length or
/// header, or fails the parity check.
pub fn decode_recovery_key(text: &str) -> Result<SecretBytes<RECOVERY_KEY_LEN>, SecretsError> {
    let compact: Zeroizing<String> =
        Zeroizing::new(text.chars().filter(|c| !c.is_whitespace()).collect());
    let decoded = Zeroizing::new(
        bs58::decode(compact.as_bytes())
            .with_alphabet(bs58::Alphabet::BITCOIN)
            .into_vec()
            .map_err(|_| SecretsError::InvalidRecoveryKey("not base58"))?,
    );

    if decoded.len() != ENCODED_LEN {
        return Err(SecretsError::InvalidRecoveryKey("wrong length"));
    }
    if !decoded.starts_with(&HEADER) {
        return Err(SecretsError::InvalidRecoveryKey("wrong header"));
    }
    if parity(&decoded) != 0 {
        return Err(SecretsError::InvalidRecoveryKey("parity check failed"));
    }

    let key = decoded
        .get(HEADER.len()..KEY_END)
        .ok_or(SecretsError::InvalidRecoveryKey("wrong length"))?;
    Ok(SecretBytes::from_slice(key)?)
}

/// Format `key` as a recovery key, in space-separated groups of four.
#[must_use]
pub fn encode_recovery_key(key: &[u8; RECOVERY_KEY_LEN]) -> SecretString {
    let mut raw = Zeroizing::new(Vec::with_capacity(ENCODED_LEN));
    raw.extend_from_slice(&HEADER);
    raw.extend_from_slice(key);
    let check = parity(&raw);
    raw.push(check);

    let encoded = Zeroizing::new(
        bs58::encode(raw.as_slice())
            .with_alphabet(bs58::Alphabet::BITCOIN)
            .into_string(),
    );
    let mut grouped = String::with_capacity(encoded.len().saturating_mul(2));
    for (i, c) in encoded.chars().enumerate() {
        if i > 0 && i % GROUP_LEN == 0 {
            grouped.push(' ');
        }
        grouped.push(c);
    }
    SecretString::from(grouped)
}

fn parity(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0, |acc, byte| acc ^ byte)
}
