//! Base64 as used on the wire: unpadded on output, padding tolerated on input.

use crate::error::SecretsError;
use data_encoding::BASE64_NOPAD;

/// Decode `text`, naming `field` in the error.
pub(crate) fn decode(field: &'static str, text: &str) -> Result<Vec<u8>, SecretsError> {
    BASE64_NOPAD
        .decode(text.trim_end_matches('=').as_bytes())
        .map_err(|_| SecretsError::Base64 { field })
}

/// Encode without padding.
pub(crate) fn encode(bytes: &[u8]) -> String {
    BASE64_NOPAD.encode(bytes)
}
