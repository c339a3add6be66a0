use data_encoding::HEXLOWER;
use keyward_crypto_core::{KeyDerivation, RingProvider};

mod hkdf;
mod pbkdf2;

/// Decode a lowercase hex literal.
pub fn hex(s: &str) -> Vec<u8> {
    HEXLOWER.decode(s.as_bytes()).expect("test vector should be valid hex")
}

/// Both strategies over the default provider.
pub fn strategies() -> [KeyDerivation<'static>; 2] {
    [
        KeyDerivation::new(&RingProvider),
        KeyDerivation::legacy(&RingProvider),
    ]
}
