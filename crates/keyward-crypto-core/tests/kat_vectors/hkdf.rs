//! RFC 5869 Appendix A vectors (SHA-256) plus a pinned SHA-512 value.

use super::{hex, strategies};
use keyward_crypto_core::HashAlgorithm;

fn range(start: u8, end_inclusive: u8) -> Vec<u8> {
    (start..=end_inclusive).collect()
}

/// RFC 5869 A.1: basic test case.
#[tokio::test]
async fn rfc5869_test_case_1() {
    let ikm = [0x0b; 22];
    let salt = range(0x00, 0x0c);
    let info = range(0xf0, 0xf9);
    let expected = hex(
        "3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865",
    );
    for kdf in strategies() {
        let okm = kdf
            .hkdf(&ikm, &salt, &info, HashAlgorithm::Sha256, 42 * 8)
            .await
            .expect("hkdf should succeed");
        assert_eq!(okm.expose(), expected.as_slice(), "{:?}", kdf.strategy());
    }
}

/// RFC 5869 A.2: longer inputs and outputs.
#[tokio::test]
async fn rfc5869_test_case_2() {
    let ikm = range(0x00, 0x4f);
    let salt = range(0x60, 0xaf);
    let info = range(0xb0, 0xff);
    let expected = hex(concat!(
        "b11e398dc80327a1c8e7f78c596a49344f012eda2d4efad8a050cc4c19afa97c",
        "59045a99cac7827271cb41c65e590e09da3275600c2f09b8367793a9aca3db71",
        "cc30c58179ec3e87c14c01d5c1f3434f1d87",
    ));
    for kdf in strategies() {
        let okm = kdf
            .hkdf(&ikm, &salt, &info, HashAlgorithm::Sha256, 82 * 8)
            .await
            .expect("hkdf should succeed");
        assert_eq!(okm.expose(), expected.as_slice(), "{:?}", kdf.strategy());
    }
}

/// RFC 5869 A.3: zero-length salt and info.
#[tokio::test]
async fn rfc5869_test_case_3() {
    let ikm = [0x0b; 22];
    let expected = hex(
        "8da4e775a563c18f715f802a063c5a31b8a11f5c5ee1879ec3454e5f3c738d2d9d201395faa4b61a96c8",
    );
    for kdf in strategies() {
        let okm = kdf
            .hkdf(&ikm, &[], &[], HashAlgorithm::Sha256, 42 * 8)
            .await
            .expect("hkdf should succeed");
        assert_eq!(okm.expose(), expected.as_slice(), "{:?}", kdf.strategy());
    }
}

#[tokio::test]
async fn sha512_two_blocks_pinned() {
    let ikm = [0x0b; 22];
    let salt = range(0x00, 0x0c);
    let info = range(0xf0, 0xf9);
    let expected = hex(concat!(
        "832390086cda71fb47625bb5ceb168e4c8e26a1a16ed34d9fc7fe92c14815793",
        "38da362cb8d9f925d7cbcce0dff7098769cf15959867d571c1715450cb530137",
        "be3fb62f3cf32b84feba8f1eb1b563e20d9749b8640b8264c4b69b14ad519911",
        "5e1d609c",
    ));
    for kdf in strategies() {
        let okm = kdf
            .hkdf(&ikm, &salt, &info, HashAlgorithm::Sha512, 100 * 8)
            .await
            .expect("hkdf should succeed");
        assert_eq!(okm.expose(), expected.as_slice(), "{:?}", kdf.strategy());
    }
}

/// Swapping salt and key must change the output: the salt is the HMAC key
/// of the extract step, the input key material is the message.
#[tokio::test]
async fn extract_argument_order_is_pinned() {
    let ikm = [0x0b; 22];
    let salt = range(0x00, 0x0c);
    let info = range(0xf0, 0xf9);
    for kdf in strategies() {
        let swapped = kdf
            .hkdf(&salt, &ikm, &info, HashAlgorithm::Sha256, 42 * 8)
            .await
            .expect("hkdf should succeed");
        assert_ne!(
            swapped.expose(),
            hex("3cb25f25faacd57a90434f64d0362f2a2d2d0a90cf1a5a4c5db02d56ecc4c5bf34007208d5b887185865")
                .as_slice()
        );
    }
}

/// HMAC zero-pads short keys, so an empty salt, an 8-byte zero salt and the
/// RFC default of `hLen` zero bytes all extract the same PRK.
#[tokio::test]
async fn short_zero_salts_equal_default_salt() {
    let ikm: Vec<u8> = (0u8..32).collect();
    for kdf in strategies() {
        let mut outputs = Vec::new();
        for salt in [&[][..], &[0u8; 8][..], &[0u8; 32][..]] {
            let okm = kdf
                .hkdf(&ikm, salt, b"m.megolm_backup.v1", HashAlgorithm::Sha256, 512)
                .await
                .expect("hkdf should succeed");
            outputs.push(okm.expose().to_vec());
        }
        assert_eq!(outputs[0], outputs[1]);
        assert_eq!(outputs[1], outputs[2]);
        assert_eq!(
            outputs[0][..32],
            hex("f22e0106af2db100b9f2992bc0a6a32963f818cc0ca469ca44c2009eef4f4ea5")[..]
        );
    }
}
