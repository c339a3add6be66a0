//! PBKDF2-HMAC vectors (RFC 7914 §11 for SHA-256; SHA-512 values from
//! widely published PBKDF2-HMAC-SHA512 test sets).

use super::{hex, strategies};
use keyward_crypto_core::HashAlgorithm;

struct Vector {
    password: &'static [u8],
    salt: &'static [u8],
    iterations: u32,
    hash: HashAlgorithm,
    expected: &'static str,
}

const VECTORS: &[Vector] = &[
    // Single block, single iteration: the loop runs once and nothing is folded.
    Vector {
        password: b"password",
        salt: b"salt",
        iterations: 1,
        hash: HashAlgorithm::Sha256,
        expected: "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b",
    },
    Vector {
        password: b"password",
        salt: b"salt",
        iterations: 2,
        hash: HashAlgorithm::Sha256,
        expected: "ae4d0c95af6b46d32d0adff928f06dd02a303f8ef3c251dfd6e2d85a95474c43",
    },
    Vector {
        password: b"password",
        salt: b"salt",
        iterations: 4096,
        hash: HashAlgorithm::Sha256,
        expected: "c5e478d59288c841aa530db6845c4c8d962893a001ce4e11a4963873aa98134a",
    },
    // Two blocks, second truncated to 8 bytes.
    Vector {
        password: b"passwordPASSWORDpassword",
        salt: b"saltSALTsaltSALTsaltSALTsaltSALTsalt",
        iterations: 4096,
        hash: HashAlgorithm::Sha256,
        expected: "348c89dbcbd32b2f32d814b8116e84cf2b17347ebc1800181c4e2a1fb8dd53e1c635518c7dac47e9",
    },
    // Three blocks, last truncated to 16 bytes.
    Vector {
        password: b"password",
        salt: b"salt",
        iterations: 1,
        hash: HashAlgorithm::Sha256,
        expected: "120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b\
                   4dbf3a2f3dad3377264bb7b8e8330d4efc7451418617dabef683735361cdc18c\
                   22cd7fe60fa40e91c65849e1f60c0d8b",
    },
    Vector {
        password: b"password",
        salt: b"salt",
        iterations: 1,
        hash: HashAlgorithm::Sha512,
        expected: "867f70cf1ade02cff3752599a3a53dc4af34c7a669815ae5d513554e1c8cf252\
                   c02d470a285a0501bad999bfe943c08f050235d7d68b1da55e63f73b60a57fce",
    },
    Vector {
        password: b"password",
        salt: b"salt",
        iterations: 2,
        hash: HashAlgorithm::Sha512,
        expected: "e1d9c16aa681708a45f5c7c4e215ceb66e011a2e9f0040713f18aefdb866d53c\
                   f76cab2868a39b9f7840edce4fef5a82be67335c77a6068e04112754f27ccf4e",
    },
    // Two SHA-512 blocks, second truncated to 36 bytes.
    Vector {
        password: b"password",
        salt: b"salt",
        iterations: 1,
        hash: HashAlgorithm::Sha512,
        expected: "867f70cf1ade02cff3752599a3a53dc4af34c7a669815ae5d513554e1c8cf252\
                   c02d470a285a0501bad999bfe943c08f050235d7d68b1da55e63f73b60a57fce\
                   7b532e206c2967d4c7d2ffa460539fc4d4e5eec70125d74c6c7cf86d25284f29\
                   7907fcea",
    },
];

fn compact(expected: &str) -> String {
    expected.split_whitespace().collect()
}

#[tokio::test]
async fn pbkdf2_matches_reference_vectors() {
    for kdf in strategies() {
        for (i, v) in VECTORS.iter().enumerate() {
            let expected = hex(&compact(v.expected));
            let out = kdf
                .pbkdf2(v.password, v.iterations, v.salt, v.hash, expected.len() * 8)
                .await
                .expect("pbkdf2 should succeed");
            assert_eq!(
                out.expose(),
                expected.as_slice(),
                "vector {i} mismatch with {:?} strategy",
                kdf.strategy()
            );
        }
    }
}

/// `pbkdf2("password", 1, "salt", SHA-256, 256)` pins reassembly for `l = 1`.
#[tokio::test]
async fn single_iteration_single_block_scenario() {
    for kdf in strategies() {
        let out = kdf
            .pbkdf2(b"password", 1, b"salt", HashAlgorithm::Sha256, 256)
            .await
            .expect("pbkdf2 should succeed");
        assert_eq!(out.len(), 32);
        assert_eq!(
            out.expose(),
            hex("120fb6cffcf8b32c43e7225256c4f837a86548c92ccc35480805987cb70be17b").as_slice()
        );
    }
}

/// Shorter outputs are prefixes of longer ones for the same inputs.
#[tokio::test]
async fn truncated_output_is_prefix() {
    for kdf in strategies() {
        let long = kdf
            .pbkdf2(b"password", 3, b"salt", HashAlgorithm::Sha256, 96 * 8)
            .await
            .expect("pbkdf2 should succeed");
        for bytes in [1, 31, 32, 33, 64, 65] {
            let short = kdf
                .pbkdf2(b"password", 3, b"salt", HashAlgorithm::Sha256, bytes * 8)
                .await
                .expect("pbkdf2 should succeed");
            assert_eq!(short.expose(), &long.expose()[..bytes]);
        }
    }
}
