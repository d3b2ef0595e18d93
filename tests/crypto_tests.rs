//! Integration tests for the CredVault crypto module.

use credvault::crypto::encryption::{decrypt, encrypt, NONCE_LEN};
use credvault::crypto::keys::derive_wrapping_key;
use credvault::crypto::{derive_root_key, generate_salt, Argon2Params, DigestAlgorithm, RootKey};

fn cheap() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

// ---------------------------------------------------------------------------
// AES-256-GCM wrapping
// ---------------------------------------------------------------------------

#[test]
fn wrap_unwrap_roundtrip_with_aad() {
    let key = [0xABu8; 32];
    let data_key = [0x42u8; 64];
    let aad = br#"{"app":"api"}"#;

    let wrapped = encrypt(&key, &data_key, aad).expect("encrypt should succeed");
    // 12-byte nonce + 16-byte tag around the payload.
    assert_eq!(wrapped.len(), NONCE_LEN + data_key.len() + 16);

    let recovered = decrypt(&key, &wrapped, aad).expect("decrypt should succeed");
    assert_eq!(&recovered[..], &data_key[..]);
}

#[test]
fn wrap_produces_different_ciphertext_each_time() {
    let key = [0xCDu8; 32];
    let ct1 = encrypt(&key, b"same", b"").unwrap();
    let ct2 = encrypt(&key, b"same", b"").unwrap();
    assert_ne!(ct1, ct2, "each call must use a fresh nonce");
}

#[test]
fn unwrap_with_other_aad_fails() {
    let key = [0x11u8; 32];
    let wrapped = encrypt(&key, b"material", br#"{"env":"prod"}"#).unwrap();
    assert!(decrypt(&key, &wrapped, br#"{"env":"dev"}"#).is_err());
    assert!(decrypt(&key, &wrapped, b"").is_err());
}

#[test]
fn unwrap_with_wrong_key_or_truncated_blob_fails() {
    let wrapped = encrypt(&[0x11u8; 32], b"material", b"").unwrap();
    assert!(decrypt(&[0x22u8; 32], &wrapped, b"").is_err());
    assert!(decrypt(&[0x11u8; 32], &wrapped[..5], b"").is_err());
}

// ---------------------------------------------------------------------------
// Root key derivation (Argon2id) and HKDF wrapping keys
// ---------------------------------------------------------------------------

#[test]
fn derive_root_key_is_deterministic_per_salt() {
    let salt = generate_salt();
    let a = derive_root_key(b"passphrase", &salt, &cheap()).unwrap();
    let b = derive_root_key(b"passphrase", &salt, &cheap()).unwrap();
    assert_eq!(a, b);

    let other = derive_root_key(b"passphrase", &generate_salt(), &cheap()).unwrap();
    assert_ne!(a, other);
}

#[test]
fn derive_root_key_rejects_weak_params() {
    let weak = Argon2Params {
        memory_kib: 64,
        iterations: 1,
        parallelism: 1,
    };
    assert!(derive_root_key(b"pw", &generate_salt(), &weak).is_err());
}

#[test]
fn wrapping_keys_differ_per_key_id() {
    let root = [7u8; 32];
    let a = derive_wrapping_key(&root, "alias/credstash").unwrap();
    let b = derive_wrapping_key(&root, "alias/other").unwrap();
    assert_ne!(a, b);
    assert_eq!(a, derive_wrapping_key(&root, "alias/credstash").unwrap());
}

#[test]
fn root_key_verifier_detects_wrong_key() {
    let right = RootKey::new([1u8; 32]);
    let wrong = RootKey::new([2u8; 32]);
    let verifier = right.verifier().unwrap();
    assert!(right.matches_verifier(&verifier).unwrap());
    assert!(!wrong.matches_verifier(&verifier).unwrap());
}

// ---------------------------------------------------------------------------
// Digest selection
// ---------------------------------------------------------------------------

#[test]
fn digest_names_parse_back() {
    for digest in DigestAlgorithm::ALL {
        assert_eq!(digest.name().parse::<DigestAlgorithm>().unwrap(), digest);
    }
    assert_eq!(
        "sha-384".parse::<DigestAlgorithm>().unwrap(),
        DigestAlgorithm::Sha384
    );
    assert!("whirlpool".parse::<DigestAlgorithm>().is_err());
}
