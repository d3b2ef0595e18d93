//! Key derivation helpers using HKDF-SHA256.
//!
//! From the keyring root key we derive:
//! - A **wrapping key** per master key id, used to seal data keys.
//! - A **verifier** that lets the keyring detect a wrong passphrase
//!   before any data key is touched.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use hkdf::Hkdf;
use sha2::Sha256;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::errors::{CredVaultError, Result};

/// Length of derived sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

/// Derive the wrapping key for `key_id`.
///
/// `info` is `"credvault-kms:<key_id>"`, so every master key id seals
/// data keys under an independent key.
pub fn derive_wrapping_key(root_key: &[u8], key_id: &str) -> Result<[u8; KEY_LEN]> {
    let info = format!("credvault-kms:{key_id}");
    hkdf_derive(root_key, info.as_bytes())
}

fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<[u8; KEY_LEN]> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = [0u8; KEY_LEN];
    hk.expand(info, &mut okm)
        .map_err(|e| CredVaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A 32-byte root key that zeroes its memory when dropped.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct RootKey {
    bytes: [u8; KEY_LEN],
}

impl RootKey {
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Random root key, for keyrings that never touch disk.
    pub fn generate() -> Self {
        use rand::RngCore;
        let mut bytes = [0u8; KEY_LEN];
        rand::rng().fill_bytes(&mut bytes);
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derive the wrapping key for a master key id.
    pub fn wrapping_key(&self, key_id: &str) -> Result<[u8; KEY_LEN]> {
        derive_wrapping_key(&self.bytes, key_id)
    }

    /// Base64 verifier stored in the keyring file.
    pub fn verifier(&self) -> Result<String> {
        let mut check = hkdf_derive(&self.bytes, b"credvault-keyring-verifier")?;
        let encoded = BASE64.encode(check);
        check.zeroize();
        Ok(encoded)
    }

    /// Constant-time check of a stored verifier.
    pub fn matches_verifier(&self, expected: &str) -> Result<bool> {
        let actual = self.verifier()?;
        Ok(actual.as_bytes().ct_eq(expected.as_bytes()).into())
    }
}
