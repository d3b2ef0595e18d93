//! Digest algorithms selectable for the integrity tag.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Sha256, Sha384, Sha512};

use crate::errors::{CredVaultError, Result};

/// Hash function used for the HMAC over a secret's ciphertext.
///
/// Serialized with the upper-case names stored in the `digest` attribute.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestAlgorithm {
    #[serde(rename = "MD5")]
    Md5,
    #[serde(rename = "SHA1")]
    Sha1,
    #[default]
    #[serde(rename = "SHA256")]
    Sha256,
    #[serde(rename = "SHA384")]
    Sha384,
    #[serde(rename = "SHA512")]
    Sha512,
}

impl DigestAlgorithm {
    pub const ALL: [DigestAlgorithm; 5] = [
        DigestAlgorithm::Md5,
        DigestAlgorithm::Sha1,
        DigestAlgorithm::Sha256,
        DigestAlgorithm::Sha384,
        DigestAlgorithm::Sha512,
    ];

    pub fn name(self) -> &'static str {
        match self {
            DigestAlgorithm::Md5 => "MD5",
            DigestAlgorithm::Sha1 => "SHA1",
            DigestAlgorithm::Sha256 => "SHA256",
            DigestAlgorithm::Sha384 => "SHA384",
            DigestAlgorithm::Sha512 => "SHA512",
        }
    }

    /// Tag length in bytes.
    pub fn output_len(self) -> usize {
        match self {
            DigestAlgorithm::Md5 => 16,
            DigestAlgorithm::Sha1 => 20,
            DigestAlgorithm::Sha256 => 32,
            DigestAlgorithm::Sha384 => 48,
            DigestAlgorithm::Sha512 => 64,
        }
    }

    /// Compute `HMAC-<self>(key, data)`.
    pub(crate) fn hmac(self, key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
        match self {
            DigestAlgorithm::Md5 => hmac_with::<Hmac<Md5>>(key, data),
            DigestAlgorithm::Sha1 => hmac_with::<Hmac<Sha1>>(key, data),
            DigestAlgorithm::Sha256 => hmac_with::<Hmac<Sha256>>(key, data),
            DigestAlgorithm::Sha384 => hmac_with::<Hmac<Sha384>>(key, data),
            DigestAlgorithm::Sha512 => hmac_with::<Hmac<Sha512>>(key, data),
        }
    }
}

fn hmac_with<M: Mac + hmac::digest::KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut mac = <M as Mac>::new_from_slice(key)
        .map_err(|e| CredVaultError::HmacError(format!("invalid HMAC key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

impl fmt::Display for DigestAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DigestAlgorithm {
    type Err = CredVaultError;

    /// Case-insensitive; accepts `SHA-256` style spellings too.
    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.replace('-', "").to_ascii_uppercase();
        DigestAlgorithm::ALL
            .into_iter()
            .find(|d| d.name() == normalized)
            .ok_or_else(|| {
                CredVaultError::CommandFailed(format!(
                    "unknown digest '{s}' — supported: MD5, SHA1, SHA256, SHA384, SHA512"
                ))
            })
    }
}
