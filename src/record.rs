//! The persisted shape of one secret version.
//!
//! Attribute names are the compatibility contract with existing stores:
//!
//! | attribute  | contents                               |
//! |------------|----------------------------------------|
//! | `name`     | secret name (partition key)            |
//! | `version`  | 19-digit zero-padded version (sort key)|
//! | `key`      | wrapped data key, base64               |
//! | `contents` | ciphertext, base64                     |
//! | `hmac`     | integrity tag, hex                     |
//! | `digest`   | tag algorithm, default `SHA256`        |

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::crypto::DigestAlgorithm;
use crate::version::Version;

/// One immutable, encrypted secret version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretRecord {
    pub name: String,

    pub version: Version,

    /// The data key as wrapped by the master-key service.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub key: Vec<u8>,

    /// AES-256-CTR ciphertext of the secret value.
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub contents: Vec<u8>,

    /// HMAC over `contents`.
    #[serde(serialize_with = "hex_encode", deserialize_with = "hex_decode")]
    pub hmac: Vec<u8>,

    /// Records written before digests were selectable have no `digest`.
    #[serde(default)]
    pub digest: DigestAlgorithm,
}

impl SecretRecord {
    pub fn encoded_key(&self) -> String {
        BASE64.encode(&self.key)
    }

    pub fn encoded_contents(&self) -> String {
        BASE64.encode(&self.contents)
    }

    pub fn encoded_hmac(&self) -> String {
        hex::encode(&self.hmac)
    }

    /// Rebuild a record from its transport-encoded attributes.
    pub fn from_encoded(
        name: String,
        version: Version,
        key: &str,
        contents: &str,
        hmac: &str,
        digest: Option<&str>,
    ) -> std::result::Result<Self, String> {
        let key = BASE64.decode(key).map_err(|e| format!("key: {e}"))?;
        let contents = BASE64.decode(contents).map_err(|e| format!("contents: {e}"))?;
        let hmac = hex::decode(hmac).map_err(|e| format!("hmac: {e}"))?;
        let digest = match digest {
            Some(d) => d.parse().map_err(|e| format!("digest: {e}"))?,
            None => DigestAlgorithm::default(),
        };
        Ok(Self {
            name,
            version,
            key,
            contents,
            hmac,
            digest,
        })
    }
}

/// A `{name, version}` pair as returned by listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SecretListing {
    pub name: String,
    pub version: Version,
}

impl From<&SecretRecord> for SecretListing {
    fn from(record: &SecretRecord) -> Self {
        Self {
            name: record.name.clone(),
            version: record.version.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde helpers for encoded Vec<u8> fields
// ---------------------------------------------------------------------------

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}

fn hex_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&hex::encode(data))
}

fn hex_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    hex::decode(&s).map_err(serde::de::Error::custom)
}
