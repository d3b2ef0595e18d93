//! Encryption context: caller-supplied key/value pairs bound to a data key.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{CredVaultError, Result};

/// String-to-string mapping bound into every master-key request.
///
/// Entries are kept sorted by key so the canonical encoding used as
/// authenticated data is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EncryptionContext(BTreeMap<String, String>);

impl EncryptionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Canonical byte encoding: compact JSON with sorted keys.
    pub fn canonical_bytes(&self) -> Vec<u8> {
        // Serializing a BTreeMap<String, String> cannot fail.
        serde_json::to_vec(&self.0).unwrap_or_default()
    }

    /// Parse `key=value` pairs as given on the command line.
    pub fn from_pairs<I, S>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ctx = Self::new();
        for pair in pairs {
            let pair = pair.as_ref();
            match pair.split_once('=') {
                Some((key, value)) if !key.is_empty() => ctx.insert(key, value),
                _ => {
                    return Err(CredVaultError::CommandFailed(format!(
                        "invalid context '{pair}' — expected key=value"
                    )))
                }
            }
        }
        Ok(ctx)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for EncryptionContext {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}
