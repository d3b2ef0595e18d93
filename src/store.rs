//! The credential store protocol.
//!
//! `CredentialStore` composes a master-key service, the envelope cipher
//! and a storage backend into single-shot operations such as
//! `store.put_secret("db.pass", "hunter2", &ctx, None, None)`.
//!
//! The store itself holds no mutable state.  Concurrent writers racing
//! on "read highest, increment" are resolved by the backend's atomic
//! `put_if_absent`; the loser sees `DuplicateVersion` and may retry.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::context::EncryptionContext;
use crate::crypto::{open, seal, DataKeyMaterial, DigestAlgorithm, OpenError};
use crate::errors::{CredVaultError, IntegrityCause, Result};
use crate::kms::{KeyService, KeyServiceError};
use crate::record::{SecretListing, SecretRecord};
use crate::storage::{SecretBackend, StorageError};
use crate::version::{highest_of, Version};

/// Master key id used when none is configured.
pub const DEFAULT_KEY_ID: &str = "alias/credstash";

/// One decrypted version of a secret.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionedSecret {
    pub version: Version,
    pub secret: String,
}

/// Result of deleting a single version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub name: String,
    pub version: Version,
    /// `false` when there was nothing stored under `(name, version)`.
    pub existed: bool,
}

/// What `get_all_secrets` does when a single secret fails to decrypt.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Record the failure in `AllSecrets::skipped` and keep going.
    #[default]
    Skip,
    /// Return the first failure.
    Abort,
}

/// Options for `get_all_secrets`.
#[derive(Debug, Clone, Default)]
pub struct GetAllOptions {
    /// Select this exact version per name; names without it are left out.
    pub version: Option<Version>,
    pub context: EncryptionContext,
    /// Only names starting with this prefix.
    pub starts_with: Option<String>,
    pub on_failure: FailurePolicy,
}

/// A secret `get_all_secrets` could not decrypt.
#[derive(Debug)]
pub struct SkippedSecret {
    pub name: String,
    pub version: Version,
    pub error: CredVaultError,
}

/// Decrypted secrets keyed by name, plus anything that was skipped.
#[derive(Debug, Default)]
pub struct AllSecrets {
    pub secrets: BTreeMap<String, String>,
    pub skipped: Vec<SkippedSecret>,
}

impl AllSecrets {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }
}

/// Settings a store instance is running with.
#[derive(Debug, Clone, Serialize)]
pub struct StoreConfiguration {
    pub key_id: String,
    pub digest: DigestAlgorithm,
    pub backend: String,
}

pub struct CredentialStore<K, B> {
    key_service: K,
    backend: B,
    key_id: String,
    digest: DigestAlgorithm,
}

impl<K: KeyService, B: SecretBackend> CredentialStore<K, B> {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    pub fn new(key_service: K, backend: B, key_id: impl Into<String>) -> Self {
        Self {
            key_service,
            backend,
            key_id: key_id.into(),
            digest: DigestAlgorithm::default(),
        }
    }

    /// Use `digest` for puts that do not name one.
    pub fn with_digest(mut self, digest: DigestAlgorithm) -> Self {
        self.digest = digest;
        self
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn key_service(&self) -> &K {
        &self.key_service
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn get_configuration(&self) -> StoreConfiguration {
        StoreConfiguration {
            key_id: self.key_id.clone(),
            digest: self.digest,
            backend: self.backend.describe(),
        }
    }

    /// Create the backend schema.  Safe to call more than once.
    pub fn setup(&self) -> Result<()> {
        self.backend.bootstrap()?;
        tracing::info!(backend = %self.backend.describe(), "credential store ready");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Encrypt and store a new version of `name`, returning its version.
    ///
    /// Without an explicit `version` the next version after the current
    /// highest one is used.  An existing version is never overwritten.
    pub fn put_secret(
        &self,
        name: &str,
        secret: &str,
        context: &EncryptionContext,
        digest: Option<DigestAlgorithm>,
        version: Option<Version>,
    ) -> Result<Version> {
        require("name", name)?;
        require("secret", secret)?;

        // 1. Resolve the version.
        let version = match version {
            Some(v) => v,
            None => self.increment_version(name)?,
        };
        let digest = digest.unwrap_or(self.digest);

        // 2. Mint a data key bound to the context.
        let generated = self
            .key_service
            .generate_data_key(&self.key_id, context)
            .map_err(|e| match e {
                KeyServiceError::KeyNotFound(_) => CredVaultError::MasterKeyNotFound(e),
                other => CredVaultError::KeyGeneration {
                    key_id: self.key_id.clone(),
                    source: other,
                },
            })?;

        // 3. Encrypt and tag.  The material is consumed and zeroized here.
        let sealed = seal(
            DataKeyMaterial::new(generated.plaintext),
            secret.as_bytes(),
            digest,
        )?;

        // 4. Conditional insert.
        let record = SecretRecord {
            name: name.to_string(),
            version: version.clone(),
            key: generated.wrapped,
            contents: sealed.ciphertext,
            hmac: sealed.tag,
            digest,
        };
        self.backend.put_if_absent(&record).map_err(|e| match e {
            StorageError::AlreadyExists { name, version } => {
                CredVaultError::DuplicateVersion { name, version }
            }
            other => other.into(),
        })?;

        tracing::info!(name, %version, %digest, key_id = %self.key_id, "stored secret");
        Ok(version)
    }

    /// Delete one version of `name`.
    pub fn delete_secret(&self, name: &str, version: Option<&Version>) -> Result<DeleteOutcome> {
        require("name", name)?;
        let version = version.ok_or(CredVaultError::MissingParameter("version"))?;

        let existed = self.backend.delete(name, version)?;
        tracing::info!(name, %version, existed, "deleted secret version");
        Ok(DeleteOutcome {
            name: name.to_string(),
            version: version.clone(),
            existed,
        })
    }

    /// Delete every version of `name`, lowest first.
    pub fn delete_secrets(&self, name: &str) -> Result<Vec<DeleteOutcome>> {
        require("name", name)?;
        let records = self.backend.versions(name)?;
        records
            .iter()
            .map(|r| self.delete_secret(name, Some(&r.version)))
            .collect()
    }

    // ------------------------------------------------------------------
    // Version lookups
    // ------------------------------------------------------------------

    /// Highest stored version of `name`, or zero when there is none.
    pub fn get_highest_version(&self, name: &str) -> Result<Version> {
        require("name", name)?;
        let records = self.backend.versions(name)?;
        Ok(highest_of(records.iter().map(|r| &r.version)))
    }

    /// The version a put without an explicit version would use.
    pub fn increment_version(&self, name: &str) -> Result<Version> {
        self.get_highest_version(name)?.increment()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Decrypt `name` at `version`, or at its highest version if omitted.
    pub fn get_secret(
        &self,
        name: &str,
        context: &EncryptionContext,
        version: Option<&Version>,
    ) -> Result<String> {
        self.get_versioned_secret(name, context, version).map(|v| v.secret)
    }

    /// Like `get_secret`, but also reports which version was read.
    pub fn get_versioned_secret(
        &self,
        name: &str,
        context: &EncryptionContext,
        version: Option<&Version>,
    ) -> Result<VersionedSecret> {
        require("name", name)?;

        let record = match version {
            Some(v) => self.backend.get(name, v)?,
            None => self.backend.highest(name)?,
        };
        let record = record.ok_or_else(|| CredVaultError::SecretNotFound {
            name: name.to_string(),
            version: version.cloned(),
        })?;

        tracing::debug!(name, version = %record.version, "fetched secret");
        let secret = self.decrypt_record(&record, context)?;
        Ok(VersionedSecret {
            version: record.version,
            secret,
        })
    }

    /// Unwrap, verify and decrypt a record the caller already holds.
    pub fn decrypt_record(
        &self,
        record: &SecretRecord,
        context: &EncryptionContext,
    ) -> Result<String> {
        let material = self
            .key_service
            .decrypt(&record.key, context)
            .map_err(|e| match e {
                KeyServiceError::KeyNotFound(_) => CredVaultError::MasterKeyNotFound(e),
                KeyServiceError::InvalidCiphertext(_) => CredVaultError::Integrity {
                    name: record.name.clone(),
                    version: record.version.clone(),
                    cause: if context.is_empty() {
                        IntegrityCause::InvalidCiphertext
                    } else {
                        IntegrityCause::PossibleContextMismatch
                    },
                },
                other => CredVaultError::KeyService(other),
            })?;

        let plaintext = open(
            DataKeyMaterial::new(material),
            &record.contents,
            &record.hmac,
            record.digest,
        )
        .map_err(|e| match e {
            OpenError::TagMismatch => {
                tracing::warn!(name = %record.name, version = %record.version, "hmac mismatch");
                CredVaultError::Integrity {
                    name: record.name.clone(),
                    version: record.version.clone(),
                    cause: IntegrityCause::TagMismatch,
                }
            }
            OpenError::Crypto(e) => e,
        })?;

        std::str::from_utf8(&plaintext)
            .map(str::to_owned)
            .map_err(|_| CredVaultError::InvalidUtf8 {
                name: record.name.clone(),
                version: record.version.clone(),
            })
    }

    /// Every version of `name`, ascending.  `limit` keeps only the newest.
    ///
    /// The first version that fails to decrypt aborts the call.
    pub fn get_all_versions(
        &self,
        name: &str,
        context: &EncryptionContext,
        limit: Option<usize>,
    ) -> Result<Vec<VersionedSecret>> {
        require("name", name)?;

        let mut records = self.backend.versions(name)?;
        records.sort_by(|a, b| a.version.cmp(&b.version));
        if let Some(limit) = limit {
            let skip = records.len().saturating_sub(limit);
            records = records.split_off(skip);
        }

        records
            .iter()
            .map(|r| {
                Ok(VersionedSecret {
                    version: r.version.clone(),
                    secret: self.decrypt_record(r, context)?,
                })
            })
            .collect()
    }

    /// One entry per stored record, sorted by name then version.
    pub fn list_secrets(&self) -> Result<Vec<SecretListing>> {
        let mut listings: Vec<SecretListing> =
            self.backend.scan()?.iter().map(SecretListing::from).collect();
        listings.sort_by(|a, b| (&a.name, &a.version).cmp(&(&b.name, &b.version)));
        Ok(listings)
    }

    /// Decrypt one version of every (matching) name.
    pub fn get_all_secrets(&self, options: &GetAllOptions) -> Result<AllSecrets> {
        // 1. Group by name, keeping only the selected version.
        let mut selected: BTreeMap<String, SecretRecord> = BTreeMap::new();
        for record in self.backend.scan()? {
            if let Some(prefix) = &options.starts_with {
                if !record.name.starts_with(prefix.as_str()) {
                    continue;
                }
            }
            if let Some(wanted) = &options.version {
                if &record.version != wanted {
                    continue;
                }
            }
            match selected.get(&record.name) {
                Some(current) if current.version >= record.version => {}
                _ => {
                    selected.insert(record.name.clone(), record);
                }
            }
        }

        // 2. Decrypt each, honouring the failure policy.
        let mut all = AllSecrets::default();
        for (name, record) in selected {
            match self.decrypt_record(&record, &options.context) {
                Ok(secret) => {
                    all.secrets.insert(name, secret);
                }
                Err(error) if options.on_failure == FailurePolicy::Skip => {
                    tracing::warn!(name = %name, version = %record.version, %error, "skipping secret");
                    all.skipped.push(SkippedSecret {
                        name,
                        version: record.version,
                        error,
                    });
                }
                Err(error) => return Err(error),
            }
        }

        tracing::debug!(
            decrypted = all.secrets.len(),
            skipped = all.skipped_count(),
            "fetched all secrets"
        );
        Ok(all)
    }
}

/// Empty strings count as missing.
fn require(field: &'static str, value: &str) -> Result<()> {
    if value.is_empty() {
        Err(CredVaultError::MissingParameter(field))
    } else {
        Ok(())
    }
}
