//! Storage backend collaborator.
//!
//! A backend is a versioned key-value store keyed by `(name, version)`.
//! The protocol needs point reads, per-name range reads sorted by
//! version, full scans, an insert that refuses to overwrite, and deletes.

pub mod memory;
pub mod sqlite;

use thiserror::Error;

use crate::record::SecretRecord;
use crate::version::Version;

pub use memory::MemoryBackend;
pub use sqlite::SqliteBackend;

/// Storage failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// `put_if_absent` found a record with the same `(name, version)`.
    #[error("{name} version {version} already exists")]
    AlreadyExists { name: String, version: Version },

    #[error("invalid table name '{0}' — only ASCII letters, digits, '_' and '-' are allowed")]
    InvalidTable(String),

    /// A stored row could not be decoded into a `SecretRecord`.
    #[error("stored record for '{name}' is malformed: {reason}")]
    InvalidRecord { name: String, reason: String },

    #[error("sqlite: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// The capabilities the credential store requires from a backend.
pub trait SecretBackend: Send + Sync {
    /// Point read of one version.
    fn get(&self, name: &str, version: &Version) -> StorageResult<Option<SecretRecord>>;

    /// Every version of `name`, ascending by version.
    fn versions(&self, name: &str) -> StorageResult<Vec<SecretRecord>>;

    /// The highest version of `name`, if any.
    fn highest(&self, name: &str) -> StorageResult<Option<SecretRecord>> {
        Ok(self.versions(name)?.pop())
    }

    /// Every record of every name.
    fn scan(&self) -> StorageResult<Vec<SecretRecord>>;

    /// Insert `record` unless `(name, version)` already exists, atomically.
    fn put_if_absent(&self, record: &SecretRecord) -> StorageResult<()>;

    /// Delete one record.  Returns whether it existed.
    fn delete(&self, name: &str, version: &Version) -> StorageResult<bool>;

    /// Create the schema if needed.  Idempotent.
    fn bootstrap(&self) -> StorageResult<()>;

    /// Human-readable description for `config` output.
    fn describe(&self) -> String;
}

impl<T: SecretBackend + ?Sized> SecretBackend for std::sync::Arc<T> {
    fn get(&self, name: &str, version: &Version) -> StorageResult<Option<SecretRecord>> {
        (**self).get(name, version)
    }

    fn versions(&self, name: &str) -> StorageResult<Vec<SecretRecord>> {
        (**self).versions(name)
    }

    fn highest(&self, name: &str) -> StorageResult<Option<SecretRecord>> {
        (**self).highest(name)
    }

    fn scan(&self) -> StorageResult<Vec<SecretRecord>> {
        (**self).scan()
    }

    fn put_if_absent(&self, record: &SecretRecord) -> StorageResult<()> {
        (**self).put_if_absent(record)
    }

    fn delete(&self, name: &str, version: &Version) -> StorageResult<bool> {
        (**self).delete(name, version)
    }

    fn bootstrap(&self) -> StorageResult<()> {
        (**self).bootstrap()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}
