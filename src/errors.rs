use thiserror::Error;

use crate::kms::KeyServiceError;
use crate::storage::StorageError;
use crate::version::Version;

/// Why a stored secret failed its integrity checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IntegrityCause {
    /// The keyed hash over the ciphertext did not match the stored tag.
    TagMismatch,
    /// The master-key service rejected the wrapped data key.
    InvalidCiphertext,
    /// The master-key service rejected the wrapped data key and the caller
    /// supplied an encryption context, which may not be the one used on put.
    PossibleContextMismatch,
}

impl IntegrityCause {
    /// Returns `true` when the failure may be caused by a wrong context.
    pub fn hints_context_mismatch(self) -> bool {
        matches!(self, IntegrityCause::PossibleContextMismatch)
    }
}

impl std::fmt::Display for IntegrityCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntegrityCause::TagMismatch => f.write_str("HMAC does not match the stored ciphertext"),
            IntegrityCause::InvalidCiphertext => {
                f.write_str("the master-key service could not decrypt the data key")
            }
            IntegrityCause::PossibleContextMismatch => f.write_str(
                "the master-key service could not decrypt the data key; the encryption context may not match",
            ),
        }
    }
}

/// All errors that can occur in CredVault.
#[derive(Debug, Error)]
pub enum CredVaultError {
    // --- Caller input ---
    #[error("{0} is a required parameter")]
    MissingParameter(&'static str),

    // --- Version arithmetic ---
    #[error("version '{0}' is not an int")]
    NotAnInteger(String),

    #[error("version {0} does not fit in the padded version width")]
    Overflow(String),

    // --- Envelope cipher ---
    #[error("data key material must be 64 bytes, got {0}")]
    InvalidKeyMaterial(usize),

    #[error("HMAC error: {0}")]
    HmacError(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong key or corrupted data")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Master-key service ---
    #[error("{0}")]
    MasterKeyNotFound(#[source] KeyServiceError),

    #[error("Could not generate key using master key {key_id}: {source}")]
    KeyGeneration {
        key_id: String,
        #[source]
        source: KeyServiceError,
    },

    #[error("master-key service error: {0}")]
    KeyService(#[from] KeyServiceError),

    #[error("Keyring error: {0}")]
    Keyring(String),

    // --- Secrets ---
    #[error("{name} version {version} is already in the credential store.")]
    DuplicateVersion { name: String, version: Version },

    #[error("Secret {name}{} could not be found.", version_suffix(.version))]
    SecretNotFound {
        name: String,
        version: Option<Version>,
    },

    #[error("Integrity check failed for {name} version {version}: {cause}")]
    Integrity {
        name: String,
        version: Version,
        cause: IntegrityCause,
    },

    #[error("{name} version {version} does not decrypt to valid UTF-8")]
    InvalidUtf8 { name: String, version: Version },

    // --- Storage ---
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    // --- Config / CLI ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Audit error: {0}")]
    AuditError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CredVaultError {
    /// Returns `true` for tag mismatches and rejected data keys.
    pub fn is_integrity(&self) -> bool {
        matches!(self, CredVaultError::Integrity { .. })
    }
}

fn version_suffix(version: &Option<Version>) -> String {
    version
        .as_ref()
        .map(|v| format!(" version {v}"))
        .unwrap_or_default()
}

/// Convenience type alias for CredVault results.
pub type Result<T> = std::result::Result<T, CredVaultError>;
