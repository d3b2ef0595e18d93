use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crypto::{Argon2Params, DigestAlgorithm};
use crate::errors::{CredVaultError, Result};

/// Project-level configuration, loaded from `.credvault.toml`.
///
/// Every field has a default so CredVault works without a config file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Directory (relative to project root) holding the database and keyring.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    /// SQLite table that holds the secret records.
    #[serde(default = "default_table")]
    pub table: String,

    /// Master key id used for new secrets.
    #[serde(default = "default_key_id")]
    pub key_id: String,

    /// HMAC digest for new secrets.
    #[serde(default)]
    pub digest: DigestAlgorithm,

    /// Whether `getall` skips secrets it cannot decrypt.
    #[serde(default = "default_skip_failures")]
    pub skip_failures: bool,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_store_dir() -> String {
    ".credvault".to_string()
}

fn default_table() -> String {
    "credential-store".to_string()
}

fn default_key_id() -> String {
    crate::store::DEFAULT_KEY_ID.to_string()
}

fn default_skip_failures() -> bool {
    true
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            table: default_table(),
            key_id: default_key_id(),
            digest: DigestAlgorithm::default(),
            skip_failures: default_skip_failures(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the project root.
    pub const FILE_NAME: &'static str = ".credvault.toml";

    /// Load settings from `<project_dir>/.credvault.toml`.
    ///
    /// Missing file means defaults; an unparsable file is an error.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CredVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        tracing::debug!(path = %config_path.display(), "loaded settings");
        Ok(settings)
    }

    /// `<project_dir>/<store_dir>`
    pub fn store_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.store_dir)
    }

    /// `<project_dir>/<store_dir>/secrets.db`
    pub fn db_path(&self, project_dir: &Path) -> PathBuf {
        self.store_path(project_dir).join("secrets.db")
    }

    /// `<project_dir>/<store_dir>/keyring.json`
    pub fn keyring_path(&self, project_dir: &Path) -> PathBuf {
        self.store_path(project_dir).join("keyring.json")
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> Argon2Params {
        Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────────
