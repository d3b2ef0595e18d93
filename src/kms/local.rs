//! Passphrase-protected local master-key service.
//!
//! The keyring lives in a small JSON file (`keyring.json` by default):
//!
//! ```text
//! { "format": 1, "salt": "<base64>", "argon2": {..}, "verifier": "<base64>",
//!   "keys": ["alias/credstash", ...], "created_at": "..." }
//! ```
//!
//! The root key is derived from the passphrase with Argon2id and never
//! written anywhere; only the master key *ids* are stored.  Each id gets
//! its own HKDF-derived wrapping key.

use std::fs;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, Zeroizing};

use super::{wrap, GeneratedDataKey, KeyService, KeyServiceError};
use crate::context::EncryptionContext;
use crate::crypto::{derive_root_key, generate_salt, Argon2Params, RootKey};
use crate::errors::{CredVaultError, Result};

/// Current keyring file format.
const KEYRING_FORMAT: u8 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct KeyringFile {
    format: u8,
    salt: String,
    argon2: Argon2Params,
    verifier: String,
    #[serde(default)]
    keys: Vec<String>,
    created_at: DateTime<Utc>,
}

pub struct LocalKeyService {
    path: PathBuf,
    file: KeyringFile,
    root: RootKey,
}

impl LocalKeyService {
    /// Create a new, empty keyring at `path`.
    pub fn create(path: &Path, passphrase: &[u8], params: &Argon2Params) -> Result<Self> {
        if path.exists() {
            return Err(CredVaultError::Keyring(format!(
                "keyring already exists at {}",
                path.display()
            )));
        }

        let salt = generate_salt();
        let mut root_bytes = derive_root_key(passphrase, &salt, params)?;
        let root = RootKey::new(root_bytes);
        root_bytes.zeroize();

        let file = KeyringFile {
            format: KEYRING_FORMAT,
            salt: BASE64.encode(salt),
            argon2: *params,
            verifier: root.verifier()?,
            keys: Vec::new(),
            created_at: Utc::now(),
        };

        let service = Self {
            path: path.to_path_buf(),
            file,
            root,
        };
        service.save()?;
        tracing::info!(path = %path.display(), "created keyring");
        Ok(service)
    }

    /// Open an existing keyring, rejecting a wrong passphrase.
    pub fn open(path: &Path, passphrase: &[u8]) -> Result<Self> {
        if !path.exists() {
            return Err(CredVaultError::Keyring(format!(
                "no keyring at {} — run `credvault setup` first",
                path.display()
            )));
        }

        let data = fs::read_to_string(path)?;
        let file: KeyringFile = serde_json::from_str(&data)
            .map_err(|e| CredVaultError::Keyring(format!("malformed keyring file: {e}")))?;
        if file.format != KEYRING_FORMAT {
            return Err(CredVaultError::Keyring(format!(
                "unsupported keyring format {}, expected {KEYRING_FORMAT}",
                file.format
            )));
        }

        let salt = BASE64
            .decode(&file.salt)
            .map_err(|e| CredVaultError::Keyring(format!("malformed keyring salt: {e}")))?;
        let mut root_bytes = derive_root_key(passphrase, &salt, &file.argon2)?;
        let root = RootKey::new(root_bytes);
        root_bytes.zeroize();

        if !root.matches_verifier(&file.verifier)? {
            return Err(CredVaultError::Keyring(
                "wrong passphrase for this keyring".into(),
            ));
        }

        Ok(Self {
            path: path.to_path_buf(),
            file,
            root,
        })
    }

    /// Open the keyring at `path`, creating it if it does not exist.
    pub fn open_or_create(path: &Path, passphrase: &[u8], params: &Argon2Params) -> Result<Self> {
        if path.exists() {
            Self::open(path, passphrase)
        } else {
            Self::create(path, passphrase, params)
        }
    }

    /// Register a master key id.  Returns `false` if it already existed.
    pub fn create_key(&mut self, key_id: &str) -> Result<bool> {
        if key_id.is_empty() || key_id.len() > wrap::MAX_KEY_ID_LEN {
            return Err(CredVaultError::Keyring(format!(
                "master key id must be 1 to {} bytes",
                wrap::MAX_KEY_ID_LEN
            )));
        }
        if self.has_key(key_id) {
            return Ok(false);
        }
        self.file.keys.push(key_id.to_string());
        self.file.keys.sort();
        self.save()?;
        tracing::info!(key_id, "registered master key");
        Ok(true)
    }

    pub fn has_key(&self, key_id: &str) -> bool {
        self.file.keys.iter().any(|k| k == key_id)
    }

    pub fn key_ids(&self) -> &[String] {
        &self.file.keys
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self) -> Result<()> {
        let json = serde_json::to_vec_pretty(&self.file)
            .map_err(|e| CredVaultError::SerializationError(format!("keyring: {e}")))?;
        write_private(&self.path, &json)
    }
}

impl KeyService for LocalKeyService {
    fn generate_data_key(
        &self,
        key_id: &str,
        context: &EncryptionContext,
    ) -> std::result::Result<GeneratedDataKey, KeyServiceError> {
        if !self.has_key(key_id) {
            return Err(KeyServiceError::KeyNotFound(key_id.to_string()));
        }
        wrap::generate(&self.root, key_id, context)
    }

    fn decrypt(
        &self,
        wrapped: &[u8],
        context: &EncryptionContext,
    ) -> std::result::Result<Zeroizing<Vec<u8>>, KeyServiceError> {
        let (key_id, sealed) = wrap::key_id_of(wrapped)?;
        if !self.has_key(key_id) {
            return Err(KeyServiceError::KeyNotFound(key_id.to_string()));
        }
        wrap::unwrap(&self.root, key_id, sealed, context)
    }
}

/// Write `bytes` to `path` atomically with owner-only permissions.
///
/// The temp file sits in the same directory so the rename stays on one
/// filesystem.
pub(crate) fn write_private(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or(Path::new("."));
    if !parent.as_os_str().is_empty() && !parent.exists() {
        fs::create_dir_all(parent)?;
    }
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    fs::write(&tmp_path, bytes)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(&tmp_path, fs::Permissions::from_mode(0o600))?;
    }

    fs::rename(&tmp_path, path)?;
    Ok(())
}
