//! Master-key service collaborator.
//!
//! The credential store never sees a master key.  It asks a `KeyService`
//! for fresh data-key material bound to an encryption context, and later
//! asks it to unwrap the stored data key under the same context.
//!
//! Two implementations ship with the crate:
//! - `LocalKeyService`: passphrase-protected keyring file (`local`)
//! - `InMemoryKeyService`: ephemeral root key for tests (`memory`)

pub mod local;
pub mod memory;
mod wrap;

use thiserror::Error;
use zeroize::Zeroizing;

use crate::context::EncryptionContext;

pub use local::LocalKeyService;
pub use memory::InMemoryKeyService;

/// Failure conditions a master-key service can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyServiceError {
    /// The requested (or embedded) master key id does not exist.
    #[error("master key '{0}' could not be found")]
    KeyNotFound(String),

    /// The wrapped key is malformed, or was sealed under another context.
    #[error("invalid ciphertext: {0}")]
    InvalidCiphertext(String),

    /// Any other failure of the service itself.
    #[error("master-key service unavailable: {0}")]
    Unavailable(String),
}

/// Data-key material together with its wrapped form.
pub struct GeneratedDataKey {
    /// 64 bytes: AES key followed by HMAC key.
    pub plaintext: Zeroizing<Vec<u8>>,
    /// Opaque blob to persist next to the ciphertext.
    pub wrapped: Vec<u8>,
}

impl std::fmt::Debug for GeneratedDataKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedDataKey")
            .field("wrapped_len", &self.wrapped.len())
            .finish_non_exhaustive()
    }
}

/// The two master-key operations the protocol depends on.
pub trait KeyService: Send + Sync {
    /// Mint 64 bytes of data-key material under `key_id`, bound to `context`.
    fn generate_data_key(
        &self,
        key_id: &str,
        context: &EncryptionContext,
    ) -> Result<GeneratedDataKey, KeyServiceError>;

    /// Unwrap a blob produced by `generate_data_key` with the same context.
    fn decrypt(
        &self,
        wrapped: &[u8],
        context: &EncryptionContext,
    ) -> Result<Zeroizing<Vec<u8>>, KeyServiceError>;
}

impl<T: KeyService + ?Sized> KeyService for std::sync::Arc<T> {
    fn generate_data_key(
        &self,
        key_id: &str,
        context: &EncryptionContext,
    ) -> Result<GeneratedDataKey, KeyServiceError> {
        (**self).generate_data_key(key_id, context)
    }

    fn decrypt(
        &self,
        wrapped: &[u8],
        context: &EncryptionContext,
    ) -> Result<Zeroizing<Vec<u8>>, KeyServiceError> {
        (**self).decrypt(wrapped, context)
    }
}
