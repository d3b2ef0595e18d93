//! In-process master-key service with an ephemeral root key.
//!
//! Useful for tests and embedding: nothing touches disk, and the call
//! counters let callers assert how often the service was reached.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::RwLock;
use zeroize::Zeroizing;

use super::{wrap, GeneratedDataKey, KeyService, KeyServiceError};
use crate::context::EncryptionContext;
use crate::crypto::RootKey;

pub struct InMemoryKeyService {
    root: RootKey,
    key_ids: RwLock<BTreeSet<String>>,
    generate_calls: AtomicUsize,
    decrypt_calls: AtomicUsize,
}

impl InMemoryKeyService {
    /// A service that knows the given master key ids.
    pub fn with_keys<I, S>(key_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            root: RootKey::generate(),
            key_ids: RwLock::new(key_ids.into_iter().map(Into::into).collect()),
            generate_calls: AtomicUsize::new(0),
            decrypt_calls: AtomicUsize::new(0),
        }
    }

    pub fn add_key(&self, key_id: impl Into<String>) {
        self.key_ids.write().insert(key_id.into());
    }

    /// Forget a master key id; data keys wrapped under it become unusable.
    pub fn remove_key(&self, key_id: &str) -> bool {
        self.key_ids.write().remove(key_id)
    }

    pub fn generate_calls(&self) -> usize {
        self.generate_calls.load(Ordering::SeqCst)
    }

    pub fn decrypt_calls(&self) -> usize {
        self.decrypt_calls.load(Ordering::SeqCst)
    }

    fn knows(&self, key_id: &str) -> bool {
        self.key_ids.read().contains(key_id)
    }
}

impl KeyService for InMemoryKeyService {
    fn generate_data_key(
        &self,
        key_id: &str,
        context: &EncryptionContext,
    ) -> Result<GeneratedDataKey, KeyServiceError> {
        self.generate_calls.fetch_add(1, Ordering::SeqCst);
        if !self.knows(key_id) {
            return Err(KeyServiceError::KeyNotFound(key_id.to_string()));
        }
        wrap::generate(&self.root, key_id, context)
    }

    fn decrypt(
        &self,
        wrapped: &[u8],
        context: &EncryptionContext,
    ) -> Result<Zeroizing<Vec<u8>>, KeyServiceError> {
        self.decrypt_calls.fetch_add(1, Ordering::SeqCst);
        let (key_id, sealed) = wrap::key_id_of(wrapped)?;
        if !self.knows(key_id) {
            return Err(KeyServiceError::KeyNotFound(key_id.to_string()));
        }
        wrap::unwrap(&self.root, key_id, sealed, context)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_key_id_is_not_found() {
        let kms = InMemoryKeyService::with_keys(["alias/credstash"]);
        let err = kms
            .generate_data_key("alias/missing", &EncryptionContext::new())
            .unwrap_err();
        assert_eq!(err, KeyServiceError::KeyNotFound("alias/missing".into()));
        assert_eq!(kms.generate_calls(), 1);
    }

    #[test]
    fn removed_key_cannot_decrypt() {
        let kms = InMemoryKeyService::with_keys(["alias/credstash"]);
        let ctx = EncryptionContext::new();
        let generated = kms.generate_data_key("alias/credstash", &ctx).unwrap();
        assert!(kms.remove_key("alias/credstash"));
        let err = kms.decrypt(&generated.wrapped, &ctx).unwrap_err();
        assert!(matches!(err, KeyServiceError::KeyNotFound(_)));
    }

    #[test]
    fn separate_instances_cannot_unwrap_each_other() {
        let a = InMemoryKeyService::with_keys(["k"]);
        let b = InMemoryKeyService::with_keys(["k"]);
        let ctx = EncryptionContext::new();
        let generated = a.generate_data_key("k", &ctx).unwrap();
        assert!(matches!(
            b.decrypt(&generated.wrapped, &ctx),
            Err(KeyServiceError::InvalidCiphertext(_))
        ));
    }
}
