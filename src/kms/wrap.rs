//! Data-key wrapping shared by the bundled key services.
//!
//! Wrapped blob layout:
//!   [ key id length: u8 | key id (UTF-8) | 12-byte nonce | ciphertext + tag ]
//!
//! The data key is sealed with AES-256-GCM under the wrapping key of its
//! master key id; the canonical encryption context is the AAD.

use rand::RngCore;
use zeroize::{Zeroize, Zeroizing};

use super::{GeneratedDataKey, KeyServiceError};
use crate::context::EncryptionContext;
use crate::crypto::{encryption, RootKey, DATA_KEY_LEN};

/// Longest master key id that fits the one-byte length prefix.
pub(crate) const MAX_KEY_ID_LEN: usize = u8::MAX as usize;

pub(crate) fn generate(
    root: &RootKey,
    key_id: &str,
    context: &EncryptionContext,
) -> Result<GeneratedDataKey, KeyServiceError> {
    let mut plaintext = Zeroizing::new(vec![0u8; DATA_KEY_LEN]);
    rand::rng().fill_bytes(plaintext.as_mut_slice());

    let wrapped = wrap(root, key_id, &plaintext, context)?;
    Ok(GeneratedDataKey { plaintext, wrapped })
}

fn wrap(
    root: &RootKey,
    key_id: &str,
    plaintext: &[u8],
    context: &EncryptionContext,
) -> Result<Vec<u8>, KeyServiceError> {
    let id_len = u8::try_from(key_id.len()).map_err(|_| {
        KeyServiceError::Unavailable(format!(
            "master key id longer than {MAX_KEY_ID_LEN} bytes"
        ))
    })?;

    let mut wrapping_key = root
        .wrapping_key(key_id)
        .map_err(|e| KeyServiceError::Unavailable(e.to_string()))?;
    let sealed = encryption::encrypt(&wrapping_key, plaintext, &context.canonical_bytes());
    wrapping_key.zeroize();
    let sealed = sealed.map_err(|e| KeyServiceError::Unavailable(e.to_string()))?;

    let mut blob = Vec::with_capacity(1 + key_id.len() + sealed.len());
    blob.push(id_len);
    blob.extend_from_slice(key_id.as_bytes());
    blob.extend_from_slice(&sealed);
    Ok(blob)
}

/// Split the master key id out of a wrapped blob.
pub(crate) fn key_id_of(blob: &[u8]) -> Result<(&str, &[u8]), KeyServiceError> {
    let (&id_len, rest) = blob
        .split_first()
        .ok_or_else(|| KeyServiceError::InvalidCiphertext("empty wrapped key".into()))?;
    let id_len = usize::from(id_len);
    if rest.len() < id_len {
        return Err(KeyServiceError::InvalidCiphertext(
            "wrapped key is truncated".into(),
        ));
    }
    let (id, sealed) = rest.split_at(id_len);
    let id = std::str::from_utf8(id).map_err(|_| {
        KeyServiceError::InvalidCiphertext("wrapped key has a malformed key id".into())
    })?;
    Ok((id, sealed))
}

/// Unwrap `sealed` (the part after the key id) under `key_id`.
pub(crate) fn unwrap(
    root: &RootKey,
    key_id: &str,
    sealed: &[u8],
    context: &EncryptionContext,
) -> Result<Zeroizing<Vec<u8>>, KeyServiceError> {
    let mut wrapping_key = root
        .wrapping_key(key_id)
        .map_err(|e| KeyServiceError::Unavailable(e.to_string()))?;
    let opened = encryption::decrypt(&wrapping_key, sealed, &context.canonical_bytes());
    wrapping_key.zeroize();
    opened.map_err(|_| {
        KeyServiceError::InvalidCiphertext(
            "the wrapped key could not be decrypted under this context".into(),
        )
    })
}
