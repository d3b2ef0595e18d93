//! Cryptographic primitives for CredVault.
//!
//! This module provides:
//! - The envelope cipher over one-time data keys (`cipher`)
//! - HMAC digest selection (`digest`)
//! - AES-256-GCM used to wrap data keys (`encryption`)
//! - Argon2id passphrase derivation for the local keyring (`kdf`)
//! - HKDF wrapping-key derivation (`keys`)

pub mod cipher;
pub mod digest;
pub mod encryption;
pub mod kdf;
pub mod keys;

pub use cipher::{open, seal, DataKeyMaterial, EncryptionKey, HmacKey, OpenError, Sealed, DATA_KEY_LEN};
pub use digest::DigestAlgorithm;
pub use kdf::{derive_root_key, generate_salt, Argon2Params};
pub use keys::RootKey;
