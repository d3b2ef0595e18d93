//! Envelope cipher: one-time data keys, AES-256-CTR and the HMAC tag.
//!
//! The master-key service hands out 64 bytes of data-key material per
//! secret version.  The first 32 bytes key an AES-256-CTR stream whose
//! counter block starts at one; the last 32 bytes key an HMAC over the
//! resulting ciphertext.  Records written this way can be read by other
//! credstash-compatible tools and vice versa.
//!
//! A fixed initial counter is only safe because a data key never encrypts two
//! plaintexts.  The types here enforce that: `DataKeyMaterial` can only
//! be built inside the crate from a master-key service response, and
//! both it and `EncryptionKey` are consumed by value when used.

use aes::Aes256;
use ctr::cipher::{KeyIvInit, StreamCipher};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use super::digest::DigestAlgorithm;
use crate::errors::{CredVaultError, Result};

type Aes256Ctr = ctr::Ctr128BE<Aes256>;

/// Length of the data-key material returned by the master-key service.
pub const DATA_KEY_LEN: usize = 64;

/// Length of each half of the data-key material.
const HALF_LEN: usize = DATA_KEY_LEN / 2;

/// Initial counter block for the CTR keystream: the 128-bit value 1.
const INITIAL_COUNTER: [u8; 16] = [0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1];

/// Freshly minted data-key plaintext, zeroized on drop.
pub struct DataKeyMaterial {
    bytes: Zeroizing<Vec<u8>>,
}

impl DataKeyMaterial {
    pub(crate) fn new(bytes: Zeroizing<Vec<u8>>) -> Self {
        Self { bytes }
    }

    /// Split into the stream-cipher key (bytes 0..32) and the HMAC key
    /// (bytes 32..64).
    pub fn split(self) -> Result<(EncryptionKey, HmacKey)> {
        if self.bytes.len() != DATA_KEY_LEN {
            return Err(CredVaultError::InvalidKeyMaterial(self.bytes.len()));
        }
        let mut enc = EncryptionKey { bytes: [0u8; HALF_LEN] };
        let mut mac = HmacKey { bytes: [0u8; HALF_LEN] };
        enc.bytes.copy_from_slice(&self.bytes[..HALF_LEN]);
        mac.bytes.copy_from_slice(&self.bytes[HALF_LEN..]);
        Ok((enc, mac))
    }
}

impl std::fmt::Debug for DataKeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DataKeyMaterial(..)")
    }
}

/// AES-256-CTR key for exactly one encryption or decryption.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey {
    bytes: [u8; HALF_LEN],
}

impl EncryptionKey {
    /// Encrypt `plaintext`.  Consumes the key.
    pub fn encrypt(self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let mut buf = plaintext.to_vec();
        self.apply_keystream(&mut buf)?;
        Ok(buf)
    }

    /// Decrypt `ciphertext`; the CTR transform is its own inverse.
    pub fn decrypt(self, ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let mut buf = Zeroizing::new(ciphertext.to_vec());
        self.apply_keystream(&mut buf)?;
        Ok(buf)
    }

    fn apply_keystream(&self, buf: &mut [u8]) -> Result<()> {
        let mut cipher = Aes256Ctr::new_from_slices(&self.bytes, &INITIAL_COUNTER)
            .map_err(|e| CredVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;
        cipher.apply_keystream(buf);
        Ok(())
    }
}

/// HMAC key for the integrity tag over a ciphertext.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct HmacKey {
    bytes: [u8; HALF_LEN],
}

impl HmacKey {
    /// Keyed hash of `ciphertext` under `digest`.
    pub fn tag(&self, ciphertext: &[u8], digest: DigestAlgorithm) -> Result<Vec<u8>> {
        digest.hmac(&self.bytes, ciphertext)
    }

    /// Recompute the tag and compare in constant time.
    ///
    /// Never errors: any failure to compute the tag counts as a mismatch.
    pub fn verify(&self, ciphertext: &[u8], expected: &[u8], digest: DigestAlgorithm) -> bool {
        match self.tag(ciphertext, digest) {
            Ok(actual) => actual.len() == expected.len() && bool::from(actual.ct_eq(expected)),
            Err(_) => false,
        }
    }
}

/// Ciphertext and tag produced by [`seal`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sealed {
    pub ciphertext: Vec<u8>,
    pub tag: Vec<u8>,
}

/// Encrypt `plaintext` and tag the ciphertext, consuming the material.
pub fn seal(
    material: DataKeyMaterial,
    plaintext: &[u8],
    digest: DigestAlgorithm,
) -> Result<Sealed> {
    let (enc_key, hmac_key) = material.split()?;
    let ciphertext = enc_key.encrypt(plaintext)?;
    let tag = hmac_key.tag(&ciphertext, digest)?;
    Ok(Sealed { ciphertext, tag })
}

/// Why [`open`] refused to return plaintext.
#[derive(Debug)]
pub enum OpenError {
    TagMismatch,
    Crypto(CredVaultError),
}

/// Verify the tag, then decrypt.  No plaintext is produced on mismatch.
pub fn open(
    material: DataKeyMaterial,
    ciphertext: &[u8],
    tag: &[u8],
    digest: DigestAlgorithm,
) -> std::result::Result<Zeroizing<Vec<u8>>, OpenError> {
    let (enc_key, hmac_key) = material.split().map_err(OpenError::Crypto)?;
    if !hmac_key.verify(ciphertext, tag, digest) {
        return Err(OpenError::TagMismatch);
    }
    enc_key.decrypt(ciphertext).map_err(OpenError::Crypto)
}
