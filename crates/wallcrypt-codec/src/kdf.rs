//! Key derivation: passphrase digest, per-file nonce, XOR key mixing
//!
//! ```text
//! KeyMaterial = SHA-256(passphrase)          deterministic, no salt
//! FileNonce   = 32 random bytes              fresh per encryption, stored clear
//! DerivedKey  = KeyMaterial XOR FileNonce    the actual cipher key
//! ```
//!
//! XOR is self-inverse, so the same `mix_key` recovers the key on decryption
//! from the stored nonce.

use rand::{CryptoRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use zeroize::Zeroize;

use crate::KEY_SIZE;

/// The 256-bit digest of the passphrase. Zeroized on drop.
#[derive(Clone)]
pub struct KeyMaterial {
    bytes: [u8; KEY_SIZE],
}

impl KeyMaterial {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for KeyMaterial {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The per-file 256-bit cipher key. Exists only for the duration of one
/// encrypt or decrypt call. Zeroized on drop.
#[derive(Clone)]
pub struct DerivedKey {
    bytes: [u8; KEY_SIZE],
}

impl DerivedKey {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

impl Drop for DerivedKey {
    fn drop(&mut self) {
        self.bytes.zeroize();
    }
}

impl std::fmt::Debug for DerivedKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DerivedKey")
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// The per-file random value stored unencrypted in the trailer. Not secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileNonce {
    bytes: [u8; KEY_SIZE],
}

impl FileNonce {
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.bytes
    }
}

/// Hash the passphrase down to fixed-size key material.
///
/// Deterministic: the same passphrase always yields the same digest, on both
/// the encrypt and decrypt side. Deliberately not a hardened KDF.
pub fn derive_key_material(passphrase: &SecretString) -> KeyMaterial {
    let digest = Sha256::digest(passphrase.expose_secret().as_bytes());
    KeyMaterial::from_bytes(digest.into())
}

/// Draw a fresh 32-byte nonce from a cryptographically secure source.
///
/// Called exactly once per encryption; decryption reads the nonce back from
/// the file instead.
pub fn draw_nonce<R: RngCore + CryptoRng>(rng: &mut R) -> FileNonce {
    let mut bytes = [0u8; KEY_SIZE];
    rng.fill_bytes(&mut bytes);
    FileNonce::from_bytes(bytes)
}

/// Byte-wise XOR of key material and nonce.
///
/// Self-inverse: `mix_key(m, mix_key(m, x)) == x` for any 32-byte `x`, which
/// is what lets decryption recover the derived key from the stored nonce.
pub fn mix_key(material: &KeyMaterial, nonce: &FileNonce) -> DerivedKey {
    let mut bytes = [0u8; KEY_SIZE];
    for (out, (m, n)) in bytes
        .iter_mut()
        .zip(material.as_bytes().iter().zip(nonce.as_bytes()))
    {
        *out = m ^ n;
    }
    DerivedKey::from_bytes(bytes)
}
