//! wallcrypt-codec: passphrase-based streaming file encryption
//!
//! Encrypted file format (binary):
//! ```text
//! [N x 128-byte ciphertext SuperBlocks][32 bytes: file nonce, clear][16 bytes: encrypted padding count]
//! SuperBlock = 8 independent AES-256 blocks, no chaining
//! key = SHA-256(passphrase) XOR nonce
//! ```
//!
//! The trailer is always the last 48 bytes. The padding count (how many
//! trailing bytes of the final SuperBlock are random filler) is encoded as a
//! 16-byte big-endian integer and passed through one single-block encryption
//! before being written, so decryption can recover the exact plaintext length.
//!
//! There is no magic number, version byte, or integrity tag: a wrong
//! passphrase and a corrupted file are indistinguishable at decrypt time, and
//! the XOR key mix is not a hardened KDF. Both are properties of the wire
//! format this crate preserves, not oversights.

pub mod block;
pub mod error;
pub mod kdf;
pub mod stream;

pub use block::SuperCipher;
pub use error::{CodecError, CodecResult};
pub use kdf::{derive_key_material, draw_nonce, mix_key, DerivedKey, FileNonce, KeyMaterial};
pub use stream::{decrypt_file, decrypt_stream, encrypt_file, encrypt_stream};

/// Size of the cipher key and of the key material digest (256-bit)
pub const KEY_SIZE: usize = 32;

/// Size of a single cipher block
pub const BLOCK_SIZE: usize = 16;

/// Cipher blocks per SuperBlock
pub const BLOCKS_PER_SUPER: usize = 8;

/// Size of a SuperBlock, the unit the streaming loops work in
pub const SUPER_BLOCK_SIZE: usize = BLOCK_SIZE * BLOCKS_PER_SUPER;

/// Size of the per-file nonce stored in the trailer
pub const NONCE_SIZE: usize = 32;

/// Size of the full trailer: nonce + encrypted padding count
pub const TRAILER_SIZE: usize = NONCE_SIZE + BLOCK_SIZE;
