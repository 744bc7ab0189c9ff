//! AES-256 block and SuperBlock transforms
//!
//! A SuperBlock is 128 bytes: 8 cipher blocks transformed independently, with
//! no state carried between blocks. The single-block entry points exist for
//! the trailer's padding-count field only.

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes256Dec, Aes256Enc, Block};

use crate::kdf::DerivedKey;
use crate::{BLOCK_SIZE, SUPER_BLOCK_SIZE};

/// Both directions of the keyed cipher. Key-size mismatches are
/// unrepresentable: the key is a fixed 32-byte array.
pub struct SuperCipher {
    enc: Aes256Enc,
    dec: Aes256Dec,
}

impl SuperCipher {
    pub fn new(key: &DerivedKey) -> Self {
        Self {
            enc: Aes256Enc::new(key.as_bytes().into()),
            dec: Aes256Dec::new(key.as_bytes().into()),
        }
    }

    /// Encrypt one cipher block in place.
    pub fn encrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        self.enc.encrypt_block(Block::from_mut_slice(block));
    }

    /// Decrypt one cipher block in place.
    pub fn decrypt_block(&self, block: &mut [u8; BLOCK_SIZE]) {
        self.dec.decrypt_block(Block::from_mut_slice(block));
    }

    /// Encrypt a SuperBlock in place: each constituent block independently.
    pub fn encrypt_super_block(&self, buf: &mut [u8; SUPER_BLOCK_SIZE]) {
        for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
            self.enc.encrypt_block(Block::from_mut_slice(chunk));
        }
    }

    /// Decrypt a SuperBlock in place: each constituent block independently.
    pub fn decrypt_super_block(&self, buf: &mut [u8; SUPER_BLOCK_SIZE]) {
        for chunk in buf.chunks_exact_mut(BLOCK_SIZE) {
            self.dec.decrypt_block(Block::from_mut_slice(chunk));
        }
    }
}
