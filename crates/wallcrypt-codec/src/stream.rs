//! Streaming encrypt/decrypt pipelines and the trailer format
//!
//! Encryption walks the plaintext in SuperBlock-sized chunks. A short read
//! (including zero bytes) marks the terminal chunk: the unread remainder is
//! filled with fresh random bytes and the filler count becomes the trailer's
//! padding field. A plaintext that is an exact multiple of 128 bytes (or
//! empty) therefore ends with one SuperBlock of pure filler and a padding
//! count of 128 — decryption's length accounting depends on this, so the
//! extra block is not optimized away.
//!
//! Decryption reads the trailer first (nonce, then the encrypted padding
//! count), recovers the key, then streams the data region. The final
//! SuperBlock is written short by the padding count, which yields the same
//! bytes as decrypt-everything-then-truncate without needing a truncatable
//! sink.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;

use rand::{CryptoRng, RngCore};
use secrecy::SecretString;
use tracing::debug;

use crate::block::SuperCipher;
use crate::error::{CodecError, CodecResult};
use crate::kdf::{derive_key_material, draw_nonce, mix_key, FileNonce};
use crate::{BLOCK_SIZE, NONCE_SIZE, SUPER_BLOCK_SIZE, TRAILER_SIZE};

/// Encrypt `source` into `sink`.
///
/// The nonce and the terminal chunk's filler are drawn from `rng`; pass
/// `rand::thread_rng()` outside of tests. Returns the number of plaintext
/// bytes consumed.
///
/// A failure part-way leaves the sink truncated; callers must discard it.
pub fn encrypt_stream<R, W, G>(
    mut source: R,
    mut sink: W,
    passphrase: &SecretString,
    rng: &mut G,
) -> CodecResult<u64>
where
    R: Read,
    W: Write,
    G: RngCore + CryptoRng,
{
    let material = derive_key_material(passphrase);
    let nonce = draw_nonce(rng);
    let cipher = SuperCipher::new(&mix_key(&material, &nonce));

    let mut buf = [0u8; SUPER_BLOCK_SIZE];
    let mut plaintext_bytes = 0u64;
    let mut super_blocks = 0u64;
    let padding: usize;

    loop {
        let n = read_fill(&mut source, &mut buf)?;
        plaintext_bytes += n as u64;

        if n == SUPER_BLOCK_SIZE {
            cipher.encrypt_super_block(&mut buf);
            sink.write_all(&buf)?;
            super_blocks += 1;
            continue;
        }

        // Terminal chunk. n may be 0: an empty plaintext or an exact-multiple
        // length still emits one SuperBlock of pure filler with padding 128.
        padding = SUPER_BLOCK_SIZE - n;
        rng.fill_bytes(&mut buf[n..]);
        cipher.encrypt_super_block(&mut buf);
        sink.write_all(&buf)?;
        super_blocks += 1;
        break;
    }

    sink.write_all(nonce.as_bytes())?;

    let mut pad_field = (padding as u128).to_be_bytes();
    cipher.encrypt_block(&mut pad_field);
    sink.write_all(&pad_field)?;
    sink.flush()?;

    debug!(super_blocks, padding, "stream encrypted");
    Ok(plaintext_bytes)
}

/// Decrypt `source` into `sink`. Returns the number of plaintext bytes
/// written.
///
/// Fails with [`CodecError::Format`] if the source is shorter than the
/// 48-byte trailer or the recovered padding count is outside 0..=128. A wrong
/// passphrase usually surfaces as the latter, but is indistinguishable from a
/// corrupted file: the format carries no integrity tag.
pub fn decrypt_stream<R, W>(
    mut source: R,
    mut sink: W,
    passphrase: &SecretString,
) -> CodecResult<u64>
where
    R: Read + Seek,
    W: Write,
{
    let material = derive_key_material(passphrase);

    let len = source.seek(SeekFrom::End(0))?;
    if len < TRAILER_SIZE as u64 {
        return Err(CodecError::Format(format!(
            "source is {len} bytes, shorter than the {TRAILER_SIZE}-byte trailer"
        )));
    }

    source.seek(SeekFrom::End(-(TRAILER_SIZE as i64)))?;
    let mut nonce_bytes = [0u8; NONCE_SIZE];
    source.read_exact(&mut nonce_bytes)?;
    let nonce = FileNonce::from_bytes(nonce_bytes);
    let cipher = SuperCipher::new(&mix_key(&material, &nonce));

    let mut pad_field = [0u8; BLOCK_SIZE];
    source.read_exact(&mut pad_field)?;
    cipher.decrypt_block(&mut pad_field);
    let padding = u128::from_be_bytes(pad_field);
    if padding > SUPER_BLOCK_SIZE as u128 {
        return Err(CodecError::Format(format!(
            "padding count {padding} outside 0..={SUPER_BLOCK_SIZE} (wrong passphrase or corrupted file)"
        )));
    }
    let padding = padding as usize;

    // Whole SuperBlocks only; a trailing partial chunk in the data region is
    // discarded, matching the encrypt side's short-read termination rule.
    let super_blocks = (len - TRAILER_SIZE as u64) / SUPER_BLOCK_SIZE as u64;
    if super_blocks == 0 && padding > 0 {
        return Err(CodecError::Format(format!(
            "padding count {padding} but no ciphertext SuperBlocks"
        )));
    }

    source.seek(SeekFrom::Start(0))?;
    let mut buf = [0u8; SUPER_BLOCK_SIZE];
    let mut written = 0u64;
    for i in 0..super_blocks {
        source.read_exact(&mut buf)?;
        cipher.decrypt_super_block(&mut buf);
        let keep = if i + 1 == super_blocks {
            SUPER_BLOCK_SIZE - padding
        } else {
            SUPER_BLOCK_SIZE
        };
        sink.write_all(&buf[..keep])?;
        written += keep as u64;
    }
    sink.flush()?;

    debug!(super_blocks, padding, written, "stream decrypted");
    Ok(written)
}

/// Encrypt the file at `src` into a new file at `dst`.
///
/// The destination is created (truncating any existing file). On failure the
/// destination may hold a partial, unusable file.
pub fn encrypt_file<P, Q>(src: P, dst: Q, passphrase: &SecretString) -> CodecResult<u64>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let source = BufReader::new(File::open(src)?);
    let sink = BufWriter::new(File::create(dst)?);
    encrypt_stream(source, sink, passphrase, &mut rand::thread_rng())
}

/// Decrypt the file at `src` into a new file at `dst`.
pub fn decrypt_file<P, Q>(src: P, dst: Q, passphrase: &SecretString) -> CodecResult<u64>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let source = BufReader::new(File::open(src)?);
    let sink = BufWriter::new(File::create(dst)?);
    decrypt_stream(source, sink, passphrase)
}

/// Read until `buf` is full or the source hits EOF. `Read::read` may return
/// short mid-stream; a short chunk here must mean end-of-input, because the
/// encrypt loop's padding accounting hangs off it.
fn read_fill<R: Read>(source: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::KEY_SIZE;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::io::Cursor;

    fn passphrase() -> SecretString {
        SecretString::from("correct-horse")
    }

    fn encrypt_to_vec(plaintext: &[u8], seed: u64) -> Vec<u8> {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut out = Vec::new();
        encrypt_stream(plaintext, &mut out, &passphrase(), &mut rng).unwrap();
        out
    }

    fn decrypt_to_vec(ciphertext: &[u8]) -> CodecResult<Vec<u8>> {
        let mut out = Vec::new();
        decrypt_stream(Cursor::new(ciphertext), &mut out, &passphrase())?;
        Ok(out)
    }

    #[test]
    fn test_roundtrip_short_plaintext() {
        let ciphertext = encrypt_to_vec(b"hello world", 1);
        assert_eq!(
            ciphertext.len(),
            SUPER_BLOCK_SIZE + TRAILER_SIZE,
            "11 bytes must fit one SuperBlock plus trailer"
        );
        assert_eq!(decrypt_to_vec(&ciphertext).unwrap(), b"hello world");
    }

    #[test]
    fn test_roundtrip_empty_plaintext() {
        let ciphertext = encrypt_to_vec(b"", 2);
        // One all-filler SuperBlock, padding 128
        assert_eq!(ciphertext.len(), SUPER_BLOCK_SIZE + TRAILER_SIZE);
        assert_eq!(decrypt_to_vec(&ciphertext).unwrap(), b"");
    }

    #[test]
    fn test_exact_multiple_emits_extra_super_block() {
        let plaintext = vec![0x41u8; SUPER_BLOCK_SIZE];
        let ciphertext = encrypt_to_vec(&plaintext, 3);
        assert_eq!(
            ciphertext.len(),
            2 * SUPER_BLOCK_SIZE + TRAILER_SIZE,
            "exact-multiple input must carry a full extra filler SuperBlock"
        );
        assert_eq!(decrypt_to_vec(&ciphertext).unwrap(), plaintext);
    }

    #[test]
    fn test_nonce_stored_in_clear() {
        let ciphertext = encrypt_to_vec(b"abc", 4);
        let mut rng = StdRng::seed_from_u64(4);
        let expected = draw_nonce(&mut rng);

        let nonce_at = ciphertext.len() - TRAILER_SIZE;
        assert_eq!(
            &ciphertext[nonce_at..nonce_at + NONCE_SIZE],
            expected.as_bytes(),
            "the first draw from the rng is the nonce, stored unencrypted"
        );
    }

    #[test]
    fn test_too_short_source_is_format_error() {
        let mut out = Vec::new();
        let err = decrypt_stream(Cursor::new(&[0u8; 47]), &mut out, &passphrase()).unwrap_err();
        assert!(matches!(err, CodecError::Format(_)));
        assert!(out.is_empty(), "nothing may be written for a bad source");
    }

    #[test]
    fn test_out_of_range_padding_is_format_error() {
        // Forge a trailer claiming an absurd padding count under a known key.
        let mut rng = StdRng::seed_from_u64(5);
        let material = derive_key_material(&passphrase());
        let nonce = draw_nonce(&mut rng);
        let cipher = SuperCipher::new(&mix_key(&material, &nonce));

        let mut file = vec![0u8; SUPER_BLOCK_SIZE];
        file.extend_from_slice(nonce.as_bytes());
        let mut pad_field = 999u128.to_be_bytes();
        cipher.encrypt_block(&mut pad_field);
        file.extend_from_slice(&pad_field);

        let err = decrypt_to_vec(&file).unwrap_err();
        assert!(matches!(err, CodecError::Format(_)));
    }

    #[test]
    fn test_padding_without_data_is_format_error() {
        // 48-byte file: trailer only, yet a nonzero padding count.
        let mut rng = StdRng::seed_from_u64(6);
        let material = derive_key_material(&passphrase());
        let nonce = draw_nonce(&mut rng);
        let cipher = SuperCipher::new(&mix_key(&material, &nonce));

        let mut file = Vec::with_capacity(TRAILER_SIZE);
        file.extend_from_slice(nonce.as_bytes());
        let mut pad_field = 16u128.to_be_bytes();
        cipher.encrypt_block(&mut pad_field);
        file.extend_from_slice(&pad_field);

        let err = decrypt_to_vec(&file).unwrap_err();
        assert!(matches!(err, CodecError::Format(_)));
    }

    #[test]
    fn test_trailing_partial_chunk_is_discarded() {
        let ciphertext = encrypt_to_vec(b"hello world", 7);
        // Splice 5 junk bytes between the data region and the trailer; they
        // land in the final short read and must not change the plaintext.
        let mut tampered = ciphertext[..SUPER_BLOCK_SIZE].to_vec();
        tampered.extend_from_slice(&[0xEE; 5]);
        tampered.extend_from_slice(&ciphertext[SUPER_BLOCK_SIZE..]);

        assert_eq!(decrypt_to_vec(&tampered).unwrap(), b"hello world");
    }

    #[test]
    fn test_wrong_passphrase_does_not_roundtrip() {
        let ciphertext = encrypt_to_vec(b"top secret bytes", 8);
        let mut out = Vec::new();
        let result = decrypt_stream(
            Cursor::new(&ciphertext),
            &mut out,
            &SecretString::from("incorrect-horse"),
        );
        // No integrity tag: either the padding check trips or garbage comes out.
        match result {
            Err(CodecError::Format(_)) => {}
            Err(other) => panic!("unexpected error kind: {other}"),
            Ok(_) => assert_ne!(out, b"top secret bytes"),
        }
    }

    #[test]
    fn test_read_fill_handles_short_reads() {
        // A reader that trickles one byte at a time.
        struct Trickle<'a>(&'a [u8]);
        impl Read for Trickle<'_> {
            fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
                if self.0.is_empty() || buf.is_empty() {
                    return Ok(0);
                }
                buf[0] = self.0[0];
                self.0 = &self.0[1..];
                Ok(1)
            }
        }

        let data = vec![7u8; 200];
        let mut rng = StdRng::seed_from_u64(9);
        let mut out = Vec::new();
        encrypt_stream(Trickle(&data), &mut out, &passphrase(), &mut rng).unwrap();
        assert_eq!(out.len(), 2 * SUPER_BLOCK_SIZE + TRAILER_SIZE);
        assert_eq!(decrypt_to_vec(&out).unwrap(), data);
    }

    #[test]
    fn test_derived_key_is_material_xor_nonce() {
        let material = derive_key_material(&passphrase());
        let nonce = FileNonce::from_bytes([0xFFu8; KEY_SIZE]);
        let key = mix_key(&material, &nonce);
        for (k, m) in key.as_bytes().iter().zip(material.as_bytes()) {
            assert_eq!(*k, m ^ 0xFF);
        }
    }
}
