//! AES-256-ECB datagram-level wrapping.
//!
//! When a preshared key is configured, every outbound datagram is zero-padded
//! to a 16-byte multiple, encrypted block-by-block, and prefixed with the
//! 16-bit magic `0xC0FE`. Inbound datagrams carrying the magic are decrypted
//! from offset 2, padding the final partial block with zeroes; datagrams
//! without the magic are discarded by the caller.

use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes256;
use zeroize::Zeroizing;

/// Magic prefix marking an AES-wrapped datagram, big-endian on the wire.
pub const AES_WRAP_MAGIC: u16 = 0xC0FE;

const BLOCK_SIZE: usize = 16;

/// Check whether a datagram carries the AES wrap magic.
pub fn is_wrapped(datagram: &[u8]) -> bool {
    datagram.len() >= 2 && u16::from_be_bytes([datagram[0], datagram[1]]) == AES_WRAP_MAGIC
}

/// Preshared-key datagram cipher.
pub struct DatagramCipher {
    cipher: Aes256,
}

impl DatagramCipher {
    /// Construct from a 32-byte preshared key.
    pub fn new(key: &Zeroizing<[u8; 32]>) -> Self {
        Self {
            cipher: Aes256::new(GenericArray::from_slice(&**key)),
        }
    }

    /// Wrap a plaintext datagram: magic + ECB ciphertext of the zero-padded
    /// plaintext.
    pub fn wrap(&self, plaintext: &[u8]) -> Vec<u8> {
        let padded_len = plaintext.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;

        let mut out = vec![0u8; 2 + padded_len];
        out[..2].copy_from_slice(&AES_WRAP_MAGIC.to_be_bytes());
        out[2..2 + plaintext.len()].copy_from_slice(plaintext);

        for block in out[2..].chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.encrypt_block(GenericArray::from_mut_slice(block));
        }

        out
    }

    /// Unwrap a magic-prefixed datagram. Returns `None` when the magic is
    /// absent. A trailing partial ciphertext block is zero-padded before
    /// decryption.
    pub fn unwrap(&self, datagram: &[u8]) -> Option<Vec<u8>> {
        if !is_wrapped(datagram) {
            return None;
        }

        let ciphertext = &datagram[2..];
        let padded_len = ciphertext.len().div_ceil(BLOCK_SIZE) * BLOCK_SIZE;

        let mut out = vec![0u8; padded_len];
        out[..ciphertext.len()].copy_from_slice(ciphertext);

        for block in out.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.decrypt_block(GenericArray::from_mut_slice(block));
        }

        Some(out)
    }
}
