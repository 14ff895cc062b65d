//! P25 voice keystream generation and per-call application.
//!
//! A 9-byte Message Indicator together with an algorithm id and key material
//! parameterises one of three keystream generators: DES-OFB, AES-256 in
//! output-feedback mode, or the LMR ARC4 variant. The [`P25Crypto`] engine
//! holds the generated keystream for a call and XORs it over successive
//! 11-byte IMBE frames, tracking the frame position within an LDU modulo 9.

use aes::cipher::{generic_array::GenericArray, BlockEncrypt, KeyInit};
use aes::Aes256;
use des::Des;
use zeroize::Zeroizing;

use crate::error::CryptoError;
use crate::p25::{P25_ALGO_AES_256, P25_ALGO_ARC4, P25_ALGO_DES, P25_MI_LENGTH};

/// IMBE voice frame length in bytes.
pub const IMBE_FRAME_LENGTH: usize = 11;

/// Voice frames per LDU.
const FRAMES_PER_LDU: usize = 9;

/// DES-OFB keystream length: 28 iterations of the 8-byte block.
const DES_KEYSTREAM_LENGTH: usize = 224;

/// AES-OFB keystream length: 15 iterations of the 16-byte block.
const AES_KEYSTREAM_LENGTH: usize = 240;

/// ARC4 keystream length for one superframe pair.
const ARC4_KEYSTREAM_LENGTH: usize = 469;

/// Keystream byte offset of the first voice frame, per algorithm.
const DES_VOICE_OFFSET: usize = 8;
const AES_VOICE_OFFSET: usize = 16;
const ARC4_VOICE_OFFSET: usize = 267;

/// Additional keystream offset applied within an LDU2.
const LDU2_OFFSET: usize = 101;

/// Which logical data unit a voice frame belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LduKind {
    Ldu1,
    Ldu2,
}

/// Generate a DES-OFB keystream. Key material shorter than 8 bytes is
/// left-padded with zeroes; the IV is the first 8 MI bytes.
pub fn des_ofb_keystream(key: &[u8], mi: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if mi.len() < P25_MI_LENGTH {
        return Err(CryptoError::InvalidMessageIndicator(mi.len()));
    }
    if key.len() > 8 {
        return Err(CryptoError::InvalidKeyLength { expected: 8, got: key.len() });
    }

    let mut des_key = Zeroizing::new([0u8; 8]);
    des_key[8 - key.len()..].copy_from_slice(key);
    let cipher = Des::new(GenericArray::from_slice(&*des_key));

    let mut feedback = [0u8; 8];
    feedback.copy_from_slice(&mi[..8]);

    let mut keystream = Vec::with_capacity(DES_KEYSTREAM_LENGTH);
    for _ in 0..DES_KEYSTREAM_LENGTH / 8 {
        let mut block = GenericArray::clone_from_slice(&feedback);
        cipher.encrypt_block(&mut block);
        feedback.copy_from_slice(&block);
        keystream.extend_from_slice(&block);
    }

    Ok(keystream)
}

/// Expand a 9-byte MI into a 128-bit IV using the 64-bit LFSR with taps
/// x⁶⁴ + x⁶² + x⁴⁶ + x³⁸ + x²⁷ + x¹⁵ + 1: the 64 overflow bits form the
/// first IV half, the final register state the second.
fn expand_mi_to_iv(mi: &[u8]) -> [u8; 16] {
    let mut lfsr = u64::from_be_bytes([mi[0], mi[1], mi[2], mi[3], mi[4], mi[5], mi[6], mi[7]]);
    let mut overflow = 0u64;

    for _ in 0..64 {
        let out_bit = lfsr >> 63;
        overflow = (overflow << 1) | out_bit;

        let feedback = (lfsr >> 63) ^ (lfsr >> 61) ^ (lfsr >> 45) ^ (lfsr >> 37)
            ^ (lfsr >> 26) ^ (lfsr >> 14);
        lfsr = (lfsr << 1) | (feedback & 1);
    }

    let mut iv = [0u8; 16];
    iv[..8].copy_from_slice(&overflow.to_be_bytes());
    iv[8..].copy_from_slice(&lfsr.to_be_bytes());
    iv
}

/// Generate an AES-256 output-feedback keystream from the LFSR-expanded MI.
pub fn aes_ofb_keystream(key: &[u8], mi: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if mi.len() < P25_MI_LENGTH {
        return Err(CryptoError::InvalidMessageIndicator(mi.len()));
    }
    if key.len() != 32 {
        return Err(CryptoError::InvalidKeyLength { expected: 32, got: key.len() });
    }

    let cipher = Aes256::new(GenericArray::from_slice(key));
    let mut feedback = expand_mi_to_iv(mi);

    let mut keystream = Vec::with_capacity(AES_KEYSTREAM_LENGTH);
    for _ in 0..AES_KEYSTREAM_LENGTH / 16 {
        let mut block = GenericArray::clone_from_slice(&feedback);
        cipher.encrypt_block(&mut block);
        feedback.copy_from_slice(&block);
        keystream.extend_from_slice(&block);
    }

    Ok(keystream)
}

/// Generate the LMR ARC4 keystream: a 13-byte adapted key (up to five key
/// bytes, zero-padded, then eight MI bytes) through the standard RC4
/// key schedule and generator. All 469 bytes are emitted in order; the
/// customary first-byte skip is not applied.
pub fn arc4_keystream(key: &[u8], mi: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if mi.len() < P25_MI_LENGTH {
        return Err(CryptoError::InvalidMessageIndicator(mi.len()));
    }

    let mut adapted = Zeroizing::new([0u8; 13]);
    let key_len = key.len().min(5);
    adapted[5 - key_len..5].copy_from_slice(&key[..key_len]);
    adapted[5..].copy_from_slice(&mi[..8]);

    // RC4 key schedule.
    let mut s: [u8; 256] = std::array::from_fn(|i| i as u8);
    let mut j = 0u8;
    for i in 0..256 {
        j = j
            .wrapping_add(s[i])
            .wrapping_add(adapted[i % adapted.len()]);
        s.swap(i, usize::from(j));
    }

    // PRGA, no initial skip.
    let mut keystream = Vec::with_capacity(ARC4_KEYSTREAM_LENGTH);
    let mut i = 0u8;
    let mut j = 0u8;
    for _ in 0..ARC4_KEYSTREAM_LENGTH {
        i = i.wrapping_add(1);
        j = j.wrapping_add(s[usize::from(i)]);
        s.swap(usize::from(i), usize::from(j));
        let idx = s[usize::from(i)].wrapping_add(s[usize::from(j)]);
        keystream.push(s[usize::from(idx)]);
    }

    Ok(keystream)
}

/// Per-call voice crypto engine.
pub struct P25Crypto {
    keystream: Zeroizing<Vec<u8>>,
    algo_id: u8,
    key_id: u16,
    position: usize,
}

impl P25Crypto {
    /// Prepare a keystream for a call from the MI, algorithm id and key
    /// material.
    pub fn prepare(algo_id: u8, key_id: u16, mi: &[u8], key: &[u8]) -> Result<Self, CryptoError> {
        let keystream = match algo_id {
            P25_ALGO_DES => des_ofb_keystream(key, mi)?,
            P25_ALGO_AES_256 => aes_ofb_keystream(key, mi)?,
            P25_ALGO_ARC4 => arc4_keystream(key, mi)?,
            other => return Err(CryptoError::UnsupportedAlgorithm(other)),
        };

        Ok(Self {
            keystream: Zeroizing::new(keystream),
            algo_id,
            key_id,
            position: 0,
        })
    }

    pub fn algo_id(&self) -> u8 {
        self.algo_id
    }

    pub fn key_id(&self) -> u16 {
        self.key_id
    }

    /// Current frame position within the LDU.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Reset the frame position at a superframe boundary.
    pub fn reset_position(&mut self) {
        self.position = 0;
    }

    fn voice_offset(&self, ldu: LduKind) -> usize {
        let base = match self.algo_id {
            P25_ALGO_DES => DES_VOICE_OFFSET,
            P25_ALGO_AES_256 => AES_VOICE_OFFSET,
            _ => ARC4_VOICE_OFFSET,
        };

        let ldu_offset = match ldu {
            LduKind::Ldu1 => 0,
            LduKind::Ldu2 => LDU2_OFFSET,
        };

        base + ldu_offset + self.position * IMBE_FRAME_LENGTH
    }

    /// XOR the keystream over one IMBE frame and advance the frame position
    /// modulo 9.
    pub fn process(&mut self, imbe: &mut [u8], ldu: LduKind) {
        debug_assert!(imbe.len() >= IMBE_FRAME_LENGTH);

        let offset = self.voice_offset(ldu);
        for (i, byte) in imbe.iter_mut().take(IMBE_FRAME_LENGTH).enumerate() {
            *byte ^= self.keystream[offset + i];
        }

        self.position = (self.position + 1) % FRAMES_PER_LDU;
    }
}
