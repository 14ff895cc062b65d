//! Hamming code helpers for DMR embedded signalling rows.
//!
//! Two single-error-correcting codes are carried: Hamming(17,12,3) for
//! embedded LC rows and Hamming(13,9,3) for short LC rows. Codewords are
//! systematic: data bits in the high positions, check bits in the low.

use crate::error::CodingError;

/// Syndrome assigned to each data column of the (17,12) code. All values
/// are distinct, non-zero and non-unit, so every single-bit error has a
/// unique signature.
const SYNDROMES_17_12: [u8; 12] = [
    0x03, 0x05, 0x06, 0x07, 0x09, 0x0A, 0x0B, 0x0C, 0x0D, 0x0E, 0x0F, 0x11,
];

/// Syndrome assigned to each data column of the (13,9) code.
const SYNDROMES_13_9: [u8; 9] = [0x3, 0x5, 0x6, 0x7, 0x9, 0xA, 0xB, 0xC, 0xD];

fn compute_checks(data: u32, syndromes: &[u8], num_checks: u32) -> u32 {
    let mut checks = 0u32;
    for (i, &syn) in syndromes.iter().enumerate() {
        // Data bit 0 is the most significant.
        if data & (1 << (syndromes.len() - 1 - i)) != 0 {
            checks ^= u32::from(syn);
        }
    }
    checks & ((1 << num_checks) - 1)
}

fn decode_generic(
    word: u32,
    syndromes: &[u8],
    num_checks: u32,
) -> Result<u32, CodingError> {
    let data_bits = syndromes.len() as u32;
    let mut data = (word >> num_checks) & ((1 << data_bits) - 1);
    let received_checks = word & ((1 << num_checks) - 1);

    let syndrome = compute_checks(data, syndromes, num_checks) ^ received_checks;
    if syndrome == 0 {
        return Ok(data);
    }

    // Single check-bit error leaves the data intact.
    if syndrome.count_ones() == 1 {
        return Ok(data);
    }

    // Single data-bit error has a unique column signature.
    if let Some(i) = syndromes.iter().position(|&s| u32::from(s) == syndrome) {
        data ^= 1 << (syndromes.len() - 1 - i);
        return Ok(data);
    }

    Err(CodingError::GolayUncorrectable)
}

/// Hamming(17,12,3) codec.
pub struct Hamming1712;

impl Hamming1712 {
    /// Encode 12 data bits into a 17-bit codeword.
    pub fn encode(data: u16) -> u32 {
        let data = u32::from(data) & 0xFFF;
        (data << 5) | compute_checks(data, &SYNDROMES_17_12, 5)
    }

    /// Decode a 17-bit codeword, correcting a single bit error.
    pub fn decode(word: u32) -> Result<u16, CodingError> {
        decode_generic(word & 0x1_FFFF, &SYNDROMES_17_12, 5).map(|d| d as u16)
    }
}

/// Hamming(13,9,3) codec.
pub struct Hamming139;

impl Hamming139 {
    /// Encode 9 data bits into a 13-bit codeword.
    pub fn encode(data: u16) -> u16 {
        let data = u32::from(data) & 0x1FF;
        (((data << 4) | compute_checks(data, &SYNDROMES_13_9, 4)) & 0x1FFF) as u16
    }

    /// Decode a 13-bit codeword, correcting a single bit error.
    pub fn decode(word: u16) -> Result<u16, CodingError> {
        decode_generic(u32::from(word) & 0x1FFF, &SYNDROMES_13_9, 4).map(|d| d as u16)
    }
}
