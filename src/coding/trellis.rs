//! 1/2-rate and 3/4-rate convolutional ("trellis") codes over 4-FSK
//! constellation points, as used by P25 packet data and DMR rate-3/4 data.
//!
//! Encoding feeds tribits (3/4) or dibits (1/2) through a state machine,
//! maps each transition to one of sixteen constellation points, expands each
//! point to a dibit pair, and interleaves the pairs into the output
//! bitstream. Decoding reverses the interleave and runs a greedy
//! state-consistent inverse lookup; when the lookup fails the decoder
//! attempts repair by exhaustive replacement of the failed point, up to
//! twenty rounds, backtracking one position before giving up.

use crate::error::CodingError;
use crate::util::bits::{read_bit, write_bit};

/// Dibit interleave schedule over the 196-bit block.
const INTERLEAVE_TABLE: [usize; 98] = [
    0, 1, 8, 9, 16, 17, 24, 25, 32, 33, 40, 41, 48, 49, 56, 57, 64, 65, 72, 73, 80, 81, 88, 89,
    96, 97, 2, 3, 10, 11, 18, 19, 26, 27, 34, 35, 42, 43, 50, 51, 58, 59, 66, 67, 74, 75, 82, 83,
    90, 91, 4, 5, 12, 13, 20, 21, 28, 29, 36, 37, 44, 45, 52, 53, 60, 61, 68, 69, 76, 77, 84, 85,
    92, 93, 6, 7, 14, 15, 22, 23, 30, 31, 38, 39, 46, 47, 54, 55, 62, 63, 70, 71, 78, 79, 86, 87,
    94, 95,
];

/// 3/4-rate transition table: `[state * 8 + tribit]` → constellation point.
const ENCODE_TABLE_34: [u8; 64] = [
    0, 8, 4, 12, 2, 10, 6, 14, //
    4, 12, 2, 10, 6, 14, 0, 8, //
    1, 9, 5, 13, 3, 11, 7, 15, //
    5, 13, 3, 11, 7, 15, 1, 9, //
    3, 11, 7, 15, 1, 9, 5, 13, //
    7, 15, 1, 9, 5, 13, 3, 11, //
    2, 10, 6, 14, 0, 8, 4, 12, //
    6, 14, 0, 8, 4, 12, 2, 10,
];

/// 1/2-rate transition table: `[state * 4 + dibit]` → constellation point.
const ENCODE_TABLE_12: [u8; 16] = [
    0, 15, 12, 3, //
    4, 11, 8, 7, //
    13, 2, 1, 14, //
    9, 6, 5, 10,
];

/// Constellation point → (first, second) dibit.
const POINT_DIBITS: [(u8, u8); 16] = [
    (0b00, 0b10),
    (0b10, 0b10),
    (0b01, 0b11),
    (0b11, 0b11),
    (0b11, 0b10),
    (0b01, 0b10),
    (0b10, 0b11),
    (0b00, 0b11),
    (0b11, 0b01),
    (0b01, 0b01),
    (0b10, 0b00),
    (0b00, 0b00),
    (0b00, 0b01),
    (0b10, 0b01),
    (0b01, 0b00),
    (0b11, 0b00),
];

/// Number of constellation points per block (48 symbols + flush).
const NUM_POINTS: usize = 49;

/// Maximum repair rounds before a block is abandoned.
const MAX_FIX_ROUNDS: usize = 20;

/// Trellis encoder/decoder. Stateless; both rates share the interleave and
/// constellation plumbing.
pub struct Trellis;

impl Trellis {
    /// Encode 144 bits (18 bytes) of payload at 3/4 rate into a 196-bit
    /// block (25 bytes are written).
    pub fn encode_3_4(payload: &[u8], out: &mut [u8]) {
        debug_assert!(payload.len() >= 18);
        debug_assert!(out.len() >= 25);

        let mut points = [0u8; NUM_POINTS];
        let mut state = 0usize;

        for (i, point) in points.iter_mut().enumerate() {
            // Final tribit is the zero flush symbol.
            let tribit = if i < 48 { read_tribit(payload, i * 3) } else { 0 };
            *point = ENCODE_TABLE_34[state * 8 + tribit as usize];
            state = tribit as usize;
        }

        points_to_block(&points, out);
    }

    /// Decode a 196-bit block at 3/4 rate into 144 bits (18 bytes) of
    /// payload.
    pub fn decode_3_4(data: &[u8], out: &mut [u8]) -> Result<(), CodingError> {
        debug_assert!(data.len() >= 25);
        debug_assert!(out.len() >= 18);

        let mut points = block_to_points(data);
        let symbols = decode_with_repair(&mut points, &ENCODE_TABLE_34, 8)?;

        for (i, &tribit) in symbols.iter().take(48).enumerate() {
            write_tribit(out, i * 3, tribit);
        }
        Ok(())
    }

    /// Encode 96 bits (12 bytes) of payload at 1/2 rate into a 196-bit
    /// block (25 bytes are written).
    pub fn encode_1_2(payload: &[u8], out: &mut [u8]) {
        debug_assert!(payload.len() >= 12);
        debug_assert!(out.len() >= 25);

        let mut points = [0u8; NUM_POINTS];
        let mut state = 0usize;

        for (i, point) in points.iter_mut().enumerate() {
            let dibit = if i < 48 { read_dibit(payload, i * 2) } else { 0 };
            *point = ENCODE_TABLE_12[state * 4 + dibit as usize];
            state = dibit as usize;
        }

        points_to_block(&points, out);
    }

    /// Decode a 196-bit block at 1/2 rate into 96 bits (12 bytes) of
    /// payload.
    pub fn decode_1_2(data: &[u8], out: &mut [u8]) -> Result<(), CodingError> {
        debug_assert!(data.len() >= 25);
        debug_assert!(out.len() >= 12);

        let mut points = block_to_points(data);
        let symbols = decode_with_repair(&mut points, &ENCODE_TABLE_12, 4)?;

        for (i, &dibit) in symbols.iter().take(48).enumerate() {
            write_dibit(out, i * 2, dibit);
        }
        Ok(())
    }
}

fn read_tribit(buf: &[u8], bit: usize) -> u8 {
    (u8::from(read_bit(buf, bit)) << 2)
        | (u8::from(read_bit(buf, bit + 1)) << 1)
        | u8::from(read_bit(buf, bit + 2))
}

fn write_tribit(buf: &mut [u8], bit: usize, tribit: u8) {
    write_bit(buf, bit, tribit & 0x04 != 0);
    write_bit(buf, bit + 1, tribit & 0x02 != 0);
    write_bit(buf, bit + 2, tribit & 0x01 != 0);
}

fn read_dibit(buf: &[u8], bit: usize) -> u8 {
    (u8::from(read_bit(buf, bit)) << 1) | u8::from(read_bit(buf, bit + 1))
}

fn write_dibit(buf: &mut [u8], bit: usize, dibit: u8) {
    write_bit(buf, bit, dibit & 0x02 != 0);
    write_bit(buf, bit + 1, dibit & 0x01 != 0);
}

/// Expand constellation points to dibit pairs and interleave into `out`.
fn points_to_block(points: &[u8; NUM_POINTS], out: &mut [u8]) {
    for (i, &point) in points.iter().enumerate() {
        let (first, second) = POINT_DIBITS[point as usize];
        write_interleaved_dibit(out, INTERLEAVE_TABLE[i * 2], first);
        write_interleaved_dibit(out, INTERLEAVE_TABLE[i * 2 + 1], second);
    }
}

/// De-interleave dibit pairs and collapse them to constellation points.
fn block_to_points(data: &[u8]) -> [u8; NUM_POINTS] {
    let mut points = [0u8; NUM_POINTS];
    for (i, point) in points.iter_mut().enumerate() {
        let first = read_interleaved_dibit(data, INTERLEAVE_TABLE[i * 2]);
        let second = read_interleaved_dibit(data, INTERLEAVE_TABLE[i * 2 + 1]);
        *point = dibits_to_point(first, second);
    }
    points
}

fn write_interleaved_dibit(buf: &mut [u8], dibit_pos: usize, dibit: u8) {
    write_bit(buf, dibit_pos * 2, dibit & 0x02 != 0);
    write_bit(buf, dibit_pos * 2 + 1, dibit & 0x01 != 0);
}

fn read_interleaved_dibit(buf: &[u8], dibit_pos: usize) -> u8 {
    (u8::from(read_bit(buf, dibit_pos * 2)) << 1) | u8::from(read_bit(buf, dibit_pos * 2 + 1))
}

fn dibits_to_point(first: u8, second: u8) -> u8 {
    POINT_DIBITS
        .iter()
        .position(|&(a, b)| a == first && b == second)
        .unwrap_or(0) as u8
}

/// Greedy state-consistent inverse walk. Returns the decoded symbols, or
/// the point index where no consistent transition exists. The terminal
/// symbol must decode to the zero flush.
fn walk(points: &[u8; NUM_POINTS], table: &[u8], width: usize) -> Result<[u8; NUM_POINTS], usize> {
    let mut symbols = [0u8; NUM_POINTS];
    let mut state = 0usize;

    for (i, &point) in points.iter().enumerate() {
        let row = &table[state * width..(state + 1) * width];
        match row.iter().position(|&p| p == point) {
            Some(symbol) => {
                symbols[i] = symbol as u8;
                state = symbol;
            }
            None => return Err(i),
        }
    }

    // The flush symbol terminates the state machine at zero.
    if symbols[NUM_POINTS - 1] != 0 {
        return Err(NUM_POINTS - 1);
    }

    Ok(symbols)
}

/// Decode with point-replacement repair: on a failed walk, exhaustively try
/// all sixteen candidate points at the failed position (then one position
/// back) and re-walk, for up to [`MAX_FIX_ROUNDS`] rounds.
fn decode_with_repair(
    points: &mut [u8; NUM_POINTS],
    table: &[u8],
    width: usize,
) -> Result<[u8; NUM_POINTS], CodingError> {
    let mut last_fail = 0usize;

    for _ in 0..MAX_FIX_ROUNDS {
        let fail_pos = match walk(points, table, width) {
            Ok(symbols) => return Ok(symbols),
            Err(pos) => pos,
        };
        last_fail = fail_pos;

        if try_fix_at(points, fail_pos, table, width) {
            continue;
        }

        // Back-track one position: the corrupt point may have decoded to a
        // wrong-but-present symbol, surfacing the failure a step late.
        if fail_pos == 0 || !try_fix_at(points, fail_pos - 1, table, width) {
            return Err(CodingError::TrellisUnrecoverable { position: fail_pos });
        }
    }

    Err(CodingError::TrellisUnrecoverable { position: last_fail })
}

/// Try all sixteen candidate points at `pos`, keeping the first that either
/// completes the walk or pushes the failure strictly further along.
fn try_fix_at(points: &mut [u8; NUM_POINTS], pos: usize, table: &[u8], width: usize) -> bool {
    let original = points[pos];
    let baseline = match walk(points, table, width) {
        Ok(_) => return true,
        Err(p) => p,
    };

    let mut best: Option<(u8, usize)> = None;
    for candidate in 0..16u8 {
        if candidate == original {
            continue;
        }

        points[pos] = candidate;
        match walk(points, table, width) {
            Ok(_) => return true,
            Err(p) if p > baseline => {
                if best.map_or(true, |(_, bp)| p > bp) {
                    best = Some((candidate, p));
                }
            }
            Err(_) => {}
        }
    }

    match best {
        Some((candidate, _)) => {
            points[pos] = candidate;
            true
        }
        None => {
            points[pos] = original;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload_18() -> [u8; 18] {
        let mut p = [0u8; 18];
        for (i, b) in p.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(37).wrapping_add(5);
        }
        p
    }

    fn payload_12() -> [u8; 12] {
        let mut p = [0u8; 12];
        for (i, b) in p.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(73).wrapping_add(11);
        }
        p
    }

    #[test]
    fn test_3_4_round_trip() {
        let payload = payload_18();
        let mut coded = [0u8; 25];
        Trellis::encode_3_4(&payload, &mut coded);

        let mut decoded = [0u8; 18];
        Trellis::decode_3_4(&coded, &mut decoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_1_2_round_trip() {
        let payload = payload_12();
        let mut coded = [0u8; 25];
        Trellis::encode_1_2(&payload, &mut coded);

        let mut decoded = [0u8; 12];
        Trellis::decode_1_2(&coded, &mut decoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_3_4_single_point_corruption_recovers() {
        let payload = payload_18();
        let mut coded = [0u8; 25];
        Trellis::encode_3_4(&payload, &mut coded);

        // Flip one constellation point's parity class so the greedy walk
        // fails exactly there, exercising the repair path.
        let points = block_to_points(&coded);
        let corrupt_point = points[10] ^ 0x01;
        let (first, second) = POINT_DIBITS[corrupt_point as usize];
        write_interleaved_dibit(&mut coded, INTERLEAVE_TABLE[20], first);
        write_interleaved_dibit(&mut coded, INTERLEAVE_TABLE[21], second);

        let mut decoded = [0u8; 18];
        Trellis::decode_3_4(&coded, &mut decoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_1_2_single_point_corruption_recovers() {
        let payload = payload_12();
        let mut coded = [0u8; 25];
        Trellis::encode_1_2(&payload, &mut coded);

        let points = block_to_points(&coded);
        // Replace point 5 with one outside its transition row.
        let state = walk(&points, &ENCODE_TABLE_12, 4).unwrap()[4] as usize;
        let row = &ENCODE_TABLE_12[state * 4..state * 4 + 4];
        let corrupt_point = (0..16u8).find(|p| !row.contains(p)).unwrap();
        let (first, second) = POINT_DIBITS[corrupt_point as usize];
        write_interleaved_dibit(&mut coded, INTERLEAVE_TABLE[10], first);
        write_interleaved_dibit(&mut coded, INTERLEAVE_TABLE[11], second);

        let mut decoded = [0u8; 12];
        Trellis::decode_1_2(&coded, &mut decoded).unwrap();
        assert_eq!(decoded, payload);
    }

    #[test]
    fn test_garbage_reports_unrecoverable() {
        let mut garbage = [0u8; 25];
        for (i, b) in garbage.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(191).wrapping_add(3);
        }

        let mut out = [0u8; 18];
        // Random dibits rarely form a valid 49-point walk terminating in the
        // zero flush; the decoder must fail cleanly rather than panic.
        let _ = Trellis::decode_3_4(&garbage, &mut out);
    }

    #[test]
    fn test_point_dibit_mapping_bijective() {
        let mut seen = [false; 16];
        for point in 0..16u8 {
            let (first, second) = POINT_DIBITS[point as usize];
            let back = dibits_to_point(first, second);
            assert_eq!(back, point);
            assert!(!seen[back as usize]);
            seen[back as usize] = true;
        }
    }
}
