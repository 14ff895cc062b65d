//! Reed-Solomon codes over GF(2⁶): (24,12,13), (24,16,9) and (36,20,17).
//!
//! Codewords are packed as 6-bit hex symbols over a byte buffer, the first
//! symbol in the most significant position. Encoding is systematic: the k
//! message symbols come first, parity fills the remainder. Decoding runs the
//! standard Berlekamp-Massey flow — syndromes, error locator, Chien search,
//! Forney magnitudes — and corrects at most ⌊(n−k)/2⌋ symbol errors,
//! reporting failure when the error locator cannot be matched to that many
//! roots.

use crate::coding::galois;
use crate::error::CodingError;
use crate::util::bits::{bin_to_hex, hex_to_bin};

/// A specific Reed-Solomon code over GF(2⁶).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReedSolomon {
    n: usize,
    k: usize,
}

impl ReedSolomon {
    /// RS(24,12,13), used by the P25 header data unit.
    pub const RS_24_12_13: Self = Self { n: 24, k: 12 };

    /// RS(24,16,9), used by P25 LDU2 encryption sync.
    pub const RS_24_16_9: Self = Self { n: 24, k: 16 };

    /// RS(36,20,17), used by P25 LDU1 link control.
    pub const RS_36_20_17: Self = Self { n: 36, k: 20 };

    /// Code length in symbols.
    pub fn n(&self) -> usize {
        self.n
    }

    /// Message length in symbols.
    pub fn k(&self) -> usize {
        self.k
    }

    /// Maximum number of correctable symbol errors.
    pub fn correctable(&self) -> usize {
        (self.n - self.k) / 2
    }

    fn packed_len(&self) -> usize {
        (self.n * 6).div_ceil(8)
    }

    /// Generator polynomial g(x) = ∏(x − αⁱ) for i in 0..(n−k), coefficient
    /// of xⁱ at index i.
    fn generator(&self) -> Vec<u8> {
        let p = self.n - self.k;
        let mut g = vec![0u8; p + 1];
        g[0] = 1;

        for i in 0..p {
            let root = galois::alpha_pow(i as isize);
            // Multiply g(x) by (x - root); subtraction is addition in GF(2^6).
            for j in (1..=i + 1).rev() {
                g[j] = g[j - 1] ^ galois::mul(g[j], root);
            }
            g[0] = galois::mul(g[0], root);
        }

        g
    }

    fn unpack(&self, buf: &[u8]) -> Vec<u8> {
        (0..self.n).map(|i| bin_to_hex(buf, i * 6)).collect()
    }

    fn pack(&self, symbols: &[u8], buf: &mut [u8]) {
        for (i, &s) in symbols.iter().enumerate() {
            hex_to_bin(s, buf, i * 6);
        }
    }

    /// Systematically encode the first k symbols of `buf` in place, filling
    /// the parity symbols.
    pub fn encode(&self, buf: &mut [u8]) -> Result<(), CodingError> {
        if buf.len() < self.packed_len() {
            return Err(CodingError::ShortBuffer { size: buf.len() });
        }

        let mut symbols = self.unpack(buf);
        let p = self.n - self.k;
        let g = self.generator();

        // LFSR division of m(x)·x^p by g(x); the remainder is the parity.
        let mut reg = vec![0u8; p];
        for i in 0..self.k {
            let feedback = symbols[i] ^ reg[p - 1];
            for j in (1..p).rev() {
                reg[j] = reg[j - 1] ^ galois::mul(feedback, g[j]);
            }
            reg[0] = galois::mul(feedback, g[0]);
        }

        for j in 0..p {
            symbols[self.k + j] = reg[p - 1 - j];
        }

        self.pack(&symbols, buf);
        Ok(())
    }

    /// Decode `buf` in place. Returns the number of symbol errors corrected.
    pub fn decode(&self, buf: &mut [u8]) -> Result<usize, CodingError> {
        if buf.len() < self.packed_len() {
            return Err(CodingError::ShortBuffer { size: buf.len() });
        }

        let mut symbols = self.unpack(buf);
        let p = self.n - self.k;

        // Syndromes S_j = r(α^j), with symbol 0 the highest-degree
        // coefficient.
        let mut syndromes = vec![0u8; p];
        let mut all_zero = true;
        for (j, syn) in syndromes.iter_mut().enumerate() {
            let x = galois::alpha_pow(j as isize);
            let mut acc = 0u8;
            for &sym in &symbols {
                acc = galois::mul(acc, x) ^ sym;
            }
            *syn = acc;
            if acc != 0 {
                all_zero = false;
            }
        }

        if all_zero {
            return Ok(0);
        }

        // Berlekamp-Massey: refine the error locator Λ(x) against the
        // syndrome sequence.
        let mut lambda = vec![0u8; p + 1];
        lambda[0] = 1;
        let mut prev = lambda.clone();
        let mut l = 0usize;
        let mut m = 1usize;
        let mut b = 1u8;

        for i in 0..p {
            let mut delta = syndromes[i];
            for j in 1..=l {
                delta ^= galois::mul(lambda[j], syndromes[i - j]);
            }

            if delta == 0 {
                m += 1;
            } else if 2 * l <= i {
                let saved = lambda.clone();
                let coef = galois::div(delta, b);
                for j in 0..=p {
                    if j + m <= p {
                        lambda[j + m] ^= galois::mul(coef, prev[j]);
                    }
                }
                l = i + 1 - l;
                prev = saved;
                b = delta;
                m = 1;
            } else {
                let coef = galois::div(delta, b);
                for j in 0..=p {
                    if j + m <= p {
                        lambda[j + m] ^= galois::mul(coef, prev[j]);
                    }
                }
                m += 1;
            }
        }

        if l > self.correctable() {
            return Err(CodingError::RsUncorrectable {
                errors: l,
                bound: self.correctable(),
            });
        }

        // Ω(x) = S(x)·Λ(x) mod x^p.
        let mut omega = vec![0u8; p];
        for i in 0..p {
            let mut acc = 0u8;
            for j in 0..=i.min(l) {
                acc ^= galois::mul(lambda[j], syndromes[i - j]);
            }
            omega[i] = acc;
        }

        // Formal derivative Λ′(x): odd-degree terms survive in GF(2).
        let mut lambda_deriv = vec![0u8; p];
        for i in (1..=l).step_by(2) {
            lambda_deriv[i - 1] = lambda[i];
        }

        // Chien search across symbol positions, with Forney magnitudes
        // e = α^i · Ω(α^-i) / Λ′(α^-i) at each located root.
        let mut corrected = 0usize;
        for idx in 0..self.n {
            let pos_power = (self.n - 1 - idx) as isize;
            let x_inv = galois::alpha_pow(-pos_power);

            if galois::poly_eval(&lambda, x_inv) != 0 {
                continue;
            }

            let denom = galois::poly_eval(&lambda_deriv, x_inv);
            if denom == 0 {
                return Err(CodingError::RsUncorrectable {
                    errors: l,
                    bound: self.correctable(),
                });
            }

            let num = galois::mul(galois::alpha_pow(pos_power), galois::poly_eval(&omega, x_inv));
            symbols[idx] ^= galois::div(num, denom);
            corrected += 1;
        }

        if corrected != l {
            return Err(CodingError::RsUncorrectable {
                errors: l,
                bound: self.correctable(),
            });
        }

        self.pack(&symbols, buf);
        Ok(corrected)
    }
}
