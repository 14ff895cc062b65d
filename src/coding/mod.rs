//! Forward error correction and integrity codes.
//!
//! Everything at this layer operates on plain byte buffers with MSB-first
//! bit addressing (see [`crate::util::bits`]). Decoders report failure
//! through [`crate::error::CodingError`]; they never panic on bad input.

pub mod crc;
pub mod galois;
pub mod golay;
pub mod hamming;
pub mod interleave;
pub mod reed_solomon;
pub mod rs129;
pub mod trellis;

pub use crc::{Crc16, Crc32, Crc9};
pub use interleave::P25Interleaver;
pub use reed_solomon::ReedSolomon;
pub use trellis::Trellis;
