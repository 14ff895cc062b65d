//! Cryptographic plumbing: AES-256-ECB datagram wrapping for the FNE link
//! and P25 voice keystream generation.

pub mod keystream;
pub mod wrap;

pub use keystream::P25Crypto;
pub use wrap::{is_wrapped, DatagramCipher, AES_WRAP_MAGIC};
