//! P25 packet data: header, data blocks and the multi-frame PDU assembler.

mod assembler;
mod block;
mod header;

pub use assembler::{AssembledPdu, DataAssembler, ExtendedAddress};
pub use block::DataBlock;
pub use header::DataHeader;

/// Offset of the FEC region within a protocol frame payload.
pub const PDU_FRAME_OFFSET: usize = 24;

/// Length of one trellis-coded FEC region.
pub const PDU_FEC_LENGTH: usize = 25;

/// Decoded data-header length (10 bytes + 2 CRC).
pub const PDU_HEADER_LENGTH: usize = 12;

/// Payload bytes in one confirmed data block.
pub const PDU_CONFIRMED_DATA_LENGTH: usize = 16;

/// Confirmed block length including serial and CRC-9.
pub const PDU_CONFIRMED_LENGTH: usize = 18;

/// Payload bytes in one unconfirmed data block.
pub const PDU_UNCONFIRMED_LENGTH: usize = 12;

/// Upper bound on blocks-to-follow; headers at or above this are rejected.
pub const PDU_MAX_BLOCKS: u8 = 32;
