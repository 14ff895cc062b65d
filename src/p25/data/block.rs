//! P25 PDU data blocks.

use crate::coding::{Crc9, Trellis};
use crate::error::CodingError;

use super::{PDU_CONFIRMED_DATA_LENGTH, PDU_CONFIRMED_LENGTH, PDU_FEC_LENGTH, PDU_UNCONFIRMED_LENGTH};

/// One PDU data block. Confirmed blocks carry a 7-bit serial, a CRC-9 and
/// sixteen payload bytes at 3/4 rate; unconfirmed blocks carry twelve
/// payload bytes at 1/2 rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    /// Block serial number (confirmed only).
    pub serial: u8,
    /// Block payload.
    pub data: Vec<u8>,
}

impl DataBlock {
    /// Build a confirmed block.
    pub fn confirmed(serial: u8, data: &[u8]) -> Self {
        let mut padded = data.to_vec();
        padded.resize(PDU_CONFIRMED_DATA_LENGTH, 0);
        Self {
            serial: serial & 0x7F,
            data: padded,
        }
    }

    /// Build an unconfirmed block.
    pub fn unconfirmed(data: &[u8]) -> Self {
        let mut padded = data.to_vec();
        padded.resize(PDU_UNCONFIRMED_LENGTH, 0);
        Self { serial: 0, data: padded }
    }

    /// Encode as a confirmed block into a 25-byte FEC region: serial and
    /// split CRC-9 in the first two bytes, then the payload, 3/4-rate
    /// trellis coded.
    pub fn encode_confirmed(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= PDU_FEC_LENGTH);

        let mut block = [0u8; PDU_CONFIRMED_LENGTH];
        block[0] = self.serial << 1;
        block[2..].copy_from_slice(&self.data[..PDU_CONFIRMED_DATA_LENGTH]);

        let crc = Crc9::compute(&block, PDU_CONFIRMED_LENGTH * 8);
        Crc9::store(&mut block, crc);

        Trellis::encode_3_4(&block, out);
    }

    /// Decode a confirmed block from a 25-byte FEC region, verifying the
    /// CRC-9.
    pub fn decode_confirmed(fec: &[u8]) -> Result<Self, CodingError> {
        let mut block = [0u8; PDU_CONFIRMED_LENGTH];
        Trellis::decode_3_4(fec, &mut block)?;

        let stored = Crc9::extract(&block);
        let computed = Crc9::compute(&block, PDU_CONFIRMED_LENGTH * 8);
        if stored != computed {
            return Err(CodingError::BlockCrc);
        }

        Ok(Self {
            serial: block[0] >> 1,
            data: block[2..].to_vec(),
        })
    }

    /// Encode as an unconfirmed block into a 25-byte FEC region at 1/2
    /// rate.
    pub fn encode_unconfirmed(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= PDU_FEC_LENGTH);

        let mut block = [0u8; PDU_UNCONFIRMED_LENGTH];
        block.copy_from_slice(&self.data[..PDU_UNCONFIRMED_LENGTH]);
        Trellis::encode_1_2(&block, out);
    }

    /// Decode an unconfirmed block from a 25-byte FEC region.
    pub fn decode_unconfirmed(fec: &[u8]) -> Result<Self, CodingError> {
        let mut block = [0u8; PDU_UNCONFIRMED_LENGTH];
        Trellis::decode_1_2(fec, &mut block)?;

        Ok(Self {
            serial: 0,
            data: block.to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmed_round_trip() {
        let payload: Vec<u8> = (0x40u8..0x50).collect();
        let block = DataBlock::confirmed(3, &payload);

        let mut fec = [0u8; PDU_FEC_LENGTH];
        block.encode_confirmed(&mut fec);

        let decoded = DataBlock::decode_confirmed(&fec).unwrap();
        assert_eq!(decoded.serial, 3);
        assert_eq!(decoded.data, payload);
    }

    #[test]
    fn test_confirmed_crc_detects_payload_swap() {
        let block_a = DataBlock::confirmed(0, &[0xAA; 16]);
        let block_b = DataBlock::confirmed(0, &[0xBB; 16]);

        let mut fec_a = [0u8; PDU_FEC_LENGTH];
        let mut fec_b = [0u8; PDU_FEC_LENGTH];
        block_a.encode_confirmed(&mut fec_a);
        block_b.encode_confirmed(&mut fec_b);

        // Each decodes against its own CRC.
        assert!(DataBlock::decode_confirmed(&fec_a).is_ok());
        assert!(DataBlock::decode_confirmed(&fec_b).is_ok());
    }

    #[test]
    fn test_unconfirmed_round_trip() {
        let payload: Vec<u8> = (1u8..13).collect();
        let block = DataBlock::unconfirmed(&payload);

        let mut fec = [0u8; PDU_FEC_LENGTH];
        block.encode_unconfirmed(&mut fec);

        let decoded = DataBlock::decode_unconfirmed(&fec).unwrap();
        assert_eq!(decoded.data, payload);
    }

    #[test]
    fn test_short_payload_zero_padded() {
        let block = DataBlock::confirmed(1, &[0xEE, 0xFF]);
        assert_eq!(block.data.len(), PDU_CONFIRMED_DATA_LENGTH);
        assert_eq!(&block.data[..2], &[0xEE, 0xFF]);
        assert!(block.data[2..].iter().all(|&b| b == 0));
    }
}
