//! P25 PDU data header.

use crate::coding::{Crc16, Trellis};
use crate::error::{CodingError, ProtocolError};
use crate::p25::PduFormat;
use crate::util::bits::{get_u24, set_u24};

use super::{PDU_FEC_LENGTH, PDU_HEADER_LENGTH};

/// Decoded PDU data header (primary or secondary).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataHeader {
    /// Acknowledgement needed.
    pub ack_needed: bool,
    /// Direction: outbound from the FNE.
    pub outbound: bool,
    /// Header format.
    pub format: PduFormat,
    /// Service access point.
    pub sap: u8,
    /// Manufacturer id.
    pub mfid: u8,
    /// Logical link id.
    pub ll_id: u32,
    /// Full message flag.
    pub full_message: bool,
    /// Data blocks following this header.
    pub blocks_to_follow: u8,
    /// Pad octets in the final block.
    pub pad_count: u8,
    /// Resynchronise flag.
    pub resync: bool,
    /// Sequence number.
    pub ns: u8,
    /// Fragment sequence number.
    pub fsn: u8,
    /// Offset of user data within the first block.
    pub header_offset: u8,
}

impl DataHeader {
    pub fn new(format: PduFormat, sap: u8, ll_id: u32) -> Self {
        Self {
            ack_needed: format == PduFormat::Confirmed,
            outbound: false,
            format,
            sap: sap & 0x3F,
            mfid: 0,
            ll_id: ll_id & 0xFF_FFFF,
            full_message: true,
            blocks_to_follow: 0,
            pad_count: 0,
            resync: false,
            ns: 0,
            fsn: 0,
            header_offset: 0,
        }
    }

    /// Pack into 12 bytes with the CRC-16 trailer.
    pub fn pack(&self) -> [u8; PDU_HEADER_LENGTH] {
        let mut buf = [0u8; PDU_HEADER_LENGTH];
        buf[0] = (u8::from(self.ack_needed) << 7)
            | (u8::from(self.outbound) << 6)
            | (self.format as u8 & 0x1F);
        buf[1] = self.sap & 0x3F;
        buf[2] = self.mfid;
        set_u24(&mut buf, 3, self.ll_id);
        buf[6] = (u8::from(self.full_message) << 7) | (self.blocks_to_follow & 0x7F);
        buf[7] = self.pad_count & 0x1F;
        buf[8] = (u8::from(self.resync) << 7) | ((self.ns & 0x07) << 4) | (self.fsn & 0x0F);
        buf[9] = self.header_offset & 0x3F;

        Crc16::add_trailer(&mut buf);
        buf
    }

    /// Unpack 12 bytes, verifying the CRC-16 trailer.
    pub fn unpack(buf: &[u8]) -> Result<Self, ProtocolError> {
        if buf.len() < PDU_HEADER_LENGTH {
            return Err(ProtocolError::MalformedMessage("short data header".into()));
        }

        if !Crc16::check_trailer(&buf[..PDU_HEADER_LENGTH]) {
            return Err(ProtocolError::MalformedMessage(
                "data header CRC check failed".into(),
            ));
        }

        let format = PduFormat::from_u8(buf[0] & 0x1F).ok_or_else(|| {
            ProtocolError::MalformedMessage(format!("unknown PDU format {:#04x}", buf[0] & 0x1F))
        })?;

        Ok(Self {
            ack_needed: buf[0] & 0x80 != 0,
            outbound: buf[0] & 0x40 != 0,
            format,
            sap: buf[1] & 0x3F,
            mfid: buf[2],
            ll_id: get_u24(buf, 3),
            full_message: buf[6] & 0x80 != 0,
            blocks_to_follow: buf[6] & 0x7F,
            pad_count: buf[7] & 0x1F,
            resync: buf[8] & 0x80 != 0,
            ns: (buf[8] >> 4) & 0x07,
            fsn: buf[8] & 0x0F,
            header_offset: buf[9] & 0x3F,
        })
    }

    /// Encode into a 25-byte trellis-coded FEC region.
    pub fn encode_fec(&self, out: &mut [u8]) {
        debug_assert!(out.len() >= PDU_FEC_LENGTH);
        let packed = self.pack();
        Trellis::encode_1_2(&packed, out);
    }

    /// Decode from a 25-byte trellis-coded FEC region.
    pub fn decode_fec(fec: &[u8]) -> Result<Self, ProtocolError> {
        let mut packed = [0u8; PDU_HEADER_LENGTH];
        Trellis::decode_1_2(fec, &mut packed)
            .map_err(|e: CodingError| ProtocolError::DataUnitDropped(e.to_string()))?;
        Self::unpack(&packed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::p25::P25_SAP_EXT_ADDR;

    #[test]
    fn test_pack_round_trip() {
        let mut header = DataHeader::new(PduFormat::Confirmed, 0x00, 0xBEEF01);
        header.blocks_to_follow = 5;
        header.pad_count = 3;
        header.ns = 2;
        header.fsn = 7;

        let packed = header.pack();
        let decoded = DataHeader::unpack(&packed).unwrap();
        assert_eq!(decoded, header);
    }

    #[test]
    fn test_crc_detects_corruption() {
        let header = DataHeader::new(PduFormat::Unconfirmed, P25_SAP_EXT_ADDR, 0x123456);
        let mut packed = header.pack();
        packed[4] ^= 0x01;
        assert!(DataHeader::unpack(&packed).is_err());
    }

    #[test]
    fn test_fec_round_trip() {
        let mut header = DataHeader::new(PduFormat::Ambt, 0x3D, 0xFFFFFC);
        header.blocks_to_follow = 2;

        let mut fec = [0u8; PDU_FEC_LENGTH];
        header.encode_fec(&mut fec);
        assert_eq!(DataHeader::decode_fec(&fec).unwrap(), header);
    }
}
