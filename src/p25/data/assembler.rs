//! Multi-frame P25 PDU assembler.
//!
//! PDU-bearing protocol frames arrive one trellis-coded FEC region at a
//! time. The assembler decodes the primary data header from the first
//! frame, accumulates the advertised number of data blocks, then decodes
//! and CRC-checks the lot, handling both extended-addressing paths: a
//! secondary header block for unconfirmed PDUs, and in-payload addressing
//! for confirmed serial-0 blocks. Any FEC or CRC failure discards the PDU
//! and returns the assembler to idle.

use tracing::debug;

use crate::coding::Crc32;
use crate::error::ProtocolError;
use crate::p25::{PduFormat, P25_SAP_EXT_ADDR};
use crate::util::bits::get_u24;

use super::{
    DataBlock, DataHeader, PDU_FEC_LENGTH, PDU_FRAME_OFFSET, PDU_MAX_BLOCKS,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Decoding,
}

/// Extended addressing extracted from a PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtendedAddress {
    pub sap: u8,
    pub ll_id: u32,
}

/// A fully assembled and verified PDU.
#[derive(Debug, Clone)]
pub struct AssembledPdu {
    pub header: DataHeader,
    pub secondary: Option<DataHeader>,
    pub extended_address: Option<ExtendedAddress>,
    /// Assembled user data, CRC-32 trailer included and verified.
    pub user_data: Vec<u8>,
}

/// Stateful PDU assembler driven by successive protocol frames.
pub struct DataAssembler {
    state: State,
    header: Option<DataHeader>,
    blocks_seen: u8,
    buffer: Vec<u8>,
}

impl DataAssembler {
    pub fn new() -> Self {
        Self {
            state: State::Idle,
            header: None,
            blocks_seen: 0,
            buffer: Vec::new(),
        }
    }

    /// Whether a PDU is mid-assembly.
    pub fn is_decoding(&self) -> bool {
        self.state == State::Decoding
    }

    /// Return to idle, discarding any partial PDU.
    pub fn reset(&mut self) {
        self.state = State::Idle;
        self.header = None;
        self.blocks_seen = 0;
        self.buffer.clear();
    }

    /// Feed one PDU-bearing protocol frame payload. Returns the assembled
    /// PDU once all advertised blocks have arrived and verified.
    pub fn assemble(&mut self, payload: &[u8]) -> Result<Option<AssembledPdu>, ProtocolError> {
        if payload.len() < PDU_FRAME_OFFSET + PDU_FEC_LENGTH {
            self.reset();
            return Err(ProtocolError::MalformedMessage(format!(
                "PDU frame too short: {} bytes",
                payload.len()
            )));
        }

        let fec = &payload[PDU_FRAME_OFFSET..PDU_FRAME_OFFSET + PDU_FEC_LENGTH];

        match self.state {
            State::Idle => {
                let header = match DataHeader::decode_fec(fec) {
                    Ok(header) => header,
                    Err(e) => {
                        self.reset();
                        return Err(e);
                    }
                };

                if header.blocks_to_follow >= PDU_MAX_BLOCKS {
                    self.reset();
                    return Err(ProtocolError::TooManyBlocks(header.blocks_to_follow));
                }

                debug!(
                    format = ?header.format,
                    sap = header.sap,
                    ll_id = header.ll_id,
                    blocks = header.blocks_to_follow,
                    "PDU data header"
                );

                if header.blocks_to_follow == 0 {
                    return Ok(Some(AssembledPdu {
                        header,
                        secondary: None,
                        extended_address: None,
                        user_data: Vec::new(),
                    }));
                }

                self.header = Some(header);
                self.state = State::Decoding;
                Ok(None)
            }

            State::Decoding => {
                self.buffer.extend_from_slice(fec);
                self.blocks_seen += 1;

                let header = self.header.expect("decoding without header");
                if self.blocks_seen < header.blocks_to_follow {
                    return Ok(None);
                }

                let result = self.process_blocks(&header);
                self.reset();
                result.map(Some)
            }
        }
    }

    fn process_blocks(&self, header: &DataHeader) -> Result<AssembledPdu, ProtocolError> {
        let mut chunks = self.buffer.chunks_exact(PDU_FEC_LENGTH);
        let mut secondary = None;
        let mut extended_address = None;
        let mut user_data = Vec::new();

        // An unconfirmed extended-address PDU spends its first block on a
        // secondary header.
        if header.sap == P25_SAP_EXT_ADDR && header.format == PduFormat::Unconfirmed {
            let fec = chunks
                .next()
                .ok_or_else(|| ProtocolError::MalformedMessage("missing secondary header".into()))?;
            let second = DataHeader::decode_fec(fec)?;
            extended_address = Some(ExtendedAddress {
                sap: second.sap,
                ll_id: second.ll_id,
            });
            secondary = Some(second);
        }

        let mut first_block = true;
        for fec in chunks {
            match header.format {
                PduFormat::Confirmed => {
                    let block = DataBlock::decode_confirmed(fec)
                        .map_err(|e| ProtocolError::DataUnitDropped(e.to_string()))?;

                    // A confirmed extended-address PDU carries the real SAP
                    // and logical link id in the first payload bytes of the
                    // serial-0 block.
                    if first_block && header.sap == P25_SAP_EXT_ADDR && block.serial == 0 {
                        extended_address = Some(ExtendedAddress {
                            sap: block.data[0] & 0x3F,
                            ll_id: get_u24(&block.data, 1),
                        });
                    }

                    user_data.extend_from_slice(&block.data);
                }
                PduFormat::Unconfirmed | PduFormat::Response | PduFormat::Ambt => {
                    let block = DataBlock::decode_unconfirmed(fec)
                        .map_err(|e| ProtocolError::DataUnitDropped(e.to_string()))?;
                    user_data.extend_from_slice(&block.data);
                }
            }
            first_block = false;
        }

        if !Crc32::check_trailer(&user_data) {
            return Err(ProtocolError::DataUnitDropped(
                "assembled PDU CRC-32 check failed".into(),
            ));
        }

        Ok(AssembledPdu {
            header: *header,
            secondary,
            extended_address,
            user_data,
        })
    }
}

impl Default for DataAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::p25::data::{PDU_CONFIRMED_DATA_LENGTH, PDU_UNCONFIRMED_LENGTH};

    fn frame_with_fec(fill: impl FnOnce(&mut [u8])) -> Vec<u8> {
        let mut payload = vec![0u8; PDU_FRAME_OFFSET + PDU_FEC_LENGTH];
        fill(&mut payload[PDU_FRAME_OFFSET..]);
        payload
    }

    fn confirmed_user_data(blocks: usize) -> Vec<u8> {
        let mut data = vec![0u8; blocks * PDU_CONFIRMED_DATA_LENGTH];
        for (i, b) in data.iter_mut().enumerate() {
            *b = (i as u8).wrapping_mul(13).wrapping_add(7);
        }
        Crc32::add_trailer(&mut data);
        data
    }

    #[test]
    fn test_confirmed_two_block_assembly() {
        let mut assembler = DataAssembler::new();

        let mut header = DataHeader::new(PduFormat::Confirmed, 0x00, 0xABCDEF);
        header.blocks_to_follow = 2;

        let header_frame = frame_with_fec(|fec| header.encode_fec(fec));
        assert!(assembler.assemble(&header_frame).unwrap().is_none());
        assert!(assembler.is_decoding());

        let user_data = confirmed_user_data(2);

        let block0 = DataBlock::confirmed(0, &user_data[..16]);
        let frame0 = frame_with_fec(|fec| block0.encode_confirmed(fec));
        assert!(assembler.assemble(&frame0).unwrap().is_none());

        let block1 = DataBlock::confirmed(1, &user_data[16..]);
        let frame1 = frame_with_fec(|fec| block1.encode_confirmed(fec));
        let pdu = assembler.assemble(&frame1).unwrap().expect("completed PDU");

        assert_eq!(pdu.user_data.len(), 32);
        assert_eq!(pdu.user_data, user_data);
        assert!(pdu.secondary.is_none());
        assert!(!assembler.is_decoding());
    }

    #[test]
    fn test_unconfirmed_ext_addr_secondary_header() {
        let mut assembler = DataAssembler::new();

        let mut header = DataHeader::new(PduFormat::Unconfirmed, P25_SAP_EXT_ADDR, 0x000001);
        header.blocks_to_follow = 3;

        let header_frame = frame_with_fec(|fec| header.encode_fec(fec));
        assert!(assembler.assemble(&header_frame).unwrap().is_none());

        // Secondary header names the true SAP and source.
        let secondary = DataHeader::new(PduFormat::Unconfirmed, 0x04, 0x9A5B10);
        let second_frame = frame_with_fec(|fec| secondary.encode_fec(fec));
        assert!(assembler.assemble(&second_frame).unwrap().is_none());

        let mut user_data = vec![0x11u8; 2 * PDU_UNCONFIRMED_LENGTH];
        Crc32::add_trailer(&mut user_data);

        let block0 = DataBlock::unconfirmed(&user_data[..12]);
        let frame0 = frame_with_fec(|fec| block0.encode_unconfirmed(fec));
        assert!(assembler.assemble(&frame0).unwrap().is_none());

        let block1 = DataBlock::unconfirmed(&user_data[12..]);
        let frame1 = frame_with_fec(|fec| block1.encode_unconfirmed(fec));
        let pdu = assembler.assemble(&frame1).unwrap().expect("completed PDU");

        let ext = pdu.extended_address.expect("extended address");
        assert_eq!(ext.sap, 0x04);
        assert_eq!(ext.ll_id, 0x9A5B10);
        assert_eq!(pdu.secondary.unwrap().ll_id, 0x9A5B10);
        assert_eq!(pdu.user_data, user_data);
    }

    #[test]
    fn test_confirmed_ext_addr_from_first_block() {
        let mut assembler = DataAssembler::new();

        let mut header = DataHeader::new(PduFormat::Confirmed, P25_SAP_EXT_ADDR, 0x000002);
        header.blocks_to_follow = 1;

        let header_frame = frame_with_fec(|fec| header.encode_fec(fec));
        assert!(assembler.assemble(&header_frame).unwrap().is_none());

        // Serial-0 block carries SAP + LLId in its leading payload bytes.
        let mut data = vec![0u8; PDU_CONFIRMED_DATA_LENGTH];
        data[0] = 0x04;
        data[1] = 0x12;
        data[2] = 0x34;
        data[3] = 0x56;
        Crc32::add_trailer(&mut data);

        let block = DataBlock::confirmed(0, &data);
        let frame = frame_with_fec(|fec| block.encode_confirmed(fec));
        let pdu = assembler.assemble(&frame).unwrap().expect("completed PDU");

        let ext = pdu.extended_address.expect("extended address");
        assert_eq!(ext.sap, 0x04);
        assert_eq!(ext.ll_id, 0x123456);
        assert!(pdu.secondary.is_none());
    }

    #[test]
    fn test_too_many_blocks_rejected() {
        let mut assembler = DataAssembler::new();

        let mut header = DataHeader::new(PduFormat::Confirmed, 0x00, 1);
        header.blocks_to_follow = PDU_MAX_BLOCKS;

        let frame = frame_with_fec(|fec| header.encode_fec(fec));
        assert!(matches!(
            assembler.assemble(&frame),
            Err(ProtocolError::TooManyBlocks(32))
        ));
        assert!(!assembler.is_decoding());
    }

    #[test]
    fn test_bad_crc32_discards() {
        let mut assembler = DataAssembler::new();

        let mut header = DataHeader::new(PduFormat::Confirmed, 0x00, 1);
        header.blocks_to_follow = 1;

        let frame = frame_with_fec(|fec| header.encode_fec(fec));
        assert!(assembler.assemble(&frame).unwrap().is_none());

        // Block data with no valid CRC-32 trailer.
        let block = DataBlock::confirmed(0, &[0x77; 16]);
        let bframe = frame_with_fec(|fec| block.encode_confirmed(fec));
        assert!(assembler.assemble(&bframe).is_err());
        assert!(!assembler.is_decoding());
    }

    #[test]
    fn test_zero_blocks_completes_immediately() {
        let mut assembler = DataAssembler::new();
        let header = DataHeader::new(PduFormat::Response, 0x00, 5);

        let frame = frame_with_fec(|fec| header.encode_fec(fec));
        let pdu = assembler.assemble(&frame).unwrap().expect("response PDU");
        assert!(pdu.user_data.is_empty());
    }
}
