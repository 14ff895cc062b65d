//! Protocol-frame preamble encoding and decoding.
//!
//! Every encapsulated protocol payload opens with a common preamble: a
//! four-byte ASCII tag, a sequence-or-LCO byte, 24-bit source and
//! destination ids, mode-specific bytes, and a control byte packing the
//! slot, call type, frame type and data type or DUID.

use crate::dmr::{DataType, FrameType};
use crate::error::ProtocolError;
use crate::nxdn::MessageType;
use crate::p25::Duid;
use crate::types::StreamId;
use crate::util::bits::{get_u24, set_u24, set_u32};

/// DMR protocol frame tag.
pub const TAG_DMR_DATA: &[u8; 4] = b"DMRD";
/// P25 protocol frame tag.
pub const TAG_P25_DATA: &[u8; 4] = b"P25D";
/// NXDN protocol frame tag.
pub const TAG_NXDN_DATA: &[u8; 4] = b"NXDD";

/// Offset of the control byte within the preamble.
const CONTROL_OFFSET: usize = 15;

/// Offset of mode-specific frame data within a DMR payload.
pub const DMR_DATA_OFFSET: usize = 20;
/// DMR burst length.
pub const DMR_FRAME_LENGTH: usize = 33;
/// Total DMR protocol payload length.
pub const DMR_PAYLOAD_LENGTH: usize = 55;

/// Offset of mode-specific frame data within P25 and NXDN payloads.
pub const P25_DATA_OFFSET: usize = 24;

/// A received (or synthesised) DMR protocol frame.
#[derive(Debug, Clone)]
pub struct DmrFrame {
    pub seq: u8,
    pub src_id: u32,
    pub dst_id: u32,
    /// Timeslot, 1 or 2.
    pub slot: u8,
    pub private_call: bool,
    pub frame_type: FrameType,
    /// Data type, present on data-sync frames.
    pub data_type: Option<DataType>,
    /// Voice frame counter, on voice frames.
    pub n: u8,
    pub stream_id: StreamId,
    /// The full protocol payload, preamble included.
    pub payload: Vec<u8>,
}

impl DmrFrame {
    /// Decode the preamble of a DMR protocol payload.
    pub fn decode(payload: &[u8], stream_id: StreamId) -> Result<Self, ProtocolError> {
        check_preamble(payload, TAG_DMR_DATA)?;

        let control = payload[CONTROL_OFFSET];
        let frame_type = FrameType::from_u8((control >> 4) & 0x03).ok_or_else(|| {
            ProtocolError::MalformedMessage(format!("bad DMR frame type in {control:#04x}"))
        })?;

        let data_type = if frame_type == FrameType::DataSync {
            Some(DataType::from_u8(control & 0x0F).ok_or_else(|| {
                ProtocolError::MalformedMessage(format!("bad DMR data type in {control:#04x}"))
            })?)
        } else {
            None
        };

        Ok(Self {
            seq: payload[4],
            src_id: get_u24(payload, 5),
            dst_id: get_u24(payload, 8),
            slot: if control & 0x80 != 0 { 2 } else { 1 },
            private_call: control & 0x40 != 0,
            frame_type,
            data_type,
            n: if data_type.is_none() { control & 0x0F } else { 0 },
            stream_id,
            payload: payload.to_vec(),
        })
    }

    /// Build a full DMR protocol payload around a 33-byte burst.
    pub fn encode(
        seq: u8,
        src_id: u32,
        dst_id: u32,
        peer_id: u32,
        slot: u8,
        private_call: bool,
        frame_type: FrameType,
        data_type: Option<DataType>,
        n: u8,
        burst: &[u8],
    ) -> Vec<u8> {
        let mut payload = vec![0u8; DMR_PAYLOAD_LENGTH];
        payload[..4].copy_from_slice(TAG_DMR_DATA);
        payload[4] = seq;
        set_u24(&mut payload, 5, src_id);
        set_u24(&mut payload, 8, dst_id);
        set_u32(&mut payload, 11, peer_id);

        let low = data_type.map_or(n & 0x0F, |dt| dt as u8 & 0x0F);
        payload[CONTROL_OFFSET] = (u8::from(slot == 2) << 7)
            | (u8::from(private_call) << 6)
            | ((frame_type as u8 & 0x03) << 4)
            | low;

        let len = burst.len().min(DMR_FRAME_LENGTH);
        payload[DMR_DATA_OFFSET..DMR_DATA_OFFSET + len].copy_from_slice(&burst[..len]);
        payload
    }
}

/// A received (or synthesised) P25 protocol frame.
#[derive(Debug, Clone)]
pub struct P25Frame {
    /// Link control opcode.
    pub lco: u8,
    pub src_id: u32,
    pub dst_id: u32,
    pub private_call: bool,
    pub duid: Option<Duid>,
    pub stream_id: StreamId,
    /// The full protocol payload, preamble included.
    pub payload: Vec<u8>,
}

impl P25Frame {
    /// Decode the preamble of a P25 protocol payload.
    pub fn decode(payload: &[u8], stream_id: StreamId) -> Result<Self, ProtocolError> {
        check_preamble(payload, TAG_P25_DATA)?;

        let control = payload[CONTROL_OFFSET];
        Ok(Self {
            lco: payload[4],
            src_id: get_u24(payload, 5),
            dst_id: get_u24(payload, 8),
            private_call: control & 0x40 != 0,
            duid: Duid::from_u8(control & 0x0F),
            stream_id,
            payload: payload.to_vec(),
        })
    }

    /// Build a full P25 protocol payload around mode-specific frame data.
    pub fn encode(
        lco: u8,
        src_id: u32,
        dst_id: u32,
        peer_id: u32,
        private_call: bool,
        duid: Duid,
        data: &[u8],
    ) -> Vec<u8> {
        let mut payload = vec![0u8; P25_DATA_OFFSET + data.len()];
        payload[..4].copy_from_slice(TAG_P25_DATA);
        payload[4] = lco;
        set_u24(&mut payload, 5, src_id);
        set_u24(&mut payload, 8, dst_id);
        set_u32(&mut payload, 11, peer_id);
        payload[CONTROL_OFFSET] = (u8::from(private_call) << 6) | (duid as u8 & 0x0F);
        payload[P25_DATA_OFFSET..].copy_from_slice(data);
        payload
    }
}

/// A received NXDN protocol frame.
#[derive(Debug, Clone)]
pub struct NxdnFrame {
    pub message_type: Option<MessageType>,
    pub src_id: u32,
    pub dst_id: u32,
    pub private_call: bool,
    pub stream_id: StreamId,
    /// The full protocol payload, preamble included.
    pub payload: Vec<u8>,
}

impl NxdnFrame {
    /// Decode the preamble of an NXDN protocol payload.
    pub fn decode(payload: &[u8], stream_id: StreamId) -> Result<Self, ProtocolError> {
        check_preamble(payload, TAG_NXDN_DATA)?;

        Ok(Self {
            message_type: MessageType::from_u8(payload[4]),
            src_id: get_u24(payload, 5),
            dst_id: get_u24(payload, 8),
            private_call: payload[CONTROL_OFFSET] & 0x40 != 0,
            stream_id,
            payload: payload.to_vec(),
        })
    }

    /// Build a full NXDN protocol payload around mode-specific frame data.
    pub fn encode(
        message_type: MessageType,
        src_id: u32,
        dst_id: u32,
        peer_id: u32,
        private_call: bool,
        data: &[u8],
    ) -> Vec<u8> {
        let mut payload = vec![0u8; P25_DATA_OFFSET + data.len()];
        payload[..4].copy_from_slice(TAG_NXDN_DATA);
        payload[4] = message_type as u8;
        set_u24(&mut payload, 5, src_id);
        set_u24(&mut payload, 8, dst_id);
        set_u32(&mut payload, 11, peer_id);
        payload[CONTROL_OFFSET] = u8::from(private_call) << 6;
        payload[P25_DATA_OFFSET..].copy_from_slice(data);
        payload
    }
}

fn check_preamble(payload: &[u8], tag: &[u8; 4]) -> Result<(), ProtocolError> {
    if payload.len() < 16 {
        return Err(ProtocolError::MalformedMessage(format!(
            "protocol payload too short: {} bytes",
            payload.len()
        )));
    }

    if &payload[..4] != tag {
        return Err(ProtocolError::MalformedMessage(format!(
            "unexpected frame tag {:02x?}",
            &payload[..4]
        )));
    }

    Ok(())
}
