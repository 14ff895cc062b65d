//! Wire framing for the FNE link.
//!
//! Every unencrypted datagram is a 12-byte RTP header, a 4-byte RTP
//! extension header, a 16-byte FNE extension header and the message payload.
//! All multi-byte integers are big-endian on the wire.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │ V=2|P|X=1|CC │ M|PT │ Sequence (2) │ Timestamp (4) │ SSRC (4) │
//! ├──────────────────────────────────────────────────────────────┤
//! │ Ext PT = 0xFE (2) │ Ext Length = 4 (2)                       │
//! ├──────────────────────────────────────────────────────────────┤
//! │ CRC-16 (2) │ Func (1) │ SubFunc (1) │ Stream ID (4)          │
//! │ Peer ID (4) │ Payload Length (4) │ Payload ...               │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod fne;
mod opcodes;
mod rtp;

pub use fne::{RtpExtensionHeader, RtpFneHeader, FNE_HEADER_LENGTH, RTP_EXTENSION_HEADER_LENGTH};
pub use opcodes::{NakReason, NetFunc, NetSubFunc};
pub use rtp::{RtpClock, RtpHeader, DVM_RTP_PAYLOAD_TYPE, RTP_HEADER_LENGTH};

use crate::coding::Crc16;
use crate::error::FramingError;
use crate::types::{PacketSequence, PeerId, StreamId};

/// Extension payload type marking the start of an FNE frame.
pub const DVM_FRAME_START: u16 = 0xFE;

/// Total bytes of headers before the payload.
pub const FRAME_OVERHEAD: usize = RTP_HEADER_LENGTH + RTP_EXTENSION_HEADER_LENGTH + FNE_HEADER_LENGTH;

/// A decoded (or to-be-encoded) frame: RTP header, FNE header, payload.
#[derive(Debug, Clone)]
pub struct FrameEnvelope {
    pub rtp: RtpHeader,
    pub fne: RtpFneHeader,
    pub payload: Vec<u8>,
}

impl FrameEnvelope {
    /// Assemble an envelope for transmission.
    pub fn new(
        peer_id: PeerId,
        stream_id: StreamId,
        seq: PacketSequence,
        timestamp: u32,
        func: u8,
        sub_func: u8,
        payload: Vec<u8>,
    ) -> Self {
        let rtp = RtpHeader::new(seq.0, timestamp, peer_id.as_u32());
        let fne = RtpFneHeader {
            crc16: Crc16::compute(&payload),
            func,
            sub_func,
            stream_id: stream_id.as_u32(),
            peer_id: peer_id.as_u32(),
            message_length: payload.len() as u32,
        };

        Self { rtp, fne, payload }
    }

    /// Encode the full envelope into a datagram.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = vec![0u8; FRAME_OVERHEAD + self.payload.len()];
        self.rtp.encode(&mut buf[..RTP_HEADER_LENGTH]);

        let ext = RtpExtensionHeader::fne();
        ext.encode(&mut buf[RTP_HEADER_LENGTH..RTP_HEADER_LENGTH + RTP_EXTENSION_HEADER_LENGTH]);

        self.fne
            .encode(&mut buf[RTP_HEADER_LENGTH + RTP_EXTENSION_HEADER_LENGTH..FRAME_OVERHEAD]);
        buf[FRAME_OVERHEAD..].copy_from_slice(&self.payload);
        buf
    }

    /// Decode and validate a datagram.
    ///
    /// Rejects frames with the wrong RTP version, a clear extension bit, an
    /// unknown payload type, a bad extension length or payload type, or a
    /// CRC-16 that disagrees with the recomputed value.
    pub fn decode(buf: &[u8]) -> Result<Self, FramingError> {
        if buf.len() < FRAME_OVERHEAD {
            return Err(FramingError::Truncated { size: buf.len() });
        }

        let rtp = RtpHeader::decode(&buf[..RTP_HEADER_LENGTH])?;

        let ext = RtpExtensionHeader::decode(
            &buf[RTP_HEADER_LENGTH..RTP_HEADER_LENGTH + RTP_EXTENSION_HEADER_LENGTH],
        );
        if ext.payload_type != DVM_FRAME_START {
            return Err(FramingError::InvalidExtensionPayloadType(ext.payload_type));
        }
        if ext.payload_length != RtpExtensionHeader::FNE_PAYLOAD_WORDS {
            return Err(FramingError::InvalidExtensionLength(ext.payload_length));
        }

        let fne = RtpFneHeader::decode(
            &buf[RTP_HEADER_LENGTH + RTP_EXTENSION_HEADER_LENGTH..FRAME_OVERHEAD],
        );

        let end = FRAME_OVERHEAD + (fne.message_length as usize).min(buf.len() - FRAME_OVERHEAD);
        let payload = buf[FRAME_OVERHEAD..end].to_vec();

        let computed = Crc16::compute(&payload);
        if computed != fne.crc16 {
            return Err(FramingError::CrcMismatch {
                header: fne.crc16,
                computed,
            });
        }

        Ok(Self { rtp, fne, payload })
    }

    pub fn peer_id(&self) -> PeerId {
        PeerId::new(self.fne.peer_id)
    }

    pub fn stream_id(&self) -> StreamId {
        StreamId::new(self.fne.stream_id)
    }

    pub fn seq(&self) -> PacketSequence {
        PacketSequence::new(self.rtp.sequence)
    }
}
