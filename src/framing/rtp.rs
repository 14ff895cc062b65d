//! RTP header encoding and the per-peer timestamp clock.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::error::FramingError;
use crate::util::bits::{get_u16, get_u32, set_u16, set_u32};
use crate::RTP_GENERIC_CLOCK_RATE;

/// RTP header length in bytes.
pub const RTP_HEADER_LENGTH: usize = 12;

/// RTP payload type assigned to DVM traffic. The value + 1 is also accepted.
pub const DVM_RTP_PAYLOAD_TYPE: u8 = 0x56;

/// Timestamp increment per packet.
const TIMESTAMP_STEP: u32 = RTP_GENERIC_CLOCK_RATE / 133;

/// 12-byte RTP header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub version: u8,
    pub padding: bool,
    pub extension: bool,
    pub csrc_count: u8,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    /// Build an outbound header: version 2, extension set, DVM payload type.
    pub fn new(sequence: u16, timestamp: u32, ssrc: u32) -> Self {
        Self {
            version: 2,
            padding: false,
            extension: true,
            csrc_count: 0,
            marker: false,
            payload_type: DVM_RTP_PAYLOAD_TYPE,
            sequence,
            timestamp,
            ssrc,
        }
    }

    /// Encode into a 12-byte buffer.
    pub fn encode(&self, buf: &mut [u8]) {
        debug_assert!(buf.len() >= RTP_HEADER_LENGTH);

        buf[0] = (self.version << 6)
            | (u8::from(self.padding) << 5)
            | (u8::from(self.extension) << 4)
            | (self.csrc_count & 0x0F);
        buf[1] = (u8::from(self.marker) << 7) | (self.payload_type & 0x7F);
        set_u16(buf, 2, self.sequence);
        set_u32(buf, 4, self.timestamp);
        set_u32(buf, 8, self.ssrc);
    }

    /// Decode and validate a 12-byte header.
    pub fn decode(buf: &[u8]) -> Result<Self, FramingError> {
        if buf.len() < RTP_HEADER_LENGTH {
            return Err(FramingError::Truncated { size: buf.len() });
        }

        let version = buf[0] >> 6;
        if version != 2 {
            return Err(FramingError::InvalidRtpVersion(version));
        }

        let extension = buf[0] & 0x10 != 0;
        if !extension {
            return Err(FramingError::MissingExtension);
        }

        let payload_type = buf[1] & 0x7F;
        if payload_type != DVM_RTP_PAYLOAD_TYPE && payload_type != DVM_RTP_PAYLOAD_TYPE + 1 {
            return Err(FramingError::InvalidPayloadType(payload_type));
        }

        Ok(Self {
            version,
            padding: buf[0] & 0x20 != 0,
            extension,
            csrc_count: buf[0] & 0x0F,
            marker: buf[1] & 0x80 != 0,
            payload_type,
            sequence: get_u16(buf, 2),
            timestamp: get_u32(buf, 4),
            ssrc: get_u32(buf, 8),
        })
    }
}

/// Per-peer RTP timestamp clock.
///
/// Seeded from wall-clock at construction and stepped by a fixed 133 Hz
/// increment derived from the 8000 Hz generic clock rate per packet. The
/// step is deliberately not RTP-spec-compliant; existing masters expect it.
#[derive(Debug)]
pub struct RtpClock {
    current: u32,
}

impl RtpClock {
    pub fn new() -> Self {
        let since_epoch = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or(Duration::ZERO);
        let ticks = since_epoch.as_millis() as u64 * u64::from(RTP_GENERIC_CLOCK_RATE) / 1000;

        Self {
            current: ticks as u32,
        }
    }

    /// Take the current timestamp and advance the clock.
    pub fn next(&mut self) -> u32 {
        let ts = self.current;
        self.current = self.current.wrapping_add(TIMESTAMP_STEP);
        ts
    }
}

impl Default for RtpClock {
    fn default() -> Self {
        Self::new()
    }
}
