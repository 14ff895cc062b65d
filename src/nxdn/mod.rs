//! NXDN message-type identifiers.
//!
//! The peer carries NXDN traffic opaquely; only the message type from the
//! protocol preamble is interpreted, to distinguish voice, data and call
//! boundaries.

/// NXDN RTCH/RCCH message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum MessageType {
    /// Voice call.
    VCall = 0x01,
    /// Voice call with individual service.
    VCallIv = 0x03,
    /// Transmission release (call end).
    TxRelease = 0x08,
    /// Data call header.
    DCallHeader = 0x09,
    /// Data call user data.
    DCallData = 0x0B,
    /// Data call acknowledgement.
    DCallAck = 0x0C,
    /// Header delay.
    HeadDelay = 0x0F,
    /// Idle.
    Idle = 0x10,
}

impl MessageType {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v & 0x3F {
            0x01 => Some(Self::VCall),
            0x03 => Some(Self::VCallIv),
            0x08 => Some(Self::TxRelease),
            0x09 => Some(Self::DCallHeader),
            0x0B => Some(Self::DCallData),
            0x0C => Some(Self::DCallAck),
            0x0F => Some(Self::HeadDelay),
            0x10 => Some(Self::Idle),
            _ => None,
        }
    }

    /// Message types that terminate a call stream.
    pub fn is_call_end(self) -> bool {
        matches!(self, Self::TxRelease | Self::Idle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        for mt in [
            MessageType::VCall,
            MessageType::VCallIv,
            MessageType::TxRelease,
            MessageType::DCallHeader,
            MessageType::DCallData,
            MessageType::DCallAck,
            MessageType::HeadDelay,
            MessageType::Idle,
        ] {
            assert_eq!(MessageType::from_u8(mt as u8), Some(mt));
        }
        assert_eq!(MessageType::from_u8(0x3F), None);
    }

    #[test]
    fn test_call_end() {
        assert!(MessageType::TxRelease.is_call_end());
        assert!(!MessageType::VCall.is_call_end());
    }
}
