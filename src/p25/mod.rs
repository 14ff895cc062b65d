//! P25 protocol data units: packet data (PDU), trunking signalling (TSBK)
//! and key management (KMM).

pub mod data;
pub mod kmm;
pub mod tsbk;

pub use data::{AssembledPdu, DataAssembler, DataBlock, DataHeader};
pub use kmm::{KeyItem, KeysetItem, KmmFrame, KmmModifyKey};
pub use tsbk::Tsbk;

/// Message indicator length in bytes (72 bits).
pub const P25_MI_LENGTH: usize = 9;

/// Encryption algorithm identifiers.
pub const P25_ALGO_UNENCRYPT: u8 = 0x80;
pub const P25_ALGO_DES: u8 = 0x81;
pub const P25_ALGO_AES_256: u8 = 0x84;
pub const P25_ALGO_ARC4: u8 = 0xAA;

/// Data unit identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Duid {
    /// Header data unit.
    Hdu = 0x0,
    /// Terminator data unit.
    Tdu = 0x3,
    /// Logical data unit 1 (voice + link control).
    Ldu1 = 0x5,
    /// Trunking signalling data unit.
    Tsdu = 0x7,
    /// Logical data unit 2 (voice + encryption sync).
    Ldu2 = 0xA,
    /// Packet data unit.
    Pdu = 0xC,
    /// Terminator data unit with link control.
    TduLc = 0xF,
}

impl Duid {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v & 0x0F {
            0x0 => Some(Self::Hdu),
            0x3 => Some(Self::Tdu),
            0x5 => Some(Self::Ldu1),
            0x7 => Some(Self::Tsdu),
            0xA => Some(Self::Ldu2),
            0xC => Some(Self::Pdu),
            0xF => Some(Self::TduLc),
            _ => None,
        }
    }
}

/// PDU header formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PduFormat {
    Response = 0x03,
    Unconfirmed = 0x15,
    Confirmed = 0x16,
    /// Alternate multi-block trunking.
    Ambt = 0x17,
}

impl PduFormat {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v & 0x1F {
            0x03 => Some(Self::Response),
            0x15 => Some(Self::Unconfirmed),
            0x16 => Some(Self::Confirmed),
            0x17 => Some(Self::Ambt),
            _ => None,
        }
    }
}

/// Service access points referenced by the PDU layer.
pub const P25_SAP_USER_DATA: u8 = 0x00;
pub const P25_SAP_EXT_ADDR: u8 = 0x1F;
pub const P25_SAP_TRUNK_CTL: u8 = 0x3D;

/// Link control opcodes referenced by frame synthesis.
pub const P25_LCF_GROUP: u8 = 0x00;
pub const P25_LCF_PRIVATE: u8 = 0x03;

/// TSBK opcodes carried by the peer.
pub const TSBK_IOSP_GRP_VCH: u8 = 0x00;
pub const TSBK_IOSP_UU_VCH: u8 = 0x04;
pub const TSBK_IOSP_ACK_RSP: u8 = 0x20;
pub const TSBK_IOSP_EXT_FNCT: u8 = 0x24;
pub const TSBK_OSP_DENY_RSP: u8 = 0x27;
pub const TSBK_IOSP_GRP_AFF: u8 = 0x28;
pub const TSBK_IOSP_U_REG: u8 = 0x2C;

/// KMM message identifiers.
pub const KMM_MODIFY_KEY_CMD: u8 = 0x13;
pub const KMM_INVENTORY_CMD: u8 = 0x0D;
pub const KMM_NAK: u8 = 0x16;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duid_round_trip() {
        for duid in [
            Duid::Hdu,
            Duid::Tdu,
            Duid::Ldu1,
            Duid::Tsdu,
            Duid::Ldu2,
            Duid::Pdu,
            Duid::TduLc,
        ] {
            assert_eq!(Duid::from_u8(duid as u8), Some(duid));
        }
        assert_eq!(Duid::from_u8(0x1), None);
    }

    #[test]
    fn test_format_round_trip() {
        for fmt in [
            PduFormat::Response,
            PduFormat::Unconfirmed,
            PduFormat::Confirmed,
            PduFormat::Ambt,
        ] {
            assert_eq!(PduFormat::from_u8(fmt as u8), Some(fmt));
        }
        assert_eq!(PduFormat::from_u8(0x00), None);
    }
}
