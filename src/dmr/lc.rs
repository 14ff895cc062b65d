//! DMR full link control and privacy link control.

use crate::coding::rs129::Rs129;
use crate::error::{CodingError, ProtocolError};
use crate::util::bits::{get_u24, set_u24};

use super::{DMR_FLCO_GROUP, DMR_FLCO_PRIVACY, DMR_FLCO_PRIVATE};

/// Full link control: 72 bits of content protected by RS(12,9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lc {
    /// Protect flag.
    pub pf: bool,
    /// Full LC opcode.
    pub flco: u8,
    /// Feature-set identifier.
    pub fid: u8,
    /// Service options.
    pub options: u8,
    /// Destination (talkgroup or unit) address.
    pub dst_id: u32,
    /// Source unit address.
    pub src_id: u32,
}

impl Lc {
    /// Group voice LC.
    pub fn group(src_id: u32, dst_id: u32) -> Self {
        Self {
            pf: false,
            flco: DMR_FLCO_GROUP,
            fid: 0,
            options: 0,
            dst_id,
            src_id,
        }
    }

    /// Unit-to-unit voice LC.
    pub fn private(src_id: u32, dst_id: u32) -> Self {
        Self {
            pf: false,
            flco: DMR_FLCO_PRIVATE,
            fid: 0,
            options: 0,
            dst_id,
            src_id,
        }
    }

    pub fn is_group(&self) -> bool {
        self.flco == DMR_FLCO_GROUP
    }

    /// Pack the 9 LC octets.
    pub fn pack(&self) -> [u8; 9] {
        let mut lc = [0u8; 9];
        lc[0] = (u8::from(self.pf) << 7) | (self.flco & 0x3F);
        lc[1] = self.fid;
        lc[2] = self.options;
        set_u24(&mut lc, 3, self.dst_id & 0xFF_FFFF);
        set_u24(&mut lc, 6, self.src_id & 0xFF_FFFF);
        lc
    }

    /// Encode the full 12-byte LC with masked RS(12,9) parity.
    pub fn encode(&self, mask: u8) -> [u8; 12] {
        let lc = self.pack();
        let parity = Rs129::encode(&lc, mask);

        let mut full = [0u8; 12];
        full[..9].copy_from_slice(&lc);
        full[9..].copy_from_slice(&parity);
        full
    }

    /// Decode a full 12-byte LC, verifying the masked parity.
    pub fn decode(data: &[u8; 12], mask: u8) -> Result<Self, CodingError> {
        if !Rs129::check(data, mask) {
            return Err(CodingError::BlockCrc);
        }

        Ok(Self {
            pf: data[0] & 0x80 != 0,
            flco: data[0] & 0x3F,
            fid: data[1],
            options: data[2],
            dst_id: get_u24(data, 3),
            src_id: get_u24(data, 6),
        })
    }
}

/// Privacy link control carried by the DMR privacy indicator header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrivacyLc {
    /// Protect flag.
    pub pf: bool,
    /// Encryption algorithm identifier (3 bits).
    pub alg_id: u8,
    /// Key identifier.
    pub key_id: u8,
    /// Message indicator fragment.
    pub mi: u32,
    /// Destination (talkgroup or unit) address.
    pub dst_id: u32,
}

impl PrivacyLc {
    pub fn new(alg_id: u8, key_id: u8, mi: u32, dst_id: u32) -> Self {
        Self {
            pf: false,
            alg_id,
            key_id,
            mi,
            dst_id,
        }
    }

    fn pack(&self) -> [u8; 9] {
        let mut lc = [0u8; 9];
        lc[0] = (u8::from(self.pf) << 7) | DMR_FLCO_PRIVACY;
        lc[1] = (self.alg_id & 0x07) << 5;
        lc[2] = self.key_id;
        set_u24(&mut lc, 3, self.mi & 0xFF_FFFF);
        set_u24(&mut lc, 6, self.dst_id & 0xFF_FFFF);
        lc
    }

    /// Encode the full 12-byte privacy LC with masked RS(12,9) parity.
    pub fn encode(&self, mask: u8) -> [u8; 12] {
        let lc = self.pack();
        let parity = Rs129::encode(&lc, mask);

        let mut full = [0u8; 12];
        full[..9].copy_from_slice(&lc);
        full[9..].copy_from_slice(&parity);
        full
    }

    /// Decode a full 12-byte privacy LC.
    pub fn decode(data: &[u8; 12], mask: u8) -> Result<Self, ProtocolError> {
        if !Rs129::check(data, mask) {
            return Err(ProtocolError::MalformedMessage(
                "privacy LC parity check failed".into(),
            ));
        }

        if data[0] & 0x3F != DMR_FLCO_PRIVACY {
            return Err(ProtocolError::MalformedMessage(format!(
                "unexpected FLCO {:#04x} in privacy LC",
                data[0] & 0x3F
            )));
        }

        Ok(Self {
            pf: data[0] & 0x80 != 0,
            alg_id: data[1] >> 5,
            key_id: data[2],
            mi: get_u24(data, 3),
            dst_id: get_u24(data, 6),
        })
    }
}
