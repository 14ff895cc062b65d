//! P25 trunking signalling blocks.
//!
//! The TSBK family is expressed as a tagged sum over the opcodes the peer
//! sends or receives; unknown opcodes pass through as raw argument bytes.
//! A raw TSBK is twelve bytes: last-block flag and opcode, manufacturer id,
//! eight argument bytes and a CRC-16 trailer. Over-the-air encoding runs
//! the raw block through the 1/2-rate trellis and the status-symbol
//! interleaver.

use crate::coding::interleave::{P25Interleaver, TSBK_RANGE};
use crate::coding::{Crc16, Trellis};
use crate::error::ProtocolError;
use crate::util::bits::{get_u16, get_u24, set_u16, set_u24};

use super::{
    TSBK_IOSP_ACK_RSP, TSBK_IOSP_EXT_FNCT, TSBK_IOSP_GRP_AFF, TSBK_IOSP_GRP_VCH,
    TSBK_IOSP_UU_VCH, TSBK_IOSP_U_REG, TSBK_OSP_DENY_RSP,
};

/// Raw TSBK length in bytes.
pub const TSBK_LENGTH: usize = 12;

/// Over-the-air coded TSBK region length in bytes.
pub const TSBK_FEC_LENGTH: usize = 25;

/// Burst buffer length needed for OTA encode.
pub const TSBK_BURST_LENGTH: usize = 40;

/// A trunking signalling block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tsbk {
    /// Group voice channel grant.
    GrpVchGrant {
        options: u8,
        channel: u16,
        dst_id: u32,
        src_id: u32,
    },
    /// Unit-to-unit voice channel grant.
    UuVchGrant { channel: u16, dst_id: u32, src_id: u32 },
    /// Acknowledge response.
    AckRsp {
        service: u8,
        extended: bool,
        src_id: u32,
        dst_id: u32,
    },
    /// Deny response.
    DenyRsp {
        service: u8,
        reason: u8,
        dst_id: u32,
        src_id: u32,
    },
    /// Extended function command.
    ExtFnct { function: u16, src_id: u32, dst_id: u32 },
    /// Group affiliation response.
    GrpAffRsp {
        accepted: bool,
        announce_group: u16,
        group: u16,
        src_id: u32,
    },
    /// Unit registration response.
    URegRsp { accepted: bool, src_id: u32, address: u32 },
    /// Any other opcode, args passed through verbatim.
    Raw { opcode: u8, mfid: u8, args: [u8; 8] },
}

impl Tsbk {
    /// The opcode byte for this block.
    pub fn opcode(&self) -> u8 {
        match self {
            Self::GrpVchGrant { .. } => TSBK_IOSP_GRP_VCH,
            Self::UuVchGrant { .. } => TSBK_IOSP_UU_VCH,
            Self::AckRsp { .. } => TSBK_IOSP_ACK_RSP,
            Self::DenyRsp { .. } => TSBK_OSP_DENY_RSP,
            Self::ExtFnct { .. } => TSBK_IOSP_EXT_FNCT,
            Self::GrpAffRsp { .. } => TSBK_IOSP_GRP_AFF,
            Self::URegRsp { .. } => TSBK_IOSP_U_REG,
            Self::Raw { opcode, .. } => *opcode,
        }
    }

    fn args(&self) -> [u8; 8] {
        let mut args = [0u8; 8];
        match self {
            Self::GrpVchGrant {
                options,
                channel,
                dst_id,
                src_id,
            } => {
                args[0] = *options;
                set_u16(&mut args, 1, *channel);
                // Group addresses are 16-bit on the air.
                set_u16(&mut args, 3, (*dst_id & 0xFFFF) as u16);
                set_u24(&mut args, 5, *src_id);
            }
            Self::UuVchGrant {
                channel,
                dst_id,
                src_id,
            } => {
                set_u16(&mut args, 0, *channel);
                set_u24(&mut args, 2, *dst_id);
                set_u24(&mut args, 5, *src_id);
            }
            Self::AckRsp {
                service,
                extended,
                src_id,
                dst_id,
            } => {
                // Symmetric layout: source at offset 0, destination at
                // offset 3, service and flags trailing.
                set_u24(&mut args, 0, *src_id);
                set_u24(&mut args, 3, *dst_id);
                args[6] = *service & 0x3F;
                args[7] = u8::from(*extended) << 7;
            }
            Self::DenyRsp {
                service,
                reason,
                dst_id,
                src_id,
            } => {
                args[0] = *service & 0x3F;
                args[1] = *reason;
                set_u24(&mut args, 2, *dst_id);
                set_u24(&mut args, 5, *src_id);
            }
            Self::ExtFnct {
                function,
                src_id,
                dst_id,
            } => {
                set_u16(&mut args, 0, *function);
                set_u24(&mut args, 2, *src_id);
                set_u24(&mut args, 5, *dst_id);
            }
            Self::GrpAffRsp {
                accepted,
                announce_group,
                group,
                src_id,
            } => {
                args[0] = u8::from(!*accepted);
                set_u16(&mut args, 1, *announce_group);
                set_u16(&mut args, 3, *group);
                set_u24(&mut args, 5, *src_id);
            }
            Self::URegRsp {
                accepted,
                src_id,
                address,
            } => {
                args[0] = u8::from(!*accepted);
                set_u24(&mut args, 1, *src_id);
                set_u24(&mut args, 4, *address);
            }
            Self::Raw { args: raw, .. } => args.copy_from_slice(raw),
        }
        args
    }

    fn mfid(&self) -> u8 {
        match self {
            Self::Raw { mfid, .. } => *mfid,
            _ => 0x00,
        }
    }

    /// Encode a raw 12-byte TSBK with the last-block flag and CRC trailer.
    pub fn encode_raw(&self, last_block: bool) -> [u8; TSBK_LENGTH] {
        let mut buf = [0u8; TSBK_LENGTH];
        buf[0] = (u8::from(last_block) << 7) | (self.opcode() & 0x3F);
        buf[1] = self.mfid();
        buf[2..10].copy_from_slice(&self.args());
        Crc16::add_trailer(&mut buf);
        buf
    }

    /// Decode a raw 12-byte TSBK, verifying the CRC trailer.
    pub fn decode_raw(buf: &[u8]) -> Result<(Self, bool), ProtocolError> {
        if buf.len() < TSBK_LENGTH {
            return Err(ProtocolError::MalformedMessage("short TSBK".into()));
        }

        if !Crc16::check_trailer(&buf[..TSBK_LENGTH]) {
            return Err(ProtocolError::MalformedMessage(
                "TSBK CRC check failed".into(),
            ));
        }

        let last_block = buf[0] & 0x80 != 0;
        let opcode = buf[0] & 0x3F;
        let mfid = buf[1];
        let args = &buf[2..10];

        let tsbk = match opcode {
            TSBK_IOSP_GRP_VCH => Self::GrpVchGrant {
                options: args[0],
                channel: get_u16(args, 1),
                dst_id: u32::from(get_u16(args, 3)),
                src_id: get_u24(args, 5),
            },
            TSBK_IOSP_UU_VCH => Self::UuVchGrant {
                channel: get_u16(args, 0),
                dst_id: get_u24(args, 2),
                src_id: get_u24(args, 5),
            },
            TSBK_IOSP_ACK_RSP => Self::AckRsp {
                service: args[6] & 0x3F,
                extended: args[7] & 0x80 != 0,
                src_id: get_u24(args, 0),
                dst_id: get_u24(args, 3),
            },
            TSBK_OSP_DENY_RSP => Self::DenyRsp {
                service: args[0] & 0x3F,
                reason: args[1],
                dst_id: get_u24(args, 2),
                src_id: get_u24(args, 5),
            },
            TSBK_IOSP_EXT_FNCT => Self::ExtFnct {
                function: get_u16(args, 0),
                src_id: get_u24(args, 2),
                dst_id: get_u24(args, 5),
            },
            TSBK_IOSP_GRP_AFF => Self::GrpAffRsp {
                accepted: args[0] == 0,
                announce_group: get_u16(args, 1),
                group: get_u16(args, 3),
                src_id: get_u24(args, 5),
            },
            TSBK_IOSP_U_REG => Self::URegRsp {
                accepted: args[0] == 0,
                src_id: get_u24(args, 1),
                address: get_u24(args, 4),
            },
            _ => {
                let mut raw = [0u8; 8];
                raw.copy_from_slice(args);
                Self::Raw {
                    opcode,
                    mfid,
                    args: raw,
                }
            }
        };

        Ok((tsbk, last_block))
    }

    /// Encode over-the-air: raw block, 1/2-rate trellis, then interleave
    /// into the TSDU payload region of `burst`.
    pub fn encode_ota(&self, burst: &mut [u8], last_block: bool) {
        debug_assert!(burst.len() >= TSBK_BURST_LENGTH);

        let raw = self.encode_raw(last_block);
        let mut fec = [0u8; TSBK_FEC_LENGTH];
        Trellis::encode_1_2(&raw, &mut fec);

        let (start, stop) = TSBK_RANGE;
        P25Interleaver::encode(&fec, burst, start, stop);
    }

    /// Decode an over-the-air TSDU payload region.
    pub fn decode_ota(burst: &[u8]) -> Result<(Self, bool), ProtocolError> {
        let (start, stop) = TSBK_RANGE;
        let mut fec = [0u8; TSBK_FEC_LENGTH];
        P25Interleaver::decode(burst, &mut fec, start, stop);

        let mut raw = [0u8; TSBK_LENGTH];
        Trellis::decode_1_2(&fec, &mut raw)
            .map_err(|e| ProtocolError::DataUnitDropped(e.to_string()))?;

        Self::decode_raw(&raw)
    }
}
