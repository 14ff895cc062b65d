//! Protocol function and sub-function opcode space, and NAK reason codes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Protocol message class (function byte).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum NetFunc {
    /// Encapsulated protocol data (DMR / P25 / NXDN / analog).
    Protocol = 0x00,
    /// Master-originated control (whitelists, TGID activation, HA params).
    Master = 0x01,
    /// Repeater login.
    RptL = 0x60,
    /// Repeater authorisation response.
    RptK = 0x61,
    /// Repeater configuration.
    RptC = 0x62,
    /// Repeater closing.
    RptClosing = 0x70,
    /// Master closing.
    MstClosing = 0x71,
    /// Ping.
    Ping = 0x74,
    /// Pong.
    Pong = 0x75,
    /// Grant request.
    GrantReq = 0x7A,
    /// In-call control.
    InCallCtrl = 0x7B,
    /// Key request.
    KeyReq = 0x7C,
    /// Key response.
    KeyRsp = 0x7D,
    /// Acknowledgement.
    Ack = 0x7E,
    /// Negative acknowledgement.
    Nak = 0x7F,
    /// Log/diagnostic transfer.
    Transfer = 0x90,
    /// Peer announcements (affiliations, registrations).
    Announce = 0x91,
}

impl NetFunc {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0x00 => Some(Self::Protocol),
            0x01 => Some(Self::Master),
            0x60 => Some(Self::RptL),
            0x61 => Some(Self::RptK),
            0x62 => Some(Self::RptC),
            0x70 => Some(Self::RptClosing),
            0x71 => Some(Self::MstClosing),
            0x74 => Some(Self::Ping),
            0x75 => Some(Self::Pong),
            0x7A => Some(Self::GrantReq),
            0x7B => Some(Self::InCallCtrl),
            0x7C => Some(Self::KeyReq),
            0x7D => Some(Self::KeyRsp),
            0x7E => Some(Self::Ack),
            0x7F => Some(Self::Nak),
            0x90 => Some(Self::Transfer),
            0x91 => Some(Self::Announce),
            _ => None,
        }
    }
}

/// Sub-function values, grouped by the function class they disambiguate.
pub struct NetSubFunc;

impl NetSubFunc {
    /// No sub-function.
    pub const NOP: u8 = 0xFF;

    // NetFunc::Protocol
    pub const PROTOCOL_DMR: u8 = 0x00;
    pub const PROTOCOL_P25: u8 = 0x01;
    pub const PROTOCOL_NXDN: u8 = 0x02;
    pub const PROTOCOL_ANALOG: u8 = 0x03;

    // NetFunc::Master
    pub const MASTER_WHITELIST_RID: u8 = 0x00;
    pub const MASTER_BLACKLIST_RID: u8 = 0x01;
    pub const MASTER_ACTIVE_TGS: u8 = 0x02;
    pub const MASTER_DEACTIVE_TGS: u8 = 0x03;
    pub const MASTER_HA_PARAMS: u8 = 0xA3;

    // NetFunc::Transfer
    pub const TRANSFER_ACTIVITY: u8 = 0x01;
    pub const TRANSFER_DIAG: u8 = 0x02;
    pub const TRANSFER_STATUS: u8 = 0x03;

    // NetFunc::Announce
    pub const ANNOUNCE_GRP_AFFIL: u8 = 0x00;
    pub const ANNOUNCE_UNIT_REG: u8 = 0x01;
    pub const ANNOUNCE_UNIT_DEREG: u8 = 0x02;
    pub const ANNOUNCE_GRP_UNAFFIL: u8 = 0x03;
    pub const ANNOUNCE_AFFILS: u8 = 0x90;
}

/// Reason code carried in a master NAK.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NakReason {
    GeneralFailure,
    ModeNotEnabled,
    IllegalPacket,
    FneUnauthorized,
    BadConnState,
    InvalidConfigData,
    PeerReset,
    PeerAcl,
    FneMaxConn,
    Invalid,
}

impl NakReason {
    pub fn from_u16(v: u16) -> Self {
        match v {
            0x0000 => Self::GeneralFailure,
            0x0001 => Self::ModeNotEnabled,
            0x0002 => Self::IllegalPacket,
            0x0003 => Self::FneUnauthorized,
            0x0004 => Self::BadConnState,
            0x0005 => Self::InvalidConfigData,
            0x0006 => Self::PeerReset,
            0x0007 => Self::PeerAcl,
            0x0008 => Self::FneMaxConn,
            _ => Self::Invalid,
        }
    }

    pub fn as_u16(self) -> u16 {
        match self {
            Self::GeneralFailure => 0x0000,
            Self::ModeNotEnabled => 0x0001,
            Self::IllegalPacket => 0x0002,
            Self::FneUnauthorized => 0x0003,
            Self::BadConnState => 0x0004,
            Self::InvalidConfigData => 0x0005,
            Self::PeerReset => 0x0006,
            Self::PeerAcl => 0x0007,
            Self::FneMaxConn => 0x0008,
            Self::Invalid => 0xFFFF,
        }
    }

    /// A terminal NAK stops the peer instead of triggering a fresh login.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::PeerAcl)
    }
}

impl fmt::Display for NakReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GeneralFailure => write!(f, "general failure"),
            Self::ModeNotEnabled => write!(f, "mode not enabled"),
            Self::IllegalPacket => write!(f, "illegal packet"),
            Self::FneUnauthorized => write!(f, "unauthorized"),
            Self::BadConnState => write!(f, "bad connection state"),
            Self::InvalidConfigData => write!(f, "invalid configuration data"),
            Self::PeerReset => write!(f, "peer reset commanded"),
            Self::PeerAcl => write!(f, "peer ACL rejection"),
            Self::FneMaxConn => write!(f, "maximum connections reached"),
            Self::Invalid => write!(f, "invalid"),
        }
    }
}
