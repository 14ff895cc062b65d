//! Error types for fnelink.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

use crate::framing::NakReason;
use crate::types::ConnectionState;

/// Result type alias for fnelink operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for fnelink.
#[derive(Error, Debug)]
pub enum Error {
    // Framing errors
    #[error("framing error: {0}")]
    Framing(#[from] FramingError),

    // Cryptographic errors
    #[error("cryptographic error: {0}")]
    Crypto(#[from] CryptoError),

    // FEC / codec errors
    #[error("coding error: {0}")]
    Coding(#[from] CodingError),

    // Protocol errors
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    // Transport errors
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("master link dead: {sent} pings sent, {acked} acked")]
    LinkDead { sent: u32, acked: u32 },

    // Configuration errors
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    // General errors
    #[error("internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Frame envelope decode failures.
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("invalid RTP version: expected 2, got {0}")]
    InvalidRtpVersion(u8),

    #[error("RTP extension bit clear")]
    MissingExtension,

    #[error("invalid RTP payload type: {0}")]
    InvalidPayloadType(u8),

    #[error("invalid extension length: expected 4, got {0}")]
    InvalidExtensionLength(u16),

    #[error("invalid extension payload type: {0:#04x}")]
    InvalidExtensionPayloadType(u16),

    #[error("payload CRC mismatch: header {header:#06x}, computed {computed:#06x}")]
    CrcMismatch { header: u16, computed: u16 },

    #[error("datagram too short: {size} bytes")]
    Truncated { size: usize },
}

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("encrypted datagram received but no preshared key is configured")]
    NoPresharedKey,

    #[error("invalid key length: expected {expected} bytes, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("unsupported encryption algorithm: {0:#04x}")]
    UnsupportedAlgorithm(u8),

    #[error("message indicator must be 9 bytes, got {0}")]
    InvalidMessageIndicator(usize),
}

/// Forward-error-correction failures.
#[derive(Error, Debug)]
pub enum CodingError {
    #[error("trellis decode unrecoverable at dibit {position}")]
    TrellisUnrecoverable { position: usize },

    #[error("Reed-Solomon decode failed: {errors} errors exceed correction bound {bound}")]
    RsUncorrectable { errors: usize, bound: usize },

    #[error("Golay decode unrecoverable")]
    GolayUncorrectable,

    #[error("block CRC check failed")]
    BlockCrc,

    #[error("buffer too short for codeword: {size} bytes")]
    ShortBuffer { size: usize },
}

/// Peer protocol and state-machine errors.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("ACK received in unexpected state {0}")]
    UnexpectedAck(ConnectionState),

    #[error("master ACK carries peer id {got}, ours is {ours}")]
    PeerIdMismatch { got: u32, ours: u32 },

    #[error("master NAK: {0}")]
    Nak(NakReason),

    #[error("datagram from unexpected endpoint {0}")]
    UnknownSender(SocketAddr),

    #[error("unknown opcode: func {func:#04x} subfunc {sub_func:#04x}")]
    UnknownOpcode { func: u8, sub_func: u8 },

    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("too many blocks to follow: {0}")]
    TooManyBlocks(u8),

    #[error("data unit dropped: {0}")]
    DataUnitDropped(String),
}

/// Transport layer errors.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("bind failed on {addr}: {reason}")]
    BindFailed { addr: SocketAddr, reason: String },

    #[error("connect failed to {addr}: {reason}")]
    ConnectFailed { addr: SocketAddr, reason: String },

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("receive failed: {0}")]
    ReceiveFailed(String),

    #[error("socket error: {0}")]
    SocketError(String),

    #[error("not connected")]
    NotConnected,
}

impl Error {
    /// Check if error is recoverable (frame dropped, session continues).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::Framing(_)
                | Error::Coding(_)
                | Error::Protocol(
                    ProtocolError::UnknownSender(_)
                        | ProtocolError::UnknownOpcode { .. }
                        | ProtocolError::MalformedMessage(_)
                        | ProtocolError::TooManyBlocks(_)
                        | ProtocolError::DataUnitDropped(_)
                )
        )
    }

    /// Check if error forces the peer back to the login state.
    pub fn should_relogin(&self) -> bool {
        match self {
            Error::LinkDead { .. } => true,
            Error::Transport(_) | Error::Io(_) => true,
            Error::Protocol(ProtocolError::UnexpectedAck(_)) => true,
            Error::Protocol(ProtocolError::PeerIdMismatch { .. }) => true,
            Error::Protocol(ProtocolError::Nak(reason)) => !reason.is_terminal(),
            _ => false,
        }
    }

    /// Check if error terminates the peer outright.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Error::Protocol(ProtocolError::Nak(reason)) if reason.is_terminal())
    }
}
