//! Core types used throughout fnelink.

use std::fmt;
use std::net::SocketAddr;

use serde::{Deserialize, Serialize};

/// Unique identifier for a peer, immutable for the life of a session.
///
/// Carried as the RTP SSRC and again in the FNE extension header of every
/// outbound frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(pub u32);

impl PeerId {
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for PeerId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

/// Identifier for a single call stream.
///
/// Regenerated on every new call the peer initiates and on every fresh login
/// handshake. A change in observed stream id on receive resets the
/// packet-sequence counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamId(pub u32);

impl StreamId {
    /// Stream id used on control and announcement messages.
    pub const ZERO: Self = Self(0);

    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Generate a fresh random stream id.
    pub fn generate() -> Self {
        Self(rand::random::<i32>() as u32)
    }

    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-stream packet sequence counter.
///
/// Incremented per outbound packet inside a stream; wraps to 0 at the
/// call-end sentinel 65535, which is reserved for call-end and control
/// packets. Reset to 0 whenever the transmit stream id changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PacketSequence(pub u16);

impl PacketSequence {
    pub const ZERO: Self = Self(0);

    /// Sentinel marking call-end and control packets.
    pub const END_OF_CALL: Self = Self(crate::RTP_END_OF_CALL_SEQ);

    pub fn new(n: u16) -> Self {
        Self(n)
    }

    /// Advance to the next sequence, wrapping before the sentinel.
    pub fn next(self) -> Self {
        if self.0 >= crate::RTP_END_OF_CALL_SEQ - 1 {
            Self(0)
        } else {
            Self(self.0 + 1)
        }
    }

    pub fn is_end_of_call(self) -> bool {
        self.0 == crate::RTP_END_OF_CALL_SEQ
    }
}

impl fmt::Display for PacketSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Peer-to-master connection state.
///
/// Transitions are one-way through the first three states under normal
/// operation; any NAK or socket failure returns to `WaitingLogin`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// Waiting to send / have acknowledged the login request.
    WaitingLogin,
    /// Login acknowledged, awaiting authorisation of the salted digest.
    WaitingAuthorisation,
    /// Authorised, awaiting acknowledgement of the configuration document.
    WaitingConfig,
    /// Fully connected and passing traffic.
    Running,
}

impl ConnectionState {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }

    pub fn is_connecting(self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WaitingLogin => write!(f, "waiting-login"),
            Self::WaitingAuthorisation => write!(f, "waiting-authorisation"),
            Self::WaitingConfig => write!(f, "waiting-config"),
            Self::Running => write!(f, "running"),
        }
    }
}

/// Geographic and descriptive site information advertised to the master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SiteInfo {
    pub latitude: f64,
    pub longitude: f64,
    pub height: i32,
    pub location: String,
}

impl Default for SiteInfo {
    fn default() -> Self {
        Self {
            latitude: 0.0,
            longitude: 0.0,
            height: 0,
            location: String::new(),
        }
    }
}

/// RF channel parameters advertised to the master.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelParams {
    pub tx_power: u32,
    pub tx_offset_mhz: f32,
    pub ch_bandwidth_khz: f32,
    pub channel_id: u8,
    pub channel_no: u32,
}

impl Default for ChannelParams {
    fn default() -> Self {
        Self {
            tx_power: 0,
            tx_offset_mhz: 0.0,
            ch_bandwidth_khz: 12.5,
            channel_id: 0,
            channel_no: 1,
        }
    }
}

/// REST API access parameters advertised to the master.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestApiParams {
    pub password: String,
    pub port: u16,
}

/// Configuration advertised to the master during the config phase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeerDetails {
    /// Identity string (callsign / site name).
    pub identity: String,
    /// Receive frequency, Hz.
    pub rx_frequency: u32,
    /// Transmit frequency, Hz.
    pub tx_frequency: u32,
    /// Peer is an external (third-party) peer.
    pub external_peer: bool,
    /// Peer is a conventional (non-trunked) site.
    pub conventional_peer: bool,
    /// Software identification tag.
    pub software: String,
    /// Site information.
    pub info: SiteInfo,
    /// Channel parameters.
    pub channel: ChannelParams,
    /// REST API parameters.
    pub rcon: RestApiParams,
}

impl Default for PeerDetails {
    fn default() -> Self {
        Self {
            identity: String::new(),
            rx_frequency: 0,
            tx_frequency: 0,
            external_peer: true,
            conventional_peer: false,
            software: format!("fnelink/{}", crate::VERSION),
            info: SiteInfo::default(),
            channel: ChannelParams::default(),
            rcon: RestApiParams::default(),
        }
    }
}

/// Runtime state of the peer-to-master connection.
#[derive(Debug, Clone)]
pub struct PeerInformation {
    /// Immutable peer identifier.
    pub peer_id: PeerId,
    /// Current transmit stream id.
    pub stream_id: StreamId,
    /// Last assigned packet sequence.
    pub pkt_seq: PacketSequence,
    /// Master endpoint, once resolved.
    pub master_addr: Option<SocketAddr>,
    /// Authentication salt received in the login ACK.
    pub salt: u32,
    /// Connection state.
    pub state: ConnectionState,
    /// Pings sent since the last state reset.
    pub pings_sent: u32,
    /// Pongs received since the last state reset.
    pub pings_acked: u32,
    /// Advertised configuration.
    pub details: PeerDetails,
}

impl PeerInformation {
    pub fn new(peer_id: PeerId, details: PeerDetails) -> Self {
        Self {
            peer_id,
            stream_id: StreamId::generate(),
            pkt_seq: PacketSequence::ZERO,
            master_addr: None,
            salt: 0,
            state: ConnectionState::WaitingLogin,
            pings_sent: 0,
            pings_acked: 0,
            details,
        }
    }

    /// Reset handshake-scoped state ahead of a fresh login cycle.
    pub fn reset_for_login(&mut self) {
        self.stream_id = StreamId::generate();
        self.pkt_seq = PacketSequence::ZERO;
        self.salt = 0;
        self.state = ConnectionState::WaitingLogin;
        self.pings_sent = 0;
        self.pings_acked = 0;
    }
}

/// Traffic statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TrafficStats {
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub packets_sent: u64,
    pub packets_received: u64,
    pub packets_dropped: u64,
}

impl TrafficStats {
    pub fn add(&mut self, other: &Self) {
        self.bytes_sent += other.bytes_sent;
        self.bytes_received += other.bytes_received;
        self.packets_sent += other.packets_sent;
        self.packets_received += other.packets_received;
        self.packets_dropped += other.packets_dropped;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_wraps_before_sentinel() {
        let seq = PacketSequence::new(crate::RTP_END_OF_CALL_SEQ - 2);
        let next = seq.next();
        assert_eq!(next, PacketSequence::ZERO);
        assert!(!next.is_end_of_call());
        assert!(PacketSequence::END_OF_CALL.is_end_of_call());
    }

    #[test]
    fn test_state_transitions() {
        assert!(ConnectionState::Running.is_running());
        assert!(ConnectionState::WaitingLogin.is_connecting());
        assert!(ConnectionState::WaitingConfig.is_connecting());
    }

    #[test]
    fn test_reset_for_login() {
        let mut info = PeerInformation::new(PeerId::new(9000), PeerDetails::default());
        info.state = ConnectionState::Running;
        info.pings_sent = 7;
        info.salt = 0xDEADBEEF;
        let old_stream = info.stream_id;

        info.reset_for_login();
        assert_eq!(info.state, ConnectionState::WaitingLogin);
        assert_eq!(info.pings_sent, 0);
        assert_eq!(info.salt, 0);
        // A fresh login regenerates the stream id; collision is vanishingly
        // unlikely but not impossible, so only check the counters strictly.
        let _ = old_stream;
    }
}
