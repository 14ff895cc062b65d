//! Event-handler seam between the peer session and the host system.

use async_trait::async_trait;

use crate::p25::KmmModifyKey;
use crate::types::PeerId;

use super::frames::{DmrFrame, NxdnFrame, P25Frame};

/// Callbacks fired by the peer session. All methods default to no-ops so a
/// host implements only what it consumes.
#[async_trait]
pub trait PeerHandler: Send + Sync {
    /// The handshake completed and the peer entered the running state.
    async fn peer_connected(&self, peer_id: PeerId) {
        let _ = peer_id;
    }

    /// The master link dropped: closing message, terminal NAK, or liveness
    /// failure.
    async fn peer_disconnected(&self, peer_id: PeerId) {
        let _ = peer_id;
    }

    /// A DMR protocol frame arrived.
    async fn dmr_frame(&self, frame: DmrFrame) {
        let _ = frame;
    }

    /// A P25 protocol frame arrived.
    async fn p25_frame(&self, frame: P25Frame) {
        let _ = frame;
    }

    /// An NXDN protocol frame arrived.
    async fn nxdn_frame(&self, frame: NxdnFrame) {
        let _ = frame;
    }

    /// A key response arrived carrying a modify-key KMM.
    async fn key_response(&self, kmm: KmmModifyKey) {
        let _ = kmm;
    }
}

/// Handler that ignores every event.
pub struct NullHandler;

#[async_trait]
impl PeerHandler for NullHandler {}
