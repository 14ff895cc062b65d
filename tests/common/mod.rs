//! Shared loopback fake-master harness.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use fnelink::framing::{FrameEnvelope, NetFunc, NetSubFunc};
use fnelink::peer::PeerHandler;
use fnelink::types::{PacketSequence, PeerId, StreamId};

/// How long a single harness receive waits before giving up.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(5);

/// A scripted master on a loopback socket.
pub struct FakeMaster {
    socket: UdpSocket,
}

impl FakeMaster {
    pub async fn bind() -> Self {
        let socket = UdpSocket::bind("127.0.0.1:0").await.expect("bind master");
        Self { socket }
    }

    pub fn addr(&self) -> SocketAddr {
        self.socket.local_addr().expect("master addr")
    }

    /// Receive and decode one frame from the peer.
    pub async fn recv_frame(&self) -> (FrameEnvelope, SocketAddr) {
        let mut buf = vec![0u8; 2048];
        let (len, from) = timeout(RECV_TIMEOUT, self.socket.recv_from(&mut buf))
            .await
            .expect("master receive timed out")
            .expect("master receive failed");

        let frame = FrameEnvelope::decode(&buf[..len]).expect("peer sent undecodable frame");
        (frame, from)
    }

    /// Receive frames until one carries the wanted function.
    pub async fn expect_func(&self, func: NetFunc) -> (FrameEnvelope, SocketAddr) {
        loop {
            let (frame, from) = self.recv_frame().await;
            if frame.fne.func == func as u8 {
                return (frame, from);
            }
        }
    }

    /// Whether any datagram arrives within `window`.
    pub async fn quiet_for(&self, window: Duration) -> bool {
        let mut buf = vec![0u8; 2048];
        timeout(window, self.socket.recv_from(&mut buf)).await.is_err()
    }

    pub async fn send_frame(&self, to: SocketAddr, func: NetFunc, sub_func: u8, payload: Vec<u8>) {
        let frame = FrameEnvelope::new(
            PeerId::new(0xFFFF_FFFF),
            StreamId::ZERO,
            PacketSequence::END_OF_CALL,
            0,
            func as u8,
            sub_func,
            payload,
        );
        self.socket
            .send_to(&frame.encode(), to)
            .await
            .expect("master send failed");
    }

    /// Send a master ACK carrying a salt or peer id after the legacy tag.
    pub async fn send_ack(&self, to: SocketAddr, value: u32) {
        let mut payload = b"RPTACK".to_vec();
        payload.extend_from_slice(&value.to_be_bytes());
        self.send_frame(to, NetFunc::Ack, NetSubFunc::NOP, payload).await;
    }

    /// Send a master NAK with a reason code.
    pub async fn send_nak(&self, to: SocketAddr, peer_id: u32, reason: u16) {
        let mut payload = b"MSTNAK".to_vec();
        payload.extend_from_slice(&peer_id.to_be_bytes());
        payload.extend_from_slice(&reason.to_be_bytes());
        self.send_frame(to, NetFunc::Nak, NetSubFunc::NOP, payload).await;
    }

    /// Send a pong.
    pub async fn send_pong(&self, to: SocketAddr) {
        self.send_frame(to, NetFunc::Pong, NetSubFunc::NOP, b"MSTPONG".to_vec())
            .await;
    }

    /// Drive the full handshake for the given peer, returning the peer's
    /// source address. `salt` seeds the login challenge.
    pub async fn complete_handshake(&self, peer_id: u32, salt: u32) -> SocketAddr {
        let (_login, from) = self.expect_func(NetFunc::RptL).await;
        self.send_ack(from, salt).await;

        let (_auth, from) = self.expect_func(NetFunc::RptK).await;
        self.send_ack(from, peer_id).await;

        let (_config, from) = self.expect_func(NetFunc::RptC).await;
        self.send_ack(from, peer_id).await;

        from
    }
}

/// Handler recording connection events.
#[derive(Default)]
pub struct RecordingHandler {
    pub connected: AtomicBool,
    pub disconnected: AtomicBool,
    pub dmr_frames: AtomicU32,
    pub p25_frames: AtomicU32,
    pub key_responses: AtomicU32,
}

#[async_trait]
impl PeerHandler for RecordingHandler {
    async fn peer_connected(&self, _peer_id: PeerId) {
        self.connected.store(true, Ordering::SeqCst);
    }

    async fn peer_disconnected(&self, _peer_id: PeerId) {
        self.disconnected.store(true, Ordering::SeqCst);
    }

    async fn dmr_frame(&self, _frame: fnelink::peer::DmrFrame) {
        self.dmr_frames.fetch_add(1, Ordering::SeqCst);
    }

    async fn p25_frame(&self, _frame: fnelink::peer::P25Frame) {
        self.p25_frames.fetch_add(1, Ordering::SeqCst);
    }

    async fn key_response(&self, _kmm: fnelink::p25::KmmModifyKey) {
        self.key_responses.fetch_add(1, Ordering::SeqCst);
    }
}

/// Build a RecordingHandler wrapped for the peer API.
pub fn recording_handler() -> Arc<RecordingHandler> {
    Arc::new(RecordingHandler::default())
}
