//! The peer-to-master session core.
//!
//! Two cooperatively-cancelled tasks share one transport: a listen task
//! that decodes and dispatches inbound datagrams, and a maintenance task
//! that drives login retries and ping liveness on a fixed interval. State
//! transitions happen on the listen task; ping counters advance on the
//! maintenance task; both go through the shared [`PeerInformation`].
//!
//! The handshake walks login → authorisation (salted SHA-256 digest) →
//! configuration (JSON document) → running. Any NAK, state violation,
//! socket failure or liveness timeout forces the session back to the login
//! state; a peer-ACL NAK is terminal and stops the peer.

mod frames;
mod handler;

pub use frames::{
    DmrFrame, NxdnFrame, P25Frame, DMR_DATA_OFFSET, DMR_FRAME_LENGTH, DMR_PAYLOAD_LENGTH,
    P25_DATA_OFFSET, TAG_DMR_DATA, TAG_NXDN_DATA, TAG_P25_DATA,
};
pub use handler::{NullHandler, PeerHandler};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sha2::{Digest, Sha256};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

use crate::config::PeerConfig;
use crate::crypto::{is_wrapped, DatagramCipher};
use crate::error::{CryptoError, Error, ProtocolError, Result};
use crate::framing::{FrameEnvelope, NakReason, NetFunc, NetSubFunc, RtpClock};
use crate::p25::{KmmFrame, KmmModifyKey, KMM_MODIFY_KEY_CMD};
use crate::transport::{Transport, UdpTransport};
use crate::types::{
    ConnectionState, PacketSequence, PeerId, PeerInformation, StreamId, TrafficStats,
};
use crate::util::bits::{get_u16, get_u32, set_u24, string_to_bytes};
use crate::{MAX_DATAGRAM, MAX_MISSED_PEER_PINGS};

/// Legacy ASCII tags carried in handshake payloads.
const TAG_REPEATER_LOGIN: &[u8; 4] = b"RPTL";
const TAG_REPEATER_AUTH: &[u8; 4] = b"RPTK";
const TAG_REPEATER_CONFIG: &[u8; 4] = b"RPTC";
const TAG_REPEATER_PING: &[u8; 7] = b"RPTPING";

/// Offset of the salt / peer id within an ACK payload (after the legacy
/// six-character tag).
const ACK_VALUE_OFFSET: usize = 6;

/// Offset of the reason code within a NAK payload.
const NAK_REASON_OFFSET: usize = 10;

/// Inbound stream tracking: a stream-id change resets the expected packet
/// sequence.
#[derive(Debug, Default)]
struct RxTracking {
    stream_id: u32,
    last_seq: u16,
}

/// An FNE peer session.
pub struct FnePeer {
    config: PeerConfig,
    transport: Arc<dyn Transport>,
    handler: Arc<dyn PeerHandler>,
    cipher: Option<DatagramCipher>,
    info: Mutex<PeerInformation>,
    clock: Mutex<RtpClock>,
    rx: Mutex<RxTracking>,
    stats: Mutex<TrafficStats>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl FnePeer {
    /// Create a peer bound to an ephemeral UDP socket.
    pub async fn new(config: PeerConfig, handler: Arc<dyn PeerHandler>) -> Result<Arc<Self>> {
        let transport: Arc<dyn Transport> = Arc::new(UdpTransport::bind_ephemeral().await?);
        Self::with_transport(config, handler, transport)
    }

    /// Create a peer over an existing transport.
    pub fn with_transport(
        config: PeerConfig,
        handler: Arc<dyn PeerHandler>,
        transport: Arc<dyn Transport>,
    ) -> Result<Arc<Self>> {
        config.validate()?;

        let cipher = config.preshared_key_bytes().map(|key| DatagramCipher::new(&key));
        let mut info = PeerInformation::new(PeerId::new(config.peer_id), config.details.clone());
        info.master_addr = Some(config.master_addr);

        let (shutdown_tx, _) = watch::channel(false);

        Ok(Arc::new(Self {
            config,
            transport,
            handler,
            cipher,
            info: Mutex::new(info),
            clock: Mutex::new(RtpClock::new()),
            rx: Mutex::new(RxTracking::default()),
            stats: Mutex::new(TrafficStats::default()),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }))
    }

    /// Our peer id.
    pub fn peer_id(&self) -> PeerId {
        PeerId::new(self.config.peer_id)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.info.lock().state
    }

    /// Snapshot of the traffic statistics.
    pub fn stats(&self) -> TrafficStats {
        *self.stats.lock()
    }

    /// Snapshot of the connection information.
    pub fn info(&self) -> PeerInformation {
        self.info.lock().clone()
    }

    /// Start the listen and maintenance tasks.
    pub fn start(self: &Arc<Self>) {
        let mut tasks = self.tasks.lock();
        if !tasks.is_empty() {
            warn!("peer already started");
            return;
        }

        info!(
            peer_id = self.config.peer_id,
            master = %self.config.master_addr,
            "starting FNE peer"
        );

        let listener = Arc::clone(self);
        let shutdown = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            listener.listen_loop(shutdown).await;
        }));

        let maintainer = Arc::clone(self);
        let shutdown = self.shutdown_tx.subscribe();
        tasks.push(tokio::spawn(async move {
            maintainer.maintenance_loop(shutdown).await;
        }));
    }

    /// Stop the peer: send the closing notice, cancel both tasks and wait
    /// for them to unwind.
    pub async fn stop(&self) {
        info!(peer_id = self.config.peer_id, "stopping FNE peer");

        let stream_id = self.info.lock().stream_id;
        let _ = self
            .send_master(
                NetFunc::RptClosing as u8,
                NetSubFunc::NOP,
                PacketSequence::END_OF_CALL,
                stream_id,
                vec![0x00],
            )
            .await;

        let _ = self.shutdown_tx.send(true);

        let handles: Vec<_> = self.tasks.lock().drain(..).collect();
        for handle in handles {
            // A cancelled task surfaces a join error; swallow it.
            let _ = handle.await;
        }
    }

    // ------------------------------------------------------------------
    // Maintenance task
    // ------------------------------------------------------------------

    async fn maintenance_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.config.ping_time);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.maintenance_tick().await;
                }
                _ = shutdown.changed() => {
                    debug!("maintenance task shutting down");
                    break;
                }
            }
        }
    }

    async fn maintenance_tick(&self) {
        let state = self.info.lock().state;

        match state {
            ConnectionState::WaitingLogin => {
                if let Err(e) = self.send_login().await {
                    warn!(error = %e, "login send failed");
                    if e.should_relogin() {
                        self.reconnect_transport().await;
                    }
                }
            }
            ConnectionState::Running => {
                let (sent, acked) = {
                    let info = self.info.lock();
                    (info.pings_sent, info.pings_acked)
                };

                if sent > acked + MAX_MISSED_PEER_PINGS {
                    error!(
                        sent,
                        acked, "master is not responding to pings, dropping link"
                    );
                    self.force_relogin(true).await;
                    return;
                }

                match self.send_ping().await {
                    Ok(()) => {
                        let mut info = self.info.lock();
                        info.pings_sent += 1;
                        trace!(sent = info.pings_sent, acked = info.pings_acked, "ping");
                    }
                    Err(e) => {
                        warn!(error = %e, "ping send failed");
                        if e.should_relogin() {
                            self.force_relogin(true).await;
                        }
                    }
                }
            }
            // Mid-handshake: the master drives progress with ACKs or NAKs.
            ConnectionState::WaitingAuthorisation | ConnectionState::WaitingConfig => {}
        }
    }

    async fn send_login(&self) -> Result<()> {
        let stream_id = {
            let mut info = self.info.lock();
            info.stream_id = StreamId::generate();
            info.pkt_seq = PacketSequence::ZERO;
            info.pings_sent = 0;
            info.pings_acked = 0;
            info.stream_id
        };

        let mut payload = Vec::with_capacity(8);
        payload.extend_from_slice(TAG_REPEATER_LOGIN);
        payload.extend_from_slice(&self.config.peer_id.to_be_bytes());

        debug!(stream_id = %stream_id, "sending login request");
        self.send_master(
            NetFunc::RptL as u8,
            NetSubFunc::NOP,
            PacketSequence::END_OF_CALL,
            stream_id,
            payload,
        )
        .await
    }

    async fn send_ping(&self) -> Result<()> {
        let stream_id = self.info.lock().stream_id;

        let mut payload = Vec::with_capacity(11);
        payload.extend_from_slice(TAG_REPEATER_PING);
        payload.extend_from_slice(&self.config.peer_id.to_be_bytes());

        self.send_master(
            NetFunc::Ping as u8,
            NetSubFunc::NOP,
            PacketSequence::END_OF_CALL,
            stream_id,
            payload,
        )
        .await
    }

    // ------------------------------------------------------------------
    // Listen task
    // ------------------------------------------------------------------

    async fn listen_loop(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut buf = vec![0u8; MAX_DATAGRAM];

        // The receive is re-armed on a timer so a transport reconnect (which
        // swaps the underlying socket) takes effect without a datagram
        // arriving on the stale one.
        let rearm = self.config.ping_time.max(Duration::from_millis(250));

        loop {
            tokio::select! {
                result = tokio::time::timeout(rearm, self.transport.recv_from(&mut buf)) => {
                    match result {
                        Ok(Ok((len, addr))) => {
                            let datagram = buf[..len].to_vec();
                            if let Err(e) = self.handle_datagram(&datagram, addr).await {
                                if matches!(e, Error::Crypto(CryptoError::NoPresharedKey)) {
                                    error!(error = %e, "misconfigured peer, stopping listener");
                                    self.initiate_stop().await;
                                    break;
                                }
                                if e.is_recoverable() {
                                    debug!(error = %e, "dropping datagram");
                                } else if e.should_relogin() {
                                    warn!(error = %e, "forcing fresh login");
                                    self.force_relogin(false).await;
                                } else if e.is_terminal() {
                                    break;
                                }
                            }
                        }
                        Ok(Err(e)) => {
                            error!(error = %e, "socket receive failed");
                            self.force_relogin(true).await;
                        }
                        Err(_) => {}
                    }
                }
                _ = shutdown.changed() => {
                    debug!("listen task shutting down");
                    break;
                }
            }
        }
    }

    async fn handle_datagram(&self, datagram: &[u8], from: SocketAddr) -> Result<()> {
        let plain;
        let data: &[u8] = if is_wrapped(datagram) {
            match &self.cipher {
                Some(cipher) => {
                    plain = cipher.unwrap(datagram).unwrap_or_default();
                    &plain
                }
                None => return Err(CryptoError::NoPresharedKey.into()),
            }
        } else if self.cipher.is_some() {
            // With a preshared key configured, unwrapped datagrams are
            // discarded as a zero-length payload.
            trace!("discarding unwrapped datagram");
            return Ok(());
        } else {
            datagram
        };

        let envelope = FrameEnvelope::decode(data).map_err(Error::Framing)?;

        if from != self.config.master_addr {
            return Err(ProtocolError::UnknownSender(from).into());
        }

        {
            let mut stats = self.stats.lock();
            stats.packets_received += 1;
            stats.bytes_received += datagram.len() as u64;
        }

        // A stream-id change resets the expected packet sequence; the RTP
        // sequence itself is informational only.
        {
            let mut rx = self.rx.lock();
            if rx.stream_id != envelope.fne.stream_id {
                trace!(
                    stream_id = envelope.fne.stream_id,
                    "new inbound stream, resetting sequence"
                );
                rx.stream_id = envelope.fne.stream_id;
                rx.last_seq = 0;
            } else if envelope.rtp.sequence != rx.last_seq.wrapping_add(1)
                && envelope.rtp.sequence != crate::RTP_END_OF_CALL_SEQ
            {
                trace!(
                    expected = rx.last_seq.wrapping_add(1),
                    got = envelope.rtp.sequence,
                    "out-of-order packet sequence"
                );
            }
            rx.last_seq = envelope.rtp.sequence;
        }

        self.dispatch(envelope).await
    }

    async fn dispatch(&self, envelope: FrameEnvelope) -> Result<()> {
        let Some(func) = NetFunc::from_u8(envelope.fne.func) else {
            warn!(
                func = format_args!("{:#04x}", envelope.fne.func),
                sub_func = format_args!("{:#04x}", envelope.fne.sub_func),
                "unknown function, dropping frame"
            );
            return Ok(());
        };

        match func {
            NetFunc::Protocol => self.handle_protocol(envelope).await,
            NetFunc::Ack => self.handle_ack(&envelope).await,
            NetFunc::Nak => self.handle_nak(&envelope).await,
            NetFunc::MstClosing => {
                info!("master is closing");
                self.notify_disconnect().await;
                self.force_relogin(false).await;
                Ok(())
            }
            NetFunc::Pong => {
                self.info.lock().pings_acked += 1;
                Ok(())
            }
            NetFunc::KeyRsp => self.handle_key_response(&envelope).await,
            // Reserved for master-to-master use; a peer ignores it.
            NetFunc::Master => {
                trace!(sub_func = envelope.fne.sub_func, "master control, ignored");
                Ok(())
            }
            other => {
                warn!(func = ?other, "unhandled function, dropping frame");
                Ok(())
            }
        }
    }

    async fn handle_protocol(&self, envelope: FrameEnvelope) -> Result<()> {
        let stream_id = envelope.stream_id();

        match envelope.fne.sub_func {
            NetSubFunc::PROTOCOL_DMR => {
                let frame = DmrFrame::decode(&envelope.payload, stream_id)
                    .map_err(Error::Protocol)?;
                trace!(
                    src = frame.src_id,
                    dst = frame.dst_id,
                    slot = frame.slot,
                    "DMR frame"
                );
                self.handler.dmr_frame(frame).await;
                Ok(())
            }
            NetSubFunc::PROTOCOL_P25 => {
                let frame = P25Frame::decode(&envelope.payload, stream_id)
                    .map_err(Error::Protocol)?;
                trace!(src = frame.src_id, dst = frame.dst_id, duid = ?frame.duid, "P25 frame");
                self.handler.p25_frame(frame).await;
                Ok(())
            }
            NetSubFunc::PROTOCOL_NXDN => {
                let frame = NxdnFrame::decode(&envelope.payload, stream_id)
                    .map_err(Error::Protocol)?;
                trace!(src = frame.src_id, dst = frame.dst_id, "NXDN frame");
                self.handler.nxdn_frame(frame).await;
                Ok(())
            }
            NetSubFunc::PROTOCOL_ANALOG => {
                trace!("analog frame, unsupported");
                Ok(())
            }
            other => Err(ProtocolError::UnknownOpcode {
                func: NetFunc::Protocol as u8,
                sub_func: other,
            }
            .into()),
        }
    }

    async fn handle_ack(&self, envelope: &FrameEnvelope) -> Result<()> {
        let payload = &envelope.payload;
        if payload.len() < ACK_VALUE_OFFSET + 4 {
            return Err(ProtocolError::MalformedMessage("short ACK".into()).into());
        }

        let state = self.info.lock().state;
        match state {
            ConnectionState::WaitingLogin => {
                let salt = get_u32(payload, ACK_VALUE_OFFSET);
                debug!(salt = format_args!("{salt:#010x}"), "login challenge received");

                let mut hasher = Sha256::new();
                hasher.update(salt.to_be_bytes());
                hasher.update(string_to_bytes(&self.config.passphrase));
                let digest = hasher.finalize();

                let mut rptk = Vec::with_capacity(40);
                rptk.extend_from_slice(TAG_REPEATER_AUTH);
                rptk.extend_from_slice(&self.config.peer_id.to_be_bytes());
                rptk.extend_from_slice(&digest);

                let stream_id = {
                    let mut info = self.info.lock();
                    info.salt = salt;
                    info.state = ConnectionState::WaitingAuthorisation;
                    info.stream_id
                };

                self.send_master(
                    NetFunc::RptK as u8,
                    NetSubFunc::NOP,
                    PacketSequence::END_OF_CALL,
                    stream_id,
                    rptk,
                )
                .await
            }

            ConnectionState::WaitingAuthorisation => {
                self.check_ack_peer_id(payload)?;

                let (config_doc, stream_id) = {
                    let mut info = self.info.lock();
                    info.state = ConnectionState::WaitingConfig;
                    (config_document(&info), info.stream_id)
                };

                let mut rptc = Vec::with_capacity(8 + config_doc.len());
                rptc.extend_from_slice(TAG_REPEATER_CONFIG);
                rptc.extend_from_slice(&self.config.peer_id.to_be_bytes());
                rptc.extend_from_slice(config_doc.as_bytes());

                debug!("authorised, sending configuration");
                self.send_master(
                    NetFunc::RptC as u8,
                    NetSubFunc::NOP,
                    PacketSequence::END_OF_CALL,
                    stream_id,
                    rptc,
                )
                .await
            }

            ConnectionState::WaitingConfig => {
                self.check_ack_peer_id(payload)?;

                {
                    let mut info = self.info.lock();
                    info.state = ConnectionState::Running;
                    info.pings_sent = 0;
                    info.pings_acked = 0;
                }

                info!(peer_id = self.config.peer_id, "connected to master");
                self.handler.peer_connected(self.peer_id()).await;
                Ok(())
            }

            ConnectionState::Running => {
                Err(ProtocolError::UnexpectedAck(ConnectionState::Running).into())
            }
        }
    }

    fn check_ack_peer_id(&self, payload: &[u8]) -> Result<()> {
        let got = get_u32(payload, ACK_VALUE_OFFSET);
        if got != self.config.peer_id {
            return Err(ProtocolError::PeerIdMismatch {
                got,
                ours: self.config.peer_id,
            }
            .into());
        }
        Ok(())
    }

    async fn handle_nak(&self, envelope: &FrameEnvelope) -> Result<()> {
        let payload = &envelope.payload;
        let reason = if payload.len() > NAK_REASON_OFFSET {
            NakReason::from_u16(get_u16(payload, NAK_REASON_OFFSET))
        } else {
            NakReason::GeneralFailure
        };

        warn!(%reason, state = %self.state(), "master NAK");

        if reason.is_terminal() {
            error!("ACL rejection is terminal, stopping peer");
            self.initiate_stop().await;
            return Err(ProtocolError::Nak(reason).into());
        }

        self.force_relogin(false).await;
        Ok(())
    }

    async fn handle_key_response(&self, envelope: &FrameEnvelope) -> Result<()> {
        let frame = KmmFrame::decode(&envelope.payload).map_err(Error::Protocol)?;

        if frame.message_id != KMM_MODIFY_KEY_CMD {
            debug!(
                message_id = format_args!("{:#04x}", frame.message_id),
                "ignoring non-modify-key KMM"
            );
            return Ok(());
        }

        let kmm = KmmModifyKey::decode(&envelope.payload).map_err(Error::Protocol)?;
        debug!(
            algorithm = format_args!("{:#04x}", kmm.algorithm_id),
            key_id = kmm.key_id,
            keys = kmm.keyset.keys.len(),
            "key response"
        );

        self.handler.key_response(kmm).await;
        Ok(())
    }

    // ------------------------------------------------------------------
    // State recovery
    // ------------------------------------------------------------------

    async fn force_relogin(&self, reconnect_transport: bool) {
        let was_running = {
            let mut info = self.info.lock();
            let was_running = info.state == ConnectionState::Running;
            info.reset_for_login();
            was_running
        };

        if was_running {
            self.notify_disconnect().await;
        }

        if reconnect_transport {
            self.reconnect_transport().await;
        }
    }

    async fn reconnect_transport(&self) {
        if let Err(e) = self.transport.reconnect().await {
            error!(error = %e, "transport reconnect failed");
        }
    }

    async fn notify_disconnect(&self) {
        self.handler.peer_disconnected(self.peer_id()).await;
    }

    /// Terminal shutdown from within a task: notify and cancel without
    /// joining (a task cannot join itself).
    async fn initiate_stop(&self) {
        self.notify_disconnect().await;
        let _ = self.shutdown_tx.send(true);
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    async fn send_master(
        &self,
        func: u8,
        sub_func: u8,
        seq: PacketSequence,
        stream_id: StreamId,
        payload: Vec<u8>,
    ) -> Result<()> {
        let timestamp = self.clock.lock().next();
        let frame = FrameEnvelope::new(
            self.peer_id(),
            stream_id,
            seq,
            timestamp,
            func,
            sub_func,
            payload,
        );

        let mut wire = frame.encode();
        if let Some(cipher) = &self.cipher {
            wire = cipher.wrap(&wire);
        }

        self.transport.send_to(&wire, self.config.master_addr).await?;

        let mut stats = self.stats.lock();
        stats.packets_sent += 1;
        stats.bytes_sent += wire.len() as u64;
        Ok(())
    }

    /// Send an encapsulated protocol frame, assigning the per-stream packet
    /// sequence. `end_of_call` sends the sentinel sequence and rolls the
    /// stream id for the next call.
    pub async fn send_protocol(
        &self,
        sub_func: u8,
        payload: Vec<u8>,
        end_of_call: bool,
    ) -> Result<()> {
        let (seq, stream_id) = {
            let mut info = self.info.lock();
            if end_of_call {
                let stream_id = info.stream_id;
                info.stream_id = StreamId::generate();
                info.pkt_seq = PacketSequence::ZERO;
                (PacketSequence::END_OF_CALL, stream_id)
            } else {
                let seq = info.pkt_seq;
                info.pkt_seq = seq.next();
                (seq, info.stream_id)
            }
        };

        self.send_master(NetFunc::Protocol as u8, sub_func, seq, stream_id, payload)
            .await
    }

    /// Current transmit stream id.
    pub fn tx_stream_id(&self) -> StreamId {
        self.info.lock().stream_id
    }

    // ------------------------------------------------------------------
    // Announcements
    // ------------------------------------------------------------------

    async fn send_announcement(&self, sub_func: u8, payload: Vec<u8>) -> Result<()> {
        self.send_master(
            NetFunc::Announce as u8,
            sub_func,
            PacketSequence::ZERO,
            StreamId::ZERO,
            payload,
        )
        .await
    }

    /// Announce a group affiliation.
    pub async fn announce_group_affiliation(&self, src_id: u32, dst_id: u32) -> Result<()> {
        let mut payload = vec![0u8; 6];
        set_u24(&mut payload, 0, src_id);
        set_u24(&mut payload, 3, dst_id);
        self.send_announcement(NetSubFunc::ANNOUNCE_GRP_AFFIL, payload).await
    }

    /// Announce removal of a group affiliation.
    pub async fn announce_group_affiliation_removal(
        &self,
        src_id: u32,
        dst_id: u32,
    ) -> Result<()> {
        let mut payload = vec![0u8; 6];
        set_u24(&mut payload, 0, src_id);
        set_u24(&mut payload, 3, dst_id);
        self.send_announcement(NetSubFunc::ANNOUNCE_GRP_UNAFFIL, payload).await
    }

    /// Announce a unit registration.
    pub async fn announce_unit_registration(&self, src_id: u32) -> Result<()> {
        let mut payload = vec![0u8; 3];
        set_u24(&mut payload, 0, src_id);
        self.send_announcement(NetSubFunc::ANNOUNCE_UNIT_REG, payload).await
    }

    /// Announce a unit de-registration.
    pub async fn announce_unit_deregistration(&self, src_id: u32) -> Result<()> {
        let mut payload = vec![0u8; 3];
        set_u24(&mut payload, 0, src_id);
        self.send_announcement(NetSubFunc::ANNOUNCE_UNIT_DEREG, payload).await
    }

    /// Send the complete affiliation table.
    pub async fn announce_affiliations(&self, affiliations: &[(u32, u32)]) -> Result<()> {
        let mut payload = vec![0u8; 4 + affiliations.len() * 6];
        payload[..4].copy_from_slice(&(affiliations.len() as u32).to_be_bytes());

        for (i, (src_id, dst_id)) in affiliations.iter().enumerate() {
            set_u24(&mut payload, 4 + i * 6, *src_id);
            set_u24(&mut payload, 7 + i * 6, *dst_id);
        }

        self.send_announcement(NetSubFunc::ANNOUNCE_AFFILS, payload).await
    }

    /// Request key material for an algorithm/key-id pair.
    pub async fn send_key_request(&self, algorithm_id: u8, key_id: u16) -> Result<()> {
        let kmm = KmmModifyKey::request(algorithm_id, key_id);
        self.send_master(
            NetFunc::KeyReq as u8,
            NetSubFunc::NOP,
            PacketSequence::ZERO,
            StreamId::ZERO,
            kmm.encode(),
        )
        .await
    }

    /// Request a traffic channel grant ahead of a call.
    pub async fn send_grant_request(
        &self,
        src_id: u32,
        dst_id: u32,
        slot: u8,
        unit_to_unit: bool,
    ) -> Result<()> {
        let mut payload = vec![0u8; 7];
        payload[0] = (u8::from(slot == 2) << 7) | u8::from(unit_to_unit);
        set_u24(&mut payload, 1, src_id);
        set_u24(&mut payload, 4, dst_id);

        let stream_id = self.info.lock().stream_id;
        self.send_master(
            NetFunc::GrantReq as u8,
            NetSubFunc::NOP,
            PacketSequence::END_OF_CALL,
            stream_id,
            payload,
        )
        .await
    }

    /// Send an in-call control command for an active call.
    pub async fn send_in_call_control(&self, command: u8, dst_id: u32, slot: u8) -> Result<()> {
        let mut payload = vec![0u8; 5];
        payload[0] = command;
        set_u24(&mut payload, 1, dst_id);
        payload[4] = slot;

        let stream_id = self.info.lock().stream_id;
        self.send_master(
            NetFunc::InCallCtrl as u8,
            NetSubFunc::NOP,
            PacketSequence::END_OF_CALL,
            stream_id,
            payload,
        )
        .await
    }

    /// Transfer an activity-log line to the master.
    pub async fn send_activity_log(&self, message: &str) -> Result<()> {
        let mut payload = self.config.peer_id.to_be_bytes().to_vec();
        payload.extend_from_slice(&string_to_bytes(message));
        self.send_master(
            NetFunc::Transfer as u8,
            NetSubFunc::TRANSFER_ACTIVITY,
            PacketSequence::ZERO,
            StreamId::ZERO,
            payload,
        )
        .await
    }

    /// Transfer a diagnostics-log line to the master.
    pub async fn send_diag_log(&self, message: &str) -> Result<()> {
        let mut payload = self.config.peer_id.to_be_bytes().to_vec();
        payload.extend_from_slice(&string_to_bytes(message));
        self.send_master(
            NetFunc::Transfer as u8,
            NetSubFunc::TRANSFER_DIAG,
            PacketSequence::ZERO,
            StreamId::ZERO,
            payload,
        )
        .await
    }
}

/// Render the configuration document advertised in the RPTC message.
fn config_document(info: &PeerInformation) -> String {
    let details = &info.details;
    serde_json::json!({
        "identity": details.identity,
        "rxFrequency": details.rx_frequency,
        "txFrequency": details.tx_frequency,
        "externalPeer": details.external_peer,
        "conventionalPeer": details.conventional_peer,
        "info": {
            "latitude": details.info.latitude,
            "longitude": details.info.longitude,
            "height": details.info.height,
            "location": details.info.location,
        },
        "channel": {
            "txPower": details.channel.tx_power,
            "txOffsetMhz": details.channel.tx_offset_mhz,
            "chBandwidthKhz": details.channel.ch_bandwidth_khz,
            "channelId": details.channel.channel_id,
            "channelNo": details.channel.channel_no,
        },
        "rcon": {
            "password": details.rcon.password,
            "port": details.rcon.port,
        },
        "software": details.software,
    })
    .to_string()
}
