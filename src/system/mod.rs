//! Host-system adapter surface.
//!
//! [`SystemBase`] attaches a peer session to a host and provides the frame
//! synthesis the host needs around voice calls: DMR silence fill and
//! terminator-with-LC emission, and P25 TDU / TSDU / silence-LDU emission.
//! Air-interface FEC beyond what the network carries is out of scope; the
//! synthesised bursts carry the link control, slot type and sync fields the
//! FNE consumes.

use std::sync::Arc;

use crate::dmr::{DataType, FrameType, Lc, SlotType, DMR_TERMINATOR_WITH_LC_CRC_MASK};
use crate::error::Result;
use crate::framing::NetSubFunc;
use crate::p25::{Duid, Tsbk, P25_LCF_GROUP, P25_LCF_PRIVATE};
use crate::peer::{DmrFrame, FnePeer, P25Frame, DMR_FRAME_LENGTH};

/// A null IMBE frame: comfort silence for P25 voice fill.
pub const NULL_IMBE: [u8; 11] = [
    0x04, 0x0C, 0xFD, 0x7B, 0xFB, 0x7D, 0xF2, 0x7B, 0x3D, 0x9E, 0x45,
];

/// A null AMBE frame pair: comfort silence for DMR voice fill.
pub const NULL_AMBE: [u8; 9] = [0xAC, 0xAA, 0x40, 0x20, 0x00, 0x44, 0x40, 0x80, 0x80];

/// DMR MS-sourced data sync pattern.
const DMR_MS_DATA_SYNC: [u8; 6] = [0xD5, 0xD7, 0xF7, 0x7F, 0xD7, 0x57];

/// Voice frames per P25 LDU.
const P25_LDU_FRAMES: usize = 9;

/// Base system adapter: owns the peer session and synthesises the call
/// artefacts hosts commonly need.
pub struct SystemBase {
    peer: Arc<FnePeer>,
}

impl SystemBase {
    pub fn new(peer: Arc<FnePeer>) -> Self {
        Self { peer }
    }

    /// The underlying peer session.
    pub fn peer(&self) -> &Arc<FnePeer> {
        &self.peer
    }

    /// Build a DMR terminator-with-LC burst.
    pub fn build_dmr_terminator(lc: &Lc, color_code: u8) -> [u8; DMR_FRAME_LENGTH] {
        let mut burst = [0u8; DMR_FRAME_LENGTH];

        let full_lc = lc.encode(DMR_TERMINATOR_WITH_LC_CRC_MASK);
        burst[..12].copy_from_slice(&full_lc);

        let slot_type = SlotType::new(color_code, DataType::TerminatorWithLc);
        burst[12..15].copy_from_slice(&slot_type.encode());

        burst[15..21].copy_from_slice(&DMR_MS_DATA_SYNC);
        burst
    }

    /// Emit a DMR terminator with LC, ending the current call stream.
    pub async fn send_dmr_terminator(
        &self,
        slot: u8,
        src_id: u32,
        dst_id: u32,
        group: bool,
        seq: u8,
    ) -> Result<()> {
        let lc = if group {
            Lc::group(src_id, dst_id)
        } else {
            Lc::private(src_id, dst_id)
        };
        let burst = Self::build_dmr_terminator(&lc, 1);

        let payload = DmrFrame::encode(
            seq,
            src_id,
            dst_id,
            self.peer.peer_id().as_u32(),
            slot,
            !group,
            FrameType::DataSync,
            Some(DataType::TerminatorWithLc),
            0,
            &burst,
        );

        self.peer
            .send_protocol(NetSubFunc::PROTOCOL_DMR, payload, true)
            .await
    }

    /// Build a DMR voice burst filled with null AMBE frames.
    pub fn build_dmr_silence() -> [u8; DMR_FRAME_LENGTH] {
        let mut burst = [0u8; DMR_FRAME_LENGTH];
        // Three AMBE frame pairs fill the burst payload.
        burst[..9].copy_from_slice(&NULL_AMBE);
        burst[9..18].copy_from_slice(&NULL_AMBE);
        burst[18..27].copy_from_slice(&NULL_AMBE);
        burst
    }

    /// Emit one DMR voice frame of silence fill.
    pub async fn send_dmr_silence(
        &self,
        slot: u8,
        src_id: u32,
        dst_id: u32,
        group: bool,
        n: u8,
        seq: u8,
    ) -> Result<()> {
        let burst = Self::build_dmr_silence();
        let frame_type = if n == 0 {
            FrameType::VoiceSync
        } else {
            FrameType::Voice
        };

        let payload = DmrFrame::encode(
            seq,
            src_id,
            dst_id,
            self.peer.peer_id().as_u32(),
            slot,
            !group,
            frame_type,
            None,
            n,
            &burst,
        );

        self.peer
            .send_protocol(NetSubFunc::PROTOCOL_DMR, payload, false)
            .await
    }

    /// Emit a P25 terminator data unit, ending the current call stream.
    pub async fn send_p25_tdu(&self, src_id: u32, dst_id: u32, group: bool) -> Result<()> {
        let lco = if group { P25_LCF_GROUP } else { P25_LCF_PRIVATE };
        let payload = P25Frame::encode(
            lco,
            src_id,
            dst_id,
            self.peer.peer_id().as_u32(),
            !group,
            Duid::Tdu,
            &[],
        );

        self.peer
            .send_protocol(NetSubFunc::PROTOCOL_P25, payload, true)
            .await
    }

    /// Emit a P25 trunking signalling data unit carrying one TSBK.
    pub async fn send_p25_tsdu(&self, tsbk: &Tsbk, src_id: u32, dst_id: u32) -> Result<()> {
        let mut burst = [0u8; crate::p25::tsbk::TSBK_BURST_LENGTH];
        tsbk.encode_ota(&mut burst, true);

        let payload = P25Frame::encode(
            P25_LCF_GROUP,
            src_id,
            dst_id,
            self.peer.peer_id().as_u32(),
            false,
            Duid::Tsdu,
            &burst,
        );

        self.peer
            .send_protocol(NetSubFunc::PROTOCOL_P25, payload, false)
            .await
    }

    /// Emit one P25 LDU of silence fill.
    pub async fn send_p25_ldu_silence(
        &self,
        src_id: u32,
        dst_id: u32,
        group: bool,
        ldu2: bool,
    ) -> Result<()> {
        let mut voice = Vec::with_capacity(P25_LDU_FRAMES * NULL_IMBE.len());
        for _ in 0..P25_LDU_FRAMES {
            voice.extend_from_slice(&NULL_IMBE);
        }

        let lco = if group { P25_LCF_GROUP } else { P25_LCF_PRIVATE };
        let duid = if ldu2 { Duid::Ldu2 } else { Duid::Ldu1 };
        let payload = P25Frame::encode(
            lco,
            src_id,
            dst_id,
            self.peer.peer_id().as_u32(),
            !group,
            duid,
            &voice,
        );

        self.peer
            .send_protocol(NetSubFunc::PROTOCOL_P25, payload, false)
            .await
    }
}
