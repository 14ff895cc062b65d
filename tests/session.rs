//! Peer session integration tests: handshake, liveness, NAK handling and
//! stream sequencing, driven against a loopback fake master.

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use common::{recording_handler, FakeMaster};
use fnelink::config::PeerConfig;
use fnelink::framing::{NetFunc, NetSubFunc};
use fnelink::peer::FnePeer;
use fnelink::types::ConnectionState;
use fnelink::util::bits::get_u32;

const PEER_ID: u32 = 9000;

fn test_config(master: &FakeMaster) -> PeerConfig {
    let mut config = PeerConfig::new(PEER_ID, master.addr(), "password");
    config.ping_time = Duration::from_millis(50);
    config.details.identity = "TESTPEER".into();
    config
}

async fn wait_for_state(peer: &Arc<FnePeer>, state: ConnectionState) {
    for _ in 0..200 {
        if peer.state() == state {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("peer never reached {state}");
}

#[tokio::test]
async fn test_login_handshake() {
    let master = FakeMaster::bind().await;
    let handler = recording_handler();
    let peer = FnePeer::new(test_config(&master), handler.clone())
        .await
        .unwrap();
    peer.start();

    // Login request carries the tag and peer id.
    let (login, from) = master.expect_func(NetFunc::RptL).await;
    assert_eq!(&login.payload[..4], b"RPTL");
    assert_eq!(get_u32(&login.payload, 4), PEER_ID);
    assert_eq!(login.fne.peer_id, PEER_ID);

    // Challenge with a known salt; the digest is SHA-256(BE(salt) ||
    // passphrase).
    master.send_ack(from, 0x12345678).await;

    let (auth, from) = master.expect_func(NetFunc::RptK).await;
    assert_eq!(&auth.payload[..4], b"RPTK");
    assert_eq!(get_u32(&auth.payload, 4), PEER_ID);
    let expected =
        hex::decode("92f74afab26901f6cd3c5577ef5787fbc5eaf96ba1ceea007c2906ed052fd8d4").unwrap();
    assert_eq!(&auth.payload[8..40], expected.as_slice());

    master.send_ack(from, PEER_ID).await;

    // Configuration document follows authorisation.
    let (config, from) = master.expect_func(NetFunc::RptC).await;
    assert_eq!(&config.payload[..4], b"RPTC");
    assert_eq!(get_u32(&config.payload, 4), PEER_ID);

    let doc: serde_json::Value = serde_json::from_slice(&config.payload[8..]).unwrap();
    assert_eq!(doc["identity"], "TESTPEER");
    assert!(doc["software"].as_str().unwrap().starts_with("fnelink/"));

    master.send_ack(from, PEER_ID).await;

    wait_for_state(&peer, ConnectionState::Running).await;
    assert!(handler.connected.load(Ordering::SeqCst));

    peer.stop().await;
}

#[tokio::test]
async fn test_ping_liveness_declares_link_dead() {
    let master = FakeMaster::bind().await;
    let handler = recording_handler();
    let peer = FnePeer::new(test_config(&master), handler.clone())
        .await
        .unwrap();
    peer.start();

    master.complete_handshake(PEER_ID, 0xCAFE0001).await;
    wait_for_state(&peer, ConnectionState::Running).await;

    // The master goes silent. The peer sends pings until the missed-ping
    // bound trips, then starts a fresh login cycle.
    let mut pings = 0u32;
    loop {
        let (frame, _) = master.recv_frame().await;
        match NetFunc::from_u8(frame.fne.func) {
            Some(NetFunc::Ping) => {
                assert_eq!(frame.rtp.sequence, 65535);
                pings += 1;
            }
            Some(NetFunc::RptL) => break,
            other => panic!("unexpected frame during silence: {other:?}"),
        }
    }

    assert_eq!(pings, 6, "expected six unanswered pings before relogin");
    assert_eq!(peer.state(), ConnectionState::WaitingLogin);
    assert!(handler.disconnected.load(Ordering::SeqCst));

    peer.stop().await;
}

#[tokio::test]
async fn test_pong_keeps_link_alive() {
    let master = FakeMaster::bind().await;
    let handler = recording_handler();
    let peer = FnePeer::new(test_config(&master), handler.clone())
        .await
        .unwrap();
    peer.start();

    master.complete_handshake(PEER_ID, 1).await;
    wait_for_state(&peer, ConnectionState::Running).await;

    // Answer every ping; the link must stay up well past the liveness
    // bound.
    for _ in 0..10 {
        let (frame, from) = master.recv_frame().await;
        if frame.fne.func == NetFunc::Ping as u8 {
            master.send_pong(from).await;
        }
    }

    assert_eq!(peer.state(), ConnectionState::Running);

    peer.stop().await;
}

#[tokio::test]
async fn test_acl_nak_is_terminal() {
    let master = FakeMaster::bind().await;
    let handler = recording_handler();
    let peer = FnePeer::new(test_config(&master), handler.clone())
        .await
        .unwrap();
    peer.start();

    let peer_addr = master.complete_handshake(PEER_ID, 2).await;
    wait_for_state(&peer, ConnectionState::Running).await;

    // Reason 7: peer ACL rejection, terminal.
    master.send_nak(peer_addr, PEER_ID, 0x0007).await;

    // The disconnect callback fires and both tasks stop: no further
    // traffic from the peer.
    for _ in 0..100 {
        if handler.disconnected.load(Ordering::SeqCst) {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(handler.disconnected.load(Ordering::SeqCst));

    // Allow for a ping already in flight when the NAK landed, then require
    // a fully quiet window.
    let mut quiet = false;
    for _ in 0..5 {
        if master.quiet_for(Duration::from_millis(250)).await {
            quiet = true;
            break;
        }
    }
    assert!(quiet, "peer kept sending after terminal NAK");
}

#[tokio::test]
async fn test_retriable_nak_forces_relogin() {
    let master = FakeMaster::bind().await;
    let handler = recording_handler();
    let peer = FnePeer::new(test_config(&master), handler.clone())
        .await
        .unwrap();
    peer.start();

    let peer_addr = master.complete_handshake(PEER_ID, 3).await;
    wait_for_state(&peer, ConnectionState::Running).await;

    // Reason 6: peer reset commanded; retriable.
    master.send_nak(peer_addr, PEER_ID, 0x0006).await;

    let (_login, _) = master.expect_func(NetFunc::RptL).await;
    assert_eq!(peer.state(), ConnectionState::WaitingLogin);

    peer.stop().await;
}

#[tokio::test]
async fn test_master_closing_forces_relogin() {
    let master = FakeMaster::bind().await;
    let handler = recording_handler();
    let peer = FnePeer::new(test_config(&master), handler.clone())
        .await
        .unwrap();
    peer.start();

    let peer_addr = master.complete_handshake(PEER_ID, 4).await;
    wait_for_state(&peer, ConnectionState::Running).await;

    master
        .send_frame(peer_addr, NetFunc::MstClosing, NetSubFunc::NOP, b"MSTCL".to_vec())
        .await;

    let (_login, _) = master.expect_func(NetFunc::RptL).await;
    assert!(handler.disconnected.load(Ordering::SeqCst));

    peer.stop().await;
}

#[tokio::test]
async fn test_protocol_sequence_monotone_and_stream_reset() {
    let master = FakeMaster::bind().await;
    let handler = recording_handler();
    let peer = FnePeer::new(test_config(&master), handler.clone())
        .await
        .unwrap();
    peer.start();

    master.complete_handshake(PEER_ID, 5).await;
    wait_for_state(&peer, ConnectionState::Running).await;

    // Five in-call frames then a call-end.
    for _ in 0..5 {
        peer.send_protocol(NetSubFunc::PROTOCOL_DMR, vec![0u8; 20], false)
            .await
            .unwrap();
    }
    peer.send_protocol(NetSubFunc::PROTOCOL_DMR, vec![0u8; 20], true)
        .await
        .unwrap();

    // And a fresh call afterwards.
    peer.send_protocol(NetSubFunc::PROTOCOL_DMR, vec![0u8; 20], false)
        .await
        .unwrap();

    let mut seqs = Vec::new();
    let mut streams = Vec::new();
    while seqs.len() < 7 {
        let (frame, _) = master.recv_frame().await;
        if frame.fne.func == NetFunc::Protocol as u8 {
            seqs.push(frame.rtp.sequence);
            streams.push(frame.fne.stream_id);
        }
    }

    // Monotone within the stream, sentinel at call end, reset on the new
    // stream id.
    assert_eq!(&seqs[..5], &[0, 1, 2, 3, 4]);
    assert_eq!(seqs[5], 65535);
    assert_eq!(seqs[6], 0);

    assert!(streams[..6].iter().all(|&s| s == streams[0]));
    assert_ne!(streams[6], streams[0], "stream id must roll at call end");

    peer.stop().await;
}

#[tokio::test]
async fn test_announcements_use_zero_stream_and_sequence() {
    let master = FakeMaster::bind().await;
    let handler = recording_handler();
    let peer = FnePeer::new(test_config(&master), handler.clone())
        .await
        .unwrap();
    peer.start();

    master.complete_handshake(PEER_ID, 6).await;
    wait_for_state(&peer, ConnectionState::Running).await;

    peer.announce_group_affiliation(0x0C0FFE, 0x000BB8).await.unwrap();

    let (frame, _) = master.expect_func(NetFunc::Announce).await;
    assert_eq!(frame.fne.sub_func, NetSubFunc::ANNOUNCE_GRP_AFFIL);
    assert_eq!(frame.rtp.sequence, 0);
    assert_eq!(frame.fne.stream_id, 0);
    assert_eq!(frame.payload.len(), 6);

    peer.announce_unit_registration(0x0C0FFE).await.unwrap();
    let (frame, _) = master.expect_func(NetFunc::Announce).await;
    assert_eq!(frame.fne.sub_func, NetSubFunc::ANNOUNCE_UNIT_REG);
    assert_eq!(frame.payload.len(), 3);

    peer.stop().await;
}

#[tokio::test]
async fn test_key_request_and_response() {
    use fnelink::p25::{KmmModifyKey, KeyItem, KeysetItem, P25_ALGO_AES_256};

    let master = FakeMaster::bind().await;
    let handler = recording_handler();
    let peer = FnePeer::new(test_config(&master), handler.clone())
        .await
        .unwrap();
    peer.start();

    let peer_addr = master.complete_handshake(PEER_ID, 7).await;
    wait_for_state(&peer, ConnectionState::Running).await;

    peer.send_key_request(P25_ALGO_AES_256, 0x0005).await.unwrap();

    let (request, _) = master.expect_func(NetFunc::KeyReq).await;
    let decoded = KmmModifyKey::decode(&request.payload).unwrap();
    assert_eq!(decoded.algorithm_id, P25_ALGO_AES_256);
    assert_eq!(decoded.key_id, 0x0005);

    // Master answers with key material.
    let mut response = KmmModifyKey::request(P25_ALGO_AES_256, 0x0005);
    response.keyset = KeysetItem {
        keyset_id: 1,
        algorithm_id: P25_ALGO_AES_256,
        key_length: 32,
        keys: vec![KeyItem::new(1, 0x0005, &[0x11; 32])],
    };
    master
        .send_frame(peer_addr, NetFunc::KeyRsp, NetSubFunc::NOP, response.encode())
        .await;

    for _ in 0..100 {
        if handler.key_responses.load(Ordering::SeqCst) > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(handler.key_responses.load(Ordering::SeqCst), 1);

    peer.stop().await;
}

#[tokio::test]
async fn test_inbound_protocol_frames_reach_handler() {
    use fnelink::peer::{DmrFrame, P25Frame};
    use fnelink::dmr::FrameType;
    use fnelink::p25::Duid;

    let master = FakeMaster::bind().await;
    let handler = recording_handler();
    let peer = FnePeer::new(test_config(&master), handler.clone())
        .await
        .unwrap();
    peer.start();

    let peer_addr = master.complete_handshake(PEER_ID, 8).await;
    wait_for_state(&peer, ConnectionState::Running).await;

    let dmr = DmrFrame::encode(
        0,
        0x0C0FFE,
        0x000BB8,
        1,
        1,
        false,
        FrameType::VoiceSync,
        None,
        0,
        &[0u8; 33],
    );
    master
        .send_frame(peer_addr, NetFunc::Protocol, NetSubFunc::PROTOCOL_DMR, dmr)
        .await;

    let p25 = P25Frame::encode(0, 0xABCDEF, 0x123456, 1, false, Duid::Ldu1, &[0u8; 50]);
    master
        .send_frame(peer_addr, NetFunc::Protocol, NetSubFunc::PROTOCOL_P25, p25)
        .await;

    for _ in 0..100 {
        if handler.dmr_frames.load(Ordering::SeqCst) > 0
            && handler.p25_frames.load(Ordering::SeqCst) > 0
        {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    assert_eq!(handler.dmr_frames.load(Ordering::SeqCst), 1);
    assert_eq!(handler.p25_frames.load(Ordering::SeqCst), 1);

    peer.stop().await;
}
