use std::time::Duration;

use ddp_can::{CanBus, LoopbackBus};
use pretty_assertions::assert_eq;

use crate::{DisMode, Session, SessionEvent, SessionState};

fn session_with(bus: LoopbackBus) -> Session<LoopbackBus> {
    Session::new(bus)
}

#[test]
fn test_white_active_open_marks_long_form() {
    let mut bus = LoopbackBus::new();
    // Nothing arrives during the broadcast-listen window; the reply only
    // shows up once our active-open A0 has actually gone out.
    bus.push_inbound_after(0x6C1, &[0xA1, 0x0F, 0x8A, 0xFF, 0x4A, 0xFF], 1);
    let mut session = session_with(bus);

    session.detect_and_open().unwrap();

    assert_eq!(session.state(), SessionState::SessionActive);
    assert_eq!(session.mode(), DisMode::White);
    assert!(session.is_opener());
    // Negotiated T3 byte 0x4A decodes to 10ms; pacing must follow it rather
    // than stay pinned at the 5ms default (spec §4.2.3 "recompute pacing").
    assert_eq!(session.bus().pacing_delay(), Duration::from_millis(10));
}

#[test]
fn test_red_broadcast_runs_four_round_trip_and_marks_red() {
    let mut bus = LoopbackBus::new();
    bus.push_inbound(0x6C1, &[0xA0, 0x07, 0x00]);
    // Our reply + ping is sends #1-#2, then one A3/A1 round trip per send #3-#6.
    bus.push_inbound_after(0x6C1, &[0xA1, 0x0F], 2);
    bus.push_inbound_after(0x6C1, &[0xA1, 0x0F], 3);
    bus.push_inbound_after(0x6C1, &[0xA1, 0x0F], 4);
    bus.push_inbound_after(0x6C1, &[0xA1, 0x0F], 5);
    bus.push_inbound_after(0x6C1, &[0xA1, 0x0F], 6);
    let mut session = session_with(bus);

    session.detect_and_open().unwrap();

    assert_eq!(session.state(), SessionState::SessionActive);
    assert_eq!(session.mode(), DisMode::Red);
    assert!(!session.is_opener());
}

#[test]
fn test_white_passive_open_replies_long_a1() {
    let mut bus = LoopbackBus::new();
    bus.push_inbound(0x6C1, &[0xA0, 0x0F, 0x8A, 0xFF, 0x4A, 0xFF]);
    let mut session = session_with(bus);

    session.detect_and_open().unwrap();

    assert_eq!(session.state(), SessionState::SessionActive);
    assert_eq!(session.mode(), DisMode::White);
    assert!(!session.is_opener());
}

/// Drives a session through active-open + the generic (non-RED) init path
/// (spec §4.2.3/§4.2.4), with `capability_payload` standing in for the
/// cluster's `09 10…`/`09 20…` capability reply. Threshold bookkeeping
/// mirrors exactly which outbound send precedes each expected reply,
/// including the ACK every reliable end-frame send waits on.
fn ready_session_with_capability(capability_payload: &[u8]) -> Session<LoopbackBus> {
    let mut bus = LoopbackBus::new();
    bus.push_inbound_after(0x6C1, &[0xA1, 0x0F, 0x8A, 0xFF, 0x4A, 0xFF], 1);

    bus.push_inbound_after(0x6C1, &[0xB1], 2);
    bus.push_inbound_after(0x6C1, &[0x1F, 0x00, 0x01], 2);

    bus.push_inbound_after(0x6C1, &[0xB2], 4);

    bus.push_inbound_after(0x6C1, &[0xB3], 5);
    let mut capability_frame = vec![0x1F];
    capability_frame.extend_from_slice(capability_payload);
    bus.push_inbound_after(0x6C1, &capability_frame, 5);

    bus.push_inbound_after(0x6C1, &[0xB4], 7);
    bus.push_inbound_after(0x6C1, &[0x1F, 0x00], 7);

    bus.push_inbound_after(0x6C1, &[0xB5], 9);

    bus.push_inbound_after(0x6C1, &[0xA1, 0x0F, 0x8A, 0xFF, 0x4A, 0xFF], 10);

    let mut session = session_with(bus);
    session.detect_and_open().unwrap();
    session.perform_initialization().unwrap();
    session
}

fn ready_session() -> Session<LoopbackBus> {
    ready_session_with_capability(&[0x09, 0x10, 0x08, 0x30, 0x39, 0x00, 0x31])
}

#[test]
fn test_perform_initialization_reaches_ready_and_detects_color_type2() {
    let session = ready_session();
    assert_eq!(session.state(), SessionState::Ready);
    assert_eq!(session.mode(), DisMode::ColorType2);
    assert_eq!(session.variant().opcode_offset, 0x08);
    assert_eq!(session.region(), Some(0x31));
}

#[test]
fn test_color_free_resumes_without_reinit() {
    let mut session = ready_session_with_capability(&[0x09, 0x10, 0x03, 0x30, 0x39, 0x00, 0x31]);
    assert_eq!(session.mode(), DisMode::ColorType1);
    assert_eq!(session.variant().coord_bytes, 2);

    session.bus.push_inbound(0x6C1, &[0x10, 0x7B, 0x84]);
    session.poll_events().unwrap();
    assert_eq!(session.state(), SessionState::Paused);

    session.bus.push_inbound(0x6C1, &[0x10, 0x7B, 0x05]);
    let events = session.poll_events().unwrap();
    assert_eq!(events, vec![SessionEvent::Resumed]);
    assert_eq!(session.state(), SessionState::Ready);
}

#[test]
fn test_send_payload_segments_into_blocks_and_chunks() {
    let mut session = ready_session();
    // BS negotiated down to the peer's 0x0F -> max 14*7 = 98 bytes/block.
    let payload: Vec<u8> = (0u8..120).collect();

    // Two blocks (98 + 22 bytes): 14 chunks then 4, each block's last chunk
    // going out as an ACKed end frame and the rest as body frames.
    let start_seq = session.send_seq;
    let ack1 = crate::ack_byte_for((start_seq + 13) % 16);
    let ack2 = crate::ack_byte_for((start_seq + 17) % 16);
    session.bus.push_inbound(0x6C1, &[ack1]);
    session.bus.push_inbound(0x6C1, &[ack2]);

    let sent = session.send_payload(&payload).unwrap();
    assert!(sent);

    let outbound = &session.bus.outbound;
    let body_frames = outbound.iter().filter(|f| f.data()[0] & 0xF0 == 0x20).count();
    let end_frames = outbound
        .iter()
        .filter(|f| matches!(f.data()[0] & 0xF0, 0x00 | 0x10))
        .count();
    assert_eq!(body_frames, 13 + 3);
    assert!(end_frames >= 2);
}

#[test]
fn test_pre_emption_then_resume_emits_events() {
    let mut session = ready_session();

    // Cluster claims the screen (mono/white busy status).
    session.bus.push_inbound(0x6C1, &[0x10, 0x53, 0x84]);
    let events = session.poll_events().unwrap();
    assert_eq!(events, vec![SessionEvent::Paused]);
    assert_eq!(session.state(), SessionState::Paused);

    // Cluster frees, then sends the re-init request; we must reply 0x2F and
    // return READY (mono/white path, not an immediate color resume).
    session.bus.push_inbound(0x6C1, &[0x10, 0x53, 0x05]);
    session.bus.push_inbound(0x6C1, &[0x10, 0x2E]);
    let events = session.poll_events().unwrap();
    assert_eq!(events, vec![SessionEvent::Resumed]);
    assert_eq!(session.state(), SessionState::Ready);

    let reinit_confirm = session
        .bus
        .outbound
        .iter()
        .any(|f| f.data().len() == 2 && f.data()[0] & 0xF0 == 0x10 && f.data()[1] == 0x2F);
    assert!(reinit_confirm);
}

#[test]
fn test_session_close_emits_a8_and_disconnects() {
    let mut session = ready_session();
    session.close().unwrap();
    assert_eq!(session.state(), SessionState::Disconnected);
    assert_eq!(session.bus.outbound.last().unwrap().data(), &[0xA8]);
}
