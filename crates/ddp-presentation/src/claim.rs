//! Screen claim handshake (spec §4.3.2).
//!
//! The window-claim/status vocabulary is its own closed set of literal byte
//! sequences per variant - unlike the drawing opcodes in [`crate::opcode`] it
//! is not derived by biasing a canonical value, so it lives here instead.

use ddp_can::CanBus;
use ddp_protocol::{DisMode, Session};

use crate::error::PresentationError;

/// `window` opcode used by the claim/clear/reset family (spec §4.3.1 row 1).
const OP_WINDOW_8BIT: u8 = 0x52;
const OP_WINDOW_COLOR_TYPE1: u8 = 0x7A;

const CLAIM_FLAGS: u8 = 0x82;
const RESET_FLAGS: u8 = 0x00;
/// Geometry of the single DIS region this driver ever claims, taken
/// verbatim from the observed claim payload `52 05 82 00 1B 40 30`.
const REGION_X: u16 = 0x00;
const REGION_Y: u16 = 0x1B;
const REGION_W: u16 = 0x40;
const REGION_H: u16 = 0x30;

const STAT_ACCEPT: [u8; 2] = [0x53, 0x85];
const STAT_BUSY: [u8; 2] = [0x53, 0x84];
const STAT_FREE: [u8; 2] = [0x53, 0x05];
const STAT_REINIT_REQ: [u8; 1] = [0x2E];
const STAT_REINIT_CONF: [u8; 1] = [0x2F];

const STAT_COLOR_ACCEPT: [[u8; 2]; 3] = [[0x7B, 0x85], [0x7B, 0x05], [0x7B, 0x0A]];
const STAT_COLOR_INVALID: [u8; 2] = [0x7B, 0xC0];

pub(crate) fn window_opcode(mode: DisMode) -> u8 {
    match mode {
        DisMode::ColorType1 => OP_WINDOW_COLOR_TYPE1,
        // ColorType2 shares the 8-bit path's literal opcode even though its
        // coordinates are negotiated separately - see spec Open Question 2.
        _ => OP_WINDOW_8BIT,
    }
}

/// Build a window-family payload: `[opcode, len, flags, x, y, w, h]` with
/// coordinates encoded at `coord_bytes` width.
pub(crate) fn window_payload_at(
    opcode: u8,
    flags: u8,
    x: u16,
    y: u16,
    w: u16,
    h: u16,
    coord_bytes: u8,
) -> Vec<u8> {
    let mut operands = vec![flags];
    for coord in [x, y, w, h] {
        operands.extend(crate::opcode::encode_coord(coord, coord_bytes));
    }
    let mut payload = vec![opcode, operands.len() as u8];
    payload.extend(operands);
    payload
}

fn window_payload(opcode: u8, flags: u8, coord_bytes: u8) -> Vec<u8> {
    window_payload_at(opcode, flags, REGION_X, REGION_Y, REGION_W, REGION_H, coord_bytes)
}

/// Full-window reset payload used after bitmap/rect draws and after
/// `clear_area` (spec SPEC_FULL.md "Window-reset after bitmap/rect draws").
pub(crate) fn reset_payload(mode: DisMode, coord_bytes: u8) -> Vec<u8> {
    window_payload(window_opcode(mode), RESET_FLAGS, coord_bytes)
}

/// Full-screen clear payload - same geometry as [`reset_payload`], same
/// family of opcode, used directly by `DrawCommand::Clear`.
pub(crate) fn clear_payload(mode: DisMode, coord_bytes: u8) -> Vec<u8> {
    reset_payload(mode, coord_bytes)
}

/// Clear a specific rectangular area (spec §6 `clear_area`).
pub(crate) fn clear_area_payload(mode: DisMode, x: u16, y: u16, w: u16, h: u16, coord_bytes: u8) -> Vec<u8> {
    window_payload_at(window_opcode(mode), RESET_FLAGS, x, y, w, h, coord_bytes)
}

/// Run the claim handshake to completion (spec §4.3.2). Returns `Ok(())`
/// once the cluster has granted the screen.
pub fn claim_screen<B: CanBus>(
    session: &mut Session<B>,
    coord_bytes: u8,
) -> Result<(), PresentationError> {
    let mode = session.mode();
    if mode.is_color() {
        return claim_color(session, mode, coord_bytes);
    }
    claim_mono(session, mode, coord_bytes)
}

fn claim_mono<B: CanBus>(
    session: &mut Session<B>,
    mode: DisMode,
    coord_bytes: u8,
) -> Result<(), PresentationError> {
    let claim = window_payload(window_opcode(mode), CLAIM_FLAGS, coord_bytes);
    session.send_single(&claim)?;

    let reply = session
        .await_message(1000)?
        .ok_or_else(|| PresentationError::Claim("no reply to claim".into()))?;
    if reply == STAT_ACCEPT {
        return Ok(());
    }

    if mode != DisMode::White {
        return Err(PresentationError::Claim(format!(
            "unexpected claim reply {reply:02x?}"
        )));
    }

    if reply != STAT_BUSY {
        return Err(PresentationError::Claim(format!(
            "unexpected white claim reply {reply:02x?}"
        )));
    }
    let free = session
        .await_message(1000)?
        .ok_or_else(|| PresentationError::Claim("no free status after busy".into()))?;
    if free != STAT_FREE {
        return Err(PresentationError::Claim(format!(
            "expected free status, got {free:02x?}"
        )));
    }
    let reinit = session
        .await_message(1000)?
        .ok_or_else(|| PresentationError::Claim("no reinit request after free".into()))?;
    if reinit != STAT_REINIT_REQ {
        return Err(PresentationError::Claim(format!(
            "expected reinit request, got {reinit:02x?}"
        )));
    }
    session.send_single(&STAT_REINIT_CONF)?;
    session.send_single(&claim)?;
    let reply = session
        .await_message(1000)?
        .ok_or_else(|| PresentationError::Claim("no reply to repeated claim".into()))?;
    if reply != STAT_ACCEPT {
        return Err(PresentationError::Claim(format!(
            "repeated claim not accepted, got {reply:02x?}"
        )));
    }
    Ok(())
}

fn claim_color<B: CanBus>(
    session: &mut Session<B>,
    mode: DisMode,
    coord_bytes: u8,
) -> Result<(), PresentationError> {
    let claim = window_payload(window_opcode(mode), CLAIM_FLAGS, coord_bytes);
    session.send_single(&claim)?;

    let reply = session
        .await_message(1000)?
        .ok_or_else(|| PresentationError::Claim("no reply to color claim".into()))?;
    if reply == STAT_COLOR_INVALID {
        return Err(PresentationError::Claim("cluster rejected claim geometry".into()));
    }
    if STAT_COLOR_ACCEPT.iter().any(|s| s.as_slice() == reply) {
        return Ok(());
    }
    Err(PresentationError::Claim(format!(
        "unexpected color claim reply {reply:02x?}"
    )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddp_protocol::{DisMode, VariantProfile};

    #[test]
    fn test_window_payload_matches_observed_claim_bytes() {
        let payload = window_payload(OP_WINDOW_8BIT, CLAIM_FLAGS, 1);
        assert_eq!(payload, vec![0x52, 0x05, 0x82, 0x00, 0x1B, 0x40, 0x30]);
    }

    #[test]
    fn test_reset_payload_matches_observed_reset_bytes() {
        let payload = reset_payload(DisMode::White, 1);
        assert_eq!(payload, vec![0x52, 0x05, 0x00, 0x00, 0x1B, 0x40, 0x30]);
    }

    #[test]
    fn test_window_opcode_color_type1_uses_7a() {
        assert_eq!(window_opcode(DisMode::ColorType1), OP_WINDOW_COLOR_TYPE1);
        let variant = VariantProfile::for_mode(DisMode::ColorType1);
        assert_eq!(variant.coord_bytes, 2);
    }
}
