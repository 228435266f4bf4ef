//! The Presentation Service (spec §4.3): turns [`DrawCommand`]s from the UI
//! layer into DDP application payloads, owns the render cache, and reacts to
//! the engine's pre-emption/resume events.

use std::time::{Duration, Instant};

use ddp_can::CanBus;
use ddp_protocol::{DisMode, Session, SessionEvent, SessionState};

use crate::bitmap::BitmapTable;
use crate::cache::{CommandCache, LineCache, LineUpdate};
use crate::claim::{self, claim_screen};
use crate::command::{DrawCommand, FLAG_INVERTED};
use crate::error::PresentationError;
use crate::glyph;
use crate::opcode::{self, CANON_BITMAP, CANON_COMMIT, CANON_LINE, CANON_RECT, CANON_RELEASE, CANON_TEXT};

/// Upper bound on a single encoded application payload (spec §7 "Application"
/// errors: an oversized payload is dropped, the session is preserved).
const MAX_PAYLOAD_BYTES: usize = 4096;

/// How long a claimed screen may sit idle before the optional inactivity
/// release (spec §4.3.4) kicks in. Disabled unless configured.
const INACTIVITY_RELEASE_AFTER: Duration = Duration::from_secs(30);

/// A fixed glyph cell width in pixels, used only to size the cleanup
/// rectangle when shrinking text (spec §4.3.5). Every DIS font observed on
/// these clusters is fixed-width; proportional fonts are out of scope.
const GLYPH_CELL_WIDTH_PX: u16 = 8;

pub struct PresentationService<B: CanBus> {
    session: Session<B>,
    bitmaps: BitmapTable,
    command_cache: CommandCache,
    line_cache: LineCache,
    screen_active: bool,
    /// Set whenever a draw was recorded while the session wasn't `READY`
    /// and actively claimed (spec §3 `pending_payload`): the cache is ahead
    /// of what the cluster is displaying, and must be replayed once the
    /// screen is claimed again.
    pending_resync: bool,
    inactivity_release_enabled: bool,
    last_draw_at: Option<Instant>,
}

impl<B: CanBus> PresentationService<B> {
    #[must_use]
    pub fn new(session: Session<B>, bitmaps: BitmapTable, inactivity_release_enabled: bool) -> Self {
        Self {
            session,
            bitmaps,
            command_cache: CommandCache::new(),
            line_cache: LineCache::new(),
            screen_active: false,
            pending_resync: false,
            inactivity_release_enabled,
            last_draw_at: None,
        }
    }

    #[must_use]
    pub fn session_state(&self) -> SessionState {
        self.session.state()
    }

    #[must_use]
    pub fn screen_active(&self) -> bool {
        self.screen_active
    }

    /// Detect the cluster and run the initialization handshake if we're the
    /// opener (spec §4.2.3, §4.2.4). Idempotent once `READY`.
    pub fn connect(&mut self) -> Result<(), PresentationError> {
        self.session.detect_and_open()?;
        if self.session.is_opener() {
            self.session.perform_initialization()?;
        }
        Ok(())
    }

    /// Drain engine events, react to pre-emption/resume, send keep-alives,
    /// and service the inactivity-release timer. Never blocks.
    pub fn tick(&mut self) -> Result<(), PresentationError> {
        for event in self.session.poll_events()? {
            match event {
                SessionEvent::Paused => {
                    self.screen_active = false;
                }
                SessionEvent::Resumed => {
                    self.pending_resync = true;
                }
                SessionEvent::Disconnected => {
                    self.screen_active = false;
                    self.pending_resync = true;
                }
                SessionEvent::DataPayload(_) => {}
            }
        }

        self.session.keepalive_if_needed()?;

        if self.inactivity_release_enabled
            && self.screen_active
            && self.session.state() == SessionState::Ready
        {
            if let Some(last) = self.last_draw_at {
                if last.elapsed() >= INACTIVITY_RELEASE_AFTER {
                    tracing::info!("releasing screen after inactivity");
                    self.send_opcode(CANON_RELEASE, &[])?;
                    self.screen_active = false;
                }
            }
        }

        if self.pending_resync && self.session.state() == SessionState::Ready {
            self.resync_from_cache()?;
            self.pending_resync = false;
        }

        Ok(())
    }

    /// Submit one UI draw command (spec §6). While `PAUSED` (or otherwise
    /// not actively claimed) this only updates the render cache - the
    /// "dry-run" behavior of spec §4.3.3.
    pub fn submit(&mut self, command: DrawCommand) -> Result<(), PresentationError> {
        if self.session.state() != SessionState::Ready {
            self.apply_dry_run(&command);
            self.pending_resync = true;
            return Ok(());
        }
        if !self.screen_active {
            claim_screen(&mut self.session, self.coord_bytes())?;
            self.screen_active = true;
        }
        self.draw_live(&command)
    }

    fn coord_bytes(&self) -> u8 {
        self.session.variant().coord_bytes
    }

    fn mode(&self) -> DisMode {
        self.session.mode()
    }

    fn biased_y(&self, y: u16) -> u16 {
        let origin = opcode::y_origin_for(self.session.region());
        y.wrapping_add(u16::from(origin))
    }

    /// Update the render cache without touching the wire - used both for
    /// commands submitted while not claimed, and as the foundation replay
    /// draws on resume (see [`Self::resync_from_cache`]).
    fn apply_dry_run(&mut self, command: &DrawCommand) {
        match command {
            DrawCommand::Clear => {
                self.command_cache.clear();
                self.line_cache.clear();
            }
            DrawCommand::DrawText { text, y, flags, .. } => {
                self.line_cache.update(*y, text, flags & FLAG_INVERTED != 0);
                self.command_cache.record(command.clone());
            }
            DrawCommand::DrawBitmap { .. } | DrawCommand::DrawLine { .. } => {
                self.command_cache.record(command.clone());
            }
            DrawCommand::ClearArea { .. } | DrawCommand::DrawRect { .. } | DrawCommand::Commit => {}
        }
    }

    /// Actually draw `command` on the wire, recording it in the render
    /// cache exactly as [`Self::apply_dry_run`] would.
    fn draw_live(&mut self, command: &DrawCommand) -> Result<(), PresentationError> {
        self.last_draw_at = Some(Instant::now());
        match command {
            DrawCommand::Clear => {
                let payload = claim::clear_payload(self.mode(), self.coord_bytes());
                self.send_payload(&payload)?;
                self.command_cache.clear();
                self.line_cache.clear();
            }
            DrawCommand::ClearArea { x, y, w, h } => {
                let payload = claim::clear_area_payload(
                    self.mode(),
                    *x,
                    self.biased_y(*y),
                    *w,
                    *h,
                    self.coord_bytes(),
                );
                self.send_payload(&payload)?;
                self.send_window_reset()?;
            }
            DrawCommand::DrawText { text, x, y, flags } => {
                self.draw_text_live(text, *x, *y, *flags)?;
            }
            DrawCommand::DrawBitmap { x, y, icon_name } => {
                self.draw_bitmap_live(*x, *y, icon_name)?;
            }
            DrawCommand::DrawLine { x, y, length, vertical } => {
                self.draw_line_live(*x, *y, *length, *vertical)?;
            }
            DrawCommand::DrawRect { x, y, w, h, color } => {
                self.draw_rect_live(*x, *y, *w, *h, *color)?;
            }
            DrawCommand::Commit => {
                self.send_opcode(CANON_COMMIT, &[])?;
            }
        }
        Ok(())
    }

    fn draw_text_live(&mut self, text: &str, x: u16, y: u16, flags: u8) -> Result<(), PresentationError> {
        let inverted = flags & FLAG_INVERTED != 0;
        match self.line_cache.update(y, text, inverted) {
            LineUpdate::Unchanged => return Ok(()),
            LineUpdate::Shrunk { previous_length } => {
                let new_len = text.chars().count();
                let gap_x = x + (new_len as u16) * GLYPH_CELL_WIDTH_PX;
                let gap_w = (previous_length as u16).saturating_sub(new_len as u16) * GLYPH_CELL_WIDTH_PX;
                if gap_w > 0 {
                    let payload = claim::clear_area_payload(
                        self.mode(),
                        gap_x,
                        self.biased_y(y),
                        gap_w,
                        1,
                        self.coord_bytes(),
                    );
                    self.send_payload(&payload)?;
                }
            }
            LineUpdate::InversionCleared => {
                let payload = claim::clear_area_payload(
                    self.mode(),
                    x,
                    self.biased_y(y),
                    REGION_CLEAR_W,
                    1,
                    self.coord_bytes(),
                );
                self.send_payload(&payload)?;
            }
            LineUpdate::Changed => {}
        }

        let glyphs = glyph::translate(text);
        let coord_bytes = self.coord_bytes();
        let mut operands = vec![flags];
        operands.extend(opcode::encode_coord(x, coord_bytes));
        operands.extend(opcode::encode_coord(self.biased_y(y), coord_bytes));
        operands.extend(&glyphs);
        self.send_opcode(CANON_TEXT, &operands)?;
        self.command_cache.record(DrawCommand::DrawText {
            text: text.to_string(),
            x,
            y,
            flags,
        });
        Ok(())
    }

    fn draw_bitmap_live(&mut self, x: u16, y: u16, icon_name: &str) -> Result<(), PresentationError> {
        let asset = self
            .bitmaps
            .get(icon_name)
            .ok_or_else(|| PresentationError::Application(format!("unknown bitmap {icon_name:?}")))?
            .clone();

        let coord_bytes = self.coord_bytes();
        let mut operands = vec![0u8];
        operands.extend(opcode::encode_coord(x, coord_bytes));
        operands.extend(opcode::encode_coord(self.biased_y(y), coord_bytes));
        operands.extend(opcode::encode_coord(asset.w, coord_bytes));
        operands.extend(opcode::encode_coord(asset.h, coord_bytes));
        operands.extend(&asset.data);
        self.send_opcode(CANON_BITMAP, &operands)?;
        self.send_window_reset()?;

        self.command_cache.record(DrawCommand::DrawBitmap {
            x,
            y,
            icon_name: icon_name.to_string(),
        });
        Ok(())
    }

    fn draw_line_live(&mut self, x: u16, y: u16, length: u16, vertical: bool) -> Result<(), PresentationError> {
        let orientation = if vertical { opcode::LINE_VERTICAL } else { opcode::LINE_HORIZONTAL };
        let coord_bytes = self.coord_bytes();
        let mut operands = vec![orientation];
        operands.extend(opcode::encode_coord(x, coord_bytes));
        operands.extend(opcode::encode_coord(self.biased_y(y), coord_bytes));
        operands.extend(opcode::encode_coord(length, coord_bytes));
        self.send_opcode(CANON_LINE, &operands)?;

        self.command_cache.record(DrawCommand::DrawLine { x, y, length, vertical });
        Ok(())
    }

    fn draw_rect_live(&mut self, x: u16, y: u16, w: u16, h: u16, color: u8) -> Result<(), PresentationError> {
        let coord_bytes = self.coord_bytes();
        let mut operands = vec![color];
        operands.extend(opcode::encode_coord(x, coord_bytes));
        operands.extend(opcode::encode_coord(self.biased_y(y), coord_bytes));
        operands.extend(opcode::encode_coord(w, coord_bytes));
        operands.extend(opcode::encode_coord(h, coord_bytes));
        self.send_opcode(CANON_RECT, &operands)
    }

    fn send_window_reset(&mut self) -> Result<(), PresentationError> {
        let payload = claim::reset_payload(self.mode(), self.coord_bytes());
        self.send_payload(&payload)
    }

    fn send_opcode(&mut self, canonical: u8, operands: &[u8]) -> Result<(), PresentationError> {
        let opcode = opcode::biased(canonical, self.session.variant());
        let mut payload = Vec::with_capacity(operands.len() + 1);
        payload.push(opcode);
        payload.extend_from_slice(operands);
        self.send_payload(&payload)
    }

    fn send_payload(&mut self, payload: &[u8]) -> Result<(), PresentationError> {
        if payload.len() > MAX_PAYLOAD_BYTES {
            return Err(PresentationError::Application(format!(
                "payload of {} bytes exceeds {MAX_PAYLOAD_BYTES}",
                payload.len()
            )));
        }
        if !self.session.send_payload(payload)? {
            self.screen_active = false;
            self.pending_resync = true;
            return Err(PresentationError::NotReady);
        }
        Ok(())
    }

    /// Re-claim the screen (if needed) and replay the render cache in
    /// ascending `(y, x)` order, followed by one commit (spec §4.3.3). A
    /// region-clear primer with no commit precedes the replay so stray
    /// pixels from the cluster's own UI don't bleed through, matching
    /// `dis_service.py`'s `handle_redraw`.
    fn resync_from_cache(&mut self) -> Result<(), PresentationError> {
        tracing::info!("resyncing screen from render cache");
        if !self.screen_active {
            claim_screen(&mut self.session, self.coord_bytes())?;
            self.screen_active = true;
        }

        let reset = claim::reset_payload(self.mode(), self.coord_bytes());
        self.send_payload(&reset)?;

        self.line_cache.clear();
        let cached = self.command_cache.ordered();
        for command in cached {
            self.draw_live(&command)?;
        }
        self.send_opcode(CANON_COMMIT, &[])?;
        Ok(())
    }
}

/// Default clear height used when clearing the trailing pixels of a line;
/// matches the claimed region's width so a full-line clear is unambiguous
/// regardless of how long the previous text was.
const REGION_CLEAR_W: u16 = 0x40;

#[cfg(test)]
mod tests {
    use super::*;
    use ddp_can::LoopbackBus;
    use ddp_protocol::ack_byte_for;

    fn ready_service() -> PresentationService<LoopbackBus> {
        let mut bus = LoopbackBus::new();
        bus.push_inbound_after(0x6C1, &[0xA1, 0x0F, 0x8A, 0xFF, 0x4A, 0xFF], 1);
        bus.push_inbound_after(0x6C1, &[0xB1], 2);
        bus.push_inbound_after(0x6C1, &[0x1F, 0x00, 0x01], 2);
        bus.push_inbound_after(0x6C1, &[0xB2], 4);
        bus.push_inbound_after(0x6C1, &[0xB3], 5);
        bus.push_inbound_after(0x6C1, &[0x1F, 0x09, 0x20, 0x00, 0x30, 0x39, 0x00, 0x31], 5);
        bus.push_inbound_after(0x6C1, &[0xB4], 7);
        bus.push_inbound_after(0x6C1, &[0x1F, 0x00], 7);
        bus.push_inbound_after(0x6C1, &[0xB5], 9);
        bus.push_inbound_after(0x6C1, &[0xA1, 0x0F, 0x8A, 0xFF, 0x4A, 0xFF], 10);

        let mut session = Session::new(bus);
        session.detect_and_open().unwrap();
        session.perform_initialization().unwrap();
        assert_eq!(session.mode(), DisMode::White);

        PresentationService::new(session, BitmapTable::new(), false)
    }

    #[test]
    fn test_submit_while_paused_is_dry_run_only() {
        let mut service = ready_service();
        // Force PAUSED without a real cluster round trip.
        service.session.bus_mut().push_inbound(0x6C1, &[0x10, 0x53, 0x84]);
        service.tick().unwrap();
        assert_eq!(service.session_state(), SessionState::Paused);

        let before = service.session.bus().outbound.len();
        service.submit(DrawCommand::draw_text("hi", 0, 1)).unwrap();
        assert_eq!(service.session.bus().outbound.len(), before);
        assert!(!service.command_cache.is_empty());
    }

    #[test]
    fn test_submit_while_ready_claims_then_draws() {
        let mut service = ready_service();

        let claim_seq = service.session.send_seq();
        service
            .session
            .bus_mut()
            .push_inbound(0x6C1, &[ack_byte_for(claim_seq)]);
        service.session.bus_mut().push_inbound(0x6C1, &[0x53, 0x85]);
        let draw_seq = claim_seq.wrapping_add(1) % 16;
        service
            .session
            .bus_mut()
            .push_inbound(0x6C1, &[ack_byte_for(draw_seq)]);

        service.submit(DrawCommand::draw_text("Hi", 0, 1)).unwrap();
        assert!(service.screen_active());

        let claimed = service
            .session
            .bus()
            .outbound
            .iter()
            .any(|f| f.data() == [0x10, 0x52, 0x05, 0x82, 0x00, 0x1B, 0x40, 0x30].as_slice());
        assert!(claimed);
    }
}
