use std::time::{Duration, Instant};

use ddp_can::CanBus;

use crate::control::{self, KA_PING};
use crate::error::DdpError;
use crate::events::SessionEvent;
use crate::frame::{self, TYPE_CONTROL, TYPE_END, TYPE_END_ALT};
use crate::state::SessionState;
use crate::Session;

/// Receive dispatch and keep-alive (spec §4.2.7, §4.2.8).
impl<B: CanBus> Session<B> {
    /// Classify one inbound frame and react to it in place (ACK bookkeeping,
    /// control-vocabulary replies, session teardown). Returns `true` if the
    /// frame was fully handled here ("background") and needs no further
    /// action from the caller, `false` if it's a data frame the caller still
    /// needs to ACK/accumulate.
    pub(crate) fn handle_incoming_packet(&mut self, data: &[u8]) -> Result<bool, DdpError> {
        let Some(&first) = data.first() else {
            return Ok(false);
        };

        match frame::type_nibble(first) {
            TYPE_CONTROL => {
                if data == control::KA_CLOSE.as_slice() {
                    self.set_state(SessionState::Disconnected);
                    return Ok(true);
                }
                if (data == control::KA_RED_PRESENT.as_slice()
                    || data == control::KA_COLOR_PRESENT.as_slice())
                    && self.state == SessionState::Ready
                {
                    tracing::warn!("broadcast detected while ready, session dropped");
                    self.set_state(SessionState::Disconnected);
                    return Ok(true);
                }
                if first == KA_PING {
                    let reply = self.params.build_a1()?;
                    self.send_can(&reply)?;
                }
                Ok(true)
            }
            t if t == frame::TYPE_ACK => {
                self.rx_last_ack = Some(first);
                Ok(true)
            }
            TYPE_END | TYPE_END_ALT | frame::TYPE_BODY => Ok(false),
            _ => {
                // Defensive fallback: some firmware emits status bytes unwrapped.
                if first == 0x53 || first == 0x7B {
                    return Ok(false);
                }
                tracing::warn!(byte = first, "unknown packet type");
                Ok(true)
            }
        }
    }

    /// Drain every frame currently waiting on the bus, applying ACKs and
    /// status-payload transitions as we go, and return the asynchronous
    /// events the caller (Presentation Service) must react to. Never blocks.
    pub fn poll_events(&mut self) -> Result<Vec<SessionEvent>, DdpError> {
        let mut events = Vec::new();
        if self.state == SessionState::Disconnected {
            return Ok(events);
        }

        while let Some(data) = self.recv_tick(Duration::ZERO)? {
            let is_background = self.handle_incoming_packet(&data)?;
            if self.state == SessionState::Disconnected {
                events.push(SessionEvent::Disconnected);
                break;
            }
            if is_background {
                continue;
            }

            let msg_type = frame::type_nibble(data[0]);
            let seq = frame::seq_nibble(data[0]);
            let payload = &data[1..];

            if matches!(msg_type, TYPE_END | TYPE_END_ALT) {
                self.send_ack(seq)?;
            }

            self.dispatch_status_payload(payload, &mut events)?;
        }
        Ok(events)
    }

    /// Interpret a delivered application payload as a pre-emption status, a
    /// re-init handshake step, or ordinary data (spec §4.3.3).
    fn dispatch_status_payload(
        &mut self,
        payload: &[u8],
        events: &mut Vec<SessionEvent>,
    ) -> Result<(), DdpError> {
        if control::is_busy_status(payload) {
            if self.state != SessionState::Paused {
                tracing::info!(?payload, "cluster claimed the screen, pausing");
                self.set_state(SessionState::Paused);
                self.send_can(&[KA_PING])?;
                events.push(SessionEvent::Paused);
            }
            return Ok(());
        }

        if control::is_color_free_status(payload) {
            if self.mode.is_color() && self.state == SessionState::Paused {
                tracing::info!(?payload, "color cluster free, resuming without re-init");
                self.set_state(SessionState::Ready);
                events.push(SessionEvent::Resumed);
            }
            return Ok(());
        }

        if control::is_mono_free_status(payload) {
            tracing::info!(?payload, "cluster free, awaiting re-init request");
            return Ok(());
        }

        if payload == [control::CMD_REINIT_REQ].as_slice() {
            tracing::info!("re-init request, confirming");
            let seq = self.send_seq;
            let mut reply = vec![frame::end_byte(seq)];
            reply.extend_from_slice(&control::CMD_REINIT_CONF);
            self.send_can(&reply)?;
            self.send_seq = (seq + 1) % 16;
            self.set_state(SessionState::Ready);
            events.push(SessionEvent::Resumed);
            return Ok(());
        }

        if !payload.is_empty() {
            events.push(SessionEvent::DataPayload(payload.to_vec()));
        }
        Ok(())
    }

    /// While `READY` or `PAUSED`, ping every 2s if we're the opener - keeps
    /// the session alive even across cluster-owned (paused) screens.
    pub fn keepalive_if_needed(&mut self) -> Result<(), DdpError> {
        if !matches!(self.state, SessionState::Ready | SessionState::Paused) {
            return Ok(());
        }
        if !self.opener {
            return Ok(());
        }
        let due = match self.last_keepalive_sent {
            None => true,
            Some(t) => t.elapsed() >= Duration::from_secs(2),
        };
        if due {
            self.send_can(&[KA_PING])?;
            self.last_keepalive_sent = Some(Instant::now());
        }
        Ok(())
    }
}
