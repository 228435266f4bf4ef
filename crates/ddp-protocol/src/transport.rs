use std::time::{Duration, Instant};

use ddp_can::CanBus;

use crate::control::KA_PING;
use crate::error::DdpError;
use crate::frame::{self, FrameKind};
use crate::state::{DisMode, SessionState};
use crate::Session;

/// Reliable send and payload segmentation (spec §4.2.5, §4.2.6), plus the
/// receive-chain helpers used both here and by the claim handshake.
impl<B: CanBus> Session<B> {
    pub(crate) fn send_can(&mut self, data: &[u8]) -> Result<(), DdpError> {
        self.bus.send(ddp_can::CAN_ID_SEND, data)?;
        Ok(())
    }

    pub(crate) fn recv_tick(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>, DdpError> {
        Ok(self.bus.recv(timeout)?.map(|f| f.data().to_vec()))
    }

    pub(crate) fn send_ack(&mut self, received_seq: u8) -> Result<(), DdpError> {
        self.send_can(&[frame::ack_byte_for(received_seq)])
    }

    /// Send a complete application payload. Returns `Ok(false)` without
    /// transmitting anything if the session isn't `READY` - the caller (the
    /// Presentation Service) is responsible for remembering it as a pending
    /// frame and retrying once `READY` returns.
    pub fn send_payload(&mut self, payload: &[u8]) -> Result<bool, DdpError> {
        if payload.is_empty() {
            return Ok(true);
        }
        if self.state != SessionState::Ready {
            tracing::warn!("not READY, caller should defer payload");
            return Ok(false);
        }

        let max_per_block = self.params.max_bytes_per_block().max(1);
        for block in payload.chunks(max_per_block) {
            if let Err(e) = self.send_block(block) {
                tracing::error!(error = %e, "failed to send ddp frame, dropping session");
                self.set_state(SessionState::Disconnected);
                return Err(e);
            }
            if self.mode == DisMode::White {
                std::thread::sleep(Duration::from_millis(20));
            }
        }
        Ok(true)
    }

    /// Send one reliably-ACKed application payload as a single end frame,
    /// bypassing block segmentation. For higher layers (the claim
    /// handshake) that need a direct request/response exchange rather than
    /// a full multi-block draw frame. Requires `READY`.
    pub fn send_single(&mut self, payload: &[u8]) -> Result<(), DdpError> {
        if self.state != SessionState::Ready {
            return Err(DdpError::Protocol("send_single requires READY".into()));
        }
        self.send_data_packet(payload, false)
    }

    /// Wait up to `timeout_ms` for the next complete application payload
    /// (spec §4.2.7), ACKing it automatically. For higher layers driving a
    /// request/response exchange (e.g. the claim handshake) on top of an
    /// already-`READY` session.
    pub fn await_message(&mut self, timeout_ms: u64) -> Result<Option<Vec<u8>>, DdpError> {
        self.recv_message_chain(timeout_ms)
    }

    fn send_block(&mut self, block: &[u8]) -> Result<(), DdpError> {
        let mut chunks: Vec<&[u8]> = block.chunks(7).collect();
        let Some(last) = chunks.pop() else {
            return Ok(());
        };
        for chunk in chunks {
            self.send_data_packet(chunk, true)?;
        }
        self.send_data_packet(last, false)
    }

    /// Send one CAN-level data packet (spec §4.2.5). `is_body` selects a
    /// `0x2x` body frame (never ACKed) vs a `0x1x` end frame (ACK required,
    /// with breathing-loop recovery and sequence resync on failure).
    pub(crate) fn send_data_packet(&mut self, data: &[u8], is_body: bool) -> Result<(), DdpError> {
        let header = if is_body {
            frame::body_byte(self.send_seq)
        } else {
            frame::end_byte(self.send_seq)
        };
        let mut packet = Vec::with_capacity(data.len() + 1);
        packet.push(header);
        packet.extend_from_slice(data);

        let original_seq = self.send_seq;
        self.send_seq = (self.send_seq + 1) % 16;
        self.send_can(&packet)?;

        if is_body {
            return Ok(());
        }

        let expected_ack_byte = frame::ack_byte_for(original_seq);
        if self.wait_for_ack_with_breathing(expected_ack_byte)? {
            return Ok(());
        }

        if let Some(last_ack) = self.rx_last_ack {
            if last_ack != expected_ack_byte {
                let next_expected = frame::next_expected_from_ack(last_ack);
                self.resync(original_seq, next_expected)?;
                if self
                    .recv_specific(&[expected_ack_byte], self.params.ack_timeout_ms)?
                    .is_some()
                {
                    return Ok(());
                }
            }
        }

        Err(DdpError::AckTimeout { seq: original_seq })
    }

    /// Waits for `expected_ack_byte`; on timeout enters the breathing loop -
    /// up to ten rounds of an `A3` ping and a 200ms wait, giving slow
    /// clusters room to catch up before declaring the send a failure.
    fn wait_for_ack_with_breathing(&mut self, expected_ack_byte: u8) -> Result<bool, DdpError> {
        if self
            .recv_specific(&[expected_ack_byte], self.params.ack_timeout_ms)?
            .is_some()
        {
            return Ok(true);
        }
        if self.rx_last_ack == Some(expected_ack_byte) {
            return Ok(true);
        }

        tracing::warn!(ack = expected_ack_byte, "ack timeout, entering breathing loop");

        for attempt in 0..10 {
            self.send_can(&[KA_PING])?;
            let deadline = Instant::now() + Duration::from_millis(200);
            let mut got_keepalive_response = false;

            while Instant::now() < deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                let tick = remaining.min(Duration::from_millis(50));
                let Some(data) = self.recv_tick(tick)? else {
                    continue;
                };
                if data[0] == expected_ack_byte {
                    tracing::info!("recovered: delayed ack received during breathing");
                    return Ok(true);
                }
                if data[0] == 0xA1 {
                    got_keepalive_response = true;
                }
                self.handle_incoming_packet(&data)?;
                if self.rx_last_ack == Some(expected_ack_byte) {
                    tracing::info!("recovered: delayed ack found in buffer");
                    return Ok(true);
                }
            }

            if !got_keepalive_response {
                tracing::warn!(attempt = attempt + 1, "breathing: no A1 response");
            }
        }

        tracing::error!("breathing loop failed: cluster did not ack");
        Ok(false)
    }

    /// Realign `send_seq` by emitting `num_dummies` all-zero frames so the
    /// peer's next expectation matches ours again, respecting block
    /// boundaries (spec §4.2.5 step 6).
    fn resync(&mut self, original_seq: u8, next_expected: u8) -> Result<(), DdpError> {
        let num_dummies = original_seq.wrapping_sub(next_expected) & 0x0F;
        if num_dummies == 0 {
            tracing::warn!("wrong ack but num_dummies=0, skipping resync");
            return Ok(());
        }
        tracing::info!(num_dummies, from = next_expected, to = original_seq, "resyncing sequence");

        self.send_seq = next_expected;
        let dummy = [0u8; 7];
        let mut remaining = num_dummies;
        let mut block_count: u8 = 0;

        while remaining > 0 {
            let last_in_block = block_count == self.params.bs.saturating_sub(1);
            let header = if last_in_block {
                frame::end_byte_alt(self.send_seq)
            } else {
                frame::body_byte(self.send_seq)
            };
            let mut packet = Vec::with_capacity(8);
            packet.push(header);
            packet.extend_from_slice(&dummy);
            self.send_can(&packet)?;

            if last_in_block {
                let expected_ack = frame::ack_byte_for(self.send_seq);
                if self
                    .recv_specific(&[expected_ack], self.params.ack_timeout_ms)?
                    .is_none()
                {
                    return Err(DdpError::AckTimeout { seq: self.send_seq });
                }
                block_count = 0;
            } else {
                block_count += 1;
            }
            self.send_seq = (self.send_seq + 1) % 16;
            remaining -= 1;
        }
        Ok(())
    }

    /// Wait up to `timeout_ms` for a literal `expected` frame, dispatching
    /// everything else through [`Session::handle_incoming_packet`] and ACKing
    /// any data frame that arrives while we wait.
    pub(crate) fn recv_specific(
        &mut self,
        expected: &[u8],
        timeout_ms: u64,
    ) -> Result<Option<Vec<u8>>, DdpError> {
        self.rx_last_ack = None;
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);

        while Instant::now() < deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let tick = remaining.min(Duration::from_millis(50));
            let Some(data) = self.recv_tick(tick)? else {
                continue;
            };
            if data == expected {
                return Ok(Some(data));
            }

            let is_background = self.handle_incoming_packet(&data)?;
            if !is_background && matches!(frame::classify(data[0]), FrameKind::End) {
                self.send_ack(frame::seq_nibble(data[0]))?;
            }
            if self.state == SessionState::Disconnected {
                return Ok(None);
            }
        }
        Ok(None)
    }

    /// Assemble one logical application payload out of a `0x2x*` / `0x1x`
    /// block chain, ACKing the end frame once the chain completes.
    pub(crate) fn recv_message_chain(&mut self, timeout_ms: u64) -> Result<Option<Vec<u8>>, DdpError> {
        let deadline = Instant::now() + Duration::from_millis(timeout_ms);
        let mut payload = Vec::new();

        while Instant::now() < deadline {
            let remaining = deadline.saturating_duration_since(Instant::now());
            let tick = remaining.min(Duration::from_millis(50));
            let Some(data) = self.recv_tick(tick)? else {
                continue;
            };

            let is_background = self.handle_incoming_packet(&data)?;
            if is_background {
                if self.state == SessionState::Disconnected {
                    return Ok(None);
                }
                continue;
            }

            match frame::classify(data[0]) {
                FrameKind::Body => payload.extend_from_slice(&data[1..]),
                FrameKind::End => {
                    payload.extend_from_slice(&data[1..]);
                    self.send_ack(frame::seq_nibble(data[0]))?;
                    return Ok(Some(payload));
                }
                _ => {}
            }
        }
        Ok(None)
    }
}
