use std::time::{Duration, Instant};

use ddp_can::CanBus;

use crate::control::{self, KA_PING};
use crate::error::DdpError;
use crate::state::{DisMode, SessionState, VariantProfile};
use crate::Session;

/// Variant detection, session open, and the initialization handshake
/// (spec §4.2.3, §4.2.4).
impl<B: CanBus> Session<B> {
    /// Listen for a broadcast, falling back to active opens (TP2.0 then
    /// TP1.6) if none arrives. On success the session is `SESSION_ACTIVE`
    /// with `mode`/`opener`/`params` populated from whichever peer reply
    /// was observed.
    pub fn detect_and_open(&mut self) -> Result<(), DdpError> {
        if self.state != SessionState::Disconnected {
            return Ok(());
        }
        tracing::info!("detecting cluster type");

        let deadline = Instant::now() + Duration::from_secs(1);
        while Instant::now() < deadline {
            let tick = deadline.saturating_duration_since(Instant::now()).min(Duration::from_millis(100));
            let Some(data) = self.recv_tick(tick)? else {
                continue;
            };
            if data.as_slice() == control::KA_RED_PRESENT.as_slice() {
                return self.red_passive_handshake();
            }
            if data.first() == Some(&0xA0) {
                tracing::info!("detected A0 open request");
                self.params.parse(&data);
                self.sync_pacing_delay();
                let reply = self.params.build_a1()?;
                self.send_can(&reply)?;
                self.opener = false;
                self.mode = if data.len() == 6 {
                    self.params.ka_long = true;
                    DisMode::White
                } else {
                    self.params.ka_long = false;
                    DisMode::Unknown
                };
                self.set_state(SessionState::SessionActive);
                return Ok(());
            }
        }

        tracing::info!("no broadcast, attempting active open with TP2.0");
        self.send_can(&control::KA_WHITE_OPEN)?;
        let deadline = Instant::now() + Duration::from_millis(500);
        while Instant::now() < deadline {
            let tick = deadline.saturating_duration_since(Instant::now()).min(Duration::from_millis(50));
            let Some(data) = self.recv_tick(tick)? else {
                continue;
            };
            if data.first() == Some(&0xA1) {
                self.params.parse(&data);
                self.sync_pacing_delay();
                self.mode = if data.len() == 6 {
                    tracing::info!("A1 (long) received, white dis detected");
                    self.params.ka_long = true;
                    DisMode::White
                } else {
                    tracing::info!("A1 (short) received, color or red dis detected");
                    self.params.ka_long = false;
                    DisMode::Unknown
                };
                self.opener = true;
                self.set_state(SessionState::SessionActive);
                return Ok(());
            }
            self.handle_incoming_packet(&data)?;
        }

        tracing::info!("no TP2.0 response, attempting TP1.6 active open");
        let our_a0_short = [0xA0, self.params.bs, 0x00];
        self.send_can(&our_a0_short)?;
        let deadline = Instant::now() + Duration::from_millis(500);
        while Instant::now() < deadline {
            let tick = deadline.saturating_duration_since(Instant::now()).min(Duration::from_millis(50));
            let Some(data) = self.recv_tick(tick)? else {
                continue;
            };
            if data.first() == Some(&0xA1) {
                self.params.parse(&data);
                self.sync_pacing_delay();
                tracing::info!("A1 (TP1.6) received, red dis detected");
                self.params.ka_long = false;
                self.mode = DisMode::Red;
                self.opener = true;
                self.set_state(SessionState::SessionActive);
                return Ok(());
            }
            self.handle_incoming_packet(&data)?;
        }

        Err(DdpError::Handshake("no cluster responded to open attempts".into()))
    }

    /// Red-variant passive open (spec §4.2.3 step 1): reply `A1 0F`, ping
    /// `A3`, expect `A1 0F`, then four further `A3`/`A1 0F` round trips.
    fn red_passive_handshake(&mut self) -> Result<(), DdpError> {
        tracing::info!("detected A0 07 00 red broadcast");
        self.send_can(&control::KA_RED_OPEN_SHORT)?;
        self.send_can(&[KA_PING])?;
        if self
            .recv_specific(&control::KA_RED_OPEN_SHORT, self.params.ack_timeout_ms)?
            .is_none()
        {
            return Err(DdpError::Handshake("red open: no A1 0F reply".into()));
        }
        for round in 0..4 {
            self.send_can(&[KA_PING])?;
            if self
                .recv_specific(&control::KA_RED_OPEN_SHORT, self.params.ack_timeout_ms)?
                .is_none()
            {
                return Err(DdpError::Handshake(format!("red open: round {round} timeout")));
            }
        }
        self.params.ka_long = false;
        self.mode = DisMode::Red;
        self.opener = false;
        self.set_state(SessionState::SessionActive);
        Ok(())
    }

    /// The scripted post-open exchange that resolves the exact cluster
    /// variant and brings the session to `READY` (spec §4.2.4). Only the
    /// opener runs this; the passive side is driven by the cluster instead.
    pub fn perform_initialization(&mut self) -> Result<(), DdpError> {
        match self.perform_initialization_inner() {
            Ok(()) => Ok(()),
            Err(e) => {
                tracing::error!(error = %e, "handshake error");
                self.set_state(SessionState::Disconnected);
                Err(e)
            }
        }
    }

    fn perform_initialization_inner(&mut self) -> Result<(), DdpError> {
        if !self.opener {
            return Err(DdpError::Handshake("initialization requires opener=true".into()));
        }
        tracing::info!(mode = ?self.mode, "starting initialization handshake");
        self.set_state(SessionState::Initializing);
        self.send_seq = 0;

        self.send_data_packet(&[0x15, 0x01, 0x01, 0x02, 0x00, 0x00], false)?;
        let step1 = self
            .recv_message_chain(1000)?
            .ok_or_else(|| DdpError::Handshake("init step 1 timeout".into()))?;
        if step1 != [0x00, 0x01] {
            return Err(DdpError::Handshake(format!("init step 1 unexpected reply {step1:02x?}")));
        }

        self.send_data_packet(&[0x01, 0x01, 0x00], false)?;
        self.send_data_packet(&[0x08], false)?;

        let mut capability = self
            .recv_message_chain(1000)?
            .ok_or_else(|| DdpError::Handshake("init step 2 timeout".into()))?;
        if capability == [0x00, 0x01] {
            // Out-of-order packet absorbed, re-read the real capability reply.
            capability = self
                .recv_message_chain(1000)?
                .ok_or_else(|| DdpError::Handshake("init step 2 (re-read) timeout".into()))?;
        }

        if capability.first() == Some(&0x09) {
            self.apply_capability(&capability);
        }

        self.send_data_packet(&[0x20, 0x3B, 0xA0, 0x00], false)?;
        self.recv_message_chain(1000)?;
        self.send_data_packet(&[0x33], false)?;

        self.send_can(&[KA_PING])?;
        let reply = self.params.build_a1()?;
        if self.recv_specific(&reply, 1000)?.is_none() {
            return Err(DdpError::Handshake("final keep-alive confirmation timeout".into()));
        }

        tracing::info!("ddp initialization complete");
        self.set_state(SessionState::Ready);
        self.last_keepalive_sent = Some(Instant::now());
        Ok(())
    }

    /// Derive `mode`/`variant`/`region` from the `09 10…`/`09 20…` capability
    /// packet (spec §4.2.4 step 4).
    fn apply_capability(&mut self, capability: &[u8]) {
        if let Some(&class) = capability.get(1) {
            match class {
                0x10 => {
                    let ty = capability.get(2).copied().unwrap_or(0);
                    self.mode = if ty == 0x03 {
                        tracing::info!("detected color dis type 1");
                        DisMode::ColorType1
                    } else {
                        tracing::info!("detected color dis type 2");
                        DisMode::ColorType2
                    };
                }
                0x20 => {
                    let ty = capability.get(2).copied().unwrap_or(0);
                    self.mode = if ty == 0x03 {
                        tracing::info!("detected mono hybrid (20 03)");
                        DisMode::MonoHybrid
                    } else if self.params.ka_long {
                        DisMode::White
                    } else {
                        DisMode::Red
                    };
                }
                _ => {}
            }
            self.variant = VariantProfile::for_mode(self.mode);
        }

        self.region = capability
            .iter()
            .position(|&b| b == 0x30)
            .and_then(|idx| capability.get(idx + 3).copied())
            .or(Some(0x31));
    }
}
