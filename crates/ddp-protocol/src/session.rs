use std::time::{Duration, Instant};

use ddp_can::{CanBus, CAN_ID_SEND};

use crate::control::KA_CLOSE;
use crate::error::DdpError;
use crate::params::SessionParams;
use crate::state::{DisMode, SessionState, VariantProfile};

/// The DDP Engine (spec §4.2): owns the session state machine, the bus
/// adapter, and everything needed to reliably move application payloads
/// across it. Generic over the bus so tests can swap in
/// [`ddp_can::LoopbackBus`].
pub struct Session<B: CanBus> {
    pub(crate) bus: B,
    pub(crate) state: SessionState,
    pub(crate) mode: DisMode,
    pub(crate) opener: bool,
    pub(crate) send_seq: u8,
    pub(crate) params: SessionParams,
    pub(crate) variant: VariantProfile,
    pub(crate) region: Option<u8>,
    pub(crate) last_keepalive_sent: Option<Instant>,
    /// Most recently observed ACK byte, used by the breathing/resync path.
    pub(crate) rx_last_ack: Option<u8>,
}

impl<B: CanBus> Session<B> {
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            state: SessionState::Disconnected,
            mode: DisMode::Unknown,
            opener: false,
            send_seq: 0,
            params: SessionParams::default(),
            variant: VariantProfile::default(),
            region: None,
            last_keepalive_sent: None,
            rx_last_ack: None,
        }
    }

    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// The outgoing packet sequence counter that the next reliable send will
    /// carry (spec §3 `send_seq`). Exposed for callers that need to predict
    /// the ACK a not-yet-sent frame will require, e.g. tests driving a
    /// [`ddp_can::LoopbackBus`].
    #[must_use]
    pub fn send_seq(&self) -> u8 {
        self.send_seq
    }

    /// Access the underlying bus adapter directly. Mainly useful for tests
    /// that need to seed or inspect a [`ddp_can::LoopbackBus`].
    pub fn bus(&self) -> &B {
        &self.bus
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    #[must_use]
    pub fn mode(&self) -> DisMode {
        self.mode
    }

    #[must_use]
    pub fn variant(&self) -> VariantProfile {
        self.variant
    }

    #[must_use]
    pub fn region(&self) -> Option<u8> {
        self.region
    }

    #[must_use]
    pub fn is_opener(&self) -> bool {
        self.opener
    }

    #[must_use]
    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    /// Recompute the bus's inter-frame pacing from the negotiated `T3_ms`
    /// (spec §4.2.3: "store as `T1_ms` and `T3_ms` and recompute pacing").
    pub(crate) fn sync_pacing_delay(&mut self) {
        self.bus.set_pacing_delay(Duration::from_secs_f64(self.params.t3_ms / 1000.0));
    }

    pub(crate) fn set_state(&mut self, new_state: SessionState) {
        if self.state == new_state {
            return;
        }
        tracing::info!(?self.state, ?new_state, "session state transition");
        self.state = new_state;
        if new_state == SessionState::Disconnected {
            self.mode = DisMode::Unknown;
            self.opener = false;
            self.send_seq = 0;
            self.variant = VariantProfile::default();
            self.region = None;
        }
    }

    /// Close the session: emit `A8` and transition to `DISCONNECTED`.
    pub fn close(&mut self) -> Result<(), DdpError> {
        if self.state != SessionState::Disconnected {
            tracing::info!("closing session (A8)");
            self.bus.send(CAN_ID_SEND, &KA_CLOSE)?;
            self.set_state(SessionState::Disconnected);
        }
        Ok(())
    }
}
