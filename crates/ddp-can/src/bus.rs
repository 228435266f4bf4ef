use std::time::Duration;

use crate::{BusError, CanFrame};

/// Unidirectional send with mandatory pacing, and a bounded-timeout
/// filtered receive (spec §4.1).
///
/// Implementors own the pacing delay: every [`CanBus::send`] call must
/// sleep for the configured inter-frame delay *after* the frame hits the
/// wire. Violating this causes cluster buffer overruns on real hardware,
/// so it is part of the trait's contract rather than left to callers.
pub trait CanBus {
    /// Send exactly one frame on `id`, then sleep for the pacing delay.
    fn send(&mut self, id: u16, data: &[u8]) -> Result<(), BusError>;

    /// Block for up to `timeout` waiting for a frame matching the
    /// adapter's incoming-id filter. Returns `Ok(None)` on timeout, never
    /// surfacing frames that don't match the filter.
    fn recv(&mut self, timeout: Duration) -> Result<Option<CanFrame>, BusError>;

    /// Pacing delay applied after every `send`. Exposed so the protocol
    /// layer can recompute derived timings (e.g. block-to-block pauses)
    /// after negotiation changes `T3`.
    fn pacing_delay(&self) -> Duration;

    fn set_pacing_delay(&mut self, delay: Duration);
}

/// In-memory loopback adapter used by tests and by higher layers that want
/// to exercise the protocol state machine without real hardware.
///
/// Frames pushed onto `inbound` are handed back by `recv` in FIFO order;
/// frames given to `send` are appended to `outbound` for assertion. No
/// actual pacing sleep occurs — tests that care about pacing assert on
/// `pacing_delay()` directly instead of wall-clock time.
#[derive(Default)]
pub struct LoopbackBus {
    pub outbound: Vec<CanFrame>,
    inbound: std::collections::VecDeque<CanFrame>,
    /// Frames held back until `outbound.len()` reaches the paired threshold,
    /// for simulating a peer reply that only arrives after we've sent a
    /// particular request.
    pending: Vec<(usize, CanFrame)>,
    pacing_delay: Duration,
}

impl LoopbackBus {
    #[must_use]
    pub fn new() -> Self {
        Self {
            pacing_delay: Duration::from_millis(5),
            ..Default::default()
        }
    }

    /// Queue a frame to be returned by the next `recv` call.
    pub fn push_inbound(&mut self, id: u16, data: &[u8]) {
        self.inbound.push_back(CanFrame::new(id, data));
    }

    /// Queue a frame that only becomes visible to `recv` once we've sent at
    /// least `after_sends` frames - for replies that should only "arrive"
    /// after a specific request goes out.
    pub fn push_inbound_after(&mut self, id: u16, data: &[u8], after_sends: usize) {
        self.pending.push((after_sends, CanFrame::new(id, data)));
    }

    fn release_due_pending(&mut self) {
        let sent = self.outbound.len();
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].0 <= sent {
                let (_, frame) = self.pending.remove(i);
                self.inbound.push_back(frame);
            } else {
                i += 1;
            }
        }
    }
}

impl CanBus for LoopbackBus {
    fn send(&mut self, id: u16, data: &[u8]) -> Result<(), BusError> {
        self.outbound.push(CanFrame::new(id, data));
        Ok(())
    }

    fn recv(&mut self, _timeout: Duration) -> Result<Option<CanFrame>, BusError> {
        self.release_due_pending();
        Ok(self.inbound.pop_front())
    }

    fn pacing_delay(&self) -> Duration {
        self.pacing_delay
    }

    fn set_pacing_delay(&mut self, delay: Duration) {
        self.pacing_delay = delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_fifo_order() {
        let mut bus = LoopbackBus::new();
        bus.push_inbound(0x6C1, &[0xA3]);
        bus.push_inbound(0x6C1, &[0xB1]);

        let first = bus.recv(Duration::ZERO).unwrap().unwrap();
        let second = bus.recv(Duration::ZERO).unwrap().unwrap();
        assert_eq!(first.data(), &[0xA3]);
        assert_eq!(second.data(), &[0xB1]);
        assert!(bus.recv(Duration::ZERO).unwrap().is_none());
    }

    #[test]
    fn test_loopback_records_outbound() {
        let mut bus = LoopbackBus::new();
        bus.send(0x6C0, &[0xA8]).unwrap();
        assert_eq!(bus.outbound.len(), 1);
        assert_eq!(bus.outbound[0].data(), &[0xA8]);
    }
}
