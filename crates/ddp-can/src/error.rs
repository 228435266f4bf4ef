/// Bus Adapter failures (spec §4.1, §7 "Transport").
///
/// A [`BusError`] is fatal for the current session: the caller is expected
/// to escalate to `DISCONNECTED` on receipt. Timeouts are represented as
/// `Ok(None)` from [`crate::CanBus::recv`], never as an error.
#[derive(Debug, thiserror::Error)]
pub enum BusError {
    #[error("CAN hardware unavailable: {0}")]
    HardwareUnavailable(String),

    #[error("CAN send failed: {0}")]
    Send(String),

    #[error("CAN receive failed: {0}")]
    Recv(String),
}
