use ddp_can::BusError;

/// Error taxonomy per the driver's error handling design: transport/ack/handshake
/// errors are fatal to the current session and escalate to `DISCONNECTED`, while
/// `Protocol` is a discard-and-continue condition that never changes session state.
#[derive(Debug, thiserror::Error)]
pub enum DdpError {
    #[error("CAN transport failure: {0}")]
    Transport(#[from] BusError),

    #[error("end frame seq {seq:#04x} unacknowledged after breathing and resync")]
    AckTimeout { seq: u8 },

    #[error("handshake failed: {0}")]
    Handshake(String),

    #[error("unparseable or unexpected frame: {0}")]
    Protocol(String),
}

impl DdpError {
    /// True for the kinds that escalate the session to `DISCONNECTED`.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        !matches!(self, DdpError::Protocol(_))
    }
}
