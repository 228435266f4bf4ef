use ddp_protocol::DdpError;

/// Error kinds surfaced by the presentation layer (spec §7).
///
/// `Transport`/`Handshake` wrap whatever the DDP Engine escalated and are
/// propagated the same way it does; `Application` errors are always
/// recoverable - the offending command is dropped and the session lives on.
#[derive(Debug, thiserror::Error)]
pub enum PresentationError {
    #[error("ddp session error: {0}")]
    Session(#[from] DdpError),

    #[error("claim handshake failed: {0}")]
    Claim(String),

    #[error("invalid draw command: {0}")]
    Application(String),

    #[error("session became unavailable mid-draw, deferring to next resync")]
    NotReady,
}
