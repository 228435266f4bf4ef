/// Asynchronous transitions the engine surfaces to whoever drives the main
/// loop (normally the Presentation Service). Mirrors spec §4.2.7 / §4.2.9.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Session torn down: `A8`, a session-dropping broadcast while `READY`,
    /// or an unrecoverable send failure. The caller should drop any claimed
    /// screen state; the engine will need `detect_and_open` again.
    Disconnected,
    /// Cluster claimed the screen. Caller should clear `screen_active` and
    /// preserve its render cache for replay.
    Paused,
    /// Cluster released the screen and the engine is `READY` again. Caller
    /// should re-claim and replay its render cache.
    Resumed,
    /// A complete inbound application payload arrived outside of a claim
    /// handshake read (already ACKed by the engine).
    DataPayload(Vec<u8>),
}
