mod control;
mod dispatch;
mod error;
mod events;
mod frame;
mod handshake;
#[cfg(test)]
mod integration_tests;
mod params;
mod session;
mod state;
mod time;
mod transport;

pub use error::DdpError;
pub use events::SessionEvent;
pub use params::{SessionParams, TpVersion};
pub use session::Session;
pub use state::{DisMode, SessionState, VariantProfile};

pub use frame::{ack_byte_for, body_byte, classify, end_byte, seq_nibble, type_nibble, FrameKind};
