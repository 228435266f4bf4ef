mod bus;
mod error;
mod frame;
#[cfg(target_os = "linux")]
mod socketcan_bus;

pub use bus::{CanBus, LoopbackBus};
pub use error::BusError;
pub use frame::CanFrame;
#[cfg(target_os = "linux")]
pub use socketcan_bus::SocketCanBus;

/// The DDP pair's fixed outgoing identifier (head unit -> cluster).
pub const CAN_ID_SEND: u16 = 0x6C0;
/// The DDP pair's fixed incoming identifier (cluster -> head unit).
pub const CAN_ID_RECV: u16 = 0x6C1;
