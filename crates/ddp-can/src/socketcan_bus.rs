use std::time::Duration;

use socketcan::{CanDataFrame, CanFilter, CanFrame as SocketCanFrame, Socket, StandardId};

use crate::{BusError, CanBus, CanFrame};

/// Production [`CanBus`] backed by Linux SocketCAN.
///
/// Opens `channel` (e.g. `"can0"`), filters to `recv_id`, and applies the
/// pacing delay after every send as required by spec §4.1. One adapter
/// instance speaks for exactly one of the two DDP identifiers' worth of
/// traffic — `send_id`/`recv_id` are fixed at construction, matching the
/// protocol's single outgoing/incoming identifier pair.
pub struct SocketCanBus {
    socket: socketcan::CanSocket,
    pacing_delay: Duration,
}

impl SocketCanBus {
    pub fn open(channel: &str, recv_id: u16) -> Result<Self, BusError> {
        let socket = socketcan::CanSocket::open(channel)
            .map_err(|e| BusError::HardwareUnavailable(format!("{channel}: {e}")))?;

        let filter = CanFilter::new(u32::from(recv_id), StandardId::MAX.as_raw().into());
        socket
            .set_filters(&[filter])
            .map_err(|e| BusError::HardwareUnavailable(format!("set_filters: {e}")))?;

        Ok(Self {
            socket,
            pacing_delay: Duration::from_millis(5),
        })
    }
}

impl CanBus for SocketCanBus {
    fn send(&mut self, id: u16, data: &[u8]) -> Result<(), BusError> {
        let std_id = StandardId::new(id).ok_or_else(|| BusError::Send(format!("bad id {id:#X}")))?;
        let frame = CanDataFrame::new(std_id, data)
            .ok_or_else(|| BusError::Send(format!("bad data len {}", data.len())))?;
        self.socket
            .write_frame(&frame)
            .map_err(|e| BusError::Send(e.to_string()))?;
        std::thread::sleep(self.pacing_delay);
        Ok(())
    }

    fn recv(&mut self, timeout: Duration) -> Result<Option<CanFrame>, BusError> {
        self.socket
            .set_read_timeout(timeout)
            .map_err(|e| BusError::Recv(e.to_string()))?;
        match self.socket.read_frame() {
            Ok(SocketCanFrame::Data(frame)) => {
                let id = match frame.id() {
                    embedded_can::Id::Standard(id) => id.as_raw(),
                    embedded_can::Id::Extended(_) => return Ok(None),
                };
                Ok(Some(CanFrame::new(id, frame.data())))
            }
            Ok(_) => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
            Err(e) => Err(BusError::Recv(e.to_string())),
        }
    }

    fn pacing_delay(&self) -> Duration {
        self.pacing_delay
    }

    fn set_pacing_delay(&mut self, delay: Duration) {
        self.pacing_delay = delay;
    }
}
