//! Transport layer implementation

use embedded_hal::serial;

use super::{ProtocolError, Result};

/// Byte link to the host.
///
/// Receiving never blocks. Sending may block until the whole frame is out.
pub trait Transport {
    fn try_receive_byte(&mut self) -> Option<u8>;
    fn send(&mut self, bytes: &[u8]) -> Result<()>;
}

/// Any embedded-hal serial device can carry the protocol.
///
/// Receive errors (overrun, framing) read as "no byte"; the communication
/// timeout resynchronises the framer afterwards.
impl<S> Transport for S
where
    S: serial::Read<u8> + serial::Write<u8>,
{
    fn try_receive_byte(&mut self) -> Option<u8> {
        match self.read() {
            Ok(byte) => Some(byte),
            Err(nb::Error::WouldBlock) | Err(nb::Error::Other(_)) => None,
        }
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        for &byte in bytes {
            nb::block!(self.write(byte)).map_err(|_| ProtocolError::TransportError)?;
        }
        nb::block!(self.flush()).map_err(|_| ProtocolError::TransportError)
    }
}
