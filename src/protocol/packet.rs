//! Request view and in-place response buffer

use super::{ProtocolError, Result, BUFFER_SIZE, ERROR_CODE, HEADER_SIZE, START_OF_PACKET};

/// One complete request, borrowed from the framer's receive buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Packet<'a> {
    pub command: u8,
    pub payload: &'a [u8],
}

impl<'a> Packet<'a> {
    pub fn new(command: u8, payload: &'a [u8]) -> Self {
        Self { command, payload }
    }
}

/// Response under construction.
///
/// The header is written by [`Response::begin`]; handlers append payload
/// and the length field follows automatically.
pub struct Response {
    buffer: [u8; BUFFER_SIZE],
    length: usize,
}

impl Response {
    pub const fn new() -> Self {
        Self {
            buffer: [0; BUFFER_SIZE],
            length: 0,
        }
    }

    /// Start a success response to `command` with an empty payload
    pub fn begin(&mut self, command: u8) {
        self.buffer[0] = START_OF_PACKET;
        self.buffer[1] = !command;
        self.length = 0;
        self.sync_length();
    }

    /// Turn the response into the error response: `0xFF`, no payload
    pub fn fail(&mut self) {
        self.buffer[1] = ERROR_CODE;
        self.length = 0;
        self.sync_length();
    }

    pub fn push(&mut self, byte: u8) -> Result<()> {
        self.extend(&[byte])
    }

    pub fn push_u16(&mut self, value: u16) -> Result<()> {
        self.extend(&value.to_be_bytes())
    }

    pub fn extend(&mut self, data: &[u8]) -> Result<()> {
        let start = HEADER_SIZE + self.length;
        let end = start + data.len();
        if end > BUFFER_SIZE {
            return Err(ProtocolError::BufferOverflow);
        }

        self.buffer[start..end].copy_from_slice(data);
        self.length += data.len();
        self.sync_length();
        Ok(())
    }

    /// Reserve `count` payload bytes and hand them out for filling
    pub fn reserve(&mut self, count: usize) -> Result<&mut [u8]> {
        let start = HEADER_SIZE + self.length;
        let end = start + count;
        if end > BUFFER_SIZE {
            return Err(ProtocolError::BufferOverflow);
        }

        self.length += count;
        self.sync_length();
        Ok(&mut self.buffer[start..end])
    }

    #[inline]
    pub fn is_error(&self) -> bool {
        self.buffer[1] == ERROR_CODE
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer[HEADER_SIZE..HEADER_SIZE + self.length]
    }

    /// The full frame as it goes on the wire
    pub fn as_bytes(&self) -> &[u8] {
        &self.buffer[..HEADER_SIZE + self.length]
    }

    fn sync_length(&mut self) {
        let [high, low] = (self.length as u16).to_be_bytes();
        self.buffer[2] = high;
        self.buffer[3] = low;
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}
