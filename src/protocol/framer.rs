//! Byte-by-byte packet assembly

use super::{Packet, BUFFER_SIZE, HEADER_SIZE, MAX_PAYLOAD, START_OF_PACKET};

/// Outcome of feeding one byte to the [`Framer`]
#[derive(Debug, PartialEq, Eq)]
pub enum Received<'a> {
    /// Byte was not part of any packet
    Ignored,
    /// Byte was stored, packet not complete yet
    Pending,
    /// A whole request arrived
    Packet(Packet<'a>),
    /// A request declared more payload than fits and has been swallowed
    Oversized { command: u8 },
}

pub struct Framer {
    buffer: [u8; BUFFER_SIZE],
    index: usize,
    // payload bytes still to swallow from an oversized request
    discard: usize,
}

impl Framer {
    pub const fn new() -> Self {
        Self {
            buffer: [0; BUFFER_SIZE],
            index: 0,
            discard: 0,
        }
    }

    pub fn push(&mut self, byte: u8) -> Received<'_> {
        if self.discard > 0 {
            self.discard -= 1;
            if self.discard == 0 {
                let command = self.buffer[1];
                self.index = 0;
                return Received::Oversized { command };
            }
            return Received::Pending;
        }

        if self.index == 0 && byte != START_OF_PACKET {
            return Received::Ignored;
        }

        self.buffer[self.index] = byte;
        self.index += 1;

        if self.index < HEADER_SIZE {
            return Received::Pending;
        }

        let length = self.declared_length();
        if length > MAX_PAYLOAD {
            if self.index == HEADER_SIZE {
                self.discard = length;
            }
            return Received::Pending;
        }

        if self.index == HEADER_SIZE + length {
            // Next byte must be a fresh start marker, whatever the dispatcher does
            self.index = 0;
            return Received::Packet(Packet::new(
                self.buffer[1],
                &self.buffer[HEADER_SIZE..HEADER_SIZE + length],
            ));
        }

        Received::Pending
    }

    /// Drop any partial packet and wait for a new start marker
    pub fn abort(&mut self) -> bool {
        let was_busy = self.is_busy();
        self.index = 0;
        self.discard = 0;
        was_busy
    }

    #[inline]
    pub fn is_busy(&self) -> bool {
        self.index > 0 || self.discard > 0
    }

    fn declared_length(&self) -> usize {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]]) as usize
    }
}

impl Default for Framer {
    fn default() -> Self {
        Self::new()
    }
}
