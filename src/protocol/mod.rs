//! Host communication protocol
//!
//! Requests and responses share one framing:
//!
//! | Offset | Field   |
//! |--------|---------|
//! | 0      | start marker `0x01` |
//! | 1      | command (response: complement of request, or `0xFF`) |
//! | 2..4   | payload length, big-endian |
//! | 4..    | payload |

pub mod framer;
pub mod packet;
pub mod transport;

pub use framer::{Framer, Received};
pub use packet::{Packet, Response};
pub use transport::Transport;

use crate::config::PAGE_SIZE;

pub const START_OF_PACKET: u8 = 0x01;
pub const ERROR_CODE: u8 = 0xFF;
pub const HEADER_SIZE: usize = 4;

/// Largest payload a request or response may carry: one full page
pub const MAX_PAYLOAD: usize = PAGE_SIZE;
pub const BUFFER_SIZE: usize = HEADER_SIZE + MAX_PAYLOAD;

/// Commands below this code are accepted without an active session
pub const UNGATED_LIMIT: u8 = 0x05;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolError {
    BufferOverflow,
    InvalidPacket,
    InvalidCommand,
    Inactive,
    ProtectedRegion,
    TransportError,
}

impl ProtocolError {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProtocolError::BufferOverflow => "buffer overflow",
            ProtocolError::InvalidPacket => "invalid packet",
            ProtocolError::InvalidCommand => "invalid command",
            ProtocolError::Inactive => "session inactive",
            ProtocolError::ProtectedRegion => "protected region",
            ProtocolError::TransportError => "transport error",
        }
    }
}

pub type Result<T> = core::result::Result<T, ProtocolError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    Activate = 0x02,
    Deactivate = 0x03,
    GetVersion = 0x04,
    GetDeviceName = 0x10,
    GetModuleName = 0x11,
    GetBootSize = 0x20,
    GetFlashSize = 0x21,
    GetPageSize = 0x22,
    SetPageAddress = 0x30,
    ReadPage = 0x31,
    WritePage = 0x32,
}

impl Command {
    #[inline]
    pub const fn code(self) -> u8 {
        self as u8
    }

    /// Whether the command needs an activated session
    #[inline]
    pub const fn is_gated(self) -> bool {
        is_gated(self as u8)
    }
}

#[inline]
pub const fn is_gated(code: u8) -> bool {
    code >= UNGATED_LIMIT
}
