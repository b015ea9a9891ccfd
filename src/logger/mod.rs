//! Diagnostic event log over any `ufmt` sink

use core::convert::Infallible;

use ufmt::{uDisplay, uWrite, uwrite, uwriteln, Formatter};

use crate::bootloader::{Event, Launch};
use crate::config::DeviceInfo;
use crate::protocol::ProtocolError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogType {
    System,
    Error,
    Debug,
}

impl LogType {
    fn tag(self) -> &'static str {
        match self {
            LogType::System => "[SYS] ",
            LogType::Error => "[ERR] ",
            LogType::Debug => "[DBG] ",
        }
    }
}

impl Event {
    pub fn log_type(&self) -> LogType {
        match self {
            Event::Handled { error: None, .. } => LogType::Debug,
            Event::Handled { error: Some(_), .. } | Event::SendFailed { .. } => LogType::Error,
            Event::FrameDropped => LogType::Error,
            Event::Launch(_) => LogType::System,
        }
    }
}

/// Byte printed as `0xNN`
pub struct Hex(pub u8);

impl uDisplay for Hex {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        const HEX_CHARS: [u8; 16] = *b"0123456789ABCDEF";
        let digits = [
            b'0',
            b'x',
            HEX_CHARS[(self.0 >> 4) as usize],
            HEX_CHARS[(self.0 & 0xF) as usize],
        ];
        // Only ASCII digits above
        f.write_str(core::str::from_utf8(&digits).unwrap_or("0x??"))
    }
}

impl uDisplay for ProtocolError {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        f.write_str(self.as_str())
    }
}

impl uDisplay for Launch {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            Launch::Application => f.write_str("starting application"),
            Launch::Halt => f.write_str("application flash empty, halting"),
        }
    }
}

impl uDisplay for Event {
    fn fmt<W>(&self, f: &mut Formatter<'_, W>) -> Result<(), W::Error>
    where
        W: uWrite + ?Sized,
    {
        match self {
            Event::Handled {
                command,
                error: None,
            } => uwrite!(f, "cmd {} ok", Hex(*command)),
            Event::Handled {
                command,
                error: Some(error),
            } => uwrite!(f, "cmd {} failed: {}", Hex(*command), error),
            Event::SendFailed { command } => uwrite!(f, "cmd {} reply not sent", Hex(*command)),
            Event::FrameDropped => f.write_str("com timeout, partial packet dropped"),
            Event::Launch(launch) => uwrite!(f, "boot timeout, {}", launch),
        }
    }
}

/// Sink for builds without a console
pub struct NullSink;

impl uWrite for NullSink {
    type Error = Infallible;

    fn write_str(&mut self, _: &str) -> Result<(), Infallible> {
        Ok(())
    }
}

pub struct Logger<W> {
    sink: W,
}

impl<W: uWrite> Logger<W> {
    pub fn new(sink: W) -> Self {
        Self { sink }
    }

    pub fn banner(&mut self, device: &DeviceInfo, application_empty: bool) {
        let _ = uwriteln!(
            self.sink,
            "{}{} bootloader v{} on {}",
            LogType::System.tag(),
            device.device_name,
            device.version,
            device.module_name
        );
        if application_empty {
            let _ = uwriteln!(self.sink, "{}no application programmed", LogType::System.tag());
        }
    }

    /// Write one event line; sink errors are dropped
    pub fn record(&mut self, event: &Event) {
        let _ = uwriteln!(self.sink, "{}{}", event.log_type().tag(), event);
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
