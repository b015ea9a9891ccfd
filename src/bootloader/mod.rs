//! Resident bootloader engine
//!
//! [`Bootloader::poll`] is the whole scheduler: each call looks at the tick
//! flag once and at the transport once, then returns. Nothing in here waits
//! on the host.

pub mod commands;
pub mod session;

pub use session::{Expired, Session};

use embedded_hal::digital::v2::OutputPin;

use crate::config::{DeviceInfo, Timing};
use crate::drivers::{PageProgrammer, SelfProgram, StatusLed};
use crate::hal::TickSource;
use crate::protocol::{Framer, ProtocolError, Received, Response, Transport};
use commands::Target;

/// Where control goes once the bootloader gives up waiting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Launch {
    /// Jump to address zero
    Application,
    /// Application region is blank; park the CPU
    Halt,
}

/// Something worth logging that happened during one poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// A request was answered; `error` is set when the reply was `0xFF`
    Handled {
        command: u8,
        error: Option<ProtocolError>,
    },
    /// The reply could not be sent
    SendFailed { command: u8 },
    /// A partial packet was thrown away after the host went quiet
    FrameDropped,
    Launch(Launch),
}

pub struct Bootloader<T, K, F, P> {
    transport: T,
    ticker: K,
    framer: Framer,
    response: Response,
    session: Session,
    led: StatusLed<P>,
    programmer: PageProgrammer<F>,
    page_address: u32,
    device: &'static DeviceInfo,
    timing: Timing,
    launched: bool,
}

impl<T, K, F, P> Bootloader<T, K, F, P>
where
    T: Transport,
    K: TickSource,
    F: SelfProgram,
    P: OutputPin,
{
    pub fn new(
        transport: T,
        ticker: K,
        flash: F,
        led_pin: P,
        device: &'static DeviceInfo,
        timing: Timing,
    ) -> Self {
        Self {
            transport,
            ticker,
            framer: Framer::new(),
            response: Response::new(),
            session: Session::new(),
            led: StatusLed::new(led_pin, &timing),
            programmer: PageProgrammer::new(flash),
            page_address: 0,
            device,
            timing,
            launched: false,
        }
    }

    /// One pass of the event loop.
    ///
    /// Returns [`Event::Launch`] exactly once, when the boot timeout runs out;
    /// after that the bootloader stays inert.
    pub fn poll(&mut self) -> Option<Event> {
        if self.launched {
            return None;
        }

        let mut event = None;

        if self.ticker.poll_overflow() {
            let expired = self.session.tick(&self.timing);
            if expired.boot {
                return Some(Event::Launch(self.launch()));
            }

            self.led.tick();

            if expired.com && self.framer.abort() {
                event = Some(Event::FrameDropped);
            }
        }

        if let Some(byte) = self.transport.try_receive_byte() {
            if let Some(handled) = self.receive(byte) {
                event = Some(handled);
            }
        }

        event
    }

    fn receive(&mut self, byte: u8) -> Option<Event> {
        let Self {
            transport,
            framer,
            response,
            session,
            led,
            programmer,
            page_address,
            device,
            ..
        } = self;

        let outcome = match framer.push(byte) {
            Received::Ignored => return None,
            Received::Pending => {
                session.byte_received();
                return None;
            }
            Received::Packet(packet) => {
                let mut target = Target {
                    session: &mut *session,
                    led,
                    programmer,
                    page_address,
                    device: *device,
                };
                let outcome = commands::dispatch(&mut target, &packet, response);
                (packet.command, outcome)
            }
            Received::Oversized { command } => {
                response.begin(command);
                response.fail();
                (command, Err(ProtocolError::BufferOverflow))
            }
        };

        session.byte_received();

        let (command, outcome) = outcome;
        if transport.send(response.as_bytes()).is_err() {
            return Some(Event::SendFailed { command });
        }

        Some(Event::Handled {
            command,
            error: outcome.err(),
        })
    }

    fn launch(&mut self) -> Launch {
        self.launched = true;
        self.led.off();

        if self.programmer.is_flash_empty() {
            Launch::Halt
        } else {
            Launch::Application
        }
    }

    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    #[inline]
    pub fn led(&self) -> &StatusLed<P> {
        &self.led
    }

    #[inline]
    pub fn page_address(&self) -> u32 {
        self.page_address
    }

    #[inline]
    pub fn programmer(&self) -> &PageProgrammer<F> {
        &self.programmer
    }

    #[inline]
    pub fn has_launched(&self) -> bool {
        self.launched
    }

    pub fn device(&self) -> &'static DeviceInfo {
        self.device
    }

    /// Give back the transport and tick source so they can be reset
    /// before the application starts
    pub fn release(self) -> (T, K) {
        (self.transport, self.ticker)
    }
}
