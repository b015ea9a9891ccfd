use avr_device::atmega128a::TC0;

use super::TickSource;

#[derive(Clone, Copy)]
#[repr(u8)]
pub enum Prescaler {
    Stop = 0,
    Direct = 1,
    Div8 = 2,
    Div32 = 3,
    Div64 = 4,
    Div128 = 5,
    Div256 = 6,
    Div1024 = 7,
}

const PRESCALER_MASK: u8 = 0x07;
const TOV0: u8 = 1 << 0;

/// Timer0 in normal mode, polled for overflows.
///
/// At 16 MHz with clk/256 one overflow is 4.096 ms.
pub struct TickTimer {
    tc0: TC0,
}

impl TickTimer {
    pub fn new(tc0: TC0, prescaler: Prescaler) -> Self {
        unsafe {
            tc0.tcnt0.write(|w| w.bits(0));
            tc0.tccr0.write(|w| w.bits(prescaler as u8 & PRESCALER_MASK));
            // Writing a one clears a stale overflow flag
            tc0.tifr.write(|w| w.bits(TOV0));
        }
        Self { tc0 }
    }

    /// Stop counting and restore reset defaults before leaving the bootloader
    pub fn stop(&mut self) {
        unsafe {
            self.tc0.tccr0.write(|w| w.bits(Prescaler::Stop as u8));
            self.tc0.tcnt0.write(|w| w.bits(0));
            self.tc0.tifr.write(|w| w.bits(TOV0));
        }
    }
}

impl TickSource for TickTimer {
    fn poll_overflow(&mut self) -> bool {
        if self.tc0.tifr.read().bits() & TOV0 == 0 {
            return false;
        }
        unsafe {
            self.tc0.tifr.write(|w| w.bits(TOV0));
        }
        true
    }
}
