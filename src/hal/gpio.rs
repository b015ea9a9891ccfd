use avr_device::atmega128a::PORTA;
use core::convert::Infallible;
use embedded_hal::digital::v2::OutputPin;

/// Status LED on PORTA, pin `P` (LED0 on the BIGAVR2 board is PA0)
pub struct LedPin<const P: u8> {
    port: PORTA,
}

impl<const P: u8> LedPin<P> {
    pub fn new(port: PORTA) -> Self {
        unsafe {
            port.ddra.modify(|r, w| w.bits(r.bits() | (1 << P)));
        }
        Self { port }
    }
}

impl<const P: u8> OutputPin for LedPin<P> {
    type Error = Infallible;

    #[inline]
    fn set_low(&mut self) -> Result<(), Infallible> {
        unsafe {
            self.port.porta.modify(|r, w| w.bits(r.bits() & !(1 << P)));
        }
        Ok(())
    }

    #[inline]
    fn set_high(&mut self) -> Result<(), Infallible> {
        unsafe {
            self.port.porta.modify(|r, w| w.bits(r.bits() | (1 << P)));
        }
        Ok(())
    }
}
