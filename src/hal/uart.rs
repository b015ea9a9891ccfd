//! Polled USART driver.
//!
//! No interrupts: the bootloader loop asks for bytes when it has time.

use avr_device::atmega128a::{USART0, USART1};
use embedded_hal::serial;

use crate::config::{CPU_FREQ_HZ, UART_BAUD};

// UCSRnA bits
const RXC: u8 = 1 << 7;
const UDRE: u8 = 1 << 5;
const FE: u8 = 1 << 4;
const DOR: u8 = 1 << 3;
const U2X: u8 = 1 << 1;
// UCSRnB bits
const RXEN: u8 = 1 << 4;
const TXEN: u8 = 1 << 3;
// UCSRnC: 8 data bits, no parity, 1 stop bit
const FORMAT_8N1: u8 = (1 << 2) | (1 << 1);

// Double-speed baud divisor
const UBRR: u16 = (CPU_FREQ_HZ / (8 * UART_BAUD) - 1) as u16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartError {
    Overrun,
    Framing,
}

pub struct Uart<USART> {
    usart: USART,
}

macro_rules! impl_uart {
    ($USART:ident, $udr:ident, $ucsra:ident, $ucsrb:ident, $ucsrc:ident, $ubrrh:ident, $ubrrl:ident) => {
        impl Uart<$USART> {
            pub fn new(usart: $USART) -> Self {
                let [high, low] = UBRR.to_be_bytes();
                unsafe {
                    usart.$ubrrh.write(|w| w.bits(high));
                    usart.$ubrrl.write(|w| w.bits(low));
                    usart.$ucsra.write(|w| w.bits(U2X));
                    usart.$ucsrc.write(|w| w.bits(FORMAT_8N1));
                    usart.$ucsrb.write(|w| w.bits(RXEN | TXEN));
                }
                Self { usart }
            }

            /// Turn the USART off and hand the peripheral back
            pub fn release(self) -> $USART {
                unsafe {
                    self.usart.$ucsrb.write(|w| w.bits(0));
                }
                self.usart
            }
        }

        impl serial::Read<u8> for Uart<$USART> {
            type Error = UartError;

            fn read(&mut self) -> nb::Result<u8, UartError> {
                let status = self.usart.$ucsra.read().bits();
                if status & RXC == 0 {
                    return Err(nb::Error::WouldBlock);
                }

                // Reading UDR clears the error flags, so sample them first
                let byte = self.usart.$udr.read().bits();
                if status & DOR != 0 {
                    Err(nb::Error::Other(UartError::Overrun))
                } else if status & FE != 0 {
                    Err(nb::Error::Other(UartError::Framing))
                } else {
                    Ok(byte)
                }
            }
        }

        impl serial::Write<u8> for Uart<$USART> {
            type Error = UartError;

            fn write(&mut self, byte: u8) -> nb::Result<(), UartError> {
                if self.usart.$ucsra.read().bits() & UDRE == 0 {
                    return Err(nb::Error::WouldBlock);
                }
                unsafe {
                    self.usart.$udr.write(|w| w.bits(byte));
                }
                Ok(())
            }

            fn flush(&mut self) -> nb::Result<(), UartError> {
                if self.usart.$ucsra.read().bits() & UDRE == 0 {
                    Err(nb::Error::WouldBlock)
                } else {
                    Ok(())
                }
            }
        }

        impl ufmt::uWrite for Uart<$USART> {
            type Error = UartError;

            fn write_str(&mut self, s: &str) -> Result<(), UartError> {
                for byte in s.bytes() {
                    nb::block!(serial::Write::write(self, byte))?;
                }
                Ok(())
            }
        }
    };
}

// USART0 carries the protocol, USART1 the debug console
impl_uart!(USART0, udr0, ucsr0a, ucsr0b, ucsr0c, ubrr0h, ubrr0l);
impl_uart!(USART1, udr1, ucsr1a, ucsr1b, ucsr1c, ubrr1h, ubrr1l);
