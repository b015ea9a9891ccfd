//! Hardware bindings for the ATmega128.
//!
//! Only [`TickSource`] is portable; the peripheral drivers exist for AVR
//! builds only.

#[cfg(target_arch = "avr")]
pub mod gpio;
#[cfg(target_arch = "avr")]
pub mod spm;
#[cfg(target_arch = "avr")]
pub mod timer;
#[cfg(target_arch = "avr")]
pub mod uart;
#[cfg(target_arch = "avr")]
pub mod watchdog;

#[cfg(target_arch = "avr")]
pub use gpio::LedPin;
#[cfg(target_arch = "avr")]
pub use spm::{jump_to_application, Spm};
#[cfg(target_arch = "avr")]
pub use timer::TickTimer;
#[cfg(target_arch = "avr")]
pub use uart::Uart;
#[cfg(target_arch = "avr")]
pub use watchdog::Watchdog;

/// Periodic time base for all bootloader counters
pub trait TickSource {
    /// Consume a pending overflow, if any
    fn poll_overflow(&mut self) -> bool;
}
