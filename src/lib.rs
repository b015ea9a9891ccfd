//! Resident serial bootloader for the ATmega128.
//!
//! The bootloader sits in the boot section and owns the chip after reset.
//! A host that sends ACTIVATE within the boot timeout can read and rewrite
//! the application flash page by page; otherwise control passes to the
//! application at address zero.
#![cfg_attr(not(test), no_std)]
#![cfg_attr(target_arch = "avr", feature(asm_experimental_arch))]

pub mod bootloader;
pub mod config;
pub mod drivers;
pub mod hal;
pub mod logger;
pub mod protocol;

pub use bootloader::{Bootloader, Event, Launch};
pub use config::{DeviceInfo, Timing};
