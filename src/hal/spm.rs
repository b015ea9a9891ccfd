//! Store Program Memory access for code running in the boot section.
//!
//! Every `spm` must follow the SPMCSR write within four cycles, so each
//! operation is a single `asm!` block. RAMPZ selects the upper 64 KiB.

use core::arch::asm;
use core::ptr::read_volatile;

use crate::drivers::SelfProgram;

// Data-space addresses
const SPMCSR: *const u8 = 0x68 as *const u8;
const EECR: *const u8 = 0x3C as *const u8;

// SPMCSR bits
const SPMEN: u8 = 1 << 0;
const PGERS: u8 = 1 << 1;
const PGWRT: u8 = 1 << 2;
const RWWSRE: u8 = 1 << 4;

// EECR write-in-progress
const EEWE: u8 = 1 << 1;

pub struct Spm {
    _private: (),
}

impl Spm {
    /// # Safety
    /// Only valid while executing from the boot section; there must be a
    /// single instance.
    pub unsafe fn new() -> Self {
        Self { _private: () }
    }

    #[inline(always)]
    unsafe fn command(address: u32, command: u8) {
        asm!(
            "out 0x3B, {rampz}",
            "sts 0x68, {command}",
            "spm",
            rampz = in(reg) (address >> 16) as u8,
            command = in(reg) command,
            in("Z") address as u16,
        );
    }
}

impl SelfProgram for Spm {
    fn disable_interrupts(&mut self) -> bool {
        let sreg: u8;
        unsafe {
            asm!("in {sreg}, 0x3F", "cli", sreg = out(reg) sreg);
        }
        sreg & 0x80 != 0
    }

    fn restore_interrupts(&mut self, was_enabled: bool) {
        if was_enabled {
            unsafe { avr_device::interrupt::enable() };
        }
    }

    fn wait_eeprom_idle(&mut self) {
        while unsafe { read_volatile(EECR) } & EEWE != 0 {}
    }

    fn wait_spm_idle(&mut self) {
        while unsafe { read_volatile(SPMCSR) } & SPMEN != 0 {}
    }

    fn erase_page(&mut self, address: u32) {
        unsafe { Self::command(address, PGERS | SPMEN) };
    }

    fn fill_word(&mut self, address: u32, word: u16) {
        // r0:r1 carry the word; r1 is the zero register and is cleared after
        unsafe {
            asm!(
                "movw r0, {word}",
                "sts 0x68, {command}",
                "spm",
                "clr r1",
                word = in(reg_pair) word,
                command = in(reg) SPMEN,
                in("Z") address as u16,
            );
        }
    }

    fn write_page(&mut self, address: u32) {
        unsafe { Self::command(address, PGWRT | SPMEN) };
    }

    fn enable_rww(&mut self) {
        self.wait_spm_idle();
        unsafe { Self::command(0, RWWSRE | SPMEN) };
    }

    fn read_byte(&self, address: u32) -> u8 {
        let byte: u8;
        unsafe {
            asm!(
                "out 0x3B, {rampz}",
                "elpm {byte}, Z",
                rampz = in(reg) (address >> 16) as u8,
                byte = out(reg) byte,
                in("Z") address as u16,
            );
        }
        byte
    }
}

/// Leave the bootloader through the application's reset vector
pub fn jump_to_application() -> ! {
    unsafe {
        asm!("jmp 0", options(noreturn));
    }
}
