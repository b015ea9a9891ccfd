//! Self-programming of the application flash
//!
//! The SPM engine is shared with anything else that touches flash or EEPROM,
//! so a whole erase/fill/write runs with interrupts masked. The prior
//! interrupt state comes back when [`InterruptsMasked`] is dropped, on every
//! exit path.

use core::ops::{Deref, DerefMut};

use crate::config::PAGE_SIZE;

/// Value of an erased flash byte
pub const ERASED: u8 = 0xFF;

/// Bytes checked by [`PageProgrammer::is_flash_empty`]
const EMPTY_PROBE_LEN: u32 = 8;

/// Hardware operations of the self-programming engine.
///
/// Addresses are byte addresses. `erase_page` and `write_page` start an
/// operation; completion is awaited with `wait_spm_idle`.
pub trait SelfProgram {
    /// Mask interrupts, returning whether they were enabled before
    fn disable_interrupts(&mut self) -> bool;
    fn restore_interrupts(&mut self, was_enabled: bool);

    fn wait_eeprom_idle(&mut self);
    fn wait_spm_idle(&mut self);

    fn erase_page(&mut self, address: u32);
    /// Load one little-endian word into the temporary page buffer
    fn fill_word(&mut self, address: u32, word: u16);
    fn write_page(&mut self, address: u32);
    /// Make the read-while-write section readable again
    fn enable_rww(&mut self);

    fn read_byte(&self, address: u32) -> u8;
}

/// Scoped interrupt mask around a [`SelfProgram`] device
pub struct InterruptsMasked<'a, F: SelfProgram> {
    flash: &'a mut F,
    was_enabled: bool,
}

impl<'a, F: SelfProgram> InterruptsMasked<'a, F> {
    pub fn new(flash: &'a mut F) -> Self {
        let was_enabled = flash.disable_interrupts();
        Self { flash, was_enabled }
    }
}

impl<F: SelfProgram> Deref for InterruptsMasked<'_, F> {
    type Target = F;

    fn deref(&self) -> &F {
        &*self.flash
    }
}

impl<F: SelfProgram> DerefMut for InterruptsMasked<'_, F> {
    fn deref_mut(&mut self) -> &mut F {
        &mut *self.flash
    }
}

impl<F: SelfProgram> Drop for InterruptsMasked<'_, F> {
    fn drop(&mut self) {
        self.flash.restore_interrupts(self.was_enabled);
    }
}

pub struct PageProgrammer<F> {
    flash: F,
}

impl<F: SelfProgram> PageProgrammer<F> {
    pub fn new(flash: F) -> Self {
        Self { flash }
    }

    /// Overwrite the page containing `address` with `data`, padded with 0xFF.
    ///
    /// At most one page of `data` is used. A misaligned address programs the
    /// page it falls in.
    pub fn program(&mut self, address: u32, data: &[u8]) {
        let page = page_base(address);
        let mut words = PageWords::new(&data[..data.len().min(PAGE_SIZE)]);

        let mut flash = InterruptsMasked::new(&mut self.flash);

        flash.wait_eeprom_idle();
        flash.erase_page(page);
        flash.wait_spm_idle();

        for offset in (0..PAGE_SIZE as u32).step_by(2) {
            flash.fill_word(page + offset, words.next_word());
        }

        flash.write_page(page);
        flash.wait_spm_idle();
        flash.enable_rww();
    }

    /// Copy `buffer.len()` bytes of flash starting at `address`
    pub fn read(&self, address: u32, buffer: &mut [u8]) {
        for (i, byte) in buffer.iter_mut().enumerate() {
            *byte = self.flash.read_byte(address.wrapping_add(i as u32));
        }
    }

    /// True when the application region looks never programmed
    pub fn is_flash_empty(&self) -> bool {
        (0..EMPTY_PROBE_LEN).all(|address| self.flash.read_byte(address) == ERASED)
    }

    pub fn flash(&self) -> &F {
        &self.flash
    }
}

#[inline]
pub const fn page_base(address: u32) -> u32 {
    address & !(PAGE_SIZE as u32 - 1)
}

/// Packs page data into little-endian words, padding with 0xFF
struct PageWords<'a> {
    data: &'a [u8],
}

impl<'a> PageWords<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn next_word(&mut self) -> u16 {
        let data = self.data;
        match data {
            [low, high, rest @ ..] => {
                self.data = rest;
                u16::from_le_bytes([*low, *high])
            }
            [low] => {
                self.data = &[];
                u16::from_le_bytes([*low, ERASED])
            }
            [] => 0xFFFF,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    enum Op {
        EepromWait,
        Erase(u32),
        Fill(u32, u16),
        Write(u32),
        SpmWait,
        Rww,
    }

    struct FakeFlash {
        memory: Vec<u8>,
        buffer: [u8; PAGE_SIZE],
        interrupts: bool,
        ops: Vec<(Op, bool)>,
    }

    impl FakeFlash {
        fn new(interrupts: bool) -> Self {
            Self {
                memory: vec![0x00; PAGE_SIZE * 4],
                buffer: [ERASED; PAGE_SIZE],
                interrupts,
                ops: Vec::new(),
            }
        }

        fn record(&mut self, op: Op) {
            self.ops.push((op, self.interrupts));
        }
    }

    impl SelfProgram for FakeFlash {
        fn disable_interrupts(&mut self) -> bool {
            core::mem::replace(&mut self.interrupts, false)
        }

        fn restore_interrupts(&mut self, was_enabled: bool) {
            self.interrupts = was_enabled;
        }

        fn wait_eeprom_idle(&mut self) {
            self.record(Op::EepromWait);
        }

        fn wait_spm_idle(&mut self) {
            self.record(Op::SpmWait);
        }

        fn erase_page(&mut self, address: u32) {
            let start = address as usize;
            self.memory[start..start + PAGE_SIZE].fill(ERASED);
            self.record(Op::Erase(address));
        }

        fn fill_word(&mut self, address: u32, word: u16) {
            let offset = address as usize % PAGE_SIZE;
            self.buffer[offset..offset + 2].copy_from_slice(&word.to_le_bytes());
            self.record(Op::Fill(address, word));
        }

        fn write_page(&mut self, address: u32) {
            let start = address as usize;
            self.memory[start..start + PAGE_SIZE].copy_from_slice(&self.buffer);
            self.buffer = [ERASED; PAGE_SIZE];
            self.record(Op::Write(address));
        }

        fn enable_rww(&mut self) {
            self.record(Op::Rww);
        }

        fn read_byte(&self, address: u32) -> u8 {
            self.memory.get(address as usize).copied().unwrap_or(ERASED)
        }
    }

    #[test]
    fn short_data_is_padded_with_erased_bytes() {
        let mut programmer = PageProgrammer::new(FakeFlash::new(true));
        programmer.program(0x100, &[0x11, 0x22, 0x33]);

        let mut page = [0u8; PAGE_SIZE];
        programmer.read(0x100, &mut page);
        assert_eq!(&page[..3], &[0x11, 0x22, 0x33]);
        assert!(page[3..].iter().all(|&b| b == ERASED));

        // Neighbouring pages are untouched
        assert_eq!(programmer.flash().read_byte(0xFF), 0x00);
        assert_eq!(programmer.flash().read_byte(0x200), 0x00);
    }

    #[test]
    fn words_are_little_endian() {
        let mut programmer = PageProgrammer::new(FakeFlash::new(true));
        programmer.program(0, &[0x11, 0x22, 0x33]);

        let fills: Vec<_> = programmer
            .flash()
            .ops
            .iter()
            .filter_map(|(op, _)| match op {
                Op::Fill(address, word) => Some((*address, *word)),
                _ => None,
            })
            .collect();

        assert_eq!(fills.len(), PAGE_SIZE / 2);
        assert_eq!(fills[0], (0, 0x2211));
        assert_eq!(fills[1], (2, 0xFF33));
        assert_eq!(fills[2], (4, 0xFFFF));
    }

    #[test]
    fn sequence_runs_with_interrupts_masked() {
        let mut programmer = PageProgrammer::new(FakeFlash::new(true));
        programmer.program(0x200, &[0xAA; PAGE_SIZE]);

        let flash = programmer.flash();
        assert!(flash.ops.iter().all(|(_, interrupts)| !interrupts));
        assert!(flash.interrupts, "interrupt state not restored");

        let ops: Vec<_> = flash
            .ops
            .iter()
            .map(|(op, _)| op)
            .filter(|op| !matches!(op, Op::Fill(..)))
            .collect();
        assert_eq!(
            ops,
            [
                &Op::EepromWait,
                &Op::Erase(0x200),
                &Op::SpmWait,
                &Op::Write(0x200),
                &Op::SpmWait,
                &Op::Rww,
            ]
        );
    }

    #[test]
    fn masked_caller_stays_masked() {
        let mut programmer = PageProgrammer::new(FakeFlash::new(false));
        programmer.program(0, &[]);
        assert!(!programmer.flash().interrupts);
    }

    #[test]
    fn empty_data_erases_the_page() {
        let mut programmer = PageProgrammer::new(FakeFlash::new(true));
        programmer.program(0, &[]);

        let mut page = [0u8; PAGE_SIZE];
        programmer.read(0, &mut page);
        assert_eq!(page, [ERASED; PAGE_SIZE]);
    }

    #[test]
    fn misaligned_address_programs_containing_page() {
        let mut programmer = PageProgrammer::new(FakeFlash::new(true));
        programmer.program(0x105, &[0x42]);

        assert_eq!(programmer.flash().read_byte(0x100), 0x42);
        assert_eq!(programmer.flash().read_byte(0x105), ERASED);
        assert_eq!(programmer.flash().read_byte(0x200), 0x00);
    }

    #[test]
    fn data_beyond_one_page_is_ignored() {
        let mut programmer = PageProgrammer::new(FakeFlash::new(true));
        programmer.program(0, &[0x5A; PAGE_SIZE + 10]);

        assert_eq!(programmer.flash().read_byte(PAGE_SIZE as u32 - 1), 0x5A);
        assert_eq!(programmer.flash().read_byte(PAGE_SIZE as u32), 0x00);
    }

    #[test]
    fn empty_flash_detection() {
        let mut programmer = PageProgrammer::new(FakeFlash::new(true));
        assert!(!programmer.is_flash_empty());

        programmer.program(0, &[]);
        assert!(programmer.is_flash_empty());

        programmer.program(0, &[0xFF; 7]);
        assert!(programmer.is_flash_empty());

        programmer.program(0, &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0x0C]);
        assert!(!programmer.is_flash_empty());
    }
}
