#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use atmega128_bootloader::config::PAGE_SIZE;
use atmega128_bootloader::drivers::SelfProgram;
use atmega128_bootloader::hal::TickSource;
use atmega128_bootloader::{Bootloader, DeviceInfo, Event, Timing};
use embedded_hal::digital::v2::OutputPin;
use embedded_hal::serial;

pub const FLASH_BYTES: usize = 128 * 1024;

pub const TIMING: Timing = Timing {
    blink_ticks: 4,
    flash_on_ticks: 2,
    flash_off_ticks: 6,
    boot_timeout_ticks: 20,
    com_timeout_ticks: 5,
};

/// First instructions of a typical application (`jmp` into the vector table)
pub const APPLICATION_STUB: [u8; 8] = [0x0C, 0x94, 0x46, 0x00, 0x0C, 0x94, 0x50, 0x00];

#[derive(Default)]
struct WireState {
    to_device: VecDeque<u8>,
    from_device: Vec<u8>,
    broken: bool,
}

/// Serial line with the host on the other end
#[derive(Clone, Default)]
pub struct Wire(Rc<RefCell<WireState>>);

impl Wire {
    pub fn host_send(&self, bytes: &[u8]) {
        self.0.borrow_mut().to_device.extend(bytes.iter().copied());
    }

    pub fn host_take(&self) -> Vec<u8> {
        std::mem::take(&mut self.0.borrow_mut().from_device)
    }

    pub fn pending(&self) -> usize {
        self.0.borrow().to_device.len()
    }

    pub fn break_tx(&self) {
        self.0.borrow_mut().broken = true;
    }
}

impl serial::Read<u8> for Wire {
    type Error = Infallible;

    fn read(&mut self) -> nb::Result<u8, Infallible> {
        self.0
            .borrow_mut()
            .to_device
            .pop_front()
            .ok_or(nb::Error::WouldBlock)
    }
}

impl serial::Write<u8> for Wire {
    type Error = ();

    fn write(&mut self, byte: u8) -> nb::Result<(), ()> {
        let mut state = self.0.borrow_mut();
        if state.broken {
            return Err(nb::Error::Other(()));
        }
        state.from_device.push(byte);
        Ok(())
    }

    fn flush(&mut self) -> nb::Result<(), ()> {
        Ok(())
    }
}

/// Timer overflows injected by the test
#[derive(Clone, Default)]
pub struct Ticks(Rc<Cell<u32>>);

impl Ticks {
    pub fn add(&self, count: u32) {
        self.0.set(self.0.get() + count);
    }
}

impl TickSource for Ticks {
    fn poll_overflow(&mut self) -> bool {
        match self.0.get() {
            0 => false,
            n => {
                self.0.set(n - 1);
                true
            }
        }
    }
}

#[derive(Clone, Default)]
pub struct Led(Rc<Cell<bool>>);

impl Led {
    pub fn is_lit(&self) -> bool {
        self.0.get()
    }
}

impl OutputPin for Led {
    type Error = Infallible;

    fn set_low(&mut self) -> Result<(), Infallible> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Infallible> {
        self.0.set(true);
        Ok(())
    }
}

/// RAM model of the SPM engine with its temporary page buffer
pub struct RamFlash {
    pub memory: Vec<u8>,
    page_buffer: Vec<u8>,
    pub interrupts_enabled: bool,
    pub unmasked_ops: usize,
    pub erases: Vec<u32>,
    pub writes: Vec<u32>,
}

impl RamFlash {
    pub fn blank() -> Self {
        Self {
            memory: vec![0xFF; FLASH_BYTES],
            page_buffer: vec![0xFF; PAGE_SIZE],
            interrupts_enabled: true,
            unmasked_ops: 0,
            erases: Vec::new(),
            writes: Vec::new(),
        }
    }

    pub fn with_application() -> Self {
        let mut flash = Self::blank();
        flash.memory[..APPLICATION_STUB.len()].copy_from_slice(&APPLICATION_STUB);
        flash
    }

    pub fn page(&self, address: u32) -> &[u8] {
        let start = address as usize;
        &self.memory[start..start + PAGE_SIZE]
    }

    fn check_masked(&mut self) {
        if self.interrupts_enabled {
            self.unmasked_ops += 1;
        }
    }

    fn page_start(address: u32) -> usize {
        address as usize & !(PAGE_SIZE - 1)
    }
}

impl SelfProgram for RamFlash {
    fn disable_interrupts(&mut self) -> bool {
        std::mem::replace(&mut self.interrupts_enabled, false)
    }

    fn restore_interrupts(&mut self, was_enabled: bool) {
        self.interrupts_enabled = was_enabled;
    }

    fn wait_eeprom_idle(&mut self) {
        self.check_masked();
    }

    fn wait_spm_idle(&mut self) {
        self.check_masked();
    }

    fn erase_page(&mut self, address: u32) {
        self.check_masked();
        let start = Self::page_start(address);
        self.memory[start..start + PAGE_SIZE].fill(0xFF);
        self.erases.push(address);
    }

    fn fill_word(&mut self, address: u32, word: u16) {
        self.check_masked();
        let offset = address as usize % PAGE_SIZE & !1;
        self.page_buffer[offset..offset + 2].copy_from_slice(&word.to_le_bytes());
    }

    fn write_page(&mut self, address: u32) {
        self.check_masked();
        let start = Self::page_start(address);
        // Flash can only clear bits, exactly like the real array
        for (cell, byte) in self.memory[start..start + PAGE_SIZE]
            .iter_mut()
            .zip(&self.page_buffer)
        {
            *cell &= *byte;
        }
        self.page_buffer.fill(0xFF);
        self.writes.push(address);
    }

    fn enable_rww(&mut self) {
        self.check_masked();
    }

    fn read_byte(&self, address: u32) -> u8 {
        self.memory.get(address as usize).copied().unwrap_or(0xFF)
    }
}

pub type TestBootloader = Bootloader<Wire, Ticks, RamFlash, Led>;

pub struct Harness {
    pub bootloader: TestBootloader,
    pub wire: Wire,
    pub ticks: Ticks,
    pub led: Led,
    pub events: Vec<Event>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_flash(RamFlash::with_application())
    }

    pub fn with_flash(flash: RamFlash) -> Self {
        let wire = Wire::default();
        let ticks = Ticks::default();
        let led = Led::default();
        let bootloader = Bootloader::new(
            wire.clone(),
            ticks.clone(),
            flash,
            led.clone(),
            &DeviceInfo::ATMEGA128,
            TIMING,
        );

        Self {
            bootloader,
            wire,
            ticks,
            led,
            events: Vec::new(),
        }
    }

    pub fn poll(&mut self) {
        if let Some(event) = self.bootloader.poll() {
            self.events.push(event);
        }
    }

    /// Put bytes on the line and poll until the device has read them all
    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.wire.host_send(bytes);
        for _ in 0..bytes.len() {
            self.poll();
        }
        assert_eq!(self.wire.pending(), 0, "device left bytes unread");
    }

    /// Send one request and return whatever the device answered
    pub fn request(&mut self, command: u8, payload: &[u8]) -> Vec<u8> {
        self.wire.host_take();
        self.send_raw(&frame(command, payload));
        self.wire.host_take()
    }

    pub fn tick(&mut self, count: u32) {
        for _ in 0..count {
            self.ticks.add(1);
            self.poll();
        }
    }

    pub fn activate(&mut self) {
        assert_eq!(self.request(0x02, &[]), [0x01, 0xFD, 0x00, 0x00]);
    }

    pub fn set_page_address(&mut self, address: u32) {
        assert_eq!(
            self.request(0x30, &address.to_be_bytes()),
            [0x01, 0xCF, 0x00, 0x00]
        );
    }

    pub fn flash(&self) -> &RamFlash {
        self.bootloader.programmer().flash()
    }
}

pub fn frame(command: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x01, command];
    bytes.extend((payload.len() as u16).to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

pub const ERROR_RESPONSE: [u8; 4] = [0x01, 0xFF, 0x00, 0x00];
