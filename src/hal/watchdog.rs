use avr_device::atmega128a::{CPU, WDT};

// WDTCR bits
const WDCE: u8 = 1 << 4;
const WDE: u8 = 1 << 3;
// MCUCSR watchdog reset flag
const WDRF: u8 = 1 << 3;

pub struct Watchdog {
    wdt: WDT,
}

impl Watchdog {
    #[inline]
    pub fn new(wdt: WDT) -> Self {
        Self { wdt }
    }

    /// Switch the watchdog off.
    ///
    /// An application that reset through the watchdog leaves it running;
    /// the bootloader would otherwise be reset before any host shows up.
    #[inline]
    pub fn disable(&mut self, cpu: &CPU) {
        avr_device::interrupt::free(|_| unsafe {
            cpu.mcucsr.modify(|r, w| w.bits(r.bits() & !WDRF));
            // Timed sequence to disable watchdog
            self.wdt.wdtcr.write(|w| w.bits(WDCE | WDE));
            self.wdt.wdtcr.write(|w| w.bits(0x00));
        });
    }
}
