use embedded_hal::digital::v2::OutputPin;

use crate::config::Timing;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedMode {
    /// Waiting for a host, even on/off blink
    Blink,
    /// Active session, short pulse lit
    FlashOn,
    /// Active session, long gap between pulses
    FlashOff,
}

/// Bootloader status LED, advanced once per tick
pub struct StatusLed<P> {
    pin: P,
    mode: LedMode,
    counter: u16,
    lit: bool,
    blink_ticks: u16,
    flash_on_ticks: u16,
    flash_off_ticks: u16,
}

impl<P: OutputPin> StatusLed<P> {
    /// Take over the pin and light it, starting in [`LedMode::Blink`]
    pub fn new(pin: P, timing: &Timing) -> Self {
        let mut led = Self {
            pin,
            mode: LedMode::Blink,
            counter: 0,
            lit: false,
            blink_ticks: timing.blink_ticks,
            flash_on_ticks: timing.flash_on_ticks,
            flash_off_ticks: timing.flash_off_ticks,
        };
        led.set(true);
        led
    }

    pub fn tick(&mut self) {
        self.counter = self.counter.saturating_add(1);

        match self.mode {
            LedMode::Blink if self.counter >= self.blink_ticks => {
                self.counter = 0;
                self.set(!self.lit);
            }
            LedMode::FlashOn if self.counter >= self.flash_on_ticks => {
                self.counter = 0;
                self.mode = LedMode::FlashOff;
                self.set(false);
            }
            LedMode::FlashOff if self.counter >= self.flash_off_ticks => {
                self.counter = 0;
                self.mode = LedMode::FlashOn;
                self.set(true);
            }
            _ => {}
        }
    }

    /// Start the active-session pulse, lit from now
    pub fn flash(&mut self) {
        self.mode = LedMode::FlashOn;
        self.counter = 0;
        self.set(true);
    }

    /// Go back to the idle blink
    pub fn blink(&mut self) {
        self.mode = LedMode::Blink;
        self.counter = 0;
    }

    pub fn off(&mut self) {
        self.set(false);
    }

    #[inline]
    pub fn mode(&self) -> LedMode {
        self.mode
    }

    #[inline]
    pub fn is_lit(&self) -> bool {
        self.lit
    }

    fn set(&mut self, lit: bool) {
        // Pin errors cannot be reported anywhere useful; the state is kept anyway
        let _ = if lit {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        };
        self.lit = lit;
    }
}
