//! Configuration constants for the ATmega128 bootloader

/// CPU frequency in Hz, taken from `MCU_FREQ_HZ` at build time
pub const CPU_FREQ_HZ: u32 = parse_hz(env!("MCU_FREQ_HZ"), 16_000_000);

/// UART baud rate (double-speed mode)
pub const UART_BAUD: u32 = 115_200;

/// Bootloader version reported by GET_VERSION
pub const BOOTLOADER_VERSION: u8 = 1;

/// Flash size in KiB
pub const FLASH_SIZE_KB: u16 = 128;

/// SPM page size in bytes
pub const PAGE_SIZE: usize = 256;

/// Bytes reserved for the boot section
pub const BOOT_SIZE: u16 = 4096;

pub const DEVICE_NAME: &str = "ATmega128";
pub const MODULE_NAME: &str = "BIGAVR2";

/// Timer0 runs from clk/256 and overflows every 256 counts
pub const TIMER_PRESCALER: u32 = 256;
pub const TIMER_OVERFLOW: u32 = 256;

/// Seconds without activation before the application is started
pub const BOOT_TIMEOUT_S: u16 = 3;

/// Seconds of silence before a partial packet is dropped
pub const COM_TIMEOUT_S: u16 = 2;

/// Tick thresholds for the LED and both timeouts.
///
/// One tick is one Timer0 overflow. All counters in the bootloader compare
/// against these values, so tests can shrink them freely.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Half period of the idle blink (2 Hz on/off)
    pub blink_ticks: u16,
    /// On time of the active-session pulse
    pub flash_on_ticks: u16,
    /// Off time of the active-session pulse, completing one second
    pub flash_off_ticks: u16,
    pub boot_timeout_ticks: u16,
    pub com_timeout_ticks: u16,
}

impl Timing {
    pub const fn from_clock(cpu_freq_hz: u32) -> Self {
        let per_second = cpu_freq_hz / (TIMER_PRESCALER * TIMER_OVERFLOW);
        let flash_on = per_second / 8;

        Self {
            blink_ticks: ticks(per_second / 4),
            flash_on_ticks: ticks(flash_on),
            flash_off_ticks: ticks(per_second - flash_on),
            boot_timeout_ticks: ticks(per_second.saturating_mul(BOOT_TIMEOUT_S as u32)),
            com_timeout_ticks: ticks(per_second.saturating_mul(COM_TIMEOUT_S as u32)),
        }
    }
}

/// Clamp a tick count into `1..=u16::MAX`; a zero threshold would expire on
/// the first tick
const fn ticks(count: u32) -> u16 {
    if count == 0 {
        1
    } else if count > u16::MAX as u32 {
        u16::MAX
    } else {
        count as u16
    }
}

// Below one overflow per second every timeout collapses to a single tick
const _: () = assert!(
    CPU_FREQ_HZ >= TIMER_PRESCALER * TIMER_OVERFLOW,
    "MCU_FREQ_HZ is below one timer overflow per second"
);

impl Default for Timing {
    fn default() -> Self {
        Self::from_clock(CPU_FREQ_HZ)
    }
}

/// Fixed facts about the chip, reported to the host verbatim
#[derive(Debug, Clone, Copy)]
pub struct DeviceInfo {
    pub version: u8,
    pub device_name: &'static str,
    pub module_name: &'static str,
    pub boot_size: u16,
    pub flash_size_kb: u16,
    pub page_size: u16,
}

impl DeviceInfo {
    pub const ATMEGA128: DeviceInfo = DeviceInfo {
        version: BOOTLOADER_VERSION,
        device_name: DEVICE_NAME,
        module_name: MODULE_NAME,
        boot_size: BOOT_SIZE,
        flash_size_kb: FLASH_SIZE_KB,
        page_size: PAGE_SIZE as u16,
    };

    /// First byte address of the boot section
    pub const fn boot_start(&self) -> u32 {
        self.flash_size_kb as u32 * 1024 - self.boot_size as u32
    }
}

const fn parse_hz(text: &str, fallback: u32) -> u32 {
    let bytes = text.as_bytes();
    if bytes.is_empty() {
        return fallback;
    }

    let mut value: u32 = 0;
    let mut i = 0;
    while i < bytes.len() {
        let digit = bytes[i];
        if digit < b'0' || digit > b'9' {
            return fallback;
        }
        value = value * 10 + (digit - b'0') as u32;
        i += 1;
    }
    value
}
