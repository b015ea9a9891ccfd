//! Bootloader firmware entry point.
//!
//! Fuses: BOOTSZ = 2048 words (boot section at 0x1F000) and BOOTRST
//! programmed, so reset lands here instead of at address zero.
#![cfg_attr(target_arch = "avr", no_std)]
#![cfg_attr(target_arch = "avr", no_main)]

#[cfg(target_arch = "avr")]
mod firmware {
    use panic_halt as _;

    use avr_device::atmega128a::Peripherals;
    use atmega128_bootloader::{
        hal::{jump_to_application, timer::Prescaler, LedPin, Spm, TickTimer, Uart, Watchdog},
        logger::Logger,
        Bootloader, DeviceInfo, Event, Launch, Timing,
    };

    #[avr_device::entry]
    fn main() -> ! {
        let dp = match Peripherals::take() {
            Some(dp) => dp,
            None => loop {},
        };

        Watchdog::new(dp.WDT).disable(&dp.CPU);

        #[cfg(feature = "debug")]
        let mut log = Logger::new(Uart::new(dp.USART1));
        #[cfg(not(feature = "debug"))]
        let mut log = Logger::new(atmega128_bootloader::logger::NullSink);

        let transport = Uart::new(dp.USART0);
        let ticker = TickTimer::new(dp.TC0, Prescaler::Div256);
        let flash = unsafe { Spm::new() };
        let led = LedPin::<0>::new(dp.PORTA);

        let mut bootloader = Bootloader::new(
            transport,
            ticker,
            flash,
            led,
            &DeviceInfo::ATMEGA128,
            Timing::default(),
        );

        log.banner(bootloader.device(), bootloader.programmer().is_flash_empty());

        let target = loop {
            match bootloader.poll() {
                Some(Event::Launch(target)) => break target,
                Some(event) => log.record(&event),
                None => {}
            }
        };
        log.record(&Event::Launch(target));

        // Leave the peripherals the way reset would
        let (transport, mut ticker) = bootloader.release();
        ticker.stop();
        let _ = transport.release();
        #[cfg(feature = "debug")]
        let _ = log.into_inner().release();

        match target {
            Launch::Application => jump_to_application(),
            Launch::Halt => loop {},
        }
    }
}

#[cfg(not(target_arch = "avr"))]
fn main() {}
