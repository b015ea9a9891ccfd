use std::env;

// Byte address where the boot section starts (BOOTSZ = 2048 words).
const FLASH_BYTES: u32 = 128 * 1024;
const BOOT_SIZE: u32 = 4096;

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=MCU_FREQ_HZ");

    // Pass CPU frequency for timing calculations
    let freq = env::var("MCU_FREQ_HZ").unwrap_or_else(|_| String::from("16000000"));
    println!("cargo:rustc-env=MCU_FREQ_HZ={}", freq);

    // Host builds only run the library tests, no linking for the chip
    let target = env::var("TARGET").unwrap_or_default();
    if !target.contains("avr") {
        return;
    }

    // Configure for ATmega128 and place the firmware in the boot section
    println!("cargo:rustc-link-arg-bins=-mmcu=atmega128");
    println!(
        "cargo:rustc-link-arg-bins=-Wl,--section-start=.text=0x{:X}",
        FLASH_BYTES - BOOT_SIZE
    );

    println!(
        "cargo:warning=Building bootloader for ATmega128 at {} Hz, boot section 0x{:X}",
        freq,
        FLASH_BYTES - BOOT_SIZE
    );
}
