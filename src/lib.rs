//! MiniOS kernel core: interrupt table and PIC bring-up, PS/2 keyboard
//! decoding, VGA text output and the line editor that ties them together.

#![cfg_attr(not(test), no_std)]
#![feature(abi_x86_interrupt)]

pub mod config;
pub mod constants;
pub mod error;
pub mod gdt;
pub mod idt;
pub mod interrupts;
pub mod keyboard;
pub mod line_editor;
pub mod logger;
pub mod pic;
pub mod port;
pub mod serial;
pub mod shell;
pub mod vga_buffer;

use config::KernelConfig;

/// Bring the machine to the point where the line editor can run.
///
/// Order matters: the gates reference the GDT's code selector, and the PIC
/// must be remapped before interrupts are enabled at the CPU.
pub fn init(config: &KernelConfig) {
    if let Err(e) = logger::init(config.log_level) {
        crate::println!("logger: {}", e);
    }
    log::info!("booting MiniOS, input mode {:?}", config.input_mode);

    gdt::init();
    interrupts::init(config);
    vga_buffer::init();
}

pub fn hlt_loop() -> ! {
    loop {
        x86_64::instructions::hlt();
    }
}

/// Stop the processor for good. Interrupts are disabled first so nothing
/// wakes it.
pub fn halt() -> ! {
    x86_64::instructions::interrupts::disable();
    log::info!("halted");
    hlt_loop()
}
