//! Boot-time configuration, fixed when the kernel is compiled.

use log::LevelFilter;
use crate::constants::interrupts::{KEYBOARD_IRQ, PIC_1_OFFSET, PIC_2_OFFSET};
use crate::pic::PicConfig;

/// How the keyboard driver learns about key presses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// IRQ1 fills the key event queue; the main loop halts while idle.
    Interrupt,
    /// The main loop spins on the controller's status port; CPU
    /// interrupts stay off.
    Polling,
}

#[derive(Debug, Clone, Copy)]
pub struct KernelConfig {
    pub input_mode: InputMode,
    pub log_level: LevelFilter,
    pub pic: PicConfig,
}

impl KernelConfig {
    pub const fn new(input_mode: InputMode, log_level: LevelFilter) -> Self {
        let pic = PicConfig::new(PIC_1_OFFSET, PIC_2_OFFSET);
        let pic = match input_mode {
            InputMode::Interrupt => pic.unmask(KEYBOARD_IRQ),
            InputMode::Polling => pic,
        };
        KernelConfig { input_mode, log_level, pic }
    }

    /// `polling-keyboard` feature selects polling; debug builds log at
    /// `Debug`, release builds at `Info`.
    pub const fn from_build() -> Self {
        let input_mode = if cfg!(feature = "polling-keyboard") {
            InputMode::Polling
        } else {
            InputMode::Interrupt
        };
        let log_level = if cfg!(debug_assertions) {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        };
        KernelConfig::new(input_mode, log_level)
    }

    pub const fn interrupts_enabled(&self) -> bool {
        matches!(self.input_mode, InputMode::Interrupt)
    }
}

impl Default for KernelConfig {
    fn default() -> Self {
        KernelConfig::from_build()
    }
}
