/// Fixed hardware addresses and sizes shared by the drivers

/// VGA text mode constants
pub mod vga {
    /// VGA text buffer physical address
    pub const BUFFER_ADDR: usize = 0xb8000;

    /// VGA text mode dimensions
    pub const BUFFER_HEIGHT: usize = 25;
    pub const BUFFER_WIDTH: usize = 80;

    /// CRT controller index/data ports
    pub const COMMAND_PORT: u16 = 0x3D4;
    pub const DATA_PORT: u16 = 0x3D5;

    /// Cursor control registers
    pub const CURSOR_START_REG: u8 = 0x0A;
    pub const CURSOR_END_REG: u8 = 0x0B;
    pub const CURSOR_LOCATION_HIGH: u8 = 0x0E;
    pub const CURSOR_LOCATION_LOW: u8 = 0x0F;

    /// Underline-style cursor: scanlines 14..=15
    pub const CURSOR_SCANLINE_START: u8 = 14;
    pub const CURSOR_SCANLINE_END: u8 = 15;

    /// Light grey on black
    pub const DEFAULT_ATTRIBUTE: u8 = 0x07;
}

/// PS/2 Keyboard controller constants
pub mod keyboard {
    /// PS/2 keyboard data port
    pub const DATA_PORT: u16 = 0x60;

    /// PS/2 keyboard status/command port
    pub const STATUS_COMMAND_PORT: u16 = 0x64;

    /// Status register bit flags
    pub const STATUS_OUTPUT_BUFFER_FULL: u8 = 0x01;

    /// Command to reset CPU via keyboard controller
    pub const CMD_RESET_CPU: u8 = 0xFE;

    /// Scancodes with this bit set are key releases
    pub const RELEASE_BIT: u8 = 0x80;

    pub const SCANCODE_ENTER: u8 = 0x1C;
    pub const SCANCODE_BACKSPACE: u8 = 0x0E;

    /// Pending key events the IRQ1 handler can buffer
    pub const EVENT_QUEUE_CAPACITY: usize = 16;
}

/// Interrupt constants
pub mod interrupts {
    /// PIC (Programmable Interrupt Controller) offset
    /// Vectors 0..32 belong to CPU exceptions, so IRQs start at 32
    pub const PIC_1_OFFSET: u8 = 32;
    pub const PIC_2_OFFSET: u8 = PIC_1_OFFSET + 8;

    /// Number of gates in the interrupt descriptor table
    pub const IDT_ENTRIES: usize = 256;

    /// Master PIC IRQ line the slave is chained to
    pub const CASCADE_IRQ: u8 = 2;

    /// Keyboard IRQ line on the master PIC
    pub const KEYBOARD_IRQ: u8 = 1;
}

/// Port I/O helpers
pub mod port {
    /// POST diagnostic port, written to give slow devices time to settle
    pub const POST_PORT: u16 = 0x80;
}

/// Serial debug output
pub mod serial {
    /// COM1
    pub const COM1_PORT: u16 = 0x3F8;
}

/// Line editor limits
pub mod input {
    /// Usable characters per line (a 128-byte buffer minus its terminator)
    pub const LINE_CAPACITY: usize = 127;
}
