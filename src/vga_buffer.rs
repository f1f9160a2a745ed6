use core::fmt;
use volatile::Volatile;
use spin::Mutex;
use lazy_static::lazy_static;
use crate::constants::vga::{
    BUFFER_ADDR, BUFFER_HEIGHT, BUFFER_WIDTH, COMMAND_PORT, CURSOR_END_REG,
    CURSOR_LOCATION_HIGH, CURSOR_LOCATION_LOW, CURSOR_SCANLINE_END, CURSOR_SCANLINE_START,
    CURSOR_START_REG, DATA_PORT, DEFAULT_ATTRIBUTE,
};
use crate::port::{HardwarePorts, PortIo};

#[allow(dead_code)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    Blue = 1,
    Green = 2,
    Cyan = 3,
    Red = 4,
    Magenta = 5,
    Brown = 6,
    LightGray = 7,
    DarkGray = 8,
    LightBlue = 9,
    LightGreen = 10,
    LightCyan = 11,
    LightRed = 12,
    Pink = 13,
    Yellow = 14,
    White = 15,
}

/// Display attribute byte: background in the high nibble, foreground in the low.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ColorCode(u8);

impl ColorCode {
    pub const fn new(foreground: Color, background: Color) -> ColorCode {
        ColorCode((background as u8) << 4 | (foreground as u8))
    }

    pub const fn as_u8(self) -> u8 {
        self.0
    }
}

impl Default for ColorCode {
    fn default() -> Self {
        ColorCode(DEFAULT_ATTRIBUTE)
    }
}

/// One 16-bit cell: character in the low byte, attribute in the high byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct ScreenChar {
    pub ascii_character: u8,
    pub color_code: ColorCode,
}

#[repr(transparent)]
pub struct Buffer {
    chars: [[Volatile<ScreenChar>; BUFFER_WIDTH]; BUFFER_HEIGHT],
}

impl Buffer {
    /// # Safety
    ///
    /// `addr` must point to `BUFFER_WIDTH * BUFFER_HEIGHT` writable 16-bit
    /// cells that nothing else references for the rest of the program.
    pub unsafe fn at(addr: usize) -> &'static mut Buffer {
        &mut *(addr as *mut Buffer)
    }
}

/// What the line editor and the command dispatcher draw through.
pub trait TextDisplay: fmt::Write {
    /// Write one byte at the cursor, `\n` moves to the next row.
    fn put_char(&mut self, byte: u8);

    /// Blank the cell before the cursor and move the cursor onto it.
    fn erase_last(&mut self);

    fn clear(&mut self);

    fn write_text(&mut self, s: &str) {
        for byte in s.bytes() {
            self.put_char(byte);
        }
    }
}

/// Owner of the character grid and the logical + hardware cursor.
pub struct Writer<P: PortIo = HardwarePorts> {
    column_position: usize,
    row_position: usize,
    color_code: ColorCode,
    buffer: &'static mut Buffer,
    ports: P,
}

impl<P: PortIo> Writer<P> {
    pub fn new(buffer: &'static mut Buffer, ports: P) -> Self {
        Writer {
            column_position: 0,
            row_position: 0,
            color_code: ColorCode::default(),
            buffer,
            ports,
        }
    }

    /// `(row, column)` where the next character lands.
    pub fn cursor(&self) -> (usize, usize) {
        (self.row_position, self.column_position)
    }

    pub fn cell(&self, row: usize, column: usize) -> ScreenChar {
        self.buffer.chars[row][column].read()
    }

    pub fn set_color(&mut self, color_code: ColorCode) {
        self.color_code = color_code;
    }

    pub fn ports(&self) -> &P {
        &self.ports
    }

    /// Printable ASCII and `\n` are drawn as-is, `\r` is ignored and any
    /// other byte shows as a block.
    pub fn write_byte(&mut self, byte: u8) {
        match byte {
            b'\n' => self.new_line(),
            b'\r' => {}
            _ => {
                let glyph = match byte {
                    0x20..=0x7e => byte,
                    _ => 0xfe,
                };
                let row = self.row_position;
                let col = self.column_position;
                self.write_cell(row, col, glyph);
                self.column_position += 1;
                if self.column_position >= BUFFER_WIDTH {
                    self.new_line();
                }
            }
        }
        self.update_cursor();
    }

    // row may reach BUFFER_HEIGHT only inside this function
    fn new_line(&mut self) {
        self.column_position = 0;
        self.row_position += 1;
        if self.row_position >= BUFFER_HEIGHT {
            self.scroll_up();
            self.row_position = BUFFER_HEIGHT - 1;
        }
    }

    fn scroll_up(&mut self) {
        for row in 1..BUFFER_HEIGHT {
            for col in 0..BUFFER_WIDTH {
                let character = self.buffer.chars[row][col].read();
                self.buffer.chars[row - 1][col].write(character);
            }
        }
        self.clear_row(BUFFER_HEIGHT - 1);
    }

    fn write_cell(&mut self, row: usize, col: usize, byte: u8) {
        self.buffer.chars[row][col].write(ScreenChar {
            ascii_character: byte,
            color_code: self.color_code,
        });
    }

    // blank cells always carry the default attribute
    fn clear_row(&mut self, row: usize) {
        let blank = ScreenChar {
            ascii_character: b' ',
            color_code: ColorCode::default(),
        };
        for col in 0..BUFFER_WIDTH {
            self.buffer.chars[row][col].write(blank);
        }
    }

    pub fn write_string(&mut self, s: &str) {
        for byte in s.bytes() {
            self.write_byte(byte);
        }
    }

    pub fn backspace(&mut self) {
        if self.column_position > 0 {
            self.column_position -= 1;
        } else if self.row_position > 0 {
            self.row_position -= 1;
            self.column_position = BUFFER_WIDTH - 1;
        } else {
            return;
        }
        let row = self.row_position;
        let col = self.column_position;
        self.buffer.chars[row][col].write(ScreenChar {
            ascii_character: b' ',
            color_code: ColorCode::default(),
        });
        self.update_cursor();
    }

    pub fn clear_screen(&mut self) {
        for row in 0..BUFFER_HEIGHT {
            self.clear_row(row);
        }
        self.column_position = 0;
        self.row_position = 0;
        self.update_cursor();
    }

    /// Show the hardware cursor as an underline.
    pub fn enable_cursor(&mut self) {
        self.ports.write_u8(COMMAND_PORT, CURSOR_START_REG);
        let start = self.ports.read_u8(DATA_PORT);
        self.ports.write_u8(DATA_PORT, (start & 0xC0) | CURSOR_SCANLINE_START);
        self.ports.write_u8(COMMAND_PORT, CURSOR_END_REG);
        let end = self.ports.read_u8(DATA_PORT);
        self.ports.write_u8(DATA_PORT, (end & 0xE0) | CURSOR_SCANLINE_END);
    }

    fn update_cursor(&mut self) {
        let pos = (self.row_position * BUFFER_WIDTH + self.column_position) as u16;
        self.ports.write_u8(COMMAND_PORT, CURSOR_LOCATION_LOW);
        self.ports.write_u8(DATA_PORT, (pos & 0xFF) as u8);
        self.ports.write_u8(COMMAND_PORT, CURSOR_LOCATION_HIGH);
        self.ports.write_u8(DATA_PORT, (pos >> 8) as u8);
    }
}

impl<P: PortIo> fmt::Write for Writer<P> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        self.write_string(s);
        Ok(())
    }
}

impl<P: PortIo> TextDisplay for Writer<P> {
    fn put_char(&mut self, byte: u8) {
        self.write_byte(byte);
    }

    fn erase_last(&mut self) {
        self.backspace();
    }

    fn clear(&mut self) {
        self.clear_screen();
    }

    fn write_text(&mut self, s: &str) {
        self.write_string(s);
    }
}

lazy_static! {
    pub static ref WRITER: Mutex<Writer> = Mutex::new(Writer::new(
        unsafe { Buffer::at(BUFFER_ADDR) },
        unsafe { HardwarePorts::new() },
    ));
}

/// Clear the screen and turn on the hardware cursor.
pub fn init() {
    let mut writer = WRITER.lock();
    writer.enable_cursor();
    writer.clear_screen();
}

/// Handle to the global writer; locks it for each call only.
#[derive(Debug, Default, Clone, Copy)]
pub struct Screen;

impl fmt::Write for Screen {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        WRITER.lock().write_string(s);
        Ok(())
    }
}

impl TextDisplay for Screen {
    fn put_char(&mut self, byte: u8) {
        WRITER.lock().write_byte(byte);
    }

    fn erase_last(&mut self) {
        WRITER.lock().backspace();
    }

    fn clear(&mut self) {
        WRITER.lock().clear_screen();
    }

    fn write_text(&mut self, s: &str) {
        WRITER.lock().write_string(s);
    }
}

#[macro_export]
macro_rules! print {
    ($($arg:tt)*) => ($crate::vga_buffer::_print(format_args!($($arg)*)));
}

#[macro_export]
macro_rules! println {
    () => ($crate::print!("\n"));
    ($($arg:tt)*) => ($crate::print!("{}\n", format_args!($($arg)*)));
}

#[doc(hidden)]
pub fn _print(args: core::fmt::Arguments) {
    use core::fmt::Write;
    // Writer::write_str never fails
    let _ = WRITER.lock().write_fmt(args);
}
