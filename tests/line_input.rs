//! Scancodes in, rendered text and dispatched lines out, with the hardware
//! replaced by scripted ports and a heap-backed character grid.

use std::collections::VecDeque;

use minios::constants::keyboard::{DATA_PORT, STATUS_COMMAND_PORT};
use minios::constants::vga::{BUFFER_HEIGHT, BUFFER_WIDTH};
use minios::keyboard::PolledKeyboard;
use minios::line_editor::{Dispatcher, LineEditor};
use minios::port::PortIo;
use minios::shell::Shell;
use minios::vga_buffer::{Buffer, TextDisplay, Writer};

/// Controller that always has the next scripted byte ready.
#[derive(Default)]
struct ScriptedController {
    scancodes: VecDeque<u8>,
}

impl PortIo for ScriptedController {
    fn read_u8(&mut self, port: u16) -> u8 {
        match port {
            STATUS_COMMAND_PORT => u8::from(!self.scancodes.is_empty()),
            DATA_PORT => self.scancodes.pop_front().expect("data read without status"),
            _ => 0,
        }
    }

    fn write_u8(&mut self, _port: u16, _value: u8) {}
}

#[derive(Default)]
struct NullPorts;

impl PortIo for NullPorts {
    fn read_u8(&mut self, _port: u16) -> u8 {
        0
    }

    fn write_u8(&mut self, _port: u16, _value: u8) {}
}

fn screen() -> Writer<NullPorts> {
    let cells: &'static mut [[u16; BUFFER_WIDTH]; BUFFER_HEIGHT] =
        Box::leak(Box::new([[0; BUFFER_WIDTH]; BUFFER_HEIGHT]));
    let buffer = unsafe { Buffer::at(cells.as_mut_ptr() as usize) };
    let mut writer = Writer::new(buffer, NullPorts);
    writer.clear();
    writer
}

fn row(writer: &Writer<NullPorts>, row: usize) -> String {
    let text: String = (0..BUFFER_WIDTH)
        .map(|col| writer.cell(row, col).ascii_character as char)
        .collect();
    text.trim_end().to_string()
}

fn keyboard(scancodes: &[u8]) -> PolledKeyboard<ScriptedController> {
    PolledKeyboard::with_ports(ScriptedController {
        scancodes: scancodes.iter().copied().collect(),
    })
}

#[test]
fn typed_line_reaches_the_dispatcher() {
    // "echo hi", with a typo fixed by backspace, key releases interleaved
    let scancodes = [
        0x12, 0x92, 0x2E, 0xAE, 0x23, 0xA3, 0x18, 0x98, 0x39, 0xB9, // e c h o ' '
        0x23, 0xA3, 0x22, 0xA2, 0x0E, 0x8E, 0x17, 0x97, 0x1C, 0x9C, // h g <bs> i <enter>
    ];
    let mut keys = keyboard(&scancodes);
    let mut display = screen();
    let mut shell = Shell::new();
    let mut editor: LineEditor = LineEditor::new();

    shell.prompt(&mut display);
    let line = editor.read_line(&mut keys, &mut display);
    assert_eq!(line, "echo hi");
    shell.dispatch(line, &mut display);

    assert_eq!(row(&display, 0), "MiniOS $ echo hi");
    assert_eq!(row(&display, 1), "hi");
    assert_eq!(display.cursor(), (2, 0));
}

#[test]
fn two_lines_in_a_row() {
    let scancodes = [0x1E, 0x1C, 0x30, 0x30, 0x1C];
    let mut keys = keyboard(&scancodes);
    let mut display = screen();
    let mut editor: LineEditor = LineEditor::new();

    assert_eq!(editor.read_line(&mut keys, &mut display), "a");
    assert_eq!(editor.read_line(&mut keys, &mut display), "bb");
    assert_eq!(row(&display, 0), "a");
    assert_eq!(row(&display, 1), "bb");
}

#[test]
fn long_output_scrolls_instead_of_overrunning() {
    let mut display = screen();
    for i in 0..(BUFFER_HEIGHT + 5) {
        display.write_text(&format!("line {}\n", i));
    }
    assert_eq!(row(&display, 0), "line 6");
    assert_eq!(row(&display, BUFFER_HEIGHT - 2), format!("line {}", BUFFER_HEIGHT + 4));
    assert_eq!(display.cursor(), (BUFFER_HEIGHT - 1, 0));
}
