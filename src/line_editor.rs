//! Turns key events into one submitted line at a time.

use core::str;
use crate::constants::input::LINE_CAPACITY;
use crate::error::InputError;
use crate::keyboard::{KeyEvent, KeySource};
use crate::vga_buffer::TextDisplay;

/// ASCII text with a fixed capacity; never grows past `N` bytes.
pub struct LineBuffer<const N: usize> {
    bytes: [u8; N],
    len: usize,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        LineBuffer { bytes: [0; N], len: 0 }
    }

    pub fn push(&mut self, byte: u8) -> Result<(), InputError> {
        if self.len == N {
            return Err(InputError::LineFull);
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        Ok(())
    }

    pub fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        self.len -= 1;
        Some(self.bytes[self.len])
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    pub fn as_str(&self) -> &str {
        // only printable ASCII is ever pushed by the editor
        str::from_utf8(&self.bytes[..self.len]).unwrap_or("")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorState {
    Editing,
    Submitted,
}

/// Receives each submitted line. Implemented by the shell.
pub trait Dispatcher {
    /// Printed before the editor starts collecting a line.
    fn prompt(&mut self, display: &mut dyn TextDisplay);

    fn dispatch(&mut self, line: &str, display: &mut dyn TextDisplay);
}

pub struct LineEditor<const N: usize = LINE_CAPACITY> {
    buffer: LineBuffer<N>,
    state: EditorState,
}

impl<const N: usize> LineEditor<N> {
    pub const fn new() -> Self {
        LineEditor {
            buffer: LineBuffer::new(),
            state: EditorState::Editing,
        }
    }

    pub fn state(&self) -> EditorState {
        self.state
    }

    /// Text typed so far (or the submitted line, until the next event).
    pub fn line(&self) -> &str {
        self.buffer.as_str()
    }

    /// Apply one key event, mirroring it on `display`.
    pub fn apply<D: TextDisplay + ?Sized>(&mut self, event: KeyEvent, display: &mut D) -> EditorState {
        if self.state == EditorState::Submitted {
            self.buffer.clear();
            self.state = EditorState::Editing;
        }

        match event {
            KeyEvent::Char(c) if c == ' ' || c.is_ascii_graphic() => {
                // a full line swallows further characters
                if self.buffer.push(c as u8).is_ok() {
                    display.put_char(c as u8);
                }
            }
            KeyEvent::Char(_) => {}
            KeyEvent::Backspace => {
                if self.buffer.pop().is_some() {
                    display.erase_last();
                }
            }
            KeyEvent::Enter => {
                display.put_char(b'\n');
                self.state = EditorState::Submitted;
            }
        }
        self.state
    }

    /// Block until Enter, then return the line. The buffer is reset when the
    /// next event arrives.
    pub fn read_line<S, D>(&mut self, keys: &mut S, display: &mut D) -> &str
    where
        S: KeySource + ?Sized,
        D: TextDisplay + ?Sized,
    {
        if self.state == EditorState::Submitted {
            self.buffer.clear();
            self.state = EditorState::Editing;
        }
        loop {
            let event = keys.read_event();
            if self.apply(event, display) == EditorState::Submitted {
                return self.buffer.as_str();
            }
        }
    }
}

/// Prompt, read, dispatch, forever. Only a dispatcher command that halts
/// the machine ends it.
pub fn run<S, D, H>(keys: &mut S, display: &mut D, dispatcher: &mut H) -> !
where
    S: KeySource,
    D: TextDisplay,
    H: Dispatcher,
{
    let mut editor: LineEditor = LineEditor::new();
    loop {
        dispatcher.prompt(display);
        let line = editor.read_line(keys, display);
        log::trace!("line submitted: {:?}", line);
        dispatcher.dispatch(line, display);
    }
}
