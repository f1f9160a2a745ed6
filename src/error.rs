//! Error types for the input path.

use core::fmt;

/// A bounded input container refused an element.
///
/// Neither case is fatal: the key event queue drops the newest event and the
/// line editor drops the extra character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputError {
    /// The key event queue is at capacity
    QueueFull,
    /// The line buffer is at capacity
    LineFull,
}

impl fmt::Display for InputError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputError::QueueFull => write!(f, "key event queue full"),
            InputError::LineFull => write!(f, "input line full"),
        }
    }
}
