use core::fmt::{self, Write};
use crate::line_editor::Dispatcher;
use crate::vga_buffer::TextDisplay;

const PROMPT: &str = "MiniOS $ ";

/// Command function type
type CommandFn = fn(&[&str], &mut dyn TextDisplay) -> fmt::Result;

/// Command registry entry
struct Command {
    name: &'static str,
    help: &'static str,
    func: CommandFn,
}

/// Command dispatch table - add new commands here
const COMMANDS: &[Command] = &[
    Command {
        name: "help",
        help: "Display this help message",
        func: cmd_help,
    },
    Command {
        name: "about",
        help: "What this kernel is",
        func: cmd_about,
    },
    Command {
        name: "echo",
        help: "Echo arguments to the screen",
        func: cmd_echo,
    },
    Command {
        name: "clear",
        help: "Clear the screen",
        func: cmd_clear,
    },
    Command {
        name: "reboot",
        help: "Reboot the system",
        func: cmd_reboot,
    },
    Command {
        name: "halt",
        help: "Stop the CPU",
        func: cmd_halt,
    },
];

/// Find command by name
fn find_command(name: &str) -> Option<&'static Command> {
    COMMANDS.iter().find(|cmd| cmd.name == name)
}

/// Matches submitted lines against `COMMANDS`.
#[derive(Debug, Default)]
pub struct Shell {
    _private: (),
}

impl Shell {
    pub const fn new() -> Self {
        Shell { _private: () }
    }

    fn execute(&mut self, line: &str, display: &mut dyn TextDisplay) -> fmt::Result {
        let mut words = line.split_whitespace();
        let Some(name) = words.next() else {
            return Ok(());
        };

        let mut args: [&str; 8] = [""; 8];
        let mut argc = 0;
        for word in words.take(args.len()) {
            args[argc] = word;
            argc += 1;
        }

        match find_command(name) {
            Some(cmd) => {
                log::debug!("running {}", cmd.name);
                (cmd.func)(&args[..argc], display)
            }
            None => writeln!(display, "Unknown command: {}. Type 'help' for available commands.", name),
        }
    }
}

impl Dispatcher for Shell {
    fn prompt(&mut self, display: &mut dyn TextDisplay) {
        display.write_text(PROMPT);
    }

    fn dispatch(&mut self, line: &str, display: &mut dyn TextDisplay) {
        if let Err(e) = self.execute(line, display) {
            log::warn!("command output failed: {}", e);
        }
    }
}

// ============================================================================
// Command implementations
// ============================================================================

fn cmd_help(_args: &[&str], display: &mut dyn TextDisplay) -> fmt::Result {
    writeln!(display, "Available commands:")?;
    for cmd in COMMANDS {
        writeln!(display, "  {:<12} - {}", cmd.name, cmd.help)?;
    }
    Ok(())
}

fn cmd_about(_args: &[&str], display: &mut dyn TextDisplay) -> fmt::Result {
    writeln!(display, "MiniOS v{} - a single address space teaching kernel.", env!("CARGO_PKG_VERSION"))
}

fn cmd_echo(args: &[&str], display: &mut dyn TextDisplay) -> fmt::Result {
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            display.write_str(" ")?;
        }
        display.write_str(arg)?;
    }
    writeln!(display)
}

fn cmd_clear(_args: &[&str], display: &mut dyn TextDisplay) -> fmt::Result {
    display.clear();
    Ok(())
}

fn cmd_reboot(_args: &[&str], display: &mut dyn TextDisplay) -> fmt::Result {
    writeln!(display, "Rebooting system...")?;
    crate::keyboard::reset_cpu();
}

fn cmd_halt(_args: &[&str], display: &mut dyn TextDisplay) -> fmt::Result {
    writeln!(display, "System halting...")?;
    crate::halt();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vga_buffer::testing::{row_text, writer};

    #[test]
    fn echo_joins_arguments() {
        let mut display = writer();
        Shell::new().dispatch("echo  hello   world", &mut display);
        assert_eq!(row_text(&display, 0), "hello world");
        assert_eq!(display.cursor(), (1, 0));
    }

    #[test]
    fn unknown_command_is_reported() {
        let mut display = writer();
        Shell::new().dispatch("frobnicate now", &mut display);
        assert_eq!(
            row_text(&display, 0),
            "Unknown command: frobnicate. Type 'help' for available commands."
        );
    }

    #[test]
    fn blank_line_prints_nothing() {
        let mut display = writer();
        Shell::new().dispatch("   ", &mut display);
        assert_eq!(display.cursor(), (0, 0));
    }

    #[test]
    fn help_lists_every_command() {
        let mut display = writer();
        Shell::new().dispatch("help", &mut display);
        assert_eq!(row_text(&display, 0), "Available commands:");
        for (i, cmd) in COMMANDS.iter().enumerate() {
            assert!(row_text(&display, i + 1).trim_start().starts_with(cmd.name));
        }
    }

    #[test]
    fn clear_resets_the_screen() {
        let mut display = writer();
        display.write_string("junk\nmore junk\n");
        Shell::new().dispatch("clear", &mut display);
        assert_eq!(display.cursor(), (0, 0));
        assert_eq!(row_text(&display, 0), "");
    }

    #[test]
    fn prompt_is_written_in_place() {
        let mut display = writer();
        Shell::new().prompt(&mut display);
        assert_eq!(row_text(&display, 0), PROMPT.trim_end());
        assert_eq!(display.cursor(), (0, PROMPT.len()));
    }
}
