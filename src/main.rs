#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(target_os = "none")]
mod kernel {
    use core::panic::PanicInfo;
    use minios::config::{InputMode, KernelConfig};
    use minios::keyboard::{InterruptKeyboard, PolledKeyboard};
    use minios::shell::Shell;
    use minios::vga_buffer::Screen;
    use minios::{line_editor, println};

    const CONFIG: KernelConfig = KernelConfig::from_build();

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        println!("{}", info);
        minios::hlt_loop();
    }

    #[no_mangle]
    pub extern "C" fn _start() -> ! {
        minios::init(&CONFIG);

        println!("Welcome to MiniOS v{}", env!("CARGO_PKG_VERSION"));
        println!("Type 'help' for available commands.");

        let mut screen = Screen;
        let mut shell = Shell::new();
        match CONFIG.input_mode {
            InputMode::Interrupt => {
                line_editor::run(&mut InterruptKeyboard::new(), &mut screen, &mut shell)
            }
            InputMode::Polling => {
                line_editor::run(&mut PolledKeyboard::new(), &mut screen, &mut shell)
            }
        }
    }
}

/// Hosted builds only exist so `cargo test` can build the workspace.
#[cfg(not(target_os = "none"))]
fn main() {
    eprintln!("minios is a bare-metal kernel: build it with `cargo bootimage --target x86_64-minios.json`");
}
