use x86_64::structures::idt::{InterruptStackFrame, PageFaultErrorCode};
use lazy_static::lazy_static;
use spin::Once;
use crate::config::KernelConfig;
use crate::constants::interrupts::{PIC_1_OFFSET, PIC_2_OFFSET};
use crate::constants::keyboard::DATA_PORT;
use crate::idt::{GateAttributes, InterruptTable};
use crate::pic::{self, end_of_interrupt};
use crate::port::{HardwarePorts, PortIo};

/// Hardware interrupt numbers (after remapping)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum InterruptIndex {
    Timer = PIC_1_OFFSET,
    Keyboard,
    // PIC 1 (master) IRQs 2-7
    Cascade,
    COM2,
    COM1,
    LPT2,
    FloppyDisk,
    LPT1,
    // PIC 2 (slave) IRQs 8-15
    RTC = PIC_2_OFFSET,
    ACPI,
    Available1,
    Available2,
    Mouse,
    CoProcessor,
    PrimaryATA,
    SecondaryATA,
}

impl InterruptIndex {
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// CPU exception vectors with dedicated handlers
mod exception {
    pub const DIVIDE_ERROR: u8 = 0;
    pub const BREAKPOINT: u8 = 3;
    pub const DOUBLE_FAULT: u8 = 8;
    pub const GENERAL_PROTECTION: u8 = 13;
    pub const PAGE_FAULT: u8 = 14;

    /// Vectors without a dedicated handler for which the CPU pushes an
    /// error code
    pub const WITH_ERROR_CODE: [u8; 7] = [10, 11, 12, 17, 21, 29, 30];
}

/// Address of a handler as stored in a gate.
macro_rules! handler_addr {
    ($handler:expr) => {
        $handler as usize as u64
    };
}

/// Build the full 256-gate table for code segment `selector`.
///
/// Vectors without a dedicated handler fall through to
/// `unexpected_interrupt_handler`, which never returns, so a stray vector
/// halts with a log line instead of faulting again.
pub fn build_table(selector: u16) -> InterruptTable {
    let mut table = InterruptTable::new(handler_addr!(unexpected_interrupt_handler), selector);

    table.install_gate(exception::DIVIDE_ERROR, handler_addr!(divide_error_handler));
    table
        .install_gate(exception::BREAKPOINT, handler_addr!(breakpoint_handler))
        .set_attributes(GateAttributes::TRAP_GATE);
    table
        .install_gate(exception::DOUBLE_FAULT, handler_addr!(double_fault_handler))
        .set_stack_index(crate::gdt::DOUBLE_FAULT_IST_INDEX);
    table.install_gate(exception::GENERAL_PROTECTION, handler_addr!(general_protection_fault_handler));
    table.install_gate(exception::PAGE_FAULT, handler_addr!(page_fault_handler));
    for vector in exception::WITH_ERROR_CODE {
        table.install_gate(vector, handler_addr!(unexpected_exception_handler));
    }

    // every PIC line gets a handler that acknowledges it, masked or not
    for irq in 0..8 {
        table.install_gate(PIC_1_OFFSET + irq, handler_addr!(master_spurious_handler));
        table.install_gate(PIC_2_OFFSET + irq, handler_addr!(slave_spurious_handler));
    }
    table.install_gate(InterruptIndex::Timer.as_u8(), handler_addr!(timer_interrupt_handler));
    table.install_gate(InterruptIndex::Keyboard.as_u8(), handler_addr!(keyboard_interrupt_handler));
    table.install_gate(InterruptIndex::LPT1.as_u8(), handler_addr!(irq7_handler));
    table.install_gate(InterruptIndex::SecondaryATA.as_u8(), handler_addr!(irq15_handler));

    table
}

lazy_static! {
    static ref IDT: InterruptTable = build_table(crate::gdt::code_selector().0);
}

static PLATFORM: Once<()> = Once::new();

/// Activate the interrupt table, then remap the PICs. Interrupts are
/// enabled at the CPU only when `config` asks for interrupt-driven input.
///
/// Runs once; later calls are ignored. `gdt::init` must have run first.
pub fn init(config: &KernelConfig) {
    PLATFORM.call_once(|| {
        IDT.activate();

        let mut ports = unsafe { HardwarePorts::new() };
        pic::remap(&mut ports, &config.pic);

        if config.interrupts_enabled() {
            x86_64::instructions::interrupts::enable();
            log::info!("interrupts enabled, keyboard on vector {:#x}", InterruptIndex::Keyboard.as_u8());
        } else {
            log::info!("interrupts left disabled, keyboard polled");
        }
    });
}

// Exception handlers
extern "x86-interrupt" fn breakpoint_handler(stack_frame: InterruptStackFrame) {
    log::warn!("EXCEPTION: BREAKPOINT\n{:#?}", stack_frame);
}

extern "x86-interrupt" fn divide_error_handler(stack_frame: InterruptStackFrame) {
    log::error!("EXCEPTION: DIVIDE ERROR\n{:#?}", stack_frame);
    crate::hlt_loop();
}

extern "x86-interrupt" fn double_fault_handler(
    stack_frame: InterruptStackFrame,
    _error_code: u64,
) -> ! {
    log::error!("EXCEPTION: DOUBLE FAULT\n{:#?}", stack_frame);
    crate::hlt_loop();
}

extern "x86-interrupt" fn page_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: PageFaultErrorCode,
) {
    use x86_64::registers::control::Cr2;

    log::error!("EXCEPTION: PAGE FAULT");
    log::error!("Accessed Address: {:?}", Cr2::read());
    log::error!("Error Code: {:?}", error_code);
    log::error!("{:#?}", stack_frame);
    crate::hlt_loop();
}

extern "x86-interrupt" fn general_protection_fault_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) {
    log::error!("EXCEPTION: GENERAL PROTECTION FAULT");
    log::error!("Error Code: {:#x}", error_code);
    log::error!("{:#?}", stack_frame);
    crate::hlt_loop();
}

extern "x86-interrupt" fn unexpected_interrupt_handler(stack_frame: InterruptStackFrame) -> ! {
    log::error!("unexpected interrupt\n{:#?}", stack_frame);
    crate::hlt_loop();
}

extern "x86-interrupt" fn unexpected_exception_handler(
    stack_frame: InterruptStackFrame,
    error_code: u64,
) -> ! {
    log::error!("unexpected exception, error code {:#x}\n{:#?}", error_code, stack_frame);
    crate::hlt_loop();
}

// Hardware interrupt handlers. None of them may touch the display: the main
// loop can be holding the writer lock when they fire.
extern "x86-interrupt" fn timer_interrupt_handler(_stack_frame: InterruptStackFrame) {
    end_of_interrupt(InterruptIndex::Timer.as_u8());
}

extern "x86-interrupt" fn keyboard_interrupt_handler(_stack_frame: InterruptStackFrame) {
    let mut ports = unsafe { HardwarePorts::new() };
    let scancode = ports.read_u8(DATA_PORT);

    crate::keyboard::add_scancode(scancode);

    end_of_interrupt(InterruptIndex::Keyboard.as_u8());
}

extern "x86-interrupt" fn master_spurious_handler(_stack_frame: InterruptStackFrame) {
    end_of_interrupt(PIC_1_OFFSET);
}

extern "x86-interrupt" fn irq7_handler(_stack_frame: InterruptStackFrame) {
    let mut ports = unsafe { HardwarePorts::new() };
    pic::acknowledge_lowest_priority(&mut ports, 7);
}

extern "x86-interrupt" fn irq15_handler(_stack_frame: InterruptStackFrame) {
    let mut ports = unsafe { HardwarePorts::new() };
    pic::acknowledge_lowest_priority(&mut ports, 15);
}

extern "x86-interrupt" fn slave_spurious_handler(_stack_frame: InterruptStackFrame) {
    // a slave vector acknowledges both controllers
    end_of_interrupt(PIC_2_OFFSET);
}
