//! The 256-gate interrupt descriptor table.
//!
//! Gates are written by hand rather than through
//! `x86_64::structures::idt::InterruptDescriptorTable` so that every vector,
//! including the ones nothing is expected to raise, carries an explicit
//! present gate before the table is loaded.

use core::mem::size_of;
use x86_64::instructions::tables::lidt;
use x86_64::structures::DescriptorTablePointer;
use x86_64::VirtAddr;
use crate::constants::interrupts::IDT_ENTRIES;

/// Type/attribute byte of a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct GateAttributes(u8);

impl GateAttributes {
    const PRESENT: u8 = 1 << 7;
    const KIND_INTERRUPT: u8 = 0xE;
    const KIND_TRAP: u8 = 0xF;

    /// Present, ring 0, interrupts disabled on entry.
    pub const INTERRUPT_GATE: GateAttributes =
        GateAttributes(Self::PRESENT | Self::KIND_INTERRUPT);

    /// Present, ring 0, interrupt flag left alone on entry.
    pub const TRAP_GATE: GateAttributes = GateAttributes(Self::PRESENT | Self::KIND_TRAP);

    pub const fn as_u8(self) -> u8 {
        self.0
    }

    pub const fn is_present(self) -> bool {
        self.0 & Self::PRESENT != 0
    }

    pub const fn is_trap(self) -> bool {
        self.0 & 0xF == Self::KIND_TRAP
    }
}

/// One 16-byte long-mode gate.
///
/// The handler address is split over three fields. `ist` occupies what is a
/// reserved zero byte in the 32-bit layout; only bits 0..3 are used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(C)]
pub struct GateDescriptor {
    offset_low: u16,
    selector: u16,
    ist: u8,
    attributes: GateAttributes,
    offset_mid: u16,
    offset_high: u32,
    reserved: u32,
}

impl GateDescriptor {
    pub const fn new(handler: u64, selector: u16, attributes: GateAttributes) -> Self {
        GateDescriptor {
            offset_low: handler as u16,
            selector,
            ist: 0,
            attributes,
            offset_mid: (handler >> 16) as u16,
            offset_high: (handler >> 32) as u32,
            reserved: 0,
        }
    }

    pub const fn handler_address(&self) -> u64 {
        self.offset_low as u64
            | (self.offset_mid as u64) << 16
            | (self.offset_high as u64) << 32
    }

    pub const fn selector(&self) -> u16 {
        self.selector
    }

    pub const fn attributes(&self) -> GateAttributes {
        self.attributes
    }

    pub const fn is_present(&self) -> bool {
        self.attributes.is_present()
    }

    pub const fn stack_index(&self) -> Option<u16> {
        match self.ist & 0b111 {
            0 => None,
            n => Some(n as u16 - 1),
        }
    }

    /// Switch to TSS interrupt stack `index` on entry.
    ///
    /// The hardware field is 1-based, 0 meaning "stay on the current stack".
    pub fn set_stack_index(&mut self, index: u16) -> &mut Self {
        assert!(index < 7, "IST index {} out of range", index);
        self.ist = index as u8 + 1;
        self
    }

    pub fn set_attributes(&mut self, attributes: GateAttributes) -> &mut Self {
        self.attributes = attributes;
        self
    }
}

/// Every vector the CPU can raise, each with a present gate.
#[derive(Debug, Clone)]
#[repr(C, align(16))]
pub struct InterruptTable {
    gates: [GateDescriptor; IDT_ENTRIES],
    selector: u16,
}

impl InterruptTable {
    /// Table whose every gate sends the CPU to `default_handler`.
    ///
    /// # Panics
    ///
    /// If `default_handler` is null.
    pub fn new(default_handler: u64, selector: u16) -> Self {
        assert_ne!(default_handler, 0, "default interrupt handler is null");
        InterruptTable {
            gates: [GateDescriptor::new(default_handler, selector, GateAttributes::INTERRUPT_GATE);
                IDT_ENTRIES],
            selector,
        }
    }

    /// Point `vector` at `handler`, replacing whatever was there.
    ///
    /// # Panics
    ///
    /// If `handler` is null: a present gate to address 0 would fault on
    /// delivery.
    pub fn install_gate(&mut self, vector: u8, handler: u64) -> &mut GateDescriptor {
        assert_ne!(handler, 0, "null handler for vector {:#x}", vector);
        let gate = &mut self.gates[usize::from(vector)];
        *gate = GateDescriptor::new(handler, self.selector, GateAttributes::INTERRUPT_GATE);
        gate
    }

    pub fn gate(&self, vector: u8) -> &GateDescriptor {
        &self.gates[usize::from(vector)]
    }

    pub fn gates(&self) -> &[GateDescriptor] {
        &self.gates
    }

    /// `lidt` operand: base of the gate array, size in bytes minus one.
    pub fn pointer(&self) -> DescriptorTablePointer {
        DescriptorTablePointer {
            limit: (size_of::<[GateDescriptor; IDT_ENTRIES]>() - 1) as u16,
            base: VirtAddr::from_ptr(self.gates.as_ptr()),
        }
    }

    /// Load this table into the CPU.
    ///
    /// The table must outlive every interrupt that will ever be delivered,
    /// hence `'static`.
    pub fn activate(&'static self) {
        debug_assert!(self.gates.iter().all(GateDescriptor::is_present));
        let pointer = self.pointer();
        unsafe { lidt(&pointer) };
        log::debug!(
            "interrupt table active at {:#x}, limit {:#x}",
            pointer.base.as_u64(),
            pointer.limit
        );
    }
}
