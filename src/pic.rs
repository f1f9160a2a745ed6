//! Remapping of the chained 8259 interrupt controllers.

use pic8259::ChainedPics;
use spin::Mutex;
use crate::constants::interrupts::{CASCADE_IRQ, PIC_1_OFFSET, PIC_2_OFFSET};
use crate::port::PortIo;

pub const MASTER_COMMAND: u16 = 0x20;
pub const MASTER_DATA: u16 = 0x21;
pub const SLAVE_COMMAND: u16 = 0xA0;
pub const SLAVE_DATA: u16 = 0xA1;

/// ICW1: edge triggered, cascade mode, ICW4 follows
const ICW1_INIT: u8 = 0x11;
/// ICW3 (master): a slave hangs off IRQ2
const ICW3_MASTER: u8 = 1 << CASCADE_IRQ;
/// ICW3 (slave): cascade identity 2
const ICW3_SLAVE: u8 = CASCADE_IRQ;
/// ICW4: 8086/88 mode
const ICW4_8086: u8 = 0x01;
/// OCW3: next command-port read returns the in-service register
const OCW3_READ_ISR: u8 = 0x0B;
/// OCW2: non-specific end of interrupt
const EOI: u8 = 0x20;
/// Lowest-priority line on each controller, where spurious requests land
const SPURIOUS_LINE: u8 = 7;

/// Only used to acknowledge interrupts; `remap` does the initialization.
pub static PICS: Mutex<ChainedPics> =
    Mutex::new(unsafe { ChainedPics::new(PIC_1_OFFSET, PIC_2_OFFSET) });

/// Vector offsets and interrupt masks for both controllers.
///
/// A set mask bit disables that IRQ line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PicConfig {
    pub master_offset: u8,
    pub slave_offset: u8,
    pub master_mask: u8,
    pub slave_mask: u8,
}

impl PicConfig {
    /// All lines masked.
    ///
    /// # Panics
    ///
    /// If either block of eight vectors overlaps the CPU exception range
    /// (0..32) or the other controller, or is not 8-aligned. In a `const`
    /// this is a compile error.
    pub const fn new(master_offset: u8, slave_offset: u8) -> Self {
        assert!(master_offset >= 32 && slave_offset >= 32, "PIC offsets overlap CPU exceptions");
        assert!(master_offset % 8 == 0 && slave_offset % 8 == 0, "PIC offsets must be 8-aligned");
        assert!(
            master_offset as u16 + 8 <= slave_offset as u16
                || slave_offset as u16 + 8 <= master_offset as u16,
            "PIC vector ranges overlap"
        );
        assert!(master_offset <= 248 && slave_offset <= 248, "PIC vectors past 255");
        PicConfig {
            master_offset,
            slave_offset,
            master_mask: 0xFF,
            slave_mask: 0xFF,
        }
    }

    /// Enable IRQ line `irq` (0..16). Enabling a slave line also enables the
    /// cascade line on the master.
    pub const fn unmask(mut self, irq: u8) -> Self {
        assert!(irq < 16, "IRQ line out of range");
        if irq < 8 {
            self.master_mask &= !(1 << irq);
        } else {
            self.slave_mask &= !(1 << (irq - 8));
            self.master_mask &= !(1 << CASCADE_IRQ);
        }
        self
    }

    #[cfg(test)]
    pub const fn is_masked(&self, irq: u8) -> bool {
        if irq < 8 {
            self.master_mask & (1 << irq) != 0
        } else {
            self.slave_mask & (1 << (irq - 8)) != 0
        }
    }

    /// CPU vector raised for IRQ line `irq`.
    pub const fn vector(&self, irq: u8) -> u8 {
        if irq < 8 {
            self.master_offset + irq
        } else {
            self.slave_offset + irq - 8
        }
    }
}

impl Default for PicConfig {
    fn default() -> Self {
        PicConfig::new(PIC_1_OFFSET, PIC_2_OFFSET)
    }
}

/// Reinitialize both controllers with `config`.
///
/// Each pair of writes goes master first, then slave, with an `io_wait`
/// after every write. The order is fixed by the 8259 protocol.
pub fn remap<P: PortIo>(ports: &mut P, config: &PicConfig) {
    let steps: [(u8, u8); 5] = [
        (ICW1_INIT, ICW1_INIT),
        (config.master_offset, config.slave_offset),
        (ICW3_MASTER, ICW3_SLAVE),
        (ICW4_8086, ICW4_8086),
        (config.master_mask, config.slave_mask),
    ];

    for (i, &(master, slave)) in steps.iter().enumerate() {
        let (master_port, slave_port) = if i == 0 {
            (MASTER_COMMAND, SLAVE_COMMAND)
        } else {
            (MASTER_DATA, SLAVE_DATA)
        };
        ports.write_u8(master_port, master);
        ports.io_wait();
        ports.write_u8(slave_port, slave);
        ports.io_wait();
    }

    log::debug!(
        "pic remapped: master {:#x} mask {:#04x}, slave {:#x} mask {:#04x}",
        config.master_offset,
        config.master_mask,
        config.slave_offset,
        config.slave_mask
    );
}

/// Acknowledge `vector` on the controller(s) that raised it.
pub fn end_of_interrupt(vector: u8) {
    unsafe {
        PICS.lock().notify_end_of_interrupt(vector);
    }
}

/// Acknowledge IRQ 7 or IRQ 15, which a controller also raises when a
/// request vanishes before the CPU takes it.
///
/// A request is genuine only if the controller's in-service bit for its
/// line 7 is set. A spurious IRQ 7 gets no EOI at all; a spurious IRQ 15
/// still came through the cascade, so the master alone is acknowledged.
/// Returns whether the request was genuine.
pub fn acknowledge_lowest_priority<P: PortIo>(ports: &mut P, irq: u8) -> bool {
    assert!(irq == SPURIOUS_LINE || irq == SPURIOUS_LINE + 8, "IRQ {} cannot be spurious", irq);
    let on_slave = irq >= 8;
    let command = if on_slave { SLAVE_COMMAND } else { MASTER_COMMAND };

    ports.write_u8(command, OCW3_READ_ISR);
    let in_service = ports.read_u8(command);
    let genuine = in_service & (1 << SPURIOUS_LINE) != 0;

    if genuine && on_slave {
        ports.write_u8(SLAVE_COMMAND, EOI);
    }
    if genuine || on_slave {
        ports.write_u8(MASTER_COMMAND, EOI);
    }
    if !genuine {
        log::debug!("spurious IRQ {}", irq);
    }
    genuine
}
