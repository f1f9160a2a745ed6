//! Single-byte access to the x86 I/O address space.
//!
//! Drivers take a `PortIo` instead of touching `x86_64::instructions::port`
//! directly, so the write sequences they issue can be checked off-target.

use x86_64::instructions::port::Port;
use crate::constants::port::POST_PORT;

pub trait PortIo {
    fn read_u8(&mut self, port: u16) -> u8;

    fn write_u8(&mut self, port: u16, value: u8);

    /// Burn roughly one I/O cycle so slow devices can latch the last write.
    fn io_wait(&mut self) {
        self.write_u8(POST_PORT, 0);
    }
}

/// The real I/O address space.
#[derive(Debug)]
pub struct HardwarePorts {
    _private: (),
}

impl HardwarePorts {
    /// # Safety
    ///
    /// The caller must run in ring 0 and own every port it goes on to
    /// read or write through the returned handle.
    pub(crate) const unsafe fn new() -> Self {
        HardwarePorts { _private: () }
    }
}

impl PortIo for HardwarePorts {
    fn read_u8(&mut self, port: u16) -> u8 {
        let mut port = Port::<u8>::new(port);
        unsafe { port.read() }
    }

    fn write_u8(&mut self, port: u16, value: u8) {
        let mut port = Port::<u8>::new(port);
        unsafe { port.write(value) }
    }
}
