//! Mode selector kept in RAM that the startup code does not initialise,
//! so it survives a warm reset.
use crate::devices::firmware_mode::{FirmwareMode, ReadModeSignal, WriteModeSignal};
use core::ptr::{addr_of, addr_of_mut, read_volatile, write_volatile};

#[link_section = ".shared_memory"]
static mut SELECTOR: u8 = 0;

/// Sole accessor to the shared selector byte.
pub struct SharedModeSignal {
    _private: (),
}

impl SharedModeSignal {
    /// # Safety
    ///
    /// Only one instance may exist, and both images must place
    /// `.shared_memory` at the same address.
    pub unsafe fn steal() -> Self { Self { _private: () } }

    fn raw(&self) -> u8 {
        // NOTE(Safety): Exclusive access is guaranteed by construction.
        unsafe { read_volatile(addr_of!(SELECTOR)) }
    }

    fn set_raw(&mut self, value: u8) {
        // NOTE(Safety): Exclusive access is guaranteed by construction.
        unsafe { write_volatile(addr_of_mut!(SELECTOR), value) }
    }
}

impl ReadModeSignal for SharedModeSignal {
    fn read_mode(&self) -> Option<FirmwareMode> { FirmwareMode::try_from(self.raw()).ok() }
}

impl WriteModeSignal for SharedModeSignal {
    fn write_mode(&mut self, mode: FirmwareMode) { self.set_raw(mode as u8) }

    fn clear(&mut self) { self.set_raw(0) }
}
