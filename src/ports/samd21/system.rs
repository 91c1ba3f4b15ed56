//! Reset and image launch on the Cortex-M0+ core.
use crate::hal::system::{Launch, ResetCause, SystemReset};
use core::ptr::read_volatile;
use cortex_m::peripheral::SCB;

/// Power manager reset cause register (`PM->RCAUSE`).
const RCAUSE: *const u8 = 0x4000_0438 as *const u8;

const RCAUSE_POR: u8 = 1 << 0;
const RCAUSE_BOD12: u8 = 1 << 1;
const RCAUSE_BOD33: u8 = 1 << 2;
const RCAUSE_EXT: u8 = 1 << 4;
const RCAUSE_WDT: u8 = 1 << 5;
const RCAUSE_SYST: u8 = 1 << 6;

pub fn reset_cause() -> ResetCause {
    // NOTE(Safety): Read-only register, always mapped.
    let rcause = unsafe { read_volatile(RCAUSE) };
    match rcause {
        r if r & RCAUSE_POR != 0 => ResetCause::PowerOn,
        r if r & (RCAUSE_BOD12 | RCAUSE_BOD33) != 0 => ResetCause::Brownout,
        r if r & RCAUSE_WDT != 0 => ResetCause::Watchdog,
        r if r & RCAUSE_SYST != 0 => ResetCause::System,
        r if r & RCAUSE_EXT != 0 => ResetCause::External,
        _ => ResetCause::PowerOn,
    }
}

pub struct CoreReset;

impl SystemReset for CoreReset {
    fn reset(&mut self) -> ! { SCB::sys_reset() }
}

pub struct VectorTableLauncher {
    scb: SCB,
}

impl VectorTableLauncher {
    pub fn new(scb: SCB) -> Self { Self { scb } }
}

impl Launch for VectorTableLauncher {
    fn launch(&mut self, vector_table: u32) -> ! {
        cortex_m::interrupt::disable();
        // NOTE(Safety): Thoroughly unsafe, we are jumping to an entirely different
        // firmware image. Its header was validated, but everything else about it
        // has to be assumed correct. Once interrupts are off there is no way back.
        unsafe {
            self.scb.vtor.write(vector_table);
            cortex_m::asm::bootload(vector_table as *const u32)
        }
    }
}
