//! Core system control: resets and control transfer between images.

/// Cause of the last reset, as latched by the power manager.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum ResetCause {
    PowerOn,
    Brownout,
    External,
    Watchdog,
    System,
}

impl ResetCause {
    /// Only user triggered resets leave RAM contents meaningful.
    pub fn preserves_ram(self) -> bool { matches!(self, ResetCause::External | ResetCause::System) }
}

pub trait SystemReset {
    fn reset(&mut self) -> !;
}

/// One way transfer of control into another firmware image.
pub trait Launch {
    /// Relocates the vector table to `vector_table`, loads the stack pointer
    /// and reset vector found there, and branches.
    fn launch(&mut self, vector_table: u32) -> !;
}
