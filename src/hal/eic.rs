//! External interrupt controller interface.
use super::gpio::PinId;

/// Hardware interrupt line (`EXTINTn`).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct Line(pub u8);

/// Number of lines the controller provides.
pub const LINE_COUNT: usize = 16;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Sense {
    Rising,
    Falling,
    Both,
    High,
    Low,
}

pub trait ExternalInterrupts {
    /// Routes `pin` to `line` and sets its detection mode. Leaves the line
    /// disabled.
    fn configure(&mut self, line: Line, sense: Sense, pin: PinId);
    fn enable(&mut self, line: Line);
    fn disable(&mut self, line: Line);
    /// Bitmask of lines with a pending edge, bit `n` being `EXTINTn`.
    fn pending(&self) -> u32;
    fn clear(&mut self, line: Line);
}
