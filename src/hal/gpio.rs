//! # Bridge GPIO interface
//!
//! Unlike typestate pins, bridge pins are chosen by the host at runtime,
//! so the port is addressed by physical pin identifier and reconfigured
//! on the fly.

/// Physical pin identifier, as numbered by the MCU (`port * 32 + pin`).
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct PinId(pub u8);

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Direction {
    Input,
    Output,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Pull {
    None,
    Up,
    Down,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct PinConfig {
    pub direction: Direction,
    pub pull: Pull,
}

impl PinConfig {
    /// State every pin returns to when its owner releases it.
    pub const FLOATING_INPUT: Self = Self { direction: Direction::Input, pull: Pull::None };
}

/// Runtime configurable GPIO port.
pub trait Port {
    fn configure(&mut self, pin: PinId, config: PinConfig);
    fn set_level(&mut self, pin: PinId, high: bool);
    fn level(&self, pin: PinId) -> bool;
    /// Drives every bridge output selected by `mask` to the matching bit of
    /// `bits` in a single register operation. Bit `n` is bridge index `n`.
    fn write_group(&mut self, mask: u32, bits: u32);
}
