//! Traits for I2C master implementation.
use super::RawStatus;
use core::fmt::Debug;

/// Blocking-capable I2C master. Writes leave the bus claimed so a
/// repeated start can follow; the caller decides when to release it.
pub trait Master {
    type Error: RawStatus + Copy + Debug;

    /// Writes `bytes` to the 7-bit `address` without a stop condition.
    fn write(&mut self, address: u8, bytes: &[u8]) -> nb::Result<(), Self::Error>;
    /// Fills `buffer` from the 7-bit `address`, finishing with a stop condition
    /// when the read succeeds.
    fn read(&mut self, address: u8, buffer: &mut [u8]) -> nb::Result<(), Self::Error>;
    /// Releases the bus.
    fn stop(&mut self);
}
