//! Non-volatile memory interface.
//!
//! Flash on the bridge MCU is written one page at a time, bits can only be
//! cleared by a write, and restoring them requires erasing a whole row
//! (a fixed group of pages). The interface exposes that geometry directly
//! so the DFU engine can plan its erases and page flushes.
use core::{
    fmt,
    ops::{Add, Sub},
};

/// Absolute address in the MCU memory map.
#[derive(Copy, Clone, Debug, Ord, PartialOrd, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct Address(pub u32);

impl Add<usize> for Address {
    type Output = Address;
    fn add(self, rhs: usize) -> Self::Output { Address(self.0 + rhs as u32) }
}

impl Sub<Address> for Address {
    type Output = usize;
    fn sub(self, rhs: Address) -> Self::Output { self.0.saturating_sub(rhs.0) as usize }
}

impl From<Address> for usize {
    fn from(address: Address) -> Self { address.0 as usize }
}

pub trait Nvm {
    type Error: Clone + Copy + fmt::Debug;

    /// Smallest unit that can be programmed.
    fn page_size(&self) -> usize;
    /// Smallest unit that can be erased. Always a whole number of pages.
    fn row_size(&self) -> usize;
    /// First and one-past-last valid addresses.
    fn range(&self) -> (Address, Address);

    fn erase_row(&mut self, address: Address) -> nb::Result<(), Self::Error>;
    /// Programs at most one page starting at a page boundary. Shorter
    /// slices leave the rest of the page erased.
    fn write_page(&mut self, address: Address, bytes: &[u8]) -> nb::Result<(), Self::Error>;
    fn read(&mut self, address: Address, bytes: &mut [u8]) -> nb::Result<(), Self::Error>;
}
