//! Hardware Abstraction Layer, containing interfaces
//! for low level drivers.
#![macro_use]

pub mod gpio;
pub mod spi;
pub mod i2c;
pub mod flash;
pub mod eic;
pub mod sercom;
pub mod usb;
pub mod system;
pub mod time;

#[cfg(not(target_arch = "arm"))]
#[doc(hidden)]
pub mod doubles;

/// Peripheral failures that can be relayed to the host as the
/// raw status code reported by the driver.
pub trait RawStatus {
    fn status_code(&self) -> u8;
}
