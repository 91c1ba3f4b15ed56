//! Error type for the bridge firmware as a whole.
//!
//! These are internal failures. What the host sees is the much coarser
//! [`ErrorCode`](crate::devices::protocol::ErrorCode) carried in every
//! response.
use core::fmt::Debug;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Error {
    DriverError(&'static str),
    DeviceError(&'static str),
    LogicError(&'static str),
    /// No valid image header at the application base.
    ApplicationMissing,
    /// The shared mode selector asks the bootloader to stay resident.
    ApplicationRequestedDfu,
}

/// Driver errors that can be reported as a bridge [`Error`].
pub trait Convertible: Into<Error> + Copy + Debug {}
impl<T: Into<Error> + Copy + Debug> Convertible for T {}

impl Error {
    pub fn report(&self) {
        match self {
            Error::DriverError(text) => error!("[DriverError] -> {}", text),
            Error::DeviceError(text) => error!("[DeviceError] -> {}", text),
            Error::LogicError(text) => error!("[LogicError] -> {}", text),
            Error::ApplicationMissing => info!("No application image present"),
            Error::ApplicationRequestedDfu => info!("Firmware update requested"),
        };
    }
}
