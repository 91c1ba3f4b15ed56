//! Host-side stand-ins for the bridge hardware, used by unit tests.
pub mod error;
pub mod eic;
pub mod flash;
pub mod gpio;
pub mod i2c;
pub mod sercom;
pub mod spi;
pub mod system;
pub mod usb;
