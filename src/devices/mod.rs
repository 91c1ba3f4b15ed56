//! Complex modules with business logic related to the problem
//! domain, that lay on top of abstract drivers. Devices are
//! generic, while board specifics (pins, memory map) are
//! handled in the `ports` module.

pub mod application;
pub mod bootloader;
pub mod configuration;
pub mod dfu;
pub mod firmware_mode;
pub mod image;
pub mod interrupts;
pub mod protocol;

/// General purpose traits that summarize requirements on devices.
pub mod traits {
    use crate::{error, hal::flash};
    use marker_blanket::marker_blanket;

    /// A supported flash must be able to erase, program and read, and
    /// report errors to the DFU engine or the bootloader.
    #[marker_blanket]
    pub trait Flash: flash::Nvm<Error: error::Convertible> {}
}
