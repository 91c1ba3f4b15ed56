//! # USB Bridge Library
//!
//! This crate contains the device control plane of the USB bridge
//! firmware in library form: the command protocol engine, the
//! peripheral configuration state machine, the GPIO/SPI/I2C bridges,
//! the DFU flash engine and the bootloader handoff.
#![cfg_attr(test, allow(unused_imports))]
#![cfg_attr(target_arch = "arm", no_std)]

#[cfg(target_arch = "arm")]
extern crate panic_semihosting;
extern crate static_assertions;

#[macro_use]
pub mod utilities {
    #[macro_use]
    mod macros;
    #[macro_use]
    pub mod memory;
    pub mod bitwise;
    pub mod guard;
}

pub mod hal;
pub mod devices;
#[cfg(target_arch = "arm")]
pub mod ports;
pub mod error;
