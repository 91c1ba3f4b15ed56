//! Logging macros for the bridge project.
//!
//! On the target these forward to `defmt`. On the host the arguments are
//! still type checked, but nothing is emitted, so test binaries link without
//! a global logger.
#![macro_use]

#[cfg(target_arch = "arm")]
macro_rules! debug {
    ($($arg:tt)*) => { defmt::debug!($($arg)*) };
}

#[cfg(target_arch = "arm")]
macro_rules! info {
    ($($arg:tt)*) => { defmt::info!($($arg)*) };
}

#[cfg(target_arch = "arm")]
macro_rules! warn {
    ($($arg:tt)*) => { defmt::warn!($($arg)*) };
}

#[cfg(target_arch = "arm")]
macro_rules! error {
    ($($arg:tt)*) => { defmt::error!($($arg)*) };
}

#[cfg(not(target_arch = "arm"))]
macro_rules! debug {
    ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
}

#[cfg(not(target_arch = "arm"))]
macro_rules! info {
    ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
}

#[cfg(not(target_arch = "arm"))]
macro_rules! warn {
    ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
}

#[cfg(not(target_arch = "arm"))]
macro_rules! error {
    ($($arg:tt)*) => {{ let _ = core::format_args!($($arg)*); }};
}
