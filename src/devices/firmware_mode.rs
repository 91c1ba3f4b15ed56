//! Firmware mode selector and deferred system reset.
//!
//! The application and the resident bootloader hand control to each other
//! through a system reset. Before resetting, the running image writes the
//! mode it wants next into a one byte selector that survives warm resets;
//! the bootloader reads it at cold start.
use super::protocol::{parse, ErrorCode};
use crate::hal::system::SystemReset;
use core::cell::Cell;
use critical_section::Mutex;

/// Frames (1 ms each at full speed) between arming the countdown and the reset.
pub const RESET_DELAY_FRAMES: u32 = 1000;

/// Firmware image the device should run.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum FirmwareMode {
    Application = 0,
    Dfu = 1,
}

impl TryFrom<u8> for FirmwareMode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(FirmwareMode::Application),
            1 => Ok(FirmwareMode::Dfu),
            unknown => Err(unknown),
        }
    }
}

pub trait ReadModeSignal {
    /// `None` when the selector holds something other than a known mode.
    fn read_mode(&self) -> Option<FirmwareMode>;
}

pub trait WriteModeSignal {
    fn write_mode(&mut self, mode: FirmwareMode);
    /// Zeroes the selector, as after a cold reset.
    fn clear(&mut self);
}

/// Countdown to a system reset, driven by USB start-of-frame events so a
/// response queued just before arming has time to reach the host.
pub struct ResetCountdown {
    remaining: Mutex<Cell<Option<u32>>>,
}

impl Default for ResetCountdown {
    fn default() -> Self { Self::new() }
}

impl ResetCountdown {
    pub const fn new() -> Self { Self { remaining: Mutex::new(Cell::new(None)) } }

    /// Starts (or restarts) the countdown. There is no way to cancel it.
    pub fn arm(&self, frames: u32) {
        critical_section::with(|cs| self.remaining.borrow(cs).set(Some(frames)));
        info!("System reset in {} frames", frames);
    }

    pub fn is_armed(&self) -> bool {
        critical_section::with(|cs| self.remaining.borrow(cs).get().is_some())
    }

    /// To be called on every start-of-frame. Resets the system on the frame
    /// that finds the countdown expired.
    pub fn on_frame<R: SystemReset>(&self, system: &mut R) {
        let expired = critical_section::with(|cs| {
            let remaining = self.remaining.borrow(cs);
            match remaining.get() {
                Some(0) => true,
                Some(frames) => {
                    remaining.set(Some(frames - 1));
                    false
                }
                None => false,
            }
        });

        if expired {
            info!("Reset countdown expired");
            system.reset();
        }
    }
}

/// Handles a host request to restart into another image: `[mode]`.
/// The selector is written right away, the reset itself is deferred.
pub fn request_reset<W: WriteModeSignal>(
    signal: &mut W,
    countdown: &ResetCountdown,
    request: &[u8],
) -> Result<(), ErrorCode> {
    let (_, mode) = parse::byte(request)?;
    let mode = FirmwareMode::try_from(mode).map_err(|unknown| {
        warn!("Unknown firmware mode {}", unknown);
        ErrorCode::Parameter
    })?;
    signal.write_mode(mode);
    countdown.arm(RESET_DELAY_FRAMES);
    Ok(())
}
