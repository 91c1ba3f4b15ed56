use crate::{
    devices::firmware_mode::{FirmwareMode, ReadModeSignal, WriteModeSignal},
    hal::system::{Launch, SystemReset},
};

/// Resets by panicking, so tests observe it with `#[should_panic]`.
#[derive(Default)]
pub struct FakeSystem;

impl SystemReset for FakeSystem {
    fn reset(&mut self) -> ! { panic!("system reset") }
}

/// Launches by panicking with the target vector table address.
#[derive(Default)]
pub struct FakeLauncher;

impl Launch for FakeLauncher {
    fn launch(&mut self, vector_table: u32) -> ! { panic!("launched image at {:#x}", vector_table) }
}

/// The shared RAM byte, as raw contents.
#[derive(Default)]
pub struct FakeModeSignal {
    pub raw: u8,
}

impl ReadModeSignal for FakeModeSignal {
    fn read_mode(&self) -> Option<FirmwareMode> { FirmwareMode::try_from(self.raw).ok() }
}

impl WriteModeSignal for FakeModeSignal {
    fn write_mode(&mut self, mode: FirmwareMode) { self.raw = mode as u8; }

    fn clear(&mut self) { self.raw = 0; }
}
