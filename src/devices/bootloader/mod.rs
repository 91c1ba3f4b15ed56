//! Resident bootloader.
//!
//! Runs at every cold start. It either hands control to the application
//! image or stays resident, serving the DFU command set so the host can
//! stream in a new image. Construction is handled by the `ports` module as
//! it depends on board specific information.
use super::{
    dfu::Dfu,
    firmware_mode::{self, FirmwareMode, ReadModeSignal, ResetCountdown, WriteModeSignal},
    image::AppImageHeader,
    protocol::{echo, parse, CommandSet, ErrorCode, Handler, Opcode, Response},
    traits::Flash,
};
use crate::{
    error::Error,
    hal::{
        flash::Address,
        system::{Launch, ResetCause},
    },
};
use core::{cmp::min, convert::Infallible};

pub struct Bootloader<'a, F: Flash, M, L> {
    dfu: Dfu<F>,
    signal: M,
    launcher: L,
    countdown: &'a ResetCountdown,
}

impl<'a, F, M, L> Bootloader<'a, F, M, L>
where
    F: Flash,
    M: ReadModeSignal + WriteModeSignal,
    L: Launch,
{
    pub fn new(
        flash: F,
        application_base: Address,
        signal: M,
        launcher: L,
        countdown: &'a ResetCountdown,
    ) -> Self {
        Self { dfu: Dfu::new(flash, application_base), signal, launcher, countdown }
    }

    pub fn dfu(&mut self) -> &mut Dfu<F> { &mut self.dfu }

    pub fn signal(&self) -> &M { &self.signal }

    /// Boots the application if the mode selector asks for it and a valid
    /// image is present. Only returns when the bootloader must stay resident.
    ///
    /// The selector is only trusted across resets that keep RAM; after any
    /// other reset it is zeroed first, which selects the application.
    pub fn try_boot(&mut self, cause: ResetCause) -> Result<Infallible, Error> {
        if !cause.preserves_ram() {
            debug!("Reset cause {:?} clears the mode selector", cause);
            self.signal.clear();
        }

        if self.signal.read_mode() != Some(FirmwareMode::Application) {
            return Err(Error::ApplicationRequestedDfu);
        }

        let base = self.dfu.base();
        let header = AppImageHeader::read(self.dfu.flash(), base)?;
        info!(
            "Booting application {}.{}.{} (build {:?})",
            header.version.major,
            header.version.minor,
            header.version.patch,
            header.build_id
        );
        warn!("Jumping to the application image. This will break `defmt`.");
        self.launcher.launch(header.vector_table)
    }

    /// `[size: u32, checksum: u32]`
    fn dfu_start(&mut self, request: &[u8], _: &mut Response<'_>) -> Result<(), ErrorCode> {
        let (request, size) = parse::word(request)?;
        let (_, checksum) = parse::word(request)?;
        info!("Expected image checksum {:#x}", checksum);
        self.dfu.start(size as usize)
    }

    /// `[bytes...]` -> `[write_address: u32]`
    fn dfu_write_data(
        &mut self,
        request: &[u8],
        response: &mut Response<'_>,
    ) -> Result<(), ErrorCode> {
        let cursor = self.dfu.write(request)?;
        response.extend_from_slice(&cursor.0.to_le_bytes())
    }

    /// `[length]` -> `[bytes...]`, possibly fewer than asked for.
    fn dfu_read_data(
        &mut self,
        request: &[u8],
        response: &mut Response<'_>,
    ) -> Result<(), ErrorCode> {
        let (_, length) = parse::byte(request)?;
        let start = response.len();
        let buffer = response.reserve(min(length as usize, response.remaining()))?;
        let read = self.dfu.read(buffer);
        response.truncate(start + read.unwrap_or(0));
        read.map(|_| ())
    }

    fn dfu_reset_read_pointer(&mut self, _: &[u8], _: &mut Response<'_>) -> Result<(), ErrorCode> {
        self.dfu.reset_read_pointer();
        Ok(())
    }

    fn dfu_done_writing(&mut self, _: &[u8], _: &mut Response<'_>) -> Result<(), ErrorCode> {
        self.dfu.finalize()
    }

    fn dfu_reset(&mut self, request: &[u8], _: &mut Response<'_>) -> Result<(), ErrorCode> {
        firmware_mode::request_reset(&mut self.signal, self.countdown, request)
    }
}

impl<'a, F, M, L> CommandSet for Bootloader<'a, F, M, L>
where
    F: Flash,
    M: ReadModeSignal + WriteModeSignal,
    L: Launch,
{
    const MODE: FirmwareMode = FirmwareMode::Dfu;

    fn handler(opcode: Opcode) -> Option<Handler<Self>> {
        let handler: Handler<Self> = match opcode {
            Opcode::Echo => echo,
            Opcode::DfuStart => Self::dfu_start,
            Opcode::DfuWriteData => Self::dfu_write_data,
            Opcode::DfuReadData => Self::dfu_read_data,
            Opcode::DfuResetReadPointer => Self::dfu_reset_read_pointer,
            Opcode::DfuDoneWriting => Self::dfu_done_writing,
            Opcode::DfuReset => Self::dfu_reset,
            _ => return None,
        };
        Some(handler)
    }
}
