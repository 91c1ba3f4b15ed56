//! Application image command set.
//!
//! Owns every bridge resource (pin port, serial block, mode selector) and
//! exposes them to the host through the protocol engine. The individual
//! command families live in submodules.
use super::{
    configuration::{ConfigurationManager, Mode},
    firmware_mode::{self, FirmwareMode, ResetCountdown, WriteModeSignal},
    interrupts::Interrupts,
    protocol::{echo, parse, CommandSet, ErrorCode, Handler, Opcode, Response},
};
use crate::hal::{eic::ExternalInterrupts, gpio::Port, sercom::Sercom, usb::Notify};

pub mod gpio;
mod i2c;
mod spi;

pub use gpio::{GpioEdges, GPIO_EDGES};
pub use spi::NO_CHIP_SELECT;

pub struct Application<'a, G, S, E, N, W> {
    port: G,
    configuration: ConfigurationManager<'a, S, E, N>,
    interrupts: &'a Interrupts<E, N>,
    signal: W,
    countdown: &'a ResetCountdown,
}

impl<'a, G, S, E, N, W> Application<'a, G, S, E, N, W>
where
    G: Port,
    S: Sercom,
    E: ExternalInterrupts,
    N: Notify,
    W: WriteModeSignal,
{
    /// Starts with every bridge pin a floating input, in GPIO mode.
    pub fn new(
        mut port: G,
        sercom: S,
        interrupts: &'a Interrupts<E, N>,
        signal: W,
        countdown: &'a ResetCountdown,
    ) -> Self {
        let configuration = ConfigurationManager::new(sercom, interrupts, &mut port);
        Self { port, configuration, interrupts, signal, countdown }
    }

    pub fn port(&self) -> &G { &self.port }

    pub fn configuration(&self) -> &ConfigurationManager<'a, S, E, N> { &self.configuration }

    pub fn signal(&self) -> &W { &self.signal }

    /// `[mode, params...]`. An unknown mode still tears the active one down.
    fn set_config(&mut self, request: &[u8], _: &mut Response<'_>) -> Result<(), ErrorCode> {
        let (params, mode) = parse::byte(request)?;
        match Mode::try_from(mode) {
            Ok(mode) => self.configuration.set_mode(&mut self.port, mode, params),
            Err(unknown) => {
                warn!("Unknown bridge mode {}", unknown);
                self.configuration.reset(&mut self.port);
                Err(ErrorCode::Parameter)
            }
        }
    }

    fn dfu_reset(&mut self, request: &[u8], _: &mut Response<'_>) -> Result<(), ErrorCode> {
        firmware_mode::request_reset(&mut self.signal, self.countdown, request)
    }
}

impl<'a, G, S, E, N, W> CommandSet for Application<'a, G, S, E, N, W>
where
    G: Port,
    S: Sercom,
    E: ExternalInterrupts,
    N: Notify,
    W: WriteModeSignal,
{
    const MODE: FirmwareMode = FirmwareMode::Application;

    fn handler(opcode: Opcode) -> Option<Handler<Self>> {
        let handler: Handler<Self> = match opcode {
            Opcode::Echo => echo,
            Opcode::SetConfig => Self::set_config,
            Opcode::GpioConfigure => Self::gpio_configure,
            Opcode::GpioPinSet => Self::gpio_pin_set,
            Opcode::GpioPinRead => Self::gpio_pin_read,
            Opcode::GpioGetInterruptStatus => Self::gpio_get_interrupt_status,
            Opcode::GpioClearInterruptStatus => Self::gpio_clear_interrupt_status,
            Opcode::GpioEnablePinInterrupt => Self::gpio_enable_pin_interrupt,
            Opcode::GpioDisablePinInterrupt => Self::gpio_disable_pin_interrupt,
            Opcode::GpioParallelWrite => Self::gpio_parallel_write,
            Opcode::SpiTransfer => Self::spi_transfer,
            Opcode::I2cTransaction => Self::i2c_transaction,
            Opcode::DfuReset => Self::dfu_reset,
            Opcode::DfuStart
            | Opcode::DfuWriteData
            | Opcode::DfuReadData
            | Opcode::DfuResetReadPointer
            | Opcode::DfuDoneWriting => return None,
        };
        Some(handler)
    }

    fn on_reset(&mut self) { self.configuration.reset(&mut self.port) }
}
