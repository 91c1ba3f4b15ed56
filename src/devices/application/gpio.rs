//! GPIO bridge commands and pin edge handling.
use super::Application;
use crate::{
    devices::{
        configuration::GPIO_COUNT,
        firmware_mode::WriteModeSignal,
        interrupts::{EdgeHandler, Status},
        protocol::{parse, ErrorCode, Response},
    },
    hal::{
        eic::{ExternalInterrupts, Line, Sense},
        gpio::{Direction, PinConfig, PinId, Port, Pull},
        sercom::Sercom,
        usb::Notify,
    },
    utilities::bitwise::low_bits,
};

/// Latches edges on bridge pins into the sticky interrupt status.
pub struct GpioEdges;

pub static GPIO_EDGES: GpioEdges = GpioEdges;

impl EdgeHandler for GpioEdges {
    fn on_edge(&self, status: &mut Status, pin: PinId, _line: Line) -> bool {
        match status.mode().table().index(pin) {
            Some(index) => {
                status.raise_pin(index);
                true
            }
            None => false,
        }
    }
}

fn direction(value: u8) -> Result<Direction, ErrorCode> {
    match value {
        0 => Ok(Direction::Input),
        1 => Ok(Direction::Output),
        _ => Err(ErrorCode::Parameter),
    }
}

fn pull(value: u8) -> Result<Pull, ErrorCode> {
    match value {
        0 => Ok(Pull::None),
        1 => Ok(Pull::Up),
        2 => Ok(Pull::Down),
        _ => Err(ErrorCode::Parameter),
    }
}

fn sense(edge: u8) -> Result<Sense, ErrorCode> {
    match edge {
        0 => Ok(Sense::Falling),
        1 => Ok(Sense::Rising),
        2 => Ok(Sense::Both),
        _ => Err(ErrorCode::Parameter),
    }
}

impl<'a, G, S, E, N, W> Application<'a, G, S, E, N, W>
where
    G: Port,
    S: Sercom,
    E: ExternalInterrupts,
    N: Notify,
    W: WriteModeSignal,
{
    fn pin(&self, index: u8) -> Result<PinId, ErrorCode> {
        self.configuration.index_to_pin(index).ok_or(ErrorCode::Parameter)
    }

    /// `[index, direction, pull]`
    pub(super) fn gpio_configure(
        &mut self,
        request: &[u8],
        _: &mut Response<'_>,
    ) -> Result<(), ErrorCode> {
        let (request, index) = parse::byte(request)?;
        let (request, direction_value) = parse::byte(request)?;
        let (_, pull_value) = parse::byte(request)?;
        let pin = self.pin(index)?;
        let config = PinConfig { direction: direction(direction_value)?, pull: pull(pull_value)? };
        self.port.configure(pin, config);
        Ok(())
    }

    /// `[index, level]`
    pub(super) fn gpio_pin_set(
        &mut self,
        request: &[u8],
        _: &mut Response<'_>,
    ) -> Result<(), ErrorCode> {
        let (request, index) = parse::byte(request)?;
        let (_, level) = parse::byte(request)?;
        let pin = self.pin(index)?;
        self.port.set_level(pin, level != 0);
        Ok(())
    }

    /// `[index]` -> `[level]`
    pub(super) fn gpio_pin_read(
        &mut self,
        request: &[u8],
        response: &mut Response<'_>,
    ) -> Result<(), ErrorCode> {
        let (_, index) = parse::byte(request)?;
        let pin = self.pin(index)?;
        response.push(self.port.level(pin) as u8)
    }

    /// `[]` -> `[status: u32]`
    pub(super) fn gpio_get_interrupt_status(
        &mut self,
        _: &[u8],
        response: &mut Response<'_>,
    ) -> Result<(), ErrorCode> {
        let pins = self.interrupts.with(|shared| shared.status.pins());
        response.extend_from_slice(&pins.to_le_bytes())
    }

    /// `[mask: u32]`
    pub(super) fn gpio_clear_interrupt_status(
        &mut self,
        request: &[u8],
        _: &mut Response<'_>,
    ) -> Result<(), ErrorCode> {
        let (_, mask) = parse::word(request)?;
        self.interrupts.with(|shared| {
            if shared.status.clear_pins(mask) {
                shared.publish();
            }
        });
        Ok(())
    }

    /// `[index, edge]`
    pub(super) fn gpio_enable_pin_interrupt(
        &mut self,
        request: &[u8],
        _: &mut Response<'_>,
    ) -> Result<(), ErrorCode> {
        let (request, index) = parse::byte(request)?;
        let (_, edge) = parse::byte(request)?;
        let pin = self.pin(index)?;
        let line = self.configuration.index_to_line(index).ok_or(ErrorCode::Parameter)?;
        let sense = sense(edge)?;
        self.interrupts.with(|shared| shared.eic.bind(line, sense, pin, &GPIO_EDGES));
        debug!("Interrupt enabled on index {}", index);
        Ok(())
    }

    /// `[index]`
    pub(super) fn gpio_disable_pin_interrupt(
        &mut self,
        request: &[u8],
        _: &mut Response<'_>,
    ) -> Result<(), ErrorCode> {
        let (_, index) = parse::byte(request)?;
        let line = self.configuration.index_to_line(index).ok_or(ErrorCode::Parameter)?;
        self.interrupts.with(|shared| shared.eic.unbind(line));
        Ok(())
    }

    /// `[bits: u32]`, bit `n` drives index `n`. Bits for indices that do not
    /// resolve in the active mode are ignored.
    pub(super) fn gpio_parallel_write(
        &mut self,
        request: &[u8],
        _: &mut Response<'_>,
    ) -> Result<(), ErrorCode> {
        let (_, bits) = parse::word(request)?;
        let mask = (0..GPIO_COUNT as u8)
            .filter(|index| self.configuration.index_to_pin(*index).is_some())
            .fold(0u32, |mask, index| mask | 1 << index);
        self.port.write_group(mask & low_bits(GPIO_COUNT), bits & mask);
        Ok(())
    }
}
