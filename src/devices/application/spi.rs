//! SPI master bridge.
use super::Application;
use crate::{
    devices::{
        firmware_mode::WriteModeSignal,
        protocol::{parse, ErrorCode, Response},
    },
    hal::{
        eic::ExternalInterrupts,
        gpio::Port,
        sercom::Sercom,
        spi::FullDuplex,
        usb::Notify,
        RawStatus,
    },
    utilities::guard::Guard,
};

/// Chip select index meaning "the host drives chip select itself".
pub const NO_CHIP_SELECT: u8 = 0xFF;

impl<'a, G, S, E, N, W> Application<'a, G, S, E, N, W>
where
    G: Port,
    S: Sercom,
    E: ExternalInterrupts,
    N: Notify,
    W: WriteModeSignal,
{
    /// `[cs_index, tx...]` -> `[rx...]`, one received byte per sent byte.
    /// On a bus failure the payload is the driver's raw status instead.
    pub(super) fn spi_transfer(
        &mut self,
        request: &[u8],
        response: &mut Response<'_>,
    ) -> Result<(), ErrorCode> {
        let (tx, cs_index) = parse::byte(request)?;
        if tx.len() > response.remaining() {
            return Err(ErrorCode::Parameter);
        }

        let chip_select = match cs_index {
            NO_CHIP_SELECT => None,
            index => Some(self.configuration.index_to_pin(index)),
        };
        let spi = self.configuration.spi().ok_or(ErrorCode::ResourceBusy)?;
        let chip_select = match chip_select {
            Some(None) => return Err(ErrorCode::Parameter),
            Some(Some(pin)) => Some(pin),
            None => None,
        };

        let rx = response.reserve(tx.len())?;
        let result = match chip_select {
            Some(pin) => {
                let _selected = Guard::new(
                    &mut self.port,
                    |port| port.set_level(pin, false),
                    |port| port.set_level(pin, true),
                );
                spi.transfer(tx, rx)
            }
            None => spi.transfer(tx, rx),
        };

        result.or_else(|e| {
            warn!("SPI transfer failed, status {}", e.status_code());
            response.clear();
            response.push(e.status_code())?;
            Err(ErrorCode::OperationFailed)
        })
    }
}
