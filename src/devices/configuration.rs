//! Bridge configuration manager.
//!
//! The bridge exposes eight GPIOs (PB00..PB07), addressed by the host
//! through a logical index. Some of them double as the pads of the shared
//! serial block, so exactly one peripheral [`Mode`] is active at a time and
//! the pins it claims disappear from the index space while it is active.
//!
//! Every mode change is `teardown(current) -> init(target)`, even when the
//! target equals the current mode. GPIO mode owns no peripheral and is the
//! state every teardown lands in.
use super::{
    interrupts::Interrupts,
    protocol::{parse, ErrorCode},
};
use crate::hal::{
    eic::{ExternalInterrupts, Line},
    gpio::{PinConfig, PinId, Port},
    sercom::{BitOrder, Function, I2cConfig, Role, Sercom, SpiConfig, SpiMode, UartConfig},
    time::{Bps, MegaHertz, U32Ext},
    usb::Notify,
    RawStatus,
};

/// Number of bridge GPIOs.
pub const GPIO_COUNT: usize = 8;

/// Physical pin behind each logical index.
pub const BRIDGE_PINS: [PinId; GPIO_COUNT] = [
    PinId(32),
    PinId(33),
    PinId(34),
    PinId(35),
    PinId(36),
    PinId(37),
    PinId(38),
    PinId(39),
];

/// Interrupt line wired to each bridge pin.
pub const BRIDGE_LINES: [Line; GPIO_COUNT] =
    [Line(0), Line(1), Line(2), Line(3), Line(4), Line(5), Line(6), Line(7)];

/// Indices claimed by each serial function (SS/MISO/MOSI/SCK, SDA/SCL, TX/RX).
const SPI_PADS: [usize; 4] = [0, 1, 2, 3];
const I2C_PADS: [usize; 2] = [2, 3];
const UART_PADS: [usize; 2] = [2, 3];

const SPI_BAUD: MegaHertz = MegaHertz(1);

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Mode {
    Gpio = 0,
    I2cMaster = 1,
    I2cSlave = 2,
    SpiMaster = 3,
    SpiSlave = 4,
    Uart = 5,
}

impl TryFrom<u8> for Mode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Mode::Gpio),
            1 => Ok(Mode::I2cMaster),
            2 => Ok(Mode::I2cSlave),
            3 => Ok(Mode::SpiMaster),
            4 => Ok(Mode::SpiSlave),
            5 => Ok(Mode::Uart),
            unknown => Err(unknown),
        }
    }
}

/// Logical index to physical pin, `None` where the mode reserves the pin.
pub struct IndexTable {
    pins: [Option<PinId>; GPIO_COUNT],
}

static GPIO_TABLE: IndexTable = IndexTable::reserving(&[]);
static SPI_TABLE: IndexTable = IndexTable::reserving(&SPI_PADS);
static I2C_TABLE: IndexTable = IndexTable::reserving(&I2C_PADS);
static UART_TABLE: IndexTable = IndexTable::reserving(&UART_PADS);

impl IndexTable {
    const fn reserving(reserved: &[usize]) -> Self {
        let mut pins = [None; GPIO_COUNT];
        let mut index = 0;
        while index < GPIO_COUNT {
            pins[index] = Some(BRIDGE_PINS[index]);
            index += 1;
        }
        let mut claimed = 0;
        while claimed < reserved.len() {
            pins[reserved[claimed]] = None;
            claimed += 1;
        }
        Self { pins }
    }

    pub fn pin(&self, index: u8) -> Option<PinId> {
        self.pins.get(index as usize).copied().flatten()
    }

    pub fn index(&self, pin: PinId) -> Option<u8> {
        self.pins.iter().position(|entry| *entry == Some(pin)).map(|index| index as u8)
    }

    pub fn line(&self, index: u8) -> Option<Line> {
        self.pin(index).map(|_| BRIDGE_LINES[index as usize])
    }
}

impl Mode {
    pub fn table(self) -> &'static IndexTable {
        match self {
            Mode::Gpio => &GPIO_TABLE,
            Mode::SpiMaster | Mode::SpiSlave => &SPI_TABLE,
            Mode::I2cMaster | Mode::I2cSlave => &I2C_TABLE,
            Mode::Uart => &UART_TABLE,
        }
    }

    fn function(self, params: &[u8]) -> Result<Option<Function>, ErrorCode> {
        Ok(Some(match self {
            Mode::Gpio => return Ok(None),
            Mode::SpiMaster => Function::Spi(spi_config(Role::Master, params)?),
            Mode::SpiSlave => Function::Spi(spi_config(Role::Slave, params)?),
            Mode::I2cMaster => {
                let (_, clock) = parse::byte(params)?;
                let clock = match clock {
                    0 => 100.khz(),
                    1 => 400.khz(),
                    _ => return Err(ErrorCode::Parameter),
                };
                Function::I2c(I2cConfig::Master { clock })
            }
            Mode::I2cSlave => {
                let (_, address) = parse::byte(params)?;
                if address >= 0x80 {
                    return Err(ErrorCode::Parameter);
                }
                Function::I2c(I2cConfig::Slave { address })
            }
            Mode::Uart => {
                let (_, baud) = parse::word(params)?;
                if baud == 0 {
                    return Err(ErrorCode::Parameter);
                }
                Function::Uart(UartConfig { baud: Bps(baud) })
            }
        }))
    }
}

fn spi_config(role: Role, params: &[u8]) -> Result<SpiConfig, ErrorCode> {
    let (params, mode) = parse::byte(params)?;
    let (_, bit_order) = parse::byte(params)?;
    let mode = match mode {
        0 => SpiMode::Mode0,
        1 => SpiMode::Mode1,
        2 => SpiMode::Mode2,
        3 => SpiMode::Mode3,
        _ => return Err(ErrorCode::Parameter),
    };
    let bit_order = match bit_order {
        0 => BitOrder::MsbFirst,
        1 => BitOrder::LsbFirst,
        _ => return Err(ErrorCode::Parameter),
    };
    Ok(SpiConfig { role, mode, bit_order, baud: SPI_BAUD.into() })
}

pub struct ConfigurationManager<'a, S, E, N> {
    sercom: S,
    interrupts: &'a Interrupts<E, N>,
}

impl<'a, S, E, N> ConfigurationManager<'a, S, E, N>
where
    S: Sercom,
    E: ExternalInterrupts,
    N: Notify,
{
    /// Takes ownership of the serial block and starts in GPIO mode.
    pub fn new<G: Port>(sercom: S, interrupts: &'a Interrupts<E, N>, port: &mut G) -> Self {
        let mut manager = Self { sercom, interrupts };
        manager.teardown(port);
        manager
    }

    pub fn mode(&self) -> Mode { self.interrupts.with(|shared| shared.status.mode()) }

    /// Tears the current mode down, then brings `mode` up with `params`.
    /// Any failure leaves the bridge in GPIO mode.
    pub fn set_mode<G: Port>(
        &mut self,
        port: &mut G,
        mode: Mode,
        params: &[u8],
    ) -> Result<(), ErrorCode> {
        self.teardown(port);
        if let Some(function) = mode.function(params)? {
            self.sercom.enable(function).map_err(|e| {
                error!("Failed to bring up {:?}, status {}", mode, e.status_code());
                ErrorCode::OperationFailed
            })?;
        }
        self.interrupts.with(|shared| shared.status.set_mode(mode));
        info!("Bridge mode set to {:?}", mode);
        Ok(())
    }

    /// Returns to GPIO mode.
    pub fn reset<G: Port>(&mut self, port: &mut G) { self.teardown(port) }

    pub fn index_to_pin(&self, index: u8) -> Option<PinId> { self.mode().table().pin(index) }

    pub fn pin_to_index(&self, pin: PinId) -> Option<u8> { self.mode().table().index(pin) }

    pub fn index_to_line(&self, index: u8) -> Option<Line> { self.mode().table().line(index) }

    /// SPI handle, only while an SPI mode is active.
    pub fn spi(&mut self) -> Option<&mut S::Spi> {
        match self.mode() {
            Mode::SpiMaster | Mode::SpiSlave => Some(self.sercom.spi()),
            _ => None,
        }
    }

    /// I2C master handle. A block configured as a slave hands out nothing.
    pub fn i2c(&mut self) -> Option<&mut S::I2c> {
        match self.mode() {
            Mode::I2cMaster => Some(self.sercom.i2c()),
            _ => None,
        }
    }

    pub fn sercom(&self) -> &S { &self.sercom }

    #[cfg(test)]
    pub(crate) fn sercom_mut(&mut self) -> &mut S { &mut self.sercom }

    fn teardown<G: Port>(&mut self, port: &mut G) {
        let previous = self.interrupts.with(|shared| {
            let previous = shared.status.mode();
            shared.status.set_mode(Mode::Gpio);
            for line in BRIDGE_LINES {
                shared.eic.unbind(line);
            }
            previous
        });
        if previous != Mode::Gpio {
            self.sercom.disable();
        }
        for pin in BRIDGE_PINS {
            port.configure(pin, PinConfig::FLOATING_INPUT);
        }
        debug!("Tore down {:?}", previous);
    }
}
