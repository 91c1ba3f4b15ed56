//! Serial communication block interface.
//!
//! The bridge exposes one serial block whose pads are shared between the
//! SPI, I2C and UART functions, so at most one of them is enabled at a
//! time.
use super::{
    i2c,
    spi,
    time::{Bps, Hertz, KiloHertz},
    RawStatus,
};
use core::fmt::Debug;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Role {
    Master,
    Slave,
}

/// Clock polarity and phase, numbered as usual (0..=3).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum SpiMode {
    Mode0,
    Mode1,
    Mode2,
    Mode3,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct SpiConfig {
    pub role: Role,
    pub mode: SpiMode,
    pub bit_order: BitOrder,
    pub baud: Hertz,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum I2cConfig {
    Master { clock: KiloHertz },
    Slave { address: u8 },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct UartConfig {
    pub baud: Bps,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Function {
    Spi(SpiConfig),
    I2c(I2cConfig),
    Uart(UartConfig),
}

pub trait Sercom {
    type Error: RawStatus + Copy + Debug;
    type Spi: spi::FullDuplex<u8>;
    type I2c: i2c::Master;

    /// Muxes the shared pads to `function` and enables the block.
    fn enable(&mut self, function: Function) -> Result<(), Self::Error>;
    /// Disables the block. Harmless when already disabled.
    fn disable(&mut self);
    fn spi(&mut self) -> &mut Self::Spi;
    fn i2c(&mut self) -> &mut Self::I2c;
}
