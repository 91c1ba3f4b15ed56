use super::{error::FakeError, i2c::MockI2c, spi::MockSpi};
use crate::hal::sercom::{Function, Sercom};

#[derive(Default)]
pub struct FakeSercom {
    pub active: Option<Function>,
    /// Every function ever enabled, in order.
    pub enabled: Vec<Function>,
    pub disables: usize,
    pub fail_enable: bool,
    pub spi: MockSpi<u8>,
    pub i2c: MockI2c,
}

impl Sercom for FakeSercom {
    type Error = FakeError;
    type Spi = MockSpi<u8>;
    type I2c = MockI2c;

    fn enable(&mut self, function: Function) -> Result<(), Self::Error> {
        if self.fail_enable {
            return Err(FakeError(0x10));
        }
        self.enabled.push(function);
        self.active = Some(function);
        Ok(())
    }

    fn disable(&mut self) {
        self.disables += 1;
        self.active = None;
    }

    fn spi(&mut self) -> &mut Self::Spi { &mut self.spi }

    fn i2c(&mut self) -> &mut Self::I2c { &mut self.i2c }
}
