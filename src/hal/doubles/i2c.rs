use super::error::FakeError;
use crate::hal::i2c::Master;
use std::collections::VecDeque;

/// Bus activity seen by the mock, in order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BusEvent {
    Write { address: u8, bytes: Vec<u8> },
    Read { address: u8, length: usize },
    Stop,
}

#[derive(Default)]
pub struct MockI2c {
    pub events: Vec<BusEvent>,
    pub to_read: VecDeque<Vec<u8>>,
    pub write_error: Option<FakeError>,
    pub read_error: Option<FakeError>,
}

impl MockI2c {
    pub fn stops(&self) -> usize {
        self.events.iter().filter(|event| **event == BusEvent::Stop).count()
    }
}

impl Master for MockI2c {
    type Error = FakeError;

    fn write(&mut self, address: u8, bytes: &[u8]) -> nb::Result<(), Self::Error> {
        self.events.push(BusEvent::Write { address, bytes: bytes.to_vec() });
        match self.write_error {
            Some(error) => Err(nb::Error::Other(error)),
            None => Ok(()),
        }
    }

    fn read(&mut self, address: u8, buffer: &mut [u8]) -> nb::Result<(), Self::Error> {
        self.events.push(BusEvent::Read { address, length: buffer.len() });
        if let Some(error) = self.read_error {
            return Err(nb::Error::Other(error));
        }
        buffer.iter_mut().zip(self.to_read.pop_front().unwrap_or_default()).for_each(|(o, i)| *o = i);
        Ok(())
    }

    fn stop(&mut self) { self.events.push(BusEvent::Stop); }
}
