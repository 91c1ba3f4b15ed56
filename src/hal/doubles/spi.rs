use super::error::FakeError;
use crate::hal::spi::FullDuplex;
use std::collections::VecDeque;

pub struct MockSpi<WORD> {
    /// Mock values to be received
    pub to_receive: VecDeque<WORD>,
    /// Mock values sent
    pub sent: VecDeque<WORD>,
    /// Fails the transmission after this many words went out
    pub fail_after: Option<(usize, FakeError)>,
    awaiting_receive: bool,
}

impl<WORD> Default for MockSpi<WORD> {
    fn default() -> Self { Self::new() }
}

impl<WORD> MockSpi<WORD> {
    pub fn new() -> Self {
        Self {
            to_receive: VecDeque::new(),
            sent: VecDeque::new(),
            fail_after: None,
            awaiting_receive: false,
        }
    }
}

impl<WORD: Default + Copy> FullDuplex<WORD> for MockSpi<WORD> {
    type Error = FakeError;
    fn transmit(&mut self, word: Option<WORD>) -> nb::Result<(), Self::Error> {
        if let Some((limit, error)) = self.fail_after {
            if self.sent.len() >= limit {
                return Err(nb::Error::Other(error));
            }
        }
        if self.awaiting_receive {
            Err(nb::Error::Other(FakeError(0xFF)))
        } else {
            self.awaiting_receive = true;
            if let Some(word) = word {
                self.sent.push_back(word)
            }
            Ok(())
        }
    }

    fn receive(&mut self) -> nb::Result<WORD, Self::Error> {
        if !self.awaiting_receive {
            Err(nb::Error::Other(FakeError(0xFF)))
        } else {
            self.awaiting_receive = false;
            Ok(self.to_receive.pop_front().unwrap_or_default())
        }
    }
}
