//! Traits for Serial Peripheral Interface implementation.
use super::RawStatus;
use core::fmt::Debug;
use nb::block;

// Allows the transmission and reception of a word in full duplex.
pub trait FullDuplex<WORD: Copy> {
    type Error: RawStatus + Copy + Debug;

    fn transmit(&mut self, word: Option<WORD>) -> nb::Result<(), Self::Error>;
    // Must be called after transmit (full duplex operation)
    fn receive(&mut self) -> nb::Result<WORD, Self::Error>;

    /// Blocking transfer of a whole buffer, one word at a time. Received words
    /// land in `rx`, which is expected to be at least as long as `tx`.
    fn transfer(&mut self, tx: &[WORD], rx: &mut [WORD]) -> Result<(), Self::Error> {
        for (word, received) in tx.iter().zip(rx.iter_mut()) {
            block!(self.transmit(Some(*word)))?;
            *received = block!(self.receive())?;
        }
        Ok(())
    }
}
