use crate::hal::{
    eic::{ExternalInterrupts, Line, Sense, LINE_COUNT},
    gpio::PinId,
};

#[derive(Default)]
pub struct FakeEic {
    pub pending: u32,
    pub enabled: u32,
    pub senses: [Option<(Sense, PinId)>; LINE_COUNT],
}

impl ExternalInterrupts for FakeEic {
    fn configure(&mut self, line: Line, sense: Sense, pin: PinId) {
        self.senses[line.0 as usize] = Some((sense, pin));
    }

    fn enable(&mut self, line: Line) { self.enabled |= 1 << line.0; }

    fn disable(&mut self, line: Line) { self.enabled &= !(1 << line.0); }

    fn pending(&self) -> u32 { self.pending }

    fn clear(&mut self, line: Line) { self.pending &= !(1 << line.0); }
}
