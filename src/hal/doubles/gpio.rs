use crate::hal::gpio::{PinConfig, PinId, Port};
use std::{collections::BTreeMap, vec::Vec};

/// Bridge pin group starts at this pin (PB00).
const GROUP_BASE: u8 = 32;

#[derive(Clone, Debug, Default)]
pub struct FakePort {
    pub configs: BTreeMap<PinId, PinConfig>,
    pub levels: BTreeMap<PinId, bool>,
    /// Every individual level change, in order.
    pub changes: Vec<(PinId, bool)>,
    /// Every group write, as `(mask, bits)`.
    pub group_writes: Vec<(u32, u32)>,
}

impl FakePort {
    pub fn config(&self, pin: PinId) -> Option<PinConfig> { self.configs.get(&pin).copied() }
}

impl Port for FakePort {
    fn configure(&mut self, pin: PinId, config: PinConfig) { self.configs.insert(pin, config); }

    fn set_level(&mut self, pin: PinId, high: bool) {
        self.levels.insert(pin, high);
        self.changes.push((pin, high));
    }

    fn level(&self, pin: PinId) -> bool { self.levels.get(&pin).copied().unwrap_or(false) }

    fn write_group(&mut self, mask: u32, bits: u32) {
        self.group_writes.push((mask, bits));
        for bit in (0..32u8).filter(|bit| mask & (1 << bit) != 0) {
            self.levels.insert(PinId(GROUP_BASE + bit), bits & (1 << bit) != 0);
        }
    }
}
