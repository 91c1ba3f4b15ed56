//! Convenience bitwise operations.

/// Simple check for particular bits being set or cleared.
pub trait BitFlags {
    fn is_set(&self, bit: u8) -> bool;
    fn is_clear(&self, bit: u8) -> bool;
}

/// Blanket implementation for any types convertible to u32.
impl<U: Copy + Into<u32>> BitFlags for U {
    fn is_set(&self, bit: u8) -> bool {
        assert!(bit < 32);
        ((*self).into() & (1u32 << bit)) != 0
    }

    fn is_clear(&self, bit: u8) -> bool { !self.is_set(bit) }
}

/// Mask covering the lowest `count` bits of a word.
pub const fn low_bits(count: usize) -> u32 {
    if count >= 32 {
        u32::MAX
    } else {
        (1u32 << count) - 1
    }
}
