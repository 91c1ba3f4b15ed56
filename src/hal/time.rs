//! Frequency and rate units.

/// Bits per second
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct Bps(pub u32);

/// Hertz
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct Hertz(pub u32);

/// KiloHertz
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct KiloHertz(pub u32);

/// MegaHertz
#[derive(Clone, Copy, Debug, PartialOrd, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct MegaHertz(pub u32);

/// Extension trait that adds convenience methods to the `u32` type
pub trait U32Ext {
    /// Wrap in `Bps`
    fn bps(self) -> Bps;

    /// Wrap in `Hertz`
    fn hz(self) -> Hertz;

    /// Wrap in `KiloHertz`
    fn khz(self) -> KiloHertz;

    /// Wrap in `MegaHertz`
    fn mhz(self) -> MegaHertz;
}

impl U32Ext for u32 {
    fn bps(self) -> Bps { Bps(self) }

    fn hz(self) -> Hertz { Hertz(self) }

    fn khz(self) -> KiloHertz { KiloHertz(self) }

    fn mhz(self) -> MegaHertz { MegaHertz(self) }
}

impl From<KiloHertz> for Hertz {
    fn from(frequency: KiloHertz) -> Self { Hertz(frequency.0 * 1_000) }
}

impl From<MegaHertz> for Hertz {
    fn from(frequency: MegaHertz) -> Self { Hertz(frequency.0 * 1_000_000) }
}
