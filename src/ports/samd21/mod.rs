//! SAMD21 bridge board.
use crate::{
    devices::{image::NVM_SIZE, interrupts::VectorSlot},
    hal::flash::Address,
};

pub mod mode_signal;
pub mod system;

pub const NVM_BASE: Address = Address(0);
pub const NVM_PAGE_SIZE: usize = 64;
pub const NVM_ROW_SIZE: usize = 4 * NVM_PAGE_SIZE;

static_assertions::const_assert!(NVM_SIZE % NVM_ROW_SIZE == 0);

/// Reference used by the external interrupt controller vector.
pub static EIC_VECTOR: VectorSlot = VectorSlot::empty();

/// Body of the `EIC` interrupt handler.
pub fn on_eic_interrupt() {
    if !EIC_VECTOR.fire() {
        warn!("EIC interrupt before the bridge was installed");
    }
}
