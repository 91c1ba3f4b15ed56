//! RAII guard that calls a given function when constructed,
//! and another when it drops out of scope.
//!
//! Useful for ensuring a chip select line is released no matter
//! the return path.
//!
//! Example
//! ```
//! # use usb_bridge_lib::hal::gpio::{PinId, Port};
//! # use usb_bridge_lib::hal::doubles::gpio::FakePort;
//! # use usb_bridge_lib::utilities::guard::Guard;
//! # let mut port = FakePort::default();
//! let chip_select = PinId(32);
//! {
//!     // The line is driven low as soon as the guard is constructed,
//!     // and the port is held by the guard until it drops.
//!     let _guard = Guard::new(
//!         &mut port,
//!         |port| port.set_level(chip_select, false),
//!         |port| port.set_level(chip_select, true),
//!     );
//! }
//! // Guard has dropped out of scope here, so the line is high again
//! assert!(port.level(chip_select));
//! # assert_eq!(port.changes, vec![(chip_select, false), (chip_select, true)]);
//! ```

use core::marker::PhantomData;

pub struct Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    item: &'a mut T,
    on_exit: Option<G>,
    _marker: PhantomData<F>,
}

impl<'a, T, F, G> Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    pub fn new(item: &'a mut T, on_entry: F, on_exit: G) -> Self {
        on_entry(item);
        Self { item, on_exit: Some(on_exit), _marker: PhantomData }
    }
}

impl<'a, T, F, G> Drop for Guard<'a, T, F, G>
where
    F: FnOnce(&mut T),
    G: FnOnce(&mut T),
{
    fn drop(&mut self) {
        if let Some(on_exit) = self.on_exit.take() {
            on_exit(self.item);
        }
    }
}
