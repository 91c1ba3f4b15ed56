//! External interrupt dispatch.
//!
//! Everything the pin edge interrupt shares with the command loop lives in
//! one [`Interrupts`] context: the controller registers, the line bindings,
//! the active bridge mode, the sticky interrupt status and the notify
//! channel. Both sides only reach it through [`Interrupts::with`], a short
//! critical section.
//!
//! Subsystems that want edges implement [`EdgeHandler`] and bind it to a
//! line. The hardware vector holds a single reference to the context
//! through a [`VectorSlot`].
use super::configuration::Mode;
use crate::{
    hal::{
        eic::{ExternalInterrupts, Line, Sense, LINE_COUNT},
        gpio::PinId,
        usb::Notify,
    },
    utilities::bitwise::BitFlags,
};
use core::cell::{Cell, RefCell};
use critical_section::Mutex;

/// Aggregate status bits relayed to the host over the notify channel.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Pending {
    Gpio = 0,
    Spi = 1,
}

/// Capability to react to an edge on a bound line. Runs in interrupt
/// context, inside the critical section.
pub trait EdgeHandler: Sync {
    /// Returns whether the aggregate status changed and the host should be
    /// notified.
    fn on_edge(&self, status: &mut Status, pin: PinId, line: Line) -> bool;
}

#[derive(Copy, Clone)]
struct Binding {
    handler: &'static dyn EdgeHandler,
    pin: PinId,
}

/// Interrupt state visible to the host.
pub struct Status {
    mode: Mode,
    pins: u32,
    aggregate: u32,
}

impl Status {
    const fn new() -> Self { Self { mode: Mode::Gpio, pins: 0, aggregate: 0 } }

    pub fn mode(&self) -> Mode { self.mode }

    pub(crate) fn set_mode(&mut self, mode: Mode) { self.mode = mode; }

    /// Sticky bitmask, bit `n` set when an edge was seen on bridge index `n`.
    pub fn pins(&self) -> u32 { self.pins }

    pub fn aggregate(&self) -> u32 { self.aggregate }

    pub fn raise_pin(&mut self, index: u8) {
        self.pins |= 1 << index;
        self.aggregate |= 1 << Pending::Gpio as u8;
    }

    /// Clears the given pins. Returns true when this left no pin pending,
    /// in which case the aggregate GPIO flag is dropped as well.
    pub fn clear_pins(&mut self, mask: u32) -> bool {
        self.pins &= !mask;
        if self.pins == 0 {
            self.aggregate &= !(1 << Pending::Gpio as u8);
            true
        } else {
            false
        }
    }
}

/// External interrupt controller driver: registers plus line bindings.
pub struct Eic<E> {
    registers: E,
    bindings: [Option<Binding>; LINE_COUNT],
}

impl<E: ExternalInterrupts> Eic<E> {
    pub const fn new(registers: E) -> Self { Self { registers, bindings: [None; LINE_COUNT] } }

    /// Configures `line` for `pin`, binds `handler` to it and enables it.
    pub fn bind(&mut self, line: Line, sense: Sense, pin: PinId, handler: &'static dyn EdgeHandler) {
        if let Some(slot) = self.bindings.get_mut(line.0 as usize) {
            self.registers.configure(line, sense, pin);
            *slot = Some(Binding { handler, pin });
            self.registers.enable(line);
        }
    }

    pub fn unbind(&mut self, line: Line) {
        if let Some(slot) = self.bindings.get_mut(line.0 as usize) {
            self.registers.disable(line);
            *slot = None;
        }
    }

    pub fn is_bound(&self, line: Line) -> bool {
        matches!(self.bindings.get(line.0 as usize), Some(Some(_)))
    }

    pub fn registers(&self) -> &E { &self.registers }

    pub fn registers_mut(&mut self) -> &mut E { &mut self.registers }

    /// Services every pending line. Lines with no binding are cleared and the
    /// edge is dropped, as they can fire before the bridge is fully set up.
    fn dispatch(&mut self, status: &mut Status) -> bool {
        let pending = self.registers.pending();
        let mut raised = false;
        for index in 0..LINE_COUNT as u8 {
            if pending.is_clear(index) {
                continue;
            }
            let line = Line(index);
            match self.bindings[index as usize] {
                Some(binding) => raised |= binding.handler.on_edge(status, binding.pin, line),
                None => warn!("Dropped edge on unbound line {}", index),
            }
            self.registers.clear(line);
        }
        raised
    }
}

pub struct Shared<E, N> {
    pub eic: Eic<E>,
    pub status: Status,
    pub notify: N,
}

impl<E: ExternalInterrupts, N: Notify> Shared<E, N> {
    /// Pushes the current aggregate status to the host.
    pub fn publish(&mut self) { self.notify.notify(self.status.aggregate()); }

    fn dispatch(&mut self) {
        if self.eic.dispatch(&mut self.status) {
            self.publish();
        }
    }
}

/// Interrupt context shared between the command loop and the hardware vector.
pub struct Interrupts<E, N> {
    shared: Mutex<RefCell<Shared<E, N>>>,
}

impl<E: ExternalInterrupts, N: Notify> Interrupts<E, N> {
    pub const fn new(registers: E, notify: N) -> Self {
        Self {
            shared: Mutex::new(RefCell::new(Shared {
                eic: Eic::new(registers),
                status: Status::new(),
                notify,
            })),
        }
    }

    /// Runs `f` on the shared state with interrupts masked. Must not block.
    pub fn with<R>(&self, f: impl FnOnce(&mut Shared<E, N>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.shared.borrow_ref_mut(cs)))
    }
}

/// Entry point of a hardware interrupt vector.
pub trait Vector: Sync {
    fn on_interrupt(&self);
}

impl<E, N> Vector for Interrupts<E, N>
where
    E: ExternalInterrupts + Send,
    N: Notify + Send,
{
    fn on_interrupt(&self) { self.with(Shared::dispatch) }
}

/// The one reference the hardware vector holds, installed once at init.
pub struct VectorSlot {
    vector: Mutex<Cell<Option<&'static dyn Vector>>>,
}

impl Default for VectorSlot {
    fn default() -> Self { Self::empty() }
}

impl VectorSlot {
    pub const fn empty() -> Self { Self { vector: Mutex::new(Cell::new(None)) } }

    pub fn install(&self, vector: &'static dyn Vector) {
        critical_section::with(|cs| {
            let slot = self.vector.borrow(cs);
            if slot.get().is_some() {
                warn!("Interrupt vector already installed");
            } else {
                slot.set(Some(vector));
            }
        })
    }

    /// Forwards to the installed vector. Returns false if nothing is
    /// installed yet, leaving the caller to acknowledge the hardware.
    pub fn fire(&self) -> bool {
        match critical_section::with(|cs| self.vector.borrow(cs).get()) {
            Some(vector) => {
                vector.on_interrupt();
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::doubles::{eic::FakeEic, usb::FakeNotify};

    struct Recorder;

    impl EdgeHandler for Recorder {
        fn on_edge(&self, status: &mut Status, pin: PinId, _line: Line) -> bool {
            status.raise_pin(pin.0 - 32);
            true
        }
    }

    static RECORDER: Recorder = Recorder;

    #[test]
    fn pending_bound_line_reaches_its_handler_and_is_cleared() {
        // Given
        let interrupts = Interrupts::new(FakeEic::default(), FakeNotify::default());
        interrupts.with(|shared| {
            shared.eic.bind(Line(5), Sense::Rising, PinId(37), &RECORDER);
            shared.eic.registers_mut().pending = 1 << 5;
        });

        // When
        interrupts.on_interrupt();

        // Then
        interrupts.with(|shared| {
            assert_eq!(shared.status.pins(), 1 << 5);
            assert_eq!(shared.eic.registers().pending, 0);
            assert_eq!(shared.notify.notifications, vec![1 << Pending::Gpio as u8]);
        });
    }

    #[test]
    fn edge_without_binding_is_dropped_and_cleared() {
        // Given
        let interrupts = Interrupts::new(FakeEic::default(), FakeNotify::default());
        interrupts.with(|shared| shared.eic.registers_mut().pending = 1 << 2);

        // When
        interrupts.on_interrupt();

        // Then
        interrupts.with(|shared| {
            assert_eq!(shared.eic.registers().pending, 0);
            assert_eq!(shared.status.pins(), 0);
            assert!(shared.notify.notifications.is_empty());
        });
    }

    #[test]
    fn unbinding_disables_line_and_forgets_handler() {
        // Given
        let interrupts = Interrupts::new(FakeEic::default(), FakeNotify::default());
        interrupts.with(|shared| shared.eic.bind(Line(1), Sense::Both, PinId(33), &RECORDER));

        // When
        interrupts.with(|shared| shared.eic.unbind(Line(1)));

        // Then
        interrupts.with(|shared| {
            assert!(!shared.eic.is_bound(Line(1)));
            assert_eq!(shared.eic.registers().enabled, 0);
            assert_eq!(shared.eic.registers().senses[1], Some((Sense::Both, PinId(33))));
        });
    }

    #[test]
    fn clearing_last_pin_drops_aggregate_flag() {
        // Given
        let mut status = Status::new();
        status.raise_pin(3);
        status.raise_pin(4);

        // When / Then
        assert!(!status.clear_pins(1 << 3));
        assert_eq!(status.aggregate(), 1);
        assert!(status.clear_pins(1 << 4));
        assert_eq!(status.aggregate(), 0);
    }

    #[test]
    fn vector_slot_is_inert_until_installed_and_installs_once() {
        // Given
        let slot = VectorSlot::empty();
        let first: &'static Interrupts<FakeEic, FakeNotify> =
            Box::leak(Box::new(Interrupts::new(FakeEic::default(), FakeNotify::default())));
        let second: &'static Interrupts<FakeEic, FakeNotify> =
            Box::leak(Box::new(Interrupts::new(FakeEic::default(), FakeNotify::default())));
        first.with(|shared| shared.eic.registers_mut().pending = 1);
        second.with(|shared| shared.eic.registers_mut().pending = 1);

        // When / Then
        assert!(!slot.fire());
        slot.install(first);
        slot.install(second);
        assert!(slot.fire());
        assert_eq!(first.with(|shared| shared.eic.registers().pending), 0);
        assert_eq!(second.with(|shared| shared.eic.registers().pending), 1);
    }
}
