//! USB side channels used by the bridge outside the command endpoints.

/// Interrupt (notify) endpoint, polled by the host for asynchronous events.
pub trait Notify {
    /// Publishes the aggregate interrupt status, replacing any value the host
    /// has not collected yet.
    fn notify(&mut self, status: u32);
}
