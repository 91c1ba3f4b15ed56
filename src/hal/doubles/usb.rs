use crate::hal::usb::Notify;

#[derive(Default)]
pub struct FakeNotify {
    pub notifications: Vec<u32>,
}

impl Notify for FakeNotify {
    fn notify(&mut self, status: u32) { self.notifications.push(status); }
}
