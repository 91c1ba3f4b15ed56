use crate::{error::Error, hal::RawStatus};

/// Fake driver failure carrying the raw status a real driver would report.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FakeError(pub u8);

impl From<FakeError> for Error {
    fn from(_error: FakeError) -> Self {
        Error::DeviceError("A fake error occurred [TESTING ONLY]")
    }
}

impl RawStatus for FakeError {
    fn status_code(&self) -> u8 { self.0 }
}
