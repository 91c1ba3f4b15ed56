//! Command protocol engine.
//!
//! Every host command arrives as a single frame on the bulk OUT endpoint
//! and is answered with a single frame on the bulk IN endpoint:
//!
//! ```text
//! command:  [ opcode << 1 | sequence ] [ payload ... ]
//! response: [ echoed header byte     ] [ error code ] [ payload ... ]
//! ```
//!
//! The sequence bit toggles for every new logical command. A frame whose
//! sequence bit matches the last accepted one is a host retry: the engine
//! reports that the cached response must be resent, and no handler runs,
//! so state mutating commands (flash writes, pin changes) are never
//! applied twice.
//!
//! Handlers are looked up through [`CommandSet`], an exhaustive match over
//! [`Opcode`] implemented by each firmware image (application or resident
//! bootloader).
use super::firmware_mode::FirmwareMode;
use crate::{error::Error, utilities::bitwise::BitFlags};

pub mod parse;

/// Echoed header byte plus error code.
pub const HEADER_SIZE: usize = 2;
const SEQUENCE_BIT: u8 = 0;

/// Error byte carried in every response.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum ErrorCode {
    None = 0,
    UnknownCommand = 1,
    NoMemory = 2,
    MalformedPacket = 3,
    ResourceBusy = 4,
    Parameter = 5,
    State = 6,
    OperationFailed = 7,
}

impl From<Error> for ErrorCode {
    fn from(_: Error) -> Self { ErrorCode::OperationFailed }
}

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum Opcode {
    Echo = 0x01,
    SetConfig = 0x02,
    GpioConfigure = 0x03,
    GpioPinSet = 0x04,
    GpioPinRead = 0x05,
    GpioGetInterruptStatus = 0x06,
    GpioClearInterruptStatus = 0x07,
    GpioEnablePinInterrupt = 0x08,
    GpioParallelWrite = 0x09,
    SpiTransfer = 0x0A,
    DfuStart = 0x0B,
    DfuWriteData = 0x0C,
    DfuReadData = 0x0D,
    DfuResetReadPointer = 0x0E,
    DfuDoneWriting = 0x0F,
    DfuReset = 0x10,
    I2cTransaction = 0x11,
    GpioDisablePinInterrupt = 0x12,
}

impl TryFrom<u8> for Opcode {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Ok(match value {
            0x01 => Opcode::Echo,
            0x02 => Opcode::SetConfig,
            0x03 => Opcode::GpioConfigure,
            0x04 => Opcode::GpioPinSet,
            0x05 => Opcode::GpioPinRead,
            0x06 => Opcode::GpioGetInterruptStatus,
            0x07 => Opcode::GpioClearInterruptStatus,
            0x08 => Opcode::GpioEnablePinInterrupt,
            0x09 => Opcode::GpioParallelWrite,
            0x0A => Opcode::SpiTransfer,
            0x0B => Opcode::DfuStart,
            0x0C => Opcode::DfuWriteData,
            0x0D => Opcode::DfuReadData,
            0x0E => Opcode::DfuResetReadPointer,
            0x0F => Opcode::DfuDoneWriting,
            0x10 => Opcode::DfuReset,
            0x11 => Opcode::I2cTransaction,
            0x12 => Opcode::GpioDisablePinInterrupt,
            unknown => return Err(unknown),
        })
    }
}

/// Vendor requests on the control endpoint, outside the command stream.
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum ControlRequest {
    /// Host (re)connected: forget the sequence state.
    Reset = 0x00,
    /// Host reads the one byte firmware mode indicator.
    Mode = 0x01,
}

impl TryFrom<u8> for ControlRequest {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x00 => Ok(ControlRequest::Reset),
            0x01 => Ok(ControlRequest::Mode),
            unknown => Err(unknown),
        }
    }
}

/// Bounded sink for a response payload.
pub struct Response<'a> {
    buffer: &'a mut [u8],
    length: usize,
}

impl<'a> Response<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self { Self { buffer, length: 0 } }

    pub fn len(&self) -> usize { self.length }

    pub fn is_empty(&self) -> bool { self.length == 0 }

    pub fn remaining(&self) -> usize { self.buffer.len() - self.length }

    pub fn as_slice(&self) -> &[u8] { &self.buffer[..self.length] }

    pub fn clear(&mut self) { self.length = 0; }

    /// Drops everything past `length`. No effect if the payload is shorter.
    pub fn truncate(&mut self, length: usize) { self.length = self.length.min(length); }

    pub fn push(&mut self, byte: u8) -> Result<(), ErrorCode> { self.extend_from_slice(&[byte]) }

    pub fn extend_from_slice(&mut self, bytes: &[u8]) -> Result<(), ErrorCode> {
        self.reserve(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    /// Appends `count` zeroed bytes and hands them out to be filled in place.
    pub fn reserve(&mut self, count: usize) -> Result<&mut [u8], ErrorCode> {
        if count > self.remaining() {
            return Err(ErrorCode::NoMemory);
        }
        let start = self.length;
        self.length += count;
        let region = &mut self.buffer[start..self.length];
        region.fill(0);
        Ok(region)
    }
}

/// Uniform command handler: request payload in, response payload out.
pub type Handler<D> = fn(&mut D, &[u8], &mut Response<'_>) -> Result<(), ErrorCode>;

/// Set of commands served by one firmware image.
pub trait CommandSet: Sized {
    /// Reported through [`ControlRequest::Mode`].
    const MODE: FirmwareMode;

    fn handler(opcode: Opcode) -> Option<Handler<Self>>;

    /// Runs when the host resets the command channel.
    fn on_reset(&mut self) {}
}

/// Result of processing one frame.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Nothing new arrived; the last response goes out again untouched.
    ResendCached,
    /// A fresh response of this many bytes is ready.
    Respond(usize),
}

#[derive(Default)]
pub struct Engine {
    last_sequence: Option<bool>,
}

impl Engine {
    pub const fn new() -> Self { Self { last_sequence: None } }

    pub fn process<D: CommandSet>(
        &mut self,
        device: &mut D,
        frame: &[u8],
        response: &mut [u8],
    ) -> Outcome {
        let (header, payload) = match frame.split_first() {
            Some((header, payload)) => (*header, payload),
            None => return Outcome::ResendCached,
        };

        let sequence = header.is_set(SEQUENCE_BIT);
        if self.last_sequence == Some(sequence) {
            debug!("Repeated sequence bit in header {:#x}, resending", header);
            return Outcome::ResendCached;
        }
        self.last_sequence = Some(sequence);

        assert!(response.len() >= HEADER_SIZE, "Response buffer can't hold a header");
        let (head, body) = response.split_at_mut(HEADER_SIZE);
        let mut sink = Response::new(body);

        let code = match Opcode::try_from(header >> 1).ok().and_then(D::handler) {
            Some(handler) => match handler(device, payload, &mut sink) {
                Ok(()) => ErrorCode::None,
                Err(code) => code,
            },
            None => {
                warn!("Unknown opcode {:#x}", header >> 1);
                sink.clear();
                ErrorCode::UnknownCommand
            }
        };

        head[0] = header;
        head[1] = code as u8;
        Outcome::Respond(HEADER_SIZE + sink.len())
    }

    /// Forgets the last accepted sequence bit, so the next frame is always
    /// treated as new.
    pub fn reset(&mut self) { self.last_sequence = None; }

    /// Services a control endpoint request. Returns the data stage for reads.
    pub fn control<D: CommandSet>(&mut self, device: &mut D, request: ControlRequest) -> Option<u8> {
        match request {
            ControlRequest::Reset => {
                info!("Command channel reset");
                self.reset();
                device.on_reset();
                None
            }
            ControlRequest::Mode => Some(D::MODE as u8),
        }
    }
}

/// Copies the request payload back.
pub fn echo<D>(_: &mut D, request: &[u8], response: &mut Response<'_>) -> Result<(), ErrorCode> {
    response.extend_from_slice(request)
}

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Default)]
    struct Counter {
        increments: usize,
        resets: usize,
    }

    impl Counter {
        fn increment(&mut self, request: &[u8], response: &mut Response<'_>) -> Result<(), ErrorCode> {
            let (_, step) = parse::byte(request)?;
            self.increments += step as usize;
            response.push(self.increments as u8)
        }
    }

    impl CommandSet for Counter {
        const MODE: FirmwareMode = FirmwareMode::Application;

        fn handler(opcode: Opcode) -> Option<Handler<Self>> {
            let handler: Handler<Self> = match opcode {
                Opcode::Echo => echo,
                Opcode::DfuWriteData => Self::increment,
                _ => return None,
            };
            Some(handler)
        }

        fn on_reset(&mut self) { self.resets += 1; }
    }

    fn header(opcode: Opcode, sequence: bool) -> u8 { (opcode as u8) << 1 | sequence as u8 }

    #[test]
    fn echo_returns_payload_behind_header_and_error_byte() {
        // Given
        let mut engine = Engine::new();
        let mut device = Counter::default();
        let mut response = [0u8; 16];
        let frame = [header(Opcode::Echo, true), 0xDE, 0xAD];

        // When
        let outcome = engine.process(&mut device, &frame, &mut response);

        // Then
        assert_eq!(outcome, Outcome::Respond(4));
        assert_eq!(response[..4], [frame[0], ErrorCode::None as u8, 0xDE, 0xAD]);
    }

    #[test]
    fn retransmitted_frame_is_not_dispatched_again() {
        // Given
        let mut engine = Engine::new();
        let mut device = Counter::default();
        let mut response = [0u8; 8];
        let frame = [header(Opcode::DfuWriteData, false), 3];
        assert_eq!(engine.process(&mut device, &frame, &mut response), Outcome::Respond(3));

        // When
        let outcome = engine.process(&mut device, &frame, &mut response);

        // Then
        assert_eq!(outcome, Outcome::ResendCached);
        assert_eq!(device.increments, 3);
    }

    #[test]
    fn toggled_sequence_bit_is_a_new_command() {
        // Given
        let mut engine = Engine::new();
        let mut device = Counter::default();
        let mut response = [0u8; 8];
        engine.process(&mut device, &[header(Opcode::DfuWriteData, false), 1], &mut response);

        // When
        let outcome =
            engine.process(&mut device, &[header(Opcode::DfuWriteData, true), 1], &mut response);

        // Then
        assert_eq!(outcome, Outcome::Respond(3));
        assert_eq!(device.increments, 2);
        assert_eq!(response[2], 2);
    }

    #[test]
    fn empty_frame_resends_cached_response() {
        let mut engine = Engine::new();
        let mut device = Counter::default();
        let mut response = [0u8; 8];
        assert_eq!(engine.process(&mut device, &[], &mut response), Outcome::ResendCached);
    }

    #[test]
    fn unknown_and_unserved_opcodes_yield_unknown_command_with_no_payload() {
        // Given
        let mut engine = Engine::new();
        let mut device = Counter::default();
        let mut response = [0u8; 8];

        // When
        let unassigned = engine.process(&mut device, &[0x7F << 1, 1, 2], &mut response);

        // Then
        assert_eq!(unassigned, Outcome::Respond(HEADER_SIZE));
        assert_eq!(response[1], ErrorCode::UnknownCommand as u8);

        // When
        let unserved =
            engine.process(&mut device, &[header(Opcode::SpiTransfer, true)], &mut response);

        // Then
        assert_eq!(unserved, Outcome::Respond(HEADER_SIZE));
        assert_eq!(response[0], header(Opcode::SpiTransfer, true));
        assert_eq!(response[1], ErrorCode::UnknownCommand as u8);
    }

    #[test]
    fn undersized_payload_is_malformed_not_fatal() {
        // Given
        let mut engine = Engine::new();
        let mut device = Counter::default();
        let mut response = [0u8; 8];

        // When
        let outcome =
            engine.process(&mut device, &[header(Opcode::DfuWriteData, true)], &mut response);

        // Then
        assert_eq!(outcome, Outcome::Respond(HEADER_SIZE));
        assert_eq!(response[1], ErrorCode::MalformedPacket as u8);
        assert_eq!(device.increments, 0);
    }

    #[test]
    fn echo_larger_than_response_capacity_is_out_of_memory() {
        let mut engine = Engine::new();
        let mut device = Counter::default();
        let mut response = [0u8; 3];
        let outcome = engine.process(&mut device, &[header(Opcode::Echo, true), 1, 2], &mut response);
        assert_eq!(outcome, Outcome::Respond(HEADER_SIZE));
        assert_eq!(response[1], ErrorCode::NoMemory as u8);
    }

    #[test]
    fn first_frame_is_accepted_with_either_sequence_bit() {
        for sequence in [false, true] {
            let mut engine = Engine::new();
            let mut device = Counter::default();
            let mut response = [0u8; 8];
            let frame = [header(Opcode::Echo, sequence)];
            assert_eq!(engine.process(&mut device, &frame, &mut response), Outcome::Respond(2));
        }
    }

    #[test]
    fn control_reset_clears_sequence_state_and_notifies_device() {
        // Given
        let mut engine = Engine::new();
        let mut device = Counter::default();
        let mut response = [0u8; 8];
        let frame = [header(Opcode::DfuWriteData, true), 1];
        engine.process(&mut device, &frame, &mut response);

        // When
        assert_eq!(engine.control(&mut device, ControlRequest::Reset), None);
        let outcome = engine.process(&mut device, &frame, &mut response);

        // Then
        assert_eq!(outcome, Outcome::Respond(3));
        assert_eq!(device.increments, 2);
        assert_eq!(device.resets, 1);
    }

    #[test]
    fn mode_request_reports_command_set_mode() {
        let mut engine = Engine::new();
        let mut device = Counter::default();
        assert_eq!(
            engine.control(&mut device, ControlRequest::Mode),
            Some(FirmwareMode::Application as u8)
        );
        assert_eq!(ControlRequest::try_from(0x01), Ok(ControlRequest::Mode));
        assert_eq!(ControlRequest::try_from(0x02), Err(0x02));
    }

    #[test]
    #[should_panic]
    fn response_buffer_without_room_for_header_is_fatal() {
        let mut engine = Engine::new();
        let mut device = Counter::default();
        let mut response = [0u8; 1];
        engine.process(&mut device, &[header(Opcode::Echo, true)], &mut response);
    }
}
