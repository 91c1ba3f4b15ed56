//! I2C master bridge.
//!
//! A transaction is described by a format string run left to right:
//!
//! * `W` writes the literal byte that follows it in the format string.
//! * `w` writes `N` bytes taken from the payload, where `N` is the next
//!   payload byte.
//! * `r` reads `N` bytes, `N` being the next format byte.
//! * `.` releases the bus.
//!
//! Every bus operation appends a sub-header `[length, op, error, status]`
//! to the response (reads are followed by their data). Processing stops
//! at the first failed operation, after its sub-header is written.
use super::Application;
use crate::{
    devices::{
        firmware_mode::WriteModeSignal,
        protocol::{parse, ErrorCode, Response},
    },
    hal::{eic::ExternalInterrupts, gpio::Port, i2c::Master, sercom::Sercom, usb::Notify, RawStatus},
};
use nb::block;

const SUB_HEADER_SIZE: usize = 4;

const WRITE_LITERAL: u8 = b'W';
const WRITE: u8 = b'w';
const READ: u8 = b'r';
const STOP: u8 = b'.';

fn sub_header(data_length: usize, op: u8, status: Option<u8>) -> [u8; SUB_HEADER_SIZE] {
    let error = match status {
        Some(_) => ErrorCode::OperationFailed,
        None => ErrorCode::None,
    };
    [(SUB_HEADER_SIZE - 1 + data_length) as u8, op, error as u8, status.unwrap_or(0)]
}

/// A failed write releases the bus before giving up.
fn write<I: Master>(
    i2c: &mut I,
    address: u8,
    bytes: &[u8],
    response: &mut Response<'_>,
) -> Result<(), ErrorCode> {
    let header = response.reserve(SUB_HEADER_SIZE)?;
    let status = block!(i2c.write(address, bytes)).err().map(|e| e.status_code());
    header.copy_from_slice(&sub_header(0, WRITE, status));
    match status {
        Some(status) => {
            warn!("I2C write to {:#x} failed, status {}", address, status);
            i2c.stop();
            Err(ErrorCode::OperationFailed)
        }
        None => Ok(()),
    }
}

/// A failed read leaves the bus as the driver left it.
fn read<I: Master>(
    i2c: &mut I,
    address: u8,
    count: usize,
    response: &mut Response<'_>,
) -> Result<(), ErrorCode> {
    let region = response.reserve(SUB_HEADER_SIZE + count)?;
    let (header, data) = region.split_at_mut(SUB_HEADER_SIZE);
    let status = block!(i2c.read(address, data)).err().map(|e| e.status_code());
    header.copy_from_slice(&sub_header(count, READ, status));
    match status {
        Some(status) => {
            warn!("I2C read from {:#x} failed, status {}", address, status);
            Err(ErrorCode::OperationFailed)
        }
        None => Ok(()),
    }
}

impl<'a, G, S, E, N, W> Application<'a, G, S, E, N, W>
where
    G: Port,
    S: Sercom,
    E: ExternalInterrupts,
    N: Notify,
    W: WriteModeSignal,
{
    /// `[address, format_length, format..., payload...]`
    pub(super) fn i2c_transaction(
        &mut self,
        request: &[u8],
        response: &mut Response<'_>,
    ) -> Result<(), ErrorCode> {
        let (request, address) = parse::byte(request)?;
        let (request, format_length) = parse::byte(request)?;
        let i2c = self.configuration.i2c().ok_or(ErrorCode::State)?;
        let (mut payload, mut format) = parse::bytes(request, format_length as usize)?;

        while let Some((&op, rest)) = format.split_first() {
            format = rest;
            match op {
                WRITE_LITERAL => {
                    let (rest, literal) = parse::byte(format)?;
                    format = rest;
                    write(i2c, address, &[literal], response)?;
                }
                WRITE => {
                    let (rest, count) = parse::byte(payload)?;
                    let (rest, bytes) = parse::bytes(rest, count as usize)?;
                    payload = rest;
                    write(i2c, address, bytes, response)?;
                }
                READ => {
                    let (rest, count) = parse::byte(format)?;
                    format = rest;
                    read(i2c, address, count as usize, response)?;
                }
                STOP => i2c.stop(),
                unknown => {
                    warn!("Unknown I2C operation {:#x}", unknown);
                    return Err(ErrorCode::Parameter);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::super::test::{call, Fixture, TestApplication};
    use super::*;
    use crate::{
        devices::{configuration::Mode, protocol::Opcode},
        hal::doubles::{error::FakeError, i2c::BusEvent},
    };

    const SLAVE: u8 = 0x50;

    fn i2c_application(fixture: &Fixture) -> TestApplication<'_> {
        let mut application = fixture.application();
        call(&mut application, Opcode::SetConfig, &[Mode::I2cMaster as u8, 1]);
        application
    }

    fn transaction(format: &[u8], payload: &[u8]) -> Vec<u8> {
        let mut request = vec![SLAVE, format.len() as u8];
        request.extend_from_slice(format);
        request.extend_from_slice(payload);
        request
    }

    #[test]
    fn register_read_writes_then_reads_with_sub_headers() {
        // Given
        let fixture = Fixture::new();
        let mut application = i2c_application(&fixture);
        application.configuration.sercom_mut().i2c.to_read.push_back(vec![0xDE, 0xAD]);

        // When
        let (code, payload) = call(
            &mut application,
            Opcode::I2cTransaction,
            &transaction(&[b'W', 0x10, b'r', 2, b'.'], &[]),
        );

        // Then
        assert_eq!(code, ErrorCode::None);
        assert_eq!(payload, vec![3, b'w', 0, 0, 5, b'r', 0, 0, 0xDE, 0xAD]);
        assert_eq!(
            application.configuration().sercom().i2c.events,
            vec![
                BusEvent::Write { address: SLAVE, bytes: vec![0x10] },
                BusEvent::Read { address: SLAVE, length: 2 },
                BusEvent::Stop,
            ]
        );
    }

    #[test]
    fn payload_writes_take_their_length_from_the_payload() {
        // Given
        let fixture = Fixture::new();
        let mut application = i2c_application(&fixture);

        // When
        let (code, payload) = call(
            &mut application,
            Opcode::I2cTransaction,
            &transaction(b"ww", &[2, 0xA0, 0xA1, 1, 0xB0]),
        );

        // Then
        assert_eq!(code, ErrorCode::None);
        assert_eq!(payload, vec![3, b'w', 0, 0, 3, b'w', 0, 0]);
        assert_eq!(
            application.configuration().sercom().i2c.events,
            vec![
                BusEvent::Write { address: SLAVE, bytes: vec![0xA0, 0xA1] },
                BusEvent::Write { address: SLAVE, bytes: vec![0xB0] },
            ]
        );
    }

    #[test]
    fn failed_write_stops_the_bus_and_skips_the_read() {
        // Given
        let fixture = Fixture::new();
        let mut application = i2c_application(&fixture);
        application.configuration.sercom_mut().i2c.write_error = Some(FakeError(0x18));

        // When
        let (code, payload) = call(
            &mut application,
            Opcode::I2cTransaction,
            &transaction(&[b'w', b'r', 4], &[1, 0x10]),
        );

        // Then
        assert_eq!(code, ErrorCode::OperationFailed);
        assert_eq!(payload, vec![3, b'w', ErrorCode::OperationFailed as u8, 0x18]);
        assert_eq!(
            application.configuration().sercom().i2c.events,
            vec![BusEvent::Write { address: SLAVE, bytes: vec![0x10] }, BusEvent::Stop]
        );
    }

    #[test]
    fn bare_write_read_format_with_a_single_payload_byte_is_malformed() {
        // Given
        let fixture = Fixture::new();
        let mut application = i2c_application(&fixture);
        application.configuration.sercom_mut().i2c.write_error = Some(FakeError(0x18));

        // When
        // `w` takes 0x10 as its length and finds no data behind it.
        let (code, payload) =
            call(&mut application, Opcode::I2cTransaction, &transaction(b"wr", &[0x10]));

        // Then
        assert_eq!(code, ErrorCode::MalformedPacket);
        assert!(payload.is_empty());
        assert!(application.configuration().sercom().i2c.events.is_empty());
    }

    #[test]
    fn failed_read_does_not_stop_the_bus() {
        // Given
        let fixture = Fixture::new();
        let mut application = i2c_application(&fixture);
        application.configuration.sercom_mut().i2c.read_error = Some(FakeError(0x20));

        // When
        let (code, payload) =
            call(&mut application, Opcode::I2cTransaction, &transaction(&[b'r', 2, b'.'], &[]));

        // Then
        assert_eq!(code, ErrorCode::OperationFailed);
        assert_eq!(payload, vec![5, b'r', ErrorCode::OperationFailed as u8, 0x20, 0, 0]);
        assert_eq!(application.configuration().sercom().i2c.stops(), 0);
    }

    #[test]
    fn truncated_format_or_payload_is_malformed() {
        // Given
        let fixture = Fixture::new();
        let mut application = i2c_application(&fixture);

        // Then
        let missing_literal = transaction(b"W", &[]);
        let missing_count = transaction(&[b'W', 1, b'r'], &[]);
        let short_payload = transaction(b"w", &[3, 0xAA]);
        let short_format = vec![SLAVE, 4, b'W', 1];
        for request in [missing_literal, missing_count, short_payload, short_format] {
            assert_eq!(
                call(&mut application, Opcode::I2cTransaction, &request).0,
                ErrorCode::MalformedPacket
            );
        }
    }

    #[test]
    fn unknown_operation_is_a_parameter_error() {
        let fixture = Fixture::new();
        let mut application = i2c_application(&fixture);
        let (code, _) = call(&mut application, Opcode::I2cTransaction, &transaction(b"x", &[]));
        assert_eq!(code, ErrorCode::Parameter);
        assert!(application.configuration().sercom().i2c.events.is_empty());
    }

    #[test]
    fn transaction_needs_an_active_i2c_mode() {
        let fixture = Fixture::new();
        let mut application = fixture.application();
        let (code, _) = call(&mut application, Opcode::I2cTransaction, &transaction(b".", &[]));
        assert_eq!(code, ErrorCode::State);
    }

    #[test]
    fn slave_mode_does_not_drive_the_bus() {
        // Given
        let fixture = Fixture::new();
        let mut application = fixture.application();
        call(&mut application, Opcode::SetConfig, &[Mode::I2cSlave as u8, 0x42]);

        // When
        let (code, payload) =
            call(&mut application, Opcode::I2cTransaction, &transaction(&[b'W', 0x10], &[]));

        // Then
        assert_eq!(code, ErrorCode::State);
        assert!(payload.is_empty());
        assert!(application.configuration().sercom().i2c.events.is_empty());
    }

    #[test]
    fn read_larger_than_response_is_out_of_memory() {
        let fixture = Fixture::new();
        let mut application = i2c_application(&fixture);
        let (code, payload) =
            call(&mut application, Opcode::I2cTransaction, &transaction(&[b'r', 61], &[]));
        assert_eq!(code, ErrorCode::NoMemory);
        assert!(payload.is_empty());
        assert!(application.configuration().sercom().i2c.events.is_empty());
    }
}
