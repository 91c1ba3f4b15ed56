//! Field parsers for command payloads.
//!
//! Thin wrappers over `nom` complete parsers: every shortfall in a host
//! payload is reported as [`ErrorCode::MalformedPacket`] and never halts
//! the device.
use super::ErrorCode;
use nom::{
    bytes::complete::take,
    number::complete::{le_u32, le_u8},
    IResult,
};

pub type Parsed<'a, T> = Result<(&'a [u8], T), ErrorCode>;

fn field<'a, O>(
    input: &'a [u8],
    mut parser: impl FnMut(&'a [u8]) -> IResult<&'a [u8], O>,
) -> Parsed<'a, O> {
    parser(input).map_err(|_| ErrorCode::MalformedPacket)
}

pub fn byte(input: &[u8]) -> Parsed<'_, u8> { field(input, le_u8) }

pub fn word(input: &[u8]) -> Parsed<'_, u32> { field(input, le_u32) }

pub fn bytes(input: &[u8], count: usize) -> Parsed<'_, &[u8]> { field(input, take(count)) }

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fields_are_consumed_little_endian_left_to_right() {
        // Given
        let payload = [0x07, 0x78, 0x56, 0x34, 0x12, 0xAA, 0xBB, 0xCC];

        // When
        let (rest, first) = byte(&payload).unwrap();
        let (rest, second) = word(rest).unwrap();
        let (rest, tail) = bytes(rest, 2).unwrap();

        // Then
        assert_eq!(first, 0x07);
        assert_eq!(second, 0x1234_5678);
        assert_eq!(tail, &[0xAA, 0xBB]);
        assert_eq!(rest, &[0xCC]);
    }

    #[test]
    fn short_payloads_are_malformed() {
        assert_eq!(byte(&[]), Err(ErrorCode::MalformedPacket));
        assert_eq!(word(&[1, 2, 3]), Err(ErrorCode::MalformedPacket));
        assert_eq!(bytes(&[1, 2], 3), Err(ErrorCode::MalformedPacket));
    }
}
