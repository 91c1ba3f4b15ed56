//! Application image header.
//!
//! Every application image starts with a fixed 64 byte header, baked in at
//! build time and placed at the application base address. The bootloader
//! only trusts the magic word: an image is present iff it matches exactly.
//!
//! | offset | field            |
//! |--------|------------------|
//! | 0      | magic (u32)      |
//! | 4      | header version   |
//! | 8      | image type (u8)  |
//! | 9..12  | major.minor.patch|
//! | 12     | vector table     |
//! | 16..24 | build id         |
//! | 24..64 | reserved         |
use super::traits::Flash;
use crate::{error::Error, hal::flash::Address};
use nb::block;
use nom::{
    bytes::complete::take,
    number::complete::{le_u32, le_u8},
    sequence::tuple,
    IResult,
};
use static_assertions::assert_eq_size;

/// Total on-chip flash.
pub const NVM_SIZE: usize = kb!(256);
/// Start of the application image (400 pages of 64 bytes above the
/// resident bootloader).
pub const APPLICATION_BASE: Address = Address(0x6400);

/// Marks the start of a valid application header.
pub const MAGIC: u32 = 0xCAFE_FEED;
pub const HEADER_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 64;

#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub enum ImageType {
    Application = 0,
    Dfu = 1,
}

#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(target_arch = "arm", derive(defmt::Format))]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
    pub patch: u8,
}

/// In-flash layout of the header.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AppImageHeader {
    pub magic: u32,
    pub header_version: u32,
    pub image_type: u8,
    pub version: FirmwareVersion,
    pub vector_table: u32,
    pub build_id: [u8; 8],
    pub reserved: [u8; 40],
}

assert_eq_size!(AppImageHeader, [u8; HEADER_SIZE]);

type Fields<'a> = (u32, u32, u8, u8, u8, u8, u32, &'a [u8]);

fn fields(input: &[u8]) -> IResult<&[u8], Fields<'_>> {
    tuple((le_u32, le_u32, le_u8, le_u8, le_u8, le_u8, le_u32, take(8usize)))(input)
}

impl AppImageHeader {
    pub const fn new(
        image_type: ImageType,
        version: FirmwareVersion,
        vector_table: u32,
        build_id: [u8; 8],
    ) -> Self {
        Self {
            magic: MAGIC,
            header_version: HEADER_VERSION,
            image_type: image_type as u8,
            version,
            vector_table,
            build_id,
            reserved: [0xFF; 40],
        }
    }

    /// Decodes a header. Anything without the magic word means there is no
    /// application.
    pub fn parse(bytes: &[u8; HEADER_SIZE]) -> Result<Self, Error> {
        let (_, (magic, header_version, image_type, major, minor, patch, vector_table, build_id)) =
            fields(bytes).map_err(|_| Error::LogicError("Truncated image header"))?;
        if magic != MAGIC {
            return Err(Error::ApplicationMissing);
        }
        let mut header = Self {
            magic,
            header_version,
            image_type,
            version: FirmwareVersion { major, minor, patch },
            vector_table,
            build_id: [0u8; 8],
            reserved: [0u8; 40],
        };
        header.build_id.copy_from_slice(build_id);
        header.reserved.copy_from_slice(&bytes[24..]);
        Ok(header)
    }

    pub fn read<F: Flash>(flash: &mut F, address: Address) -> Result<Self, Error> {
        let mut bytes = [0u8; HEADER_SIZE];
        block!(flash.read(address, &mut bytes)).map_err(Into::<Error>::into)?;
        Self::parse(&bytes)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0u8; HEADER_SIZE];
        bytes[0..4].copy_from_slice(&self.magic.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.header_version.to_le_bytes());
        bytes[8] = self.image_type;
        bytes[9] = self.version.major;
        bytes[10] = self.version.minor;
        bytes[11] = self.version.patch;
        bytes[12..16].copy_from_slice(&self.vector_table.to_le_bytes());
        bytes[16..24].copy_from_slice(&self.build_id);
        bytes[24..].copy_from_slice(&self.reserved);
        bytes
    }

    pub fn image_type(&self) -> Option<ImageType> {
        match self.image_type {
            0 => Some(ImageType::Application),
            1 => Some(ImageType::Dfu),
            _ => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::doubles::flash::FakeNvm;

    fn sample() -> AppImageHeader {
        AppImageHeader::new(
            ImageType::Application,
            FirmwareVersion { major: 1, minor: 4, patch: 2 },
            0x6500,
            *b"a1b2c3d4",
        )
    }

    #[test]
    fn header_fields_sit_at_fixed_offsets() {
        // Given
        let header = sample();

        // When
        let bytes = header.to_bytes();

        // Then
        assert_eq!(bytes[..4], [0xED, 0xFE, 0xFE, 0xCA]);
        assert_eq!(bytes[8..12], [0, 1, 4, 2]);
        assert_eq!(bytes[12..16], [0x00, 0x65, 0x00, 0x00]);
        assert_eq!(&bytes[16..24], b"a1b2c3d4");
        assert_eq!(AppImageHeader::parse(&bytes), Ok(header));
    }

    #[test]
    fn any_other_magic_means_no_application() {
        // Given
        let mut bytes = sample().to_bytes();
        bytes[3] ^= 0x01;

        // Then
        assert_eq!(AppImageHeader::parse(&bytes), Err(Error::ApplicationMissing));
        assert_eq!(AppImageHeader::parse(&[0xFF; HEADER_SIZE]), Err(Error::ApplicationMissing));
    }

    #[test]
    fn header_is_read_from_flash() {
        // Given
        let mut flash = FakeNvm::new(Address(0), 0x800, 64, 256);
        flash.data[0x400..0x440].copy_from_slice(&sample().to_bytes());

        // When
        let header = AppImageHeader::read(&mut flash, Address(0x400)).unwrap();

        // Then
        assert_eq!(header.vector_table, 0x6500);
        assert_eq!(header.image_type(), Some(ImageType::Application));
        assert_eq!(header.version, FirmwareVersion { major: 1, minor: 4, patch: 2 });
    }
}
