//! Page-buffered firmware image writer.
//!
//! The host streams the new image in chunks of any size. Flash can only be
//! programmed a page at a time and only after the containing row is erased,
//! so the session erases the whole application area up front and then
//! accumulates bytes until a full page is available to flush. Only
//! [`Dfu::finalize`] may flush a partial page.
//!
//! Reading back (for host side verification) uses its own cursor, which
//! never disturbs the write cursor.
use super::{protocol::ErrorCode, traits::Flash};
use crate::{error::Error, hal::flash::Address};
use core::cmp::min;
use nb::block;

/// Largest flash page the accumulation buffer can hold.
pub const MAX_PAGE_SIZE: usize = 256;

pub struct Dfu<F: Flash> {
    flash: F,
    base: Address,
    end: Address,
    expected_size: usize,
    write_cursor: Address,
    read_cursor: Address,
    page: [u8; MAX_PAGE_SIZE],
    buffered: usize,
}

impl<F: Flash> Dfu<F> {
    /// Manages the flash from `base` (the application start) to the end of
    /// the device.
    pub fn new(flash: F, base: Address) -> Self {
        let (start, end) = flash.range();
        assert!(flash.page_size() <= MAX_PAGE_SIZE, "Flash page exceeds DFU buffer");
        assert!(flash.row_size() % flash.page_size() == 0, "Flash rows must hold whole pages");
        assert!(start <= base && base <= end, "Application base outside flash");
        Self {
            flash,
            base,
            end,
            expected_size: 0,
            write_cursor: base,
            read_cursor: base,
            page: [0u8; MAX_PAGE_SIZE],
            buffered: 0,
        }
    }

    pub fn base(&self) -> Address { self.base }

    pub fn write_cursor(&self) -> Address { self.write_cursor }

    pub fn read_cursor(&self) -> Address { self.read_cursor }

    pub fn buffered(&self) -> usize { self.buffered }

    pub fn expected_size(&self) -> usize { self.expected_size }

    pub fn flash(&mut self) -> &mut F { &mut self.flash }

    /// Begins a new session for an image of `expected_size` bytes, erasing
    /// every row from the base to the end of flash.
    pub fn start(&mut self, expected_size: usize) -> Result<(), ErrorCode> {
        if expected_size > self.end - self.base {
            warn!("Image of {} bytes does not fit", expected_size);
            return Err(ErrorCode::NoMemory);
        }
        self.reset_session();
        self.expected_size = expected_size;
        self.erase().map_err(|e| {
            e.report();
            ErrorCode::OperationFailed
        })?;
        info!("DFU session started for {} bytes", expected_size);
        Ok(())
    }

    /// Appends `bytes` to the image. Returns the address up to which flash has
    /// been programmed.
    ///
    /// A failed flush undoes the whole call, so the host can resend the same
    /// chunk.
    pub fn write(&mut self, bytes: &[u8]) -> Result<Address, ErrorCode> {
        if self.buffered + bytes.len() > self.end - self.write_cursor {
            warn!("DFU write of {} bytes overflows flash", bytes.len());
            return Err(ErrorCode::NoMemory);
        }

        let (cursor, buffered, page) = (self.write_cursor, self.buffered, self.page);
        match self.append(bytes) {
            Ok(()) => Ok(self.write_cursor),
            Err(e) => {
                e.report();
                self.write_cursor = cursor;
                self.buffered = buffered;
                self.page = page;
                Err(ErrorCode::OperationFailed)
            }
        }
    }

    /// Reads from the read cursor into `buffer`, stopping early at the end of
    /// flash. Returns how many bytes were read.
    pub fn read(&mut self, buffer: &mut [u8]) -> Result<usize, ErrorCode> {
        let count = min(buffer.len(), self.end - self.read_cursor);
        block!(self.flash.read(self.read_cursor, &mut buffer[..count])).map_err(|e| {
            let error: Error = e.into();
            error.report();
            ErrorCode::OperationFailed
        })?;
        self.read_cursor = self.read_cursor + count;
        Ok(count)
    }

    pub fn reset_read_pointer(&mut self) { self.read_cursor = self.base; }

    /// Flushes whatever is still buffered and closes the session.
    pub fn finalize(&mut self) -> Result<(), ErrorCode> {
        let result = if self.buffered > 0 { self.flush() } else { Ok(()) };
        info!("DFU session closed at {:#x}", self.write_cursor.0);
        self.reset_session();
        result.map_err(|e| {
            e.report();
            ErrorCode::OperationFailed
        })
    }

    fn append(&mut self, mut bytes: &[u8]) -> Result<(), Error> {
        let page_size = self.flash.page_size();
        while !bytes.is_empty() {
            let count = min(page_size - self.buffered, bytes.len());
            self.page[self.buffered..self.buffered + count].copy_from_slice(&bytes[..count]);
            self.buffered += count;
            bytes = &bytes[count..];
            if self.buffered == page_size {
                self.flush()?;
            }
        }
        Ok(())
    }

    fn reset_session(&mut self) {
        self.expected_size = 0;
        self.write_cursor = self.base;
        self.read_cursor = self.base;
        self.buffered = 0;
    }

    fn erase(&mut self) -> Result<(), Error> {
        let row_size = self.flash.row_size();
        let mut row = self.base;
        while row < self.end {
            block!(self.flash.erase_row(row)).map_err(Into::<Error>::into)?;
            row = row + row_size;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), Error> {
        block!(self.flash.write_page(self.write_cursor, &self.page[..self.buffered]))
            .map_err(Into::<Error>::into)?;
        debug!("Flushed {} bytes at {:#x}", self.buffered, self.write_cursor.0);
        self.write_cursor = self.write_cursor + self.buffered;
        self.buffered = 0;
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hal::doubles::flash::FakeNvm;

    const BASE: Address = Address(0x400);
    const PAGE: usize = 128;
    const ROW: usize = 256;

    fn dfu_with_capacity(capacity: usize) -> Dfu<FakeNvm> {
        Dfu::new(FakeNvm::new(Address(0), BASE.0 as usize + capacity, PAGE, ROW), BASE)
    }

    fn image(length: usize) -> Vec<u8> { (0..length).map(|i| (i * 7 + 3) as u8).collect() }

    #[test]
    fn two_page_sized_chunks_flush_two_pages_and_finalize_flushes_nothing() {
        // Given
        let mut dfu = dfu_with_capacity(256);
        let data = image(256);

        // When
        dfu.start(256).unwrap();
        let first = dfu.write(&data[..128]).unwrap();
        let second = dfu.write(&data[128..]).unwrap();
        dfu.finalize().unwrap();

        // Then
        assert_eq!(dfu.flash().erased_rows, vec![BASE]);
        assert_eq!(first, BASE + 128);
        assert_eq!(second, BASE + 256);
        assert_eq!(dfu.flash().page_writes.len(), 2);
        assert_eq!(dfu.flash().bytes(BASE, 256), &data[..]);
    }

    #[test]
    fn start_erases_every_row_to_end_of_flash() {
        // Given
        let mut dfu = dfu_with_capacity(4 * ROW);

        // When
        dfu.start(10).unwrap();

        // Then
        let rows: Vec<_> = (0..4).map(|row| BASE + row * ROW).collect();
        assert_eq!(dfu.flash().erased_rows, rows);
        assert_eq!(dfu.expected_size(), 10);
    }

    #[test]
    fn start_rejects_images_larger_than_application_area() {
        // Given
        let mut dfu = dfu_with_capacity(512);

        // When
        let result = dfu.start(513);

        // Then
        assert_eq!(result, Err(ErrorCode::NoMemory));
        assert!(dfu.flash().erased_rows.is_empty());
    }

    #[test]
    fn page_writes_are_independent_of_chunking() {
        // Given
        let data = image(700);
        let splits: [&[usize]; 3] = [&[700], &[1, 127, 300, 272], &[50, 50, 50, 50, 500]];
        let mut reference: Option<Vec<(Address, Vec<u8>)>> = None;

        for split in splits {
            let mut dfu = dfu_with_capacity(1024);
            dfu.start(data.len()).unwrap();

            // When
            let mut offset = 0;
            for length in split {
                dfu.write(&data[offset..offset + length]).unwrap();
                offset += length;
            }

            // Then
            let expected: Vec<_> = data
                .chunks(PAGE)
                .take(700 / PAGE)
                .enumerate()
                .map(|(page, bytes)| (BASE + page * PAGE, bytes.to_vec()))
                .collect();
            assert_eq!(dfu.flash().page_writes, expected);
            assert_eq!(dfu.buffered(), 700 % PAGE);
            if let Some(reference) = &reference {
                assert_eq!(&dfu.flash().page_writes, reference);
            }
            reference = Some(dfu.flash().page_writes.clone());
        }
    }

    #[test]
    fn finalize_flushes_exactly_the_partial_page_and_resets_cursors() {
        // Given
        let mut dfu = dfu_with_capacity(512);
        let data = image(200);
        dfu.start(200).unwrap();
        dfu.write(&data).unwrap();
        let mut scratch = [0u8; 4];
        dfu.read(&mut scratch).unwrap();

        // When
        dfu.finalize().unwrap();

        // Then
        assert_eq!(dfu.flash().page_writes.len(), 2);
        assert_eq!(dfu.flash().page_writes[1], (BASE + PAGE, data[PAGE..].to_vec()));
        assert_eq!(dfu.write_cursor(), BASE);
        assert_eq!(dfu.read_cursor(), BASE);
        assert_eq!(dfu.buffered(), 0);
        assert_eq!(dfu.flash().bytes(BASE, 200), &data[..]);
    }

    #[test]
    fn writes_past_end_of_flash_are_rejected() {
        // Given
        let mut dfu = dfu_with_capacity(256);
        dfu.start(256).unwrap();
        dfu.write(&image(200)).unwrap();

        // When
        let result = dfu.write(&image(57));

        // Then
        assert_eq!(result, Err(ErrorCode::NoMemory));
        assert_eq!(dfu.write(&image(56)), Ok(BASE + 256));
    }

    #[test]
    fn reads_are_clamped_to_end_of_flash_and_keep_their_own_cursor() {
        // Given
        let mut dfu = dfu_with_capacity(256);
        let data = image(256);
        dfu.start(256).unwrap();
        dfu.write(&data).unwrap();
        let mut buffer = [0u8; 200];

        // When
        let first = dfu.read(&mut buffer).unwrap();
        let second = dfu.read(&mut buffer).unwrap();

        // Then
        assert_eq!(first, 200);
        assert_eq!(second, 56);
        assert_eq!(&buffer[..56], &data[200..]);
        assert_eq!(dfu.read(&mut buffer), Ok(0));
        assert_eq!(dfu.write_cursor(), BASE + 256);

        // When
        dfu.reset_read_pointer();

        // Then
        assert_eq!(dfu.read(&mut buffer[..10]), Ok(10));
        assert_eq!(&buffer[..10], &data[..10]);
        assert_eq!(dfu.write_cursor(), BASE + 256);
    }

    #[test]
    fn flash_failure_is_reported_as_operation_failure() {
        // Given
        let mut dfu = dfu_with_capacity(256);
        dfu.start(256).unwrap();
        dfu.flash().fail_writes = true;

        // When
        let result = dfu.write(&image(PAGE));

        // Then
        assert_eq!(result, Err(ErrorCode::OperationFailed));
    }

    #[test]
    fn chunk_resent_after_a_failed_flush_is_stored_once() {
        // Given
        let mut dfu = dfu_with_capacity(512);
        let data = image(200);
        dfu.start(200).unwrap();
        dfu.write(&data[..100]).unwrap();
        dfu.flash().fail_writes = true;
        assert_eq!(dfu.write(&data[100..]), Err(ErrorCode::OperationFailed));
        assert_eq!(dfu.buffered(), 100);
        assert_eq!(dfu.write_cursor(), BASE);

        // When
        dfu.flash().fail_writes = false;
        let cursor = dfu.write(&data[100..]).unwrap();
        dfu.finalize().unwrap();

        // Then
        assert_eq!(cursor, BASE + PAGE);
        assert_eq!(dfu.flash().page_writes.len(), 2);
        assert_eq!(dfu.flash().bytes(BASE, 200), &data[..]);
    }
}
