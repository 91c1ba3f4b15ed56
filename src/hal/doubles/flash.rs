use super::error::FakeError;
use crate::hal::flash::{Address, Nvm};

/// Flash with real programming semantics: writes can only clear bits, and
/// only a row erase sets them again.
pub struct FakeNvm {
    base: Address,
    page_size: usize,
    row_size: usize,
    pub data: Vec<u8>,
    pub erased_rows: Vec<Address>,
    pub page_writes: Vec<(Address, Vec<u8>)>,
    pub fail_writes: bool,
    pub fail_reads: bool,
}

impl FakeNvm {
    pub fn new(base: Address, length: usize, page_size: usize, row_size: usize) -> Self {
        Self {
            base,
            page_size,
            row_size,
            data: vec![0x00; length],
            erased_rows: Vec::new(),
            page_writes: Vec::new(),
            fail_writes: false,
            fail_reads: false,
        }
    }

    pub fn bytes(&self, address: Address, length: usize) -> &[u8] {
        let offset = address - self.base;
        &self.data[offset..offset + length]
    }

    fn end(&self) -> Address { self.base + self.data.len() }
}

impl Nvm for FakeNvm {
    type Error = FakeError;

    fn page_size(&self) -> usize { self.page_size }

    fn row_size(&self) -> usize { self.row_size }

    fn range(&self) -> (Address, Address) { (self.base, self.end()) }

    fn erase_row(&mut self, address: Address) -> nb::Result<(), Self::Error> {
        if address < self.base || address >= self.end() || (address - self.base) % self.row_size != 0 {
            return Err(nb::Error::Other(FakeError(1)));
        }
        let offset = address - self.base;
        self.data[offset..offset + self.row_size].fill(0xFF);
        self.erased_rows.push(address);
        Ok(())
    }

    fn write_page(&mut self, address: Address, bytes: &[u8]) -> nb::Result<(), Self::Error> {
        let misaligned = (address - self.base) % self.page_size != 0;
        if self.fail_writes || address < self.base || misaligned || bytes.len() > self.page_size {
            return Err(nb::Error::Other(FakeError(2)));
        }
        if address + bytes.len() > self.end() {
            return Err(nb::Error::Other(FakeError(3)));
        }
        let offset = address - self.base;
        self.data[offset..offset + bytes.len()].iter_mut().zip(bytes).for_each(|(o, i)| *o &= *i);
        self.page_writes.push((address, bytes.to_vec()));
        Ok(())
    }

    fn read(&mut self, address: Address, bytes: &mut [u8]) -> nb::Result<(), Self::Error> {
        if self.fail_reads || address < self.base || address + bytes.len() > self.end() {
            return Err(nb::Error::Other(FakeError(4)));
        }
        bytes.copy_from_slice(self.bytes(address, bytes.len()));
        Ok(())
    }
}
