use crate::virtual_machine::errors::VMError;
use std::ops::{Index, IndexMut};

/// Data memory size used when no configuration overrides it.
pub const DEFAULT_MEMORY_SIZE: usize = 1024;

/// Fixed-size, zero-initialised data memory.
///
/// Separate from code memory: programs can read and write it but never
/// execute from it. Machine accesses go through [`read`](Self::read) and
/// [`write`](Self::write), which take the raw (possibly negative) address
/// computed from stack values and reject anything outside `[0, len)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataMemory {
    bytes: Vec<u8>,
}

impl DataMemory {
    pub fn new(size: usize) -> Self {
        Self {
            bytes: vec![0; size],
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Checks `address` against the memory bounds.
    fn resolve(
        &self,
        address: i64,
        offset: usize,
        instruction: &'static str,
    ) -> Result<usize, VMError> {
        usize::try_from(address)
            .ok()
            .filter(|addr| *addr < self.bytes.len())
            .ok_or(VMError::InvalidAddress {
                offset,
                instruction,
                address,
                size: self.bytes.len(),
            })
    }

    /// Reads one byte on behalf of the instruction at `offset`.
    pub fn read(
        &self,
        address: i64,
        offset: usize,
        instruction: &'static str,
    ) -> Result<u8, VMError> {
        let addr = self.resolve(address, offset, instruction)?;
        Ok(self.bytes[addr])
    }

    /// Writes one byte on behalf of the instruction at `offset`.
    pub fn write(
        &mut self,
        address: i64,
        value: u8,
        offset: usize,
        instruction: &'static str,
    ) -> Result<(), VMError> {
        let addr = self.resolve(address, offset, instruction)?;
        self.bytes[addr] = value;
        Ok(())
    }

    /// Returns the half-open range `[start, end)`.
    pub fn slice(&self, start: usize, end: usize) -> Result<&[u8], VMError> {
        if start > end || end > self.bytes.len() {
            return Err(VMError::InvalidRange {
                start,
                end,
                size: self.bytes.len(),
            });
        }
        Ok(&self.bytes[start..end])
    }

    /// Copies `data` into memory starting at `address`.
    pub fn load(&mut self, address: usize, data: &[u8]) -> Result<(), VMError> {
        let end = address.saturating_add(data.len());
        if end > self.bytes.len() {
            return Err(VMError::InvalidRange {
                start: address,
                end,
                size: self.bytes.len(),
            });
        }
        self.bytes[address..end].copy_from_slice(data);
        Ok(())
    }
}

impl Default for DataMemory {
    fn default() -> Self {
        Self::new(DEFAULT_MEMORY_SIZE)
    }
}

impl<T> Index<T> for DataMemory
where
    [u8]: Index<T>,
{
    type Output = <[u8] as Index<T>>::Output;

    fn index(&self, index: T) -> &Self::Output {
        &self.bytes.as_slice()[index]
    }
}

impl<T> IndexMut<T> for DataMemory
where
    [u8]: IndexMut<T>,
{
    fn index_mut(&mut self, index: T) -> &mut Self::Output {
        &mut self.bytes.as_mut_slice()[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_zeroed() {
        let memory = DataMemory::default();
        assert_eq!(memory.len(), DEFAULT_MEMORY_SIZE);
        assert!(memory.as_bytes().iter().all(|b| *b == 0));
    }

    #[test]
    fn read_write_bounds() {
        let mut memory = DataMemory::new(16);
        memory.write(15, 0xAB, 0, "WRITE_MEM").unwrap();
        assert_eq!(memory.read(15, 0, "READ_MEM"), Ok(0xAB));
        assert_eq!(
            memory.write(16, 1, 3, "WRITE_MEM"),
            Err(VMError::InvalidAddress {
                offset: 3,
                instruction: "WRITE_MEM",
                address: 16,
                size: 16
            })
        );
        assert!(matches!(
            memory.read(-1, 0, "SGN"),
            Err(VMError::InvalidAddress { address: -1, .. })
        ));
    }

    #[test]
    fn slice_validates_range() {
        let memory = DataMemory::new(8);
        assert_eq!(memory.slice(2, 2).unwrap().len(), 0);
        assert_eq!(memory.slice(0, 8).unwrap().len(), 8);
        assert!(matches!(
            memory.slice(5, 4),
            Err(VMError::InvalidRange { start: 5, end: 4, .. })
        ));
        assert!(matches!(memory.slice(0, 9), Err(VMError::InvalidRange { .. })));
    }

    #[test]
    fn load_copies_and_checks_bounds() {
        let mut memory = DataMemory::new(8);
        memory.load(6, &[1, 2]).unwrap();
        assert_eq!(&memory[6..], &[1, 2]);
        assert!(memory.load(7, &[1, 2]).is_err());
        assert!(memory.load(usize::MAX, &[1]).is_err());
    }

    #[test]
    fn index_mut_writes_through() {
        let mut memory = DataMemory::new(4);
        memory[2] = 9;
        assert_eq!(memory[2], 9);
        memory[..2].copy_from_slice(&[7, 8]);
        assert_eq!(&memory[1..3], &[8, 9]);
    }
}
