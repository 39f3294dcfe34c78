//! JSON snapshots of data memory.
//!
//! A dump serializes as
//!
//! ```json
//! {
//!   "memory_dump": {
//!     "start": 0,
//!     "end": 4,
//!     "size": 4,
//!     "data": { "0": 0, "1": 0, "2": 7, "3": 0 }
//!   }
//! }
//! ```
//!
//! with `data` keyed by decimal address in ascending order.

use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::vm::DataMemory;
use serde::ser::{Serialize, Serializer};
use std::fs;
use std::path::Path;

/// End of the range dumped when the caller does not pick one.
pub const DEFAULT_DUMP_END: usize = 256;

/// Range dumped when the caller does not pick one, clamped to the memory size.
pub fn default_range(memory_size: usize) -> (usize, usize) {
    (0, DEFAULT_DUMP_END.min(memory_size))
}

/// Borrowed view of `[start, end)` of data memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryDump<'a> {
    start: usize,
    end: usize,
    bytes: &'a [u8],
}

impl<'a> MemoryDump<'a> {
    /// Validates the range and captures it.
    pub fn new(memory: &'a DataMemory, start: usize, end: usize) -> Result<Self, VMError> {
        Ok(Self {
            start,
            end,
            bytes: memory.slice(start, end)?,
        })
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Byte at absolute `address`, if it lies inside the dumped range.
    pub fn get(&self, address: usize) -> Option<u8> {
        address
            .checked_sub(self.start)
            .and_then(|i| self.bytes.get(i).copied())
    }

    /// Pretty-printed JSON document.
    pub fn to_json(&self) -> Result<String, VMError> {
        serde_json::to_string_pretty(self).map_err(|e| VMError::DumpError {
            source: e.to_string(),
        })
    }

    /// Writes the JSON document to `path`.
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<(), VMError> {
        let path = path.as_ref();
        let mut json = self.to_json()?;
        json.push('\n');
        fs::write(path, json).map_err(|e| VMError::IoError {
            path: path.display().to_string(),
            source: e.to_string(),
        })
    }
}

#[derive(serde::Serialize)]
struct Envelope<'a> {
    memory_dump: Body<'a>,
}

#[derive(serde::Serialize)]
struct Body<'a> {
    start: usize,
    end: usize,
    size: usize,
    data: Cells<'a>,
}

/// Address-keyed map of byte values.
struct Cells<'a> {
    start: usize,
    bytes: &'a [u8],
}

impl Serialize for Cells<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.bytes
                .iter()
                .enumerate()
                .map(|(i, value)| ((self.start + i).to_string(), value)),
        )
    }
}

impl Serialize for MemoryDump<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        Envelope {
            memory_dump: Body {
                start: self.start,
                end: self.end,
                size: self.bytes.len(),
                data: Cells {
                    start: self.start,
                    bytes: self.bytes,
                },
            },
        }
        .serialize(serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::utils::scratch_dir;
    use serde_json::Value;

    fn memory_with(bytes: &[(usize, u8)]) -> DataMemory {
        let mut memory = DataMemory::new(64);
        for (addr, value) in bytes {
            memory[*addr] = *value;
        }
        memory
    }

    #[test]
    fn json_shape() {
        let memory = memory_with(&[(2, 7)]);
        let dump = MemoryDump::new(&memory, 1, 4).unwrap();
        let value: Value = serde_json::from_str(&dump.to_json().unwrap()).unwrap();
        let body = &value["memory_dump"];
        assert_eq!(body["start"], 1);
        assert_eq!(body["end"], 4);
        assert_eq!(body["size"], 3);
        assert_eq!(body["data"]["1"], 0);
        assert_eq!(body["data"]["2"], 7);
        assert_eq!(body["data"]["3"], 0);
        assert!(body["data"].get("4").is_none());
    }

    #[test]
    fn keys_are_ascending() {
        let memory = memory_with(&[]);
        let json = MemoryDump::new(&memory, 8, 12).unwrap().to_json().unwrap();
        let positions: Vec<usize> = ["\"8\"", "\"9\"", "\"10\"", "\"11\""]
            .iter()
            .map(|key| json.find(key).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn empty_range_is_valid() {
        let memory = memory_with(&[]);
        let dump = MemoryDump::new(&memory, 5, 5).unwrap();
        assert!(dump.is_empty());
        let value: Value = serde_json::from_str(&dump.to_json().unwrap()).unwrap();
        assert_eq!(value["memory_dump"]["size"], 0);
        assert!(value["memory_dump"]["data"].as_object().unwrap().is_empty());
    }

    #[test]
    fn invalid_ranges_rejected() {
        let memory = memory_with(&[]);
        assert!(matches!(
            MemoryDump::new(&memory, 10, 2),
            Err(VMError::InvalidRange { start: 10, end: 2, size: 64 })
        ));
        assert!(MemoryDump::new(&memory, 0, 65).is_err());
    }

    #[test]
    fn default_range_fits_small_memories() {
        assert_eq!(default_range(1024), (0, 256));
        assert_eq!(default_range(256), (0, 256));
        assert_eq!(default_range(128), (0, 128));

        let memory = DataMemory::new(128);
        let (start, end) = default_range(memory.len());
        assert_eq!(MemoryDump::new(&memory, start, end).unwrap().len(), 128);
    }

    #[test]
    fn get_uses_absolute_addresses() {
        let memory = memory_with(&[(10, 3)]);
        let dump = MemoryDump::new(&memory, 8, 12).unwrap();
        assert_eq!(dump.get(10), Some(3));
        assert_eq!(dump.get(7), None);
        assert_eq!(dump.get(12), None);
    }

    #[test]
    fn write_json_to_file() {
        let dir = scratch_dir();
        let path = dir.path().join("dump.json");
        let memory = memory_with(&[(0, 100)]);
        MemoryDump::new(&memory, 0, 2)
            .unwrap()
            .write_json(&path)
            .unwrap();
        let value: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["memory_dump"]["data"]["0"], 100);
    }
}
