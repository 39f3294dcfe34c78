//! Flat binary program representation.
//!
//! A [`Program`] is the concatenation of encoded instructions with no header,
//! magic number or length prefix; the end of the buffer is the end of the
//! program. It is the only thing the encoder and the interpreter share.

use crate::virtual_machine::encoder::Instruction;
use crate::virtual_machine::errors::VMError;
use std::fmt::Write;
use std::fs;
use std::path::Path;

/// Assembled program bytes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Program {
    code: Vec<u8>,
}

impl Program {
    /// Wraps raw program bytes. No validation happens until execution.
    pub fn new(code: Vec<u8>) -> Self {
        Self { code }
    }

    /// Encodes already validated instructions back to back.
    pub fn from_instructions<'a>(instructions: impl IntoIterator<Item = &'a Instruction>) -> Self {
        let mut code = Vec::new();
        for instr in instructions {
            instr.encode_into(&mut code);
        }
        Self { code }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.code
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.code
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }

    /// Renders every byte as `0xNN`, comma separated (`0x4A, 0xD4, 0x01`).
    pub fn to_hex(&self) -> String {
        hex_list(&self.code)
    }

    /// Decodes the whole program into `(offset, instruction)` pairs.
    ///
    /// Fails on the same structural problems the interpreter would hit:
    /// an illegal opcode or a trailing instruction whose operand is cut off.
    pub fn disassemble(&self) -> Result<Vec<(usize, Instruction)>, VMError> {
        let mut out = Vec::new();
        let mut offset = 0;
        while offset < self.code.len() {
            let instr =
                Instruction::decode(&self.code[offset..]).map_err(|e| e.at_offset(offset))?;
            out.push((offset, instr));
            offset += instr.encoded_size();
        }
        Ok(out)
    }

    /// Renders a disassembly listing, one instruction per line.
    pub fn listing(&self) -> Result<String, VMError> {
        let mut out = String::new();
        for (offset, instr) in self.disassemble()? {
            let bytes = &self.code[offset..offset + instr.encoded_size()];
            let _ = writeln!(out, "{offset:#06x}: {:<24} {instr}", hex_list(bytes));
        }
        Ok(out)
    }

    /// Reads a program from a binary file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VMError> {
        let path = path.as_ref();
        fs::read(path).map(Self::new).map_err(|e| VMError::IoError {
            path: path.display().to_string(),
            source: e.to_string(),
        })
    }

    /// Writes the program bytes to a file, replacing it if it exists.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VMError> {
        let path = path.as_ref();
        fs::write(path, &self.code).map_err(|e| VMError::IoError {
            path: path.display().to_string(),
            source: e.to_string(),
        })
    }
}

impl From<Vec<u8>> for Program {
    fn from(code: Vec<u8>) -> Self {
        Self::new(code)
    }
}

/// Formats bytes as `0xNN, 0xNN, ...`.
pub(crate) fn hex_list(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("0x{b:02X}"))
        .collect::<Vec<_>>()
        .join(", ")
}
