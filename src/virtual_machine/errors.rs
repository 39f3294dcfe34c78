use uvm_derive::Error;

/// Errors raised while assembling, executing or inspecting a program.
///
/// Assembly-side variants carry the 1-based source `line`; execution-side
/// variants carry the code `offset` where the offending instruction starts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VMError {
    // =========================
    // Encoding
    // =========================
    /// Mnemonic is not part of the instruction set.
    #[error("line {line}: unknown mnemonic `{mnemonic}`")]
    UnknownMnemonic { line: usize, mnemonic: String },
    /// Instruction needs an operand but none was supplied.
    #[error("line {line}: `{mnemonic}` requires an operand")]
    MissingOperand { line: usize, mnemonic: &'static str },
    /// Operand does not fit the instruction's operand field.
    #[error("line {line}: operand {value} out of range for `{mnemonic}` (max {max})")]
    OperandOutOfRange {
        line: usize,
        mnemonic: &'static str,
        value: i64,
        max: i64,
    },

    // =========================
    // Front-ends
    // =========================
    /// Wrong number of operand tokens on a source line.
    #[error("line {line}: `{mnemonic}` takes {expected} operand(s), got {actual}")]
    ArityMismatch {
        line: usize,
        mnemonic: String,
        expected: usize,
        actual: usize,
    },
    /// Operand token is not a decimal, `0x` hex or `0b` binary integer.
    #[error("line {line}: invalid operand format `{token}`")]
    InvalidOperand { line: usize, token: String },
    /// Structured source does not have the expected shape.
    #[error("line {line}: {message}")]
    ParseError { line: usize, message: String },
    /// Source file extension does not select any front-end.
    #[error("unsupported source format `{path}` (expected .asm, .txt, .yaml or .yml)")]
    UnsupportedFormat { path: String },
    /// Reading or writing a file failed.
    #[error("io error on {path}: {source}")]
    IoError { path: String, source: String },

    // =========================
    // Decoding / execution
    // =========================
    /// Byte at an instruction boundary is not a defined opcode.
    #[error("illegal opcode {opcode:#04x} at offset {offset:#06x}")]
    IllegalOpcode { opcode: u8, offset: usize },
    /// Operand bytes run past the end of the program.
    #[error(
        "truncated instruction at offset {offset:#06x}: needs {requested} operand byte(s), {available} left"
    )]
    TruncatedInstruction {
        offset: usize,
        requested: usize,
        available: usize,
    },
    /// Instruction popped from an empty operand stack.
    #[error("{instruction}: stack underflow at offset {offset:#06x}")]
    StackUnderflow {
        offset: usize,
        instruction: &'static str,
    },
    /// Data address outside `[0, size)`.
    #[error(
        "{instruction}: invalid data address {address} at offset {offset:#06x} (memory size {size})"
    )]
    InvalidAddress {
        offset: usize,
        instruction: &'static str,
        address: i64,
        size: usize,
    },
    /// Caller-imposed instruction budget ran out before the program ended.
    #[error("step limit of {limit} instructions reached at offset {offset:#06x}")]
    StepLimitExceeded { offset: usize, limit: u64 },

    // =========================
    // Inspection
    // =========================
    /// Requested memory range is reversed or exceeds data memory.
    #[error("invalid memory range [{start}, {end}) for memory of size {size}")]
    InvalidRange { start: usize, end: usize, size: usize },
    /// Memory dump could not be serialized.
    #[error("memory dump serialization failed: {source}")]
    DumpError { source: String },
}

impl VMError {
    /// Source line of an assembly-side error.
    pub fn line(&self) -> Option<usize> {
        match self {
            VMError::UnknownMnemonic { line, .. }
            | VMError::MissingOperand { line, .. }
            | VMError::OperandOutOfRange { line, .. }
            | VMError::ArityMismatch { line, .. }
            | VMError::InvalidOperand { line, .. }
            | VMError::ParseError { line, .. } => Some(*line),
            _ => None,
        }
    }

    /// Code offset of the instruction an execution-side error belongs to.
    pub fn offset(&self) -> Option<usize> {
        match self {
            VMError::IllegalOpcode { offset, .. }
            | VMError::TruncatedInstruction { offset, .. }
            | VMError::StackUnderflow { offset, .. }
            | VMError::InvalidAddress { offset, .. }
            | VMError::StepLimitExceeded { offset, .. } => Some(*offset),
            _ => None,
        }
    }

    /// Returns a copy of a decoding error relocated to `offset`.
    ///
    /// Decoders work on a slice starting at the instruction, so they report
    /// offset 0; callers that know the absolute position patch it in here.
    pub(crate) fn at_offset(self, base: usize) -> Self {
        match self {
            VMError::IllegalOpcode { opcode, offset } => VMError::IllegalOpcode {
                opcode,
                offset: base + offset,
            },
            VMError::TruncatedInstruction {
                offset,
                requested,
                available,
            } => VMError::TruncatedInstruction {
                offset: base + offset,
                requested,
                available,
            },
            other => other,
        }
    }
}

/// An execution error together with how far the machine got.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{error} (after {executed} instruction(s))")]
pub struct Fault {
    /// What went wrong, including the offending instruction's offset.
    pub error: VMError,
    /// Instructions completed before the failing one.
    pub executed: usize,
}

impl Fault {
    /// Starting offset of the instruction that failed.
    pub fn offset(&self) -> Option<usize> {
        self.error.offset()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_location() {
        let err = VMError::OperandOutOfRange {
            line: 3,
            mnemonic: "read",
            value: 64,
            max: 63,
        };
        assert_eq!(
            err.to_string(),
            "line 3: operand 64 out of range for `read` (max 63)"
        );
        assert_eq!(err.line(), Some(3));
        assert_eq!(err.offset(), None);
    }

    #[test]
    fn display_formats_opcode_as_hex() {
        let err = VMError::IllegalOpcode {
            opcode: 0xFF,
            offset: 7,
        };
        assert_eq!(err.to_string(), "illegal opcode 0xff at offset 0x0007");
        assert_eq!(err.offset(), Some(7));
    }

    #[test]
    fn at_offset_relocates_decode_errors_only() {
        let err = VMError::TruncatedInstruction {
            offset: 0,
            requested: 4,
            available: 1,
        }
        .at_offset(10);
        assert_eq!(err.offset(), Some(10));

        let err = VMError::StackUnderflow {
            offset: 2,
            instruction: "SGN",
        }
        .at_offset(10);
        assert_eq!(err.offset(), Some(2));
    }

    #[test]
    fn fault_display_reports_progress() {
        let fault = Fault {
            error: VMError::StackUnderflow {
                offset: 0,
                instruction: "SGN",
            },
            executed: 0,
        };
        assert_eq!(
            fault.to_string(),
            "SGN: stack underflow at offset 0x0000 (after 0 instruction(s))"
        );
        assert_eq!(fault.offset(), Some(0));
    }
}
