use crate::virtual_machine::errors::VMError;
use std::fmt;

/// Operand stack of the machine.
///
/// Values are signed so that `SGN` can push `-1`; loads push zero-extended
/// 32-bit constants and memory reads push bytes, so `i64` never overflows
/// in practice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stack {
    values: Vec<i64>,
}

impl Stack {
    pub fn new() -> Self {
        Self { values: Vec::new() }
    }

    pub fn push(&mut self, value: i64) {
        self.values.push(value);
    }

    /// Pops the top value.
    ///
    /// Returns [`VMError::StackUnderflow`] tagged with the popping
    /// instruction's name and offset if the stack is empty.
    pub fn pop(&mut self, offset: usize, instruction: &'static str) -> Result<i64, VMError> {
        self.values.pop().ok_or(VMError::StackUnderflow {
            offset,
            instruction,
        })
    }

    /// Stack contents, bottom first.
    pub fn as_slice(&self) -> &[i64] {
        &self.values
    }
}

impl fmt::Display for Stack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{value}")?;
        }
        f.write_str("]")
    }
}
