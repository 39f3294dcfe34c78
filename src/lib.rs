//! Micro virtual machine library.
//!
//! Provides an assembler, a bytecode encoder and a stack-based interpreter
//! for a four-instruction machine.

pub mod utils;
pub mod virtual_machine;

pub use virtual_machine::encoder::{Assembly, Instruction, SourceInstruction};
pub use virtual_machine::errors::{Fault, VMError};
pub use virtual_machine::isa::Opcode;
pub use virtual_machine::program::Program;
pub use virtual_machine::vm::{MachineStatus, VM, VmConfig};
