//! Stack-based bytecode machine with byte-addressable data memory.
//!
//! Programs are assembled from text or YAML sources into a flat byte stream
//! and executed by a small interpreter that owns an operand stack and a
//! zero-initialised data memory.
//!
//! # Architecture
//!
//! - **Operand stack**: unbounded stack of signed integers
//! - **Data memory**: fixed-size byte array, 1024 bytes by default
//! - **Instruction format**: one opcode byte plus a fixed-width little-endian operand
//! - **Execution model**: straight-line, no jumps; the machine halts at the end of the code
//!
//! # Modules
//!
//! - [`assembler`]: Text front-end, diagnostics and front-end selection
//! - [`dump`]: JSON snapshots of data memory
//! - [`encoder`]: Operand validation, byte layout and the [`encoder::Assembly`] report
//! - [`errors`]: Assembly, execution and inspection error types
//! - [`isa`]: Instruction set definition and opcode mappings
//! - [`manifest`]: YAML front-end
//! - [`program`]: Flat bytecode container and disassembly
//! - [`vm`]: Interpreter, operand stack and data memory

pub mod assembler;
pub mod dump;
pub mod encoder;
pub mod errors;
pub mod isa;
#[cfg(test)]
mod isa_static_check;
pub mod manifest;
pub mod program;
pub mod vm;
