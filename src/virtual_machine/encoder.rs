//! Instruction encoder.
//!
//! Turns symbolic instructions (opcode + optional resolved integer operand +
//! source line) into the fixed-width binary layout. Uses
//! [`for_each_instruction!`](crate::for_each_instruction) to generate the
//! operand-carrying [`Instruction`] enum together with its encoder, decoder
//! and operand validation, so the byte layout lives in exactly one table.
//!
//! Encoding is instruction-local: an instruction's bytes never depend on
//! its position or on its neighbours.

use crate::define_instructions;
use crate::for_each_instruction;
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::{OFFSET_MASK, Opcode};
use crate::virtual_machine::program::{Program, hex_list};
use crate::warn;
use std::fmt;

macro_rules! define_encoder {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ], $display:literal, $description:literal
        ),* $(,)?
    ) => {
        /// A validated instruction whose operand already fits its field.
        #[derive(Clone, Copy, Debug, Eq, PartialEq)]
        pub enum Instruction {
            $(
                $(#[$doc])*
                $name {
                    $( $field: define_instructions!(@ty $kind) ),*
                },
            )*
        }

        impl Instruction {
            /// Returns the opcode of this instruction.
            pub const fn opcode(&self) -> Opcode {
                match self {
                    $( Instruction::$name { .. } => Opcode::$name, )*
                }
            }

            /// Returns the raw operand value, if the instruction has one.
            pub fn operand(&self) -> Option<u32> {
                match self {
                    $(
                        Instruction::$name { $( $field ),* } => {
                            None $( .or(Some(u32::from(*$field))) )*
                        }
                    )*
                }
            }

            /// Appends the encoded bytes to `out`.
            pub fn encode_into(&self, out: &mut Vec<u8>) {
                match self {
                    $(
                        Instruction::$name { $( $field ),* } => {
                            out.push($opcode);
                            $(
                                define_instructions!(@emit out, $kind, $field);
                            )*
                        }
                    )*
                }
            }

            /// Decodes the instruction at the start of `code`.
            ///
            /// Errors report offsets relative to `code`; see [`VMError::at_offset`].
            pub fn decode(code: &[u8]) -> Result<Instruction, VMError> {
                let (&byte, operand) = code.split_first().ok_or(VMError::TruncatedInstruction {
                    offset: 0,
                    requested: 1,
                    available: 0,
                })?;
                let opcode = Opcode::try_from(byte)?;
                let requested = opcode.operand_size();
                if operand.len() < requested {
                    return Err(VMError::TruncatedInstruction {
                        offset: 0,
                        requested,
                        available: operand.len(),
                    });
                }

                Ok(match opcode {
                    $(
                        Opcode::$name => Instruction::$name {
                            $( $field: define_instructions!(@decode $kind, operand) ),*
                        },
                    )*
                })
            }

            /// Builds the instruction for `opcode` from an unchecked operand.
            fn from_operand(
                opcode: Opcode,
                operand: Option<i64>,
                line: usize,
            ) -> Result<Instruction, VMError> {
                match opcode {
                    $(
                        Opcode::$name => define_encoder!(
                            @construct $name, operand, line; $( $field : $kind ),*
                        ),
                    )*
                }
            }
        }

        impl fmt::Display for Instruction {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                match self {
                    $(
                        Instruction::$name { $( $field ),* } => {
                            f.write_str($display)?;
                            $( write!(f, "({})", $field)?; )*
                            Ok(())
                        }
                    )*
                }
            }
        }
    };

    // ---------- construction ----------
    (@construct $name:ident, $operand:ident, $line:ident; ) => {
        Ok(Instruction::$name {})
    };

    (@construct $name:ident, $operand:ident, $line:ident; $field:ident : $kind:ident) => {{
        let mnemonic = Opcode::$name.mnemonic();
        let raw = $operand.ok_or(VMError::MissingOperand {
            line: $line,
            mnemonic,
        })?;
        Ok(Instruction::$name {
            $field: define_encoder!(@narrow $kind, raw, mnemonic, $line)?,
        })
    }};

    // ---------- operand range checks ----------
    (@narrow ImmU32, $raw:ident, $mnemonic:ident, $line:ident) => {
        u32::try_from($raw).map_err(|_| VMError::OperandOutOfRange {
            line: $line,
            mnemonic: $mnemonic,
            value: $raw,
            max: u32::MAX as i64,
        })
    };

    (@narrow Offset6, $raw:ident, $mnemonic:ident, $line:ident) => {
        if (0..=OFFSET_MASK as i64).contains(&$raw) {
            Ok($raw as u8)
        } else {
            Err(VMError::OperandOutOfRange {
                line: $line,
                mnemonic: $mnemonic,
                value: $raw,
                max: OFFSET_MASK as i64,
            })
        }
    };
}

for_each_instruction!(define_encoder);

impl Instruction {
    /// Encodes the instruction into a fresh byte vector.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.encoded_size());
        self.encode_into(&mut out);
        out
    }

    /// Encoded size in bytes; always equals `self.encode().len()`.
    pub const fn encoded_size(&self) -> usize {
        self.opcode().encoded_size()
    }
}

/// A symbolic instruction as handed over by a source front-end.
///
/// The operand is an already-resolved integer; whether it fits the opcode's
/// operand field is checked when the instruction is encoded.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SourceInstruction {
    pub opcode: Opcode,
    pub operand: Option<i64>,
    /// 1-based source line, kept for diagnostics only.
    pub line: usize,
}

impl SourceInstruction {
    pub fn new(opcode: Opcode, operand: Option<i64>, line: usize) -> Self {
        Self {
            opcode,
            operand,
            line,
        }
    }

    /// Maps a mnemonic to its opcode, failing with [`VMError::UnknownMnemonic`].
    pub fn from_mnemonic(
        mnemonic: &str,
        operand: Option<i64>,
        line: usize,
    ) -> Result<Self, VMError> {
        let opcode = Opcode::from_mnemonic(mnemonic).ok_or_else(|| VMError::UnknownMnemonic {
            line,
            mnemonic: mnemonic.to_string(),
        })?;
        Ok(Self::new(opcode, operand, line))
    }

    /// Validates the operand and produces the encodable [`Instruction`].
    ///
    /// Operands supplied to an operand-less opcode are ignored.
    pub fn resolve(&self) -> Result<Instruction, VMError> {
        if self.opcode.arity() == 0
            && let Some(operand) = self.operand
        {
            warn!(
                "line {}: ignoring operand {} of `{}`",
                self.line,
                operand,
                self.opcode.mnemonic()
            );
        }
        Instruction::from_operand(self.opcode, self.operand, self.line)
    }

    /// Validates and encodes this instruction.
    pub fn encode(&self) -> Result<Vec<u8>, VMError> {
        Ok(self.resolve()?.encode())
    }
}

/// Encodes a whole program, stopping at the first invalid instruction.
pub fn encode_program(instructions: &[SourceInstruction]) -> Result<Program, VMError> {
    Ok(Assembly::build(instructions)?.into_program())
}

/// One encoded instruction together with where it came from and where it landed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct AssembledInstruction {
    /// 1-based source line.
    pub line: usize,
    /// Byte offset of the opcode in the program.
    pub offset: usize,
    pub instruction: Instruction,
}

/// Result of assembling a source: the program plus a per-instruction map.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Assembly {
    instructions: Vec<AssembledInstruction>,
    program: Program,
}

impl Assembly {
    /// Validates and encodes `source` in order, failing on the first bad instruction.
    pub fn build(source: &[SourceInstruction]) -> Result<Self, VMError> {
        let mut code = Vec::with_capacity(source.iter().map(|s| s.opcode.encoded_size()).sum());
        let mut instructions = Vec::with_capacity(source.len());
        for src in source {
            let instruction = src.resolve()?;
            instructions.push(AssembledInstruction {
                line: src.line,
                offset: code.len(),
                instruction,
            });
            instruction.encode_into(&mut code);
        }
        Ok(Self {
            instructions,
            program: Program::new(code),
        })
    }

    pub fn instructions(&self) -> &[AssembledInstruction] {
        &self.instructions
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn into_program(self) -> Program {
        self.program
    }

    /// Number of instructions.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Per-instruction byte listing, e.g. `Instruction 0 (line 3): 0x4A, 0x64, 0x00, 0x00, 0x00`.
    pub fn detailed_listing(&self) -> String {
        let code = self.program.as_bytes();
        self.instructions
            .iter()
            .enumerate()
            .map(|(i, entry)| {
                let end = entry.offset + entry.instruction.encoded_size();
                format!(
                    "Instruction {} (line {}): {}",
                    i,
                    entry.line,
                    hex_list(&code[entry.offset..end])
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Human-readable dump of each instruction's fields.
    pub fn internal_representation(&self) -> String {
        let mut out = String::new();
        for (i, entry) in self.instructions.iter().enumerate() {
            let opcode = entry.instruction.opcode();
            if i > 0 {
                out.push('\n');
            }
            out.push_str(&format!(
                "[{i}] line {}: {} ({:#04X} / {})\n",
                entry.line,
                opcode.name(),
                opcode as u8,
                opcode as u8
            ));
            match entry.instruction.operand() {
                Some(operand) => {
                    out.push_str(&format!("    operand: {operand} ({operand:#X})\n"));
                }
                None => out.push_str("    operand: none\n"),
            }
            out.push_str(&format!("    size: {} byte(s)\n", opcode.encoded_size()));
            out.push_str(&format!("    description: {}\n", opcode.description()));
            out.push_str(&format!("    bytes: {}\n", hex_list(&entry.instruction.encode())));
        }
        out
    }
}
