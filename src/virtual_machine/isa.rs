//! Instruction Set Architecture (ISA) definitions.
//!
//! Defines the machine's instruction set. The [`for_each_instruction!`](crate::for_each_instruction)
//! macro holds the canonical instruction table and invokes a callback macro
//! for code generation, so the encoder, the decoder and the ISA fingerprint
//! test all derive from one list.
//!
//! This module generates:
//! - The [`Opcode`] enum with its byte values
//! - `TryFrom<u8>` for decoding opcodes
//! - Mnemonic lookup and the fixed per-opcode encoded size
//!
//! See [`encoder`](super::encoder) for the operand-carrying [`Instruction`](super::encoder::Instruction).
//!
//! # Bytecode Format
//!
//! Every instruction is one opcode byte followed by a fixed-width operand:
//! - `ImmU32`: 4 bytes, little-endian unsigned
//! - `Offset6`: 1 byte, only the low 6 bits are significant at execution
//!
//! There is no header, padding or alignment between instructions.

use crate::virtual_machine::errors::VMError;

/// Mask applied to a `read` offset byte at execution time.
pub const OFFSET_MASK: u8 = 0x3F;

/// Invokes a callback macro with the complete instruction definition list.
///
/// Row format: `Name = opcode, "mnemonic" => [operand: Kind], "DISPLAY_NAME", "description"`.
#[macro_export]
macro_rules! for_each_instruction {
    ($callback:ident) => {
        $callback! {
            /// load value ; push value
            LoadConst = 0x4A, "load" => [value: ImmU32], "LOAD_CONST", "Load constant",
            /// read offset ; base = pop ; push data[base + (offset & 0x3F)]
            ReadMem = 0x87, "read" => [offset: Offset6], "READ_MEM", "Read from memory",
            /// write address ; data[address] = pop & 0xFF
            WriteMem = 0xD5, "write" => [address: ImmU32], "WRITE_MEM", "Write to memory",
            /// sgn ; address = pop ; push sign(data[address] as i8)
            Sgn = 0x9A, "sgn" => [], "SGN", "Unary operation sgn()",
        }
    };
}

#[macro_export]
macro_rules! define_instructions {
    (
        $(
            $(#[$doc:meta])*
            $name:ident = $opcode:literal, $mnemonic:literal => [
                $( $field:ident : $kind:ident ),* $(,)?
            ], $display:literal, $description:literal
        ),* $(,)?
    ) => {
        // =========================
        // Opcode enum
        // =========================
        #[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
        #[repr(u8)]
        pub enum Opcode {
            $(
                $(#[$doc])*
                $name = $opcode,
            )*
        }

        impl TryFrom<u8> for Opcode {
            type Error = VMError;

            fn try_from(value: u8) -> Result<Self, Self::Error> {
                match value {
                    $( $opcode => Ok(Opcode::$name), )*
                    _ => Err(VMError::IllegalOpcode {
                        opcode: value,
                        offset: 0,
                    }),
                }
            }
        }

        impl Opcode {
            /// Every opcode, in table order.
            pub const ALL: &'static [Opcode] = &[ $( Opcode::$name ),* ];

            /// Returns the assembly mnemonic (`load`, `read`, ...).
            pub const fn mnemonic(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $mnemonic, )*
                }
            }

            /// Returns the upper-case name used in listings and traces.
            pub const fn name(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $display, )*
                }
            }

            /// Returns a short human-readable description.
            pub const fn description(&self) -> &'static str {
                match self {
                    $( Opcode::$name => $description, )*
                }
            }

            /// Number of operands the instruction takes (0 or 1).
            pub const fn arity(&self) -> usize {
                match self {
                    $( Opcode::$name => 0usize $( + $crate::define_instructions!(@one $field) )*, )*
                }
            }

            /// Width in bytes of the instruction's operand field.
            pub const fn operand_size(&self) -> usize {
                match self {
                    $( Opcode::$name => 0usize $( + $crate::define_instructions!(@size $kind) )*, )*
                }
            }

            /// Total encoded size (opcode byte plus operand), independent of operand value.
            pub const fn encoded_size(&self) -> usize {
                1 + self.operand_size()
            }

            /// Looks up a mnemonic, ignoring ASCII case.
            pub fn from_mnemonic(mnemonic: &str) -> Option<Opcode> {
                $(
                    if mnemonic.eq_ignore_ascii_case($mnemonic) {
                        return Some(Opcode::$name);
                    }
                )*
                None
            }
        }
    };

    // ---------- types ----------
    (@ty ImmU32)  => { u32 };
    (@ty Offset6) => { u8 };

    // ---------- sizes ----------
    (@size ImmU32)  => { 4usize };
    (@size Offset6) => { 1usize };

    (@one $field:ident) => { 1usize };

    // ---------- encoding ----------
    (@emit $out:ident, ImmU32, $v:ident) => {
        $out.extend_from_slice(&$v.to_le_bytes());
    };

    (@emit $out:ident, Offset6, $v:ident) => {
        $out.push(*$v);
    };

    // ---------- decoding ----------
    (@decode ImmU32, $bytes:expr) => {
        u32::from_le_bytes([$bytes[0], $bytes[1], $bytes[2], $bytes[3]])
    };

    (@decode Offset6, $bytes:expr) => {
        $bytes[0]
    };
}

for_each_instruction!(define_instructions);

/// Returns the encoded size of any instruction with this opcode.
pub const fn encoded_size(opcode: Opcode) -> usize {
    opcode.encoded_size()
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_values_are_fixed() {
        assert_eq!(Opcode::LoadConst as u8, 74);
        assert_eq!(Opcode::ReadMem as u8, 135);
        assert_eq!(Opcode::WriteMem as u8, 213);
        assert_eq!(Opcode::Sgn as u8, 154);
    }

    #[test]
    fn encoded_sizes() {
        assert_eq!(encoded_size(Opcode::LoadConst), 5);
        assert_eq!(encoded_size(Opcode::ReadMem), 2);
        assert_eq!(encoded_size(Opcode::WriteMem), 5);
        assert_eq!(encoded_size(Opcode::Sgn), 1);
    }

    #[test]
    fn arity_matches_table() {
        assert_eq!(Opcode::LoadConst.arity(), 1);
        assert_eq!(Opcode::Sgn.arity(), 0);
    }

    #[test]
    fn opcode_try_from_round_trips() {
        for opcode in Opcode::ALL {
            assert_eq!(Opcode::try_from(*opcode as u8), Ok(*opcode));
        }
    }

    #[test]
    fn opcode_try_from_invalid() {
        assert!(matches!(
            Opcode::try_from(0xFF),
            Err(VMError::IllegalOpcode { opcode: 0xFF, .. })
        ));
        assert!(Opcode::try_from(0x00).is_err());
    }

    #[test]
    fn from_mnemonic_ignores_case() {
        assert_eq!(Opcode::from_mnemonic("load"), Some(Opcode::LoadConst));
        assert_eq!(Opcode::from_mnemonic("WRITE"), Some(Opcode::WriteMem));
        assert_eq!(Opcode::from_mnemonic("Sgn"), Some(Opcode::Sgn));
        assert_eq!(Opcode::from_mnemonic("jump"), None);
    }

    #[test]
    fn names_and_descriptions() {
        assert_eq!(Opcode::ReadMem.name(), "READ_MEM");
        assert_eq!(Opcode::ReadMem.mnemonic(), "read");
        assert_eq!(Opcode::Sgn.description(), "Unary operation sgn()");
        assert_eq!(Opcode::WriteMem.to_string(), "WRITE_MEM");
    }
}
