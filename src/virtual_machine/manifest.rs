//! YAML manifest front-end.
//!
//! A manifest lists instructions under a top-level `program` key:
//!
//! ```yaml
//! program:
//!   - op: load
//!     operand: 100
//!   - op: write
//!     operand: "0x64"
//!   - op: sgn
//! ```
//!
//! `operand` may be a YAML integer or a string using the text front-end's
//! literal syntax. Entry `i` (0-based) is reported as line `i + 1`.

use crate::virtual_machine::assembler::{parse_literal, read_source};
use crate::virtual_machine::encoder::{Assembly, SourceInstruction};
use crate::virtual_machine::errors::VMError;
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct Manifest {
    program: Option<Vec<Entry>>,
}

#[derive(Debug, Deserialize)]
struct Entry {
    op: Option<String>,
    operand: Option<Operand>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Operand {
    Int(i64),
    Text(String),
}

impl Operand {
    fn resolve(&self, line: usize) -> Result<i64, VMError> {
        match self {
            Operand::Int(value) => Ok(*value),
            Operand::Text(text) => {
                parse_literal(text.trim()).ok_or_else(|| VMError::InvalidOperand {
                    line,
                    token: text.clone(),
                })
            }
        }
    }
}

/// Parses a manifest into symbolic instructions.
pub fn parse_manifest(source: &str) -> Result<Vec<SourceInstruction>, VMError> {
    let manifest: Manifest = serde_yaml::from_str(source).map_err(|e| VMError::ParseError {
        line: e.location().map_or(0, |loc| loc.line()),
        message: e.to_string(),
    })?;
    let entries = manifest.program.ok_or_else(|| VMError::ParseError {
        line: 0,
        message: "missing top-level `program` list".to_string(),
    })?;

    entries
        .iter()
        .enumerate()
        .map(|(idx, entry)| {
            let line = idx + 1;
            let op = entry.op.as_deref().ok_or_else(|| VMError::ParseError {
                line,
                message: "entry has no `op` field".to_string(),
            })?;
            let operand = entry
                .operand
                .as_ref()
                .map(|operand| operand.resolve(line))
                .transpose()?;
            SourceInstruction::from_mnemonic(op.trim(), operand, line)
        })
        .collect()
}

/// Assembles a manifest into bytecode.
pub fn assemble_manifest(source: &str) -> Result<Assembly, VMError> {
    Assembly::build(&parse_manifest(source)?)
}

/// Convenience: assemble a manifest file.
pub fn assemble_manifest_file<P: AsRef<Path>>(path: P) -> Result<Assembly, VMError> {
    assemble_manifest(&read_source(path.as_ref())?)
}
