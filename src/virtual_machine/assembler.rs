//! Text assembly front-end.
//!
//! Converts line-oriented assembly source into an [`Assembly`] via the
//! shared encoder.
//!
//! # Syntax
//!
//! ```text
//! mnemonic [operand]   # optional comment
//! ```
//!
//! - Mnemonics are case-insensitive (`load`, `LOAD`, `Load`)
//! - Operands are decimal (`42`, `-1`), hex (`0x2A`) or binary (`0b101010`)
//! - Comments start with `#`; blank lines are skipped
//! - Commas between tokens are optional
//!
//! Line numbers in diagnostics count every physical line, including blank
//! and comment-only lines.

use crate::virtual_machine::encoder::{Assembly, SourceInstruction};
use crate::virtual_machine::errors::VMError;
use crate::virtual_machine::isa::Opcode;
use crate::virtual_machine::manifest::assemble_manifest_file;
use std::fmt::Write;
use std::fs;
use std::path::Path;

const COMMENT_CHAR: char = '#';

/// Source flavours understood by [`assemble_path`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    /// Line-oriented text assembly (`.asm`, `.txt`).
    Text,
    /// YAML manifest with a `program` list (`.yaml`, `.yml`).
    Manifest,
}

impl SourceFormat {
    /// Picks the front-end from the file extension.
    pub fn from_path(path: &Path) -> Result<Self, VMError> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match ext.as_deref() {
            Some("asm" | "txt") => Ok(SourceFormat::Text),
            Some("yaml" | "yml") => Ok(SourceFormat::Manifest),
            _ => Err(VMError::UnsupportedFormat {
                path: path.display().to_string(),
            }),
        }
    }
}

/// Formats a compiler-style diagnostic for assembly failures.
///
/// Errors without a source line render as a single `error:` line.
pub fn render_assembly_diagnostic(file: &str, source: &str, err: &VMError) -> String {
    let mut diag = String::new();
    let _ = writeln!(diag, "error: {err}");

    let Some(line) = err.line() else {
        return diag;
    };
    let raw_line = source
        .lines()
        .nth(line.saturating_sub(1))
        .map(|l| l.trim_end_matches('\r'));
    let column = raw_line
        .and_then(|l| l.find(|c: char| !c.is_whitespace()))
        .map_or(1, |i| i + 1);
    let _ = writeln!(diag, " --> {file}:{line}:{column}");

    if let Some(line_text) = raw_line {
        let underline = " ".repeat(column.saturating_sub(1));
        let _ = writeln!(diag, "  |");
        let _ = writeln!(diag, "{:>4} | {}", line, line_text);
        let _ = writeln!(diag, "  | {}^", underline);
    }

    diag
}

/// Formats the diagnostic for an error raised while assembling `path`.
///
/// Only text sources get a source excerpt: manifest errors number entries,
/// not physical lines, so they render as a single `error:` line.
pub fn render_file_diagnostic(path: &Path, err: &VMError) -> String {
    let is_text = matches!(SourceFormat::from_path(path), Ok(SourceFormat::Text));
    match fs::read_to_string(path) {
        Ok(source) if is_text => {
            render_assembly_diagnostic(&path.display().to_string(), &source, err)
        }
        _ => format!("error: {err}\n"),
    }
}

/// Tokenize a single line of assembly.
///
/// Rules:
/// - `#` starts a comment
/// - commas are ignored
/// - whitespace-separated tokens
fn tokenize(line: &str) -> Vec<&str> {
    let code = match line.find(COMMENT_CHAR) {
        Some(i) => &line[..i],
        None => line,
    };
    code.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|tok| !tok.is_empty())
        .collect()
}

/// Parses an integer literal: decimal, `0x` hex or `0b` binary, optionally signed.
pub(crate) fn parse_literal(tok: &str) -> Option<i64> {
    let (negative, body) = match tok.as_bytes().first() {
        Some(b'-') => (true, &tok[1..]),
        Some(b'+') => (false, &tok[1..]),
        _ => (false, tok),
    };

    let prefix = body.get(..2).map(str::to_ascii_lowercase);
    let (radix, digits) = match prefix.as_deref() {
        Some("0x") => (16, &body[2..]),
        Some("0b") => (2, &body[2..]),
        _ => (10, body),
    };
    if digits.is_empty() || digits.starts_with(['+', '-']) {
        return None;
    }

    let magnitude = i64::from_str_radix(digits, radix).ok()?;
    Some(if negative { -magnitude } else { magnitude })
}

/// Parses one non-empty source line into a symbolic instruction.
fn parse_line(line_no: usize, tokens: &[&str]) -> Result<SourceInstruction, VMError> {
    let (head, operands) = match tokens.split_first() {
        Some(split) => split,
        None => {
            return Err(VMError::ParseError {
                line: line_no,
                message: "empty instruction".to_string(),
            });
        }
    };

    let opcode = Opcode::from_mnemonic(head).ok_or_else(|| VMError::UnknownMnemonic {
        line: line_no,
        mnemonic: head.to_string(),
    })?;

    if operands.len() > opcode.arity() {
        return Err(VMError::ArityMismatch {
            line: line_no,
            mnemonic: head.to_string(),
            expected: opcode.arity(),
            actual: operands.len(),
        });
    }

    let operand = match operands.first() {
        Some(tok) => Some(parse_literal(tok).ok_or_else(|| VMError::InvalidOperand {
            line: line_no,
            token: tok.to_string(),
        })?),
        None => None,
    };

    Ok(SourceInstruction::new(opcode, operand, line_no))
}

/// Parses a whole source text into symbolic instructions.
///
/// Stops at the first line that is not a well-formed instruction; operand
/// range checks are left to the encoder.
pub fn parse_source(source: &str) -> Result<Vec<SourceInstruction>, VMError> {
    let mut out = Vec::new();
    for (idx, line) in source.lines().enumerate() {
        let tokens = tokenize(line);
        if tokens.is_empty() {
            continue;
        }
        out.push(parse_line(idx + 1, &tokens)?);
    }
    Ok(out)
}

/// Assembles text source into bytecode.
pub fn assemble_source(source: &str) -> Result<Assembly, VMError> {
    Assembly::build(&parse_source(source)?)
}

/// Reads a file to a string, mapping failures to [`VMError::IoError`].
pub(crate) fn read_source(path: &Path) -> Result<String, VMError> {
    fs::read_to_string(path).map_err(|e| VMError::IoError {
        path: path.display().to_string(),
        source: e.to_string(),
    })
}

/// Convenience: assemble a text source file.
pub fn assemble_file<P: AsRef<Path>>(path: P) -> Result<Assembly, VMError> {
    assemble_source(&read_source(path.as_ref())?)
}

/// Assembles a file with the front-end its extension selects.
pub fn assemble_path<P: AsRef<Path>>(path: P) -> Result<Assembly, VMError> {
    let path = path.as_ref();
    match SourceFormat::from_path(path)? {
        SourceFormat::Text => assemble_file(path),
        SourceFormat::Manifest => assemble_manifest_file(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::utils::{scratch_dir, write_source};

    fn bytes(source: &str) -> Vec<u8> {
        assemble_source(source).unwrap().into_program().into_bytes()
    }

    #[test]
    fn tokenize_strips_comments_and_commas() {
        assert_eq!(tokenize("  load, 0x10   # push"), vec!["load", "0x10"]);
        assert_eq!(tokenize("write\t7,"), vec!["write", "7"]);
        assert!(tokenize("# only a comment").is_empty());
        assert!(tokenize("   \t").is_empty());
    }

    #[test]
    fn parse_literal_forms() {
        assert_eq!(parse_literal("42"), Some(42));
        assert_eq!(parse_literal("-1"), Some(-1));
        assert_eq!(parse_literal("0x2A"), Some(42));
        assert_eq!(parse_literal("0X2a"), Some(42));
        assert_eq!(parse_literal("0b101010"), Some(42));
        assert_eq!(parse_literal("-0x10"), Some(-16));
        assert_eq!(parse_literal("0x"), None);
        assert_eq!(parse_literal("0x-1"), None);
        assert_eq!(parse_literal("12abc"), None);
        assert_eq!(parse_literal("0b102"), None);
        assert_eq!(parse_literal(""), None);
    }

    #[test]
    fn assemble_empty_source() {
        assert!(bytes("").is_empty());
        assert!(bytes("# comment\n\n   # another\n").is_empty());
    }

    #[test]
    fn assemble_single_load() {
        assert_eq!(bytes("load 468"), vec![0x4A, 0xD4, 0x01, 0x00, 0x00]);
    }

    #[test]
    fn mnemonics_are_case_insensitive() {
        assert_eq!(bytes("LOAD 1\nRead 2\nwRiTe 3\nSGN"), bytes("load 1\nread 2\nwrite 3\nsgn"));
    }

    #[test]
    fn assemble_reference_program() {
        let source = "\
# store two values then inspect them
load 100
load 42
write 100   # data[100] = 42
write 101
load 100
read 0
load 0x65
sgn
";
        assert_eq!(
            bytes(source),
            vec![
                0x4A, 100, 0, 0, 0, //
                0x4A, 42, 0, 0, 0, //
                0xD5, 100, 0, 0, 0, //
                0xD5, 101, 0, 0, 0, //
                0x4A, 100, 0, 0, 0, //
                0x87, 0x00, //
                0x4A, 0x65, 0, 0, 0, //
                0x9A,
            ]
        );
    }

    #[test]
    fn line_numbers_count_blank_and_comment_lines() {
        let assembly = assemble_source("# header\n\nload 1\n\nsgn").unwrap();
        let lines: Vec<_> = assembly.instructions().iter().map(|e| e.line).collect();
        assert_eq!(lines, vec![3, 5]);
    }

    #[test]
    fn unknown_mnemonic_reports_line() {
        assert_eq!(
            assemble_source("load 1\njump 4").unwrap_err(),
            VMError::UnknownMnemonic {
                line: 2,
                mnemonic: "jump".to_string()
            }
        );
    }

    #[test]
    fn invalid_operand_literal() {
        assert_eq!(
            assemble_source("load 12abc").unwrap_err(),
            VMError::InvalidOperand {
                line: 1,
                token: "12abc".to_string()
            }
        );
    }

    #[test]
    fn missing_operand_comes_from_encoder() {
        assert!(matches!(
            assemble_source("\nwrite").unwrap_err(),
            VMError::MissingOperand { line: 2, mnemonic: "write" }
        ));
    }

    #[test]
    fn extra_tokens_are_rejected() {
        assert_eq!(
            assemble_source("load 1 2").unwrap_err(),
            VMError::ArityMismatch {
                line: 1,
                mnemonic: "load".to_string(),
                expected: 1,
                actual: 2
            }
        );
        assert!(matches!(
            assemble_source("sgn 5").unwrap_err(),
            VMError::ArityMismatch { expected: 0, actual: 1, .. }
        ));
    }

    #[test]
    fn out_of_range_read_offset() {
        assert!(matches!(
            assemble_source("load 0\nread 64").unwrap_err(),
            VMError::OperandOutOfRange { line: 2, value: 64, .. }
        ));
    }

    #[test]
    fn parse_errors_win_over_encoding_errors() {
        // line 1 would fail range checks, line 2 fails parsing
        assert!(matches!(
            assemble_source("read 99\nbogus").unwrap_err(),
            VMError::UnknownMnemonic { line: 2, .. }
        ));
    }

    #[test]
    fn diagnostic_points_at_line() {
        let source = "load 1\n   jump 4\n";
        let err = assemble_source(source).unwrap_err();
        let diag = render_assembly_diagnostic("prog.asm", source, &err);
        assert!(diag.starts_with("error: line 2: unknown mnemonic `jump`"));
        assert!(diag.contains(" --> prog.asm:2:4"));
        assert!(diag.contains("   2 |    jump 4"));
        assert!(diag.contains("  |    ^"));
    }

    #[test]
    fn file_diagnostic_excerpts_text_sources() {
        let dir = scratch_dir();
        let path = write_source(&dir, "prog.asm", "load 0\nread 99\n");
        let err = assemble_path(&path).unwrap_err();
        let diag = render_file_diagnostic(&path, &err);
        assert!(diag.contains(":2:1"));
        assert!(diag.contains("   2 | read 99"));
    }

    #[test]
    fn file_diagnostic_skips_excerpt_for_manifests() {
        let dir = scratch_dir();
        let path = write_source(
            &dir,
            "prog.yaml",
            "program:\n  - op: load\n    operand: 1\n  - op: read\n    operand: 99\n",
        );
        let err = assemble_path(&path).unwrap_err();
        assert!(matches!(err, VMError::OperandOutOfRange { line: 2, .. }));
        let diag = render_file_diagnostic(&path, &err);
        assert_eq!(diag, format!("error: {err}\n"));
        assert!(!diag.contains("op: load"));
    }

    #[test]
    fn diagnostic_without_line() {
        let err = VMError::UnsupportedFormat {
            path: "x.bin".to_string(),
        };
        assert_eq!(
            render_assembly_diagnostic("x.bin", "", &err).lines().count(),
            1
        );
    }

    #[test]
    fn format_detection() {
        assert_eq!(
            SourceFormat::from_path(Path::new("a.asm")),
            Ok(SourceFormat::Text)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("a.TXT")),
            Ok(SourceFormat::Text)
        );
        assert_eq!(
            SourceFormat::from_path(Path::new("dir/a.yml")),
            Ok(SourceFormat::Manifest)
        );
        assert!(matches!(
            SourceFormat::from_path(Path::new("a.bin")),
            Err(VMError::UnsupportedFormat { .. })
        ));
        assert!(SourceFormat::from_path(Path::new("noext")).is_err());
    }

    #[test]
    fn assemble_path_dispatches_on_extension() {
        let dir = scratch_dir();
        let text = write_source(&dir, "prog.asm", "load 7\nwrite 0\n");
        let yaml = write_source(
            &dir,
            "prog.yaml",
            "program:\n  - op: load\n    operand: 7\n  - op: write\n    operand: 0\n",
        );
        let from_text = assemble_path(&text).unwrap();
        let from_yaml = assemble_path(&yaml).unwrap();
        assert_eq!(from_text.program(), from_yaml.program());
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = scratch_dir();
        assert!(matches!(
            assemble_file(dir.path().join("absent.asm")),
            Err(VMError::IoError { .. })
        ));
    }
}
