//! Assembly to bytecode compiler CLI.
//!
//! Reads a text (`.asm`, `.txt`) or YAML (`.yaml`, `.yml`) source and writes
//! the flat bytecode file.
//!
//! # Usage
//! ```text
//! assembler <input> <output> [--test] [--verbose]
//! ```
//!
//! # Options
//! - `--test`: Print the internal representation and the byte listing
//! - `-v, --verbose`: Print the internal representation and enable debug logging
//!
//! # Examples
//! ```text
//! assembler program.asm program.bin
//! assembler program.yaml program.bin --test
//! ```

use clap::Parser;
use std::path::PathBuf;
use std::process;
use uvm::utils::log;
use uvm::virtual_machine::assembler::{assemble_path, render_file_diagnostic};
use uvm::virtual_machine::encoder::Assembly;
use uvm::virtual_machine::errors::VMError;
use uvm::{error, info};

const RULE_WIDTH: usize = 60;

#[derive(Parser, Debug)]
#[command(
    name = "assembler",
    about = "Assemble text or YAML sources into bytecode",
    version
)]
struct Cli {
    /// Source file (.asm, .txt, .yaml or .yml)
    input: PathBuf,
    /// Output bytecode file
    output: PathBuf,
    /// Print the internal representation and the byte listing
    #[arg(long)]
    test: bool,
    /// Print the internal representation and enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    log::set_verbose(cli.verbose);

    let assembly = match assemble_path(&cli.input) {
        Ok(assembly) => assembly,
        Err(err) => {
            report_assembly_error(&cli, &err);
            process::exit(1);
        }
    };

    println!("Assembled commands: {}", assembly.len());
    println!("Total program size: {} bytes", assembly.program().len());

    if cli.verbose || cli.test {
        print_banner("INTERNAL PROGRAM REPRESENTATION:");
        print!("{}", assembly.internal_representation());
        println!("\nTotal size: {} bytes", assembly.program().len());
    }

    if cli.test {
        print_listing(&assembly);
    }

    if let Err(err) = assembly.program().save(&cli.output) {
        error!("{err}");
        process::exit(1);
    }

    info!(
        "Compiled {} -> {} ({} bytes)",
        cli.input.display(),
        cli.output.display(),
        assembly.program().len()
    );
}

/// Logs an assembly error, with a source excerpt for text sources.
fn report_assembly_error(cli: &Cli, err: &VMError) {
    error!("Assembly failed: {err}");
    if err.line().is_some() {
        eprint!("{}", render_file_diagnostic(&cli.input, err));
    }
}

fn print_listing(assembly: &Assembly) {
    print_banner("BYTE REPRESENTATION OF PROGRAM:");
    if !assembly.is_empty() {
        println!("{}", assembly.detailed_listing());
    }
    println!("\n{}", assembly.program().to_hex());
}

fn print_banner(title: &str) {
    println!("\n{}", "=".repeat(RULE_WIDTH));
    println!("{title}");
    println!("{}", "=".repeat(RULE_WIDTH));
}
