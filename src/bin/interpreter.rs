//! Bytecode interpreter CLI.
//!
//! Loads a flat bytecode file, runs it to completion and optionally writes a
//! JSON dump of data memory.
//!
//! # Usage
//! ```text
//! interpreter <binary> [OPTIONS]
//! ```
//!
//! # Options
//! - `--dump <FILE>`: Write a JSON memory dump to `FILE`
//! - `--range <START> <END>`: Dump range, half-open (defaults to 0 256, clamped to memory size)
//! - `--memory-size <N>`: Data memory size in bytes (defaults to 1024)
//! - `--max-steps <N>`: Abort after `N` instructions
//! - `-v, --verbose`: Print the disassembly and trace every executed instruction
//!
//! # Examples
//! ```text
//! interpreter program.bin
//! interpreter program.bin --dump memory.json --range 0 128 -v
//! ```

use clap::Parser;
use std::error::Error;
use std::path::PathBuf;
use std::process;
use uvm::utils::log;
use uvm::virtual_machine::dump::default_range;
use uvm::virtual_machine::program::Program;
use uvm::virtual_machine::vm::{DEFAULT_MEMORY_SIZE, VM, VmConfig};
use uvm::{error, info};

#[derive(Parser, Debug)]
#[command(name = "interpreter", about = "Run a bytecode program", version)]
struct Cli {
    /// Bytecode file produced by the assembler
    binary: PathBuf,
    /// Write a JSON dump of data memory to this file
    #[arg(long, value_name = "FILE")]
    dump: Option<PathBuf>,
    /// Half-open address range to dump
    #[arg(long, num_args = 2, value_names = ["START", "END"])]
    range: Option<Vec<usize>>,
    /// Data memory size in bytes
    #[arg(long, default_value_t = DEFAULT_MEMORY_SIZE)]
    memory_size: usize,
    /// Abort after this many instructions
    #[arg(long)]
    max_steps: Option<u64>,
    /// Print the disassembly and trace every executed instruction
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();
    log::set_verbose(cli.verbose);

    if let Err(err) = run(&cli) {
        error!("{err}");
        process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<(), Box<dyn Error>> {
    let program = Program::load(&cli.binary)?;
    info!(
        "Reading program: {} ({} bytes)",
        cli.binary.display(),
        program.len()
    );

    if cli.verbose
        && let Ok(listing) = program.listing()
    {
        print!("{listing}");
    }

    let mut config = VmConfig::new().with_memory_size(cli.memory_size);
    if let Some(limit) = cli.max_steps {
        config = config.with_max_steps(limit);
    }

    let mut vm = VM::with_config(program, config);
    let executed = vm.run()?;
    println!("Instructions executed: {executed}");

    if let Some(path) = &cli.dump {
        let (start, end) = match cli.range.as_deref() {
            Some([start, end]) => (*start, *end),
            _ => default_range(cli.memory_size),
        };
        vm.dump(start, end)?.write_json(path)?;
        info!(
            "Data memory dump saved to: {} (addresses {start}..{end})",
            path.display()
        );
    }

    println!("Final stack: {:?}", vm.stack());
    Ok(())
}
