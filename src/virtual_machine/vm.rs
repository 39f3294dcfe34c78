//! Stack-based interpreter.
//!
//! The machine owns three pieces of state: read-only code memory holding the
//! program bytes, an operand [`Stack`] of signed integers and a zeroed
//! [`DataMemory`] (1024 bytes unless configured otherwise). Execution walks
//! the code sequentially from offset 0; there are no jumps, so every
//! instruction runs at most once and the machine halts when the instruction
//! pointer reaches the end of the code.
//!
//! Any decoding or runtime error stops the machine in the
//! [`MachineStatus::Faulted`] state. Stack and memory are left exactly as
//! the failing instruction found them, except that a popped operand is
//! consumed before its address is validated.

mod config;
mod memory;
mod stack;

pub use config::VmConfig;
pub use memory::{DEFAULT_MEMORY_SIZE, DataMemory};
pub use stack::Stack;

use crate::virtual_machine::dump::MemoryDump;
use crate::virtual_machine::errors::{Fault, VMError};
use crate::virtual_machine::isa::{OFFSET_MASK, Opcode};
use crate::virtual_machine::program::Program;
use crate::{debug, error, info};

macro_rules! exec_vm {
    // Entry point
    (
        vm = $vm:ident,
        opcode = $opcode:ident,
        { $( $variant:ident => $handler:ident ( $( $field:ident : $kind:ident ),* $(,)? ) ),* $(,)? }
    ) => {{
        match $opcode {
            $(
                Opcode::$variant => {
                    let instr_name = $opcode.name();
                    $( let $field = exec_vm!(@read $vm, $kind); )*
                    $vm.$handler(instr_name, $( $field ),*)
                }
            ),*
        }
    }};

    // Decode an operand field using the ISA's width and byte order
    (@read $vm:ident, $kind:ident) => {{
        let bytes = $vm.read_exact($crate::define_instructions!(@size $kind))?;
        $crate::define_instructions!(@decode $kind, bytes)
    }};
}

/// Lifecycle of a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MachineStatus {
    /// Constructed, nothing executed yet.
    Ready,
    /// At least one instruction executed, code remains.
    Running,
    /// Instruction pointer reached the end of the code.
    Halted,
    /// An instruction failed; the machine will not execute further.
    Faulted,
}

/// Bytecode interpreter.
pub struct VM {
    /// Program bytes, never modified.
    code: Vec<u8>,
    /// Instruction pointer (next byte to fetch).
    ip: usize,
    /// Start offset of the instruction currently executing.
    instr_offset: usize,
    stack: Stack,
    memory: DataMemory,
    /// Instructions completed so far.
    executed: usize,
    max_steps: Option<u64>,
    status: MachineStatus,
    fault: Option<Fault>,
}

impl VM {
    /// Creates a machine over `program` with the default configuration.
    pub fn new(program: Program) -> Self {
        Self::with_config(program, VmConfig::default())
    }

    /// Creates a machine over `program` with `config`.
    pub fn with_config(program: Program, config: VmConfig) -> Self {
        info!(
            "loaded program: {} byte(s) of code, {} byte(s) of data memory",
            program.len(),
            config.memory_size
        );
        Self {
            code: program.into_bytes(),
            ip: 0,
            instr_offset: 0,
            stack: Stack::new(),
            memory: DataMemory::new(config.memory_size),
            executed: 0,
            max_steps: config.max_steps,
            status: MachineStatus::Ready,
            fault: None,
        }
    }

    /// Executes until the end of the code or the first error.
    ///
    /// Returns the number of instructions executed. Running a halted machine
    /// again is a no-op; running a faulted one returns the recorded fault.
    pub fn run(&mut self) -> Result<usize, Fault> {
        while self.step()? != MachineStatus::Halted {}
        Ok(self.executed)
    }

    /// Executes a single instruction and returns the resulting status.
    pub fn step(&mut self) -> Result<MachineStatus, Fault> {
        if let Some(fault) = &self.fault {
            return Err(fault.clone());
        }
        if self.status == MachineStatus::Halted {
            return Ok(MachineStatus::Halted);
        }
        if self.ip >= self.code.len() {
            self.halt();
            return Ok(self.status);
        }

        self.status = MachineStatus::Running;
        if let Err(error) = self.cycle() {
            let fault = Fault {
                error,
                executed: self.executed,
            };
            error!("execution fault: {fault}");
            self.status = MachineStatus::Faulted;
            self.fault = Some(fault.clone());
            return Err(fault);
        }
        self.executed += 1;

        if self.ip >= self.code.len() {
            self.halt();
        }
        Ok(self.status)
    }

    pub fn status(&self) -> MachineStatus {
        self.status
    }

    /// The fault that stopped the machine, if any.
    pub fn fault(&self) -> Option<&Fault> {
        self.fault.as_ref()
    }

    /// Offset of the next instruction to execute.
    pub fn ip(&self) -> usize {
        self.ip
    }

    /// Number of instructions executed so far.
    pub fn executed(&self) -> usize {
        self.executed
    }

    /// Operand stack, bottom first.
    pub fn stack(&self) -> &[i64] {
        self.stack.as_slice()
    }

    pub fn memory(&self) -> &DataMemory {
        &self.memory
    }

    /// Seeds data memory before execution.
    pub fn load_data(&mut self, address: usize, data: &[u8]) -> Result<(), VMError> {
        self.memory.load(address, data)
    }

    /// Snapshot of data memory over `[start, end)`.
    pub fn dump(&self, start: usize, end: usize) -> Result<MemoryDump<'_>, VMError> {
        MemoryDump::new(&self.memory, start, end)
    }

    fn halt(&mut self) {
        self.status = MachineStatus::Halted;
        info!(
            "halted after {} instruction(s), stack={}",
            self.executed, self.stack
        );
    }

    /// Fetches, decodes and executes the instruction at the current IP.
    fn cycle(&mut self) -> Result<(), VMError> {
        if let Some(limit) = self.max_steps
            && self.executed as u64 >= limit
        {
            return Err(VMError::StepLimitExceeded {
                offset: self.ip,
                limit,
            });
        }

        self.instr_offset = self.ip;
        let byte = self.read_exact(1)?[0];
        let opcode = Opcode::try_from(byte).map_err(|err| err.at_offset(self.instr_offset))?;
        self.exec(opcode)
    }

    /// Reads exactly `count` bytes from the code at the current IP.
    ///
    /// Advances the instruction pointer by `count` bytes.
    fn read_exact(&mut self, count: usize) -> Result<&[u8], VMError> {
        let start = self.ip;
        let available = self.code.len().saturating_sub(start);
        let end = start
            .checked_add(count)
            .filter(|end| *end <= self.code.len())
            .ok_or(VMError::TruncatedInstruction {
                offset: self.instr_offset,
                requested: count,
                available,
            })?;

        self.ip = end;
        Ok(&self.code[start..end])
    }

    /// Executes a single decoded opcode.
    fn exec(&mut self, opcode: Opcode) -> Result<(), VMError> {
        exec_vm! {
            vm = self,
            opcode = opcode,
            {
                LoadConst => op_load_const(value: ImmU32),
                ReadMem => op_read_mem(offset: Offset6),
                WriteMem => op_write_mem(address: ImmU32),
                Sgn => op_sgn(),
            }
        }
    }

    /// Emits the per-instruction trace line.
    fn trace(&self, detail: std::fmt::Arguments<'_>) {
        debug!(
            "[{}] IP={:#06X}: {} -> stack={}",
            self.executed + 1,
            self.instr_offset,
            detail,
            self.stack
        );
    }

    fn op_load_const(&mut self, instr: &'static str, value: u32) -> Result<(), VMError> {
        self.stack.push(i64::from(value));
        self.trace(format_args!("{instr}({value})"));
        Ok(())
    }

    fn op_read_mem(&mut self, instr: &'static str, offset: u8) -> Result<(), VMError> {
        let base = self.stack.pop(self.instr_offset, instr)?;
        let address = base.saturating_add(i64::from(offset & OFFSET_MASK));
        let value = self.memory.read(address, self.instr_offset, instr)?;
        self.stack.push(i64::from(value));
        self.trace(format_args!(
            "{instr}(base={base}, offset={}) data[{address}]={value}",
            offset & OFFSET_MASK
        ));
        Ok(())
    }

    fn op_write_mem(&mut self, instr: &'static str, address: u32) -> Result<(), VMError> {
        let value = self.stack.pop(self.instr_offset, instr)?;
        let byte = (value & 0xFF) as u8;
        self.memory
            .write(i64::from(address), byte, self.instr_offset, instr)?;
        self.trace(format_args!("{instr}(data[{address}] = {byte})"));
        Ok(())
    }

    fn op_sgn(&mut self, instr: &'static str) -> Result<(), VMError> {
        let address = self.stack.pop(self.instr_offset, instr)?;
        let byte = self.memory.read(address, self.instr_offset, instr)?;
        let sign = (byte as i8).signum();
        self.stack.push(i64::from(sign));
        self.trace(format_args!("{instr}(data[{address}] = {}) = {sign}", byte as i8));
        Ok(())
    }
}
