use super::memory::DEFAULT_MEMORY_SIZE;

/// Interpreter settings fixed at construction time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VmConfig {
    /// Size of data memory in bytes.
    pub memory_size: usize,
    /// Upper bound on executed instructions; `None` runs to completion.
    pub max_steps: Option<u64>,
}

impl VmConfig {
    pub const fn new() -> Self {
        Self {
            memory_size: DEFAULT_MEMORY_SIZE,
            max_steps: None,
        }
    }

    pub const fn with_memory_size(mut self, memory_size: usize) -> Self {
        self.memory_size = memory_size;
        self
    }

    pub const fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps = Some(max_steps);
        self
    }
}

impl Default for VmConfig {
    fn default() -> Self {
        Self::new()
    }
}
