//! Test utilities shared across modules.

#[cfg(test)]
pub mod utils {
    use crate::virtual_machine::program::Program;
    use crate::virtual_machine::vm::{VM, VmConfig};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    /// Creates a temporary directory removed when the handle drops.
    pub fn scratch_dir() -> TempDir {
        tempfile::tempdir().expect("failed to create temp dir")
    }

    /// Writes `contents` to `name` inside `dir` and returns the full path.
    pub fn write_source(dir: &TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, contents).expect("failed to write source file");
        path
    }

    /// Builds a VM over raw bytes with the default 1 KiB data memory.
    pub fn vm_from_bytes(code: &[u8]) -> VM {
        VM::new(code.to_vec().into())
    }

    /// Builds a VM over raw bytes with a custom configuration.
    pub fn vm_with_config(code: &[u8], config: VmConfig) -> VM {
        VM::with_config(Program::new(code.to_vec()), config)
    }
}
