//! Cross-cutting helpers shared by the library and the command-line tools.

pub mod log;
pub mod test_utils;
