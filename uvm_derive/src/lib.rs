//! Derive macros for the uvm crate.
//!
//! Provides:
//! - `#[derive(Error)]` - `Display` and `std::error::Error` from an `#[error("...")]` message

mod error;

use proc_macro::TokenStream;

/// Implements `Display` and `Error` for error enums and structs.
#[proc_macro_derive(Error, attributes(error))]
pub fn derive_error(input: TokenStream) -> TokenStream {
    error::derive_error(input)
}
