//! Derive macro for error types.
//!
//! Generates `std::fmt::Display` and `std::error::Error` implementations.
//!
//! # Usage
//!
//! ```ignore
//! use uvm_derive::Error;
//!
//! #[derive(Debug, Error)]
//! pub enum DecodeError {
//!     #[error("illegal opcode {opcode:#04x}")]
//!     IllegalOpcode { opcode: u8, offset: usize },
//!
//!     #[error("truncated: {0}")]
//!     Truncated(usize),
//!
//!     #[error("empty program")]
//!     Empty,
//! }
//! ```
//!
//! Only the fields the message names are formatted, so a variant may carry
//! location data (like `offset` above) that callers read directly without
//! it appearing in the rendered text.

use proc_macro::TokenStream;
use quote::{ToTokens, format_ident, quote};
use std::collections::HashSet;
use syn::{Data, DeriveInput, Fields, Lit, Meta, parse_macro_input};

/// Derives `Display` and `Error` for an enum or struct.
///
/// Each variant (or the struct itself) must carry an `#[error("...")]`
/// attribute. Named fields are interpolated as `{field}`, tuple fields as
/// `{0}`, `{1}`; format specs such as `{opcode:#04x}` pass through untouched.
pub fn derive_error(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    match expand_error_derive(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => err.to_compile_error().into(),
    }
}

fn expand_error_derive(input: &DeriveInput) -> syn::Result<proc_macro2::TokenStream> {
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let display_body = match &input.data {
        Data::Enum(data_enum) => {
            let arms = data_enum
                .variants
                .iter()
                .map(|variant| {
                    let message = extract_error_message(
                        &variant.attrs,
                        &variant.ident,
                        &format!("variant `{}`", variant.ident),
                    )?;
                    Ok(display_arm(&variant.ident, &variant.fields, &message))
                })
                .collect::<syn::Result<Vec<_>>>()?;

            quote! {
                match self {
                    #(#arms)*
                }
            }
        }
        Data::Struct(data_struct) => {
            let message = extract_error_message(
                &input.attrs,
                &input.ident,
                &format!("type `{}`", input.ident),
            )?;
            struct_display(&data_struct.fields, &message)
        }
        Data::Union(_) => {
            return Err(syn::Error::new_spanned(
                input,
                "Error derive does not support unions",
            ));
        }
    };

    Ok(quote! {
        impl #impl_generics ::std::fmt::Display for #name #ty_generics #where_clause {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                #display_body
            }
        }

        impl #impl_generics ::std::error::Error for #name #ty_generics #where_clause {}
    })
}

/// Builds one `match` arm that formats an enum variant.
fn display_arm(
    variant: &syn::Ident,
    fields: &Fields,
    message: &str,
) -> proc_macro2::TokenStream {
    match fields {
        Fields::Unit => quote! {
            Self::#variant => write!(f, #message),
        },
        Fields::Named(named) => {
            let referenced = referenced_args(message);
            let used: Vec<_> = named
                .named
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .filter(|ident| referenced.contains(&ident.to_string()))
                .collect();
            quote! {
                Self::#variant { #(#used,)* .. } => write!(f, #message, #(#used = #used),*),
            }
        }
        Fields::Unnamed(unnamed) => {
            let count = unnamed.unnamed.len();
            let format_str = positional_to_named(message, count);
            let referenced = referenced_args(&format_str);
            let bindings: Vec<_> = (0..count)
                .map(|i| {
                    let ident = format_ident!("f{}", i);
                    if referenced.contains(&ident.to_string()) {
                        quote! { #ident }
                    } else {
                        quote! { _ }
                    }
                })
                .collect();
            let used: Vec<_> = (0..count)
                .map(|i| format_ident!("f{}", i))
                .filter(|ident| referenced.contains(&ident.to_string()))
                .collect();
            quote! {
                Self::#variant(#(#bindings),*) => write!(f, #format_str, #(#used = #used),*),
            }
        }
    }
}

/// Builds the `fmt` body for a struct.
fn struct_display(fields: &Fields, message: &str) -> proc_macro2::TokenStream {
    match fields {
        Fields::Unit => quote! { write!(f, #message) },
        Fields::Named(named) => {
            let referenced = referenced_args(message);
            let used: Vec<_> = named
                .named
                .iter()
                .filter_map(|field| field.ident.as_ref())
                .filter(|ident| referenced.contains(&ident.to_string()))
                .collect();
            quote! { write!(f, #message, #(#used = self.#used),*) }
        }
        Fields::Unnamed(unnamed) => {
            let count = unnamed.unnamed.len();
            let format_str = positional_to_named(message, count);
            let referenced = referenced_args(&format_str);
            let (idents, indices): (Vec<_>, Vec<_>) = (0..count)
                .map(|i| (format_ident!("f{}", i), syn::Index::from(i)))
                .filter(|(ident, _)| referenced.contains(&ident.to_string()))
                .unzip();
            quote! { write!(f, #format_str, #(#idents = self.#indices),*) }
        }
    }
}

/// Extracts the message from an `#[error("...")]` attribute.
fn extract_error_message<T: ToTokens>(
    attrs: &[syn::Attribute],
    target: &T,
    target_desc: &str,
) -> syn::Result<String> {
    let Some(attr) = attrs.iter().find(|attr| attr.path().is_ident("error")) else {
        return Err(syn::Error::new_spanned(
            target,
            format!("missing #[error(\"...\")] attribute on {target_desc}"),
        ));
    };

    let Meta::List(meta_list) = &attr.meta else {
        return Err(syn::Error::new_spanned(
            &attr.meta,
            "invalid #[error] attribute; use #[error(\"message\")]",
        ));
    };

    match syn::parse2::<Lit>(meta_list.tokens.clone()) {
        Ok(Lit::Str(lit_str)) => Ok(lit_str.value()),
        _ => Err(syn::Error::new_spanned(
            &attr.meta,
            "#[error] expects a string literal, e.g. #[error(\"illegal opcode {opcode}\")]",
        )),
    }
}

/// Collects the argument names a format string interpolates.
///
/// `{{` escapes are skipped and any `:spec` suffix is dropped, so
/// `"{opcode:#04x} at {{offset}}"` yields only `opcode`.
fn referenced_args(format_str: &str) -> HashSet<String> {
    let mut names = HashSet::new();
    let mut chars = format_str.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '{' {
            continue;
        }
        if chars.peek() == Some(&'{') {
            chars.next();
            continue;
        }
        let inner: String = chars.by_ref().take_while(|c| *c != '}').collect();
        let name = inner.split(':').next().unwrap_or_default().trim();
        if !name.is_empty() {
            names.insert(name.to_string());
        }
    }

    names
}

/// Rewrites positional `{0}`, `{1:?}` into named `{f0}`, `{f1:?}`.
fn positional_to_named(format_str: &str, field_count: usize) -> String {
    let mut result = format_str.to_string();
    for i in (0..field_count).rev() {
        result = result
            .replace(&format!("{{{i}}}"), &format!("{{f{i}}}"))
            .replace(&format!("{{{i}:"), &format!("{{f{i}:"));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn referenced_args_skips_escapes_and_specs() {
        let names = referenced_args("{opcode:#04x} at {{offset}} ({line})");
        assert!(names.contains("opcode"));
        assert!(names.contains("line"));
        assert!(!names.contains("offset"));
        assert_eq!(names.len(), 2);
    }

    #[test]
    fn referenced_args_empty_message() {
        assert!(referenced_args("stack underflow").is_empty());
    }

    #[test]
    fn positional_to_named_rewrites_specs() {
        assert_eq!(positional_to_named("{0} and {1:?}", 2), "{f0} and {f1:?}");
    }

    #[test]
    fn positional_to_named_leaves_higher_indices() {
        assert_eq!(positional_to_named("{0} {3}", 1), "{f0} {3}");
    }
}
