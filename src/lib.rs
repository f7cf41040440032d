//! swivel - a binding-description compiler for C libraries
//!
//! Binding scripts claim declarations from parsed C headers and register
//! them as generics, classes, directors and enums; the collected bindings
//! are emitted as one SWIG interface file.

pub mod binding;
pub mod core;
pub mod emit;
pub mod frontend;
pub mod ops;
pub mod scripts;
pub mod util;

/// Test utilities for swivel unit tests.
///
/// This module is only available when compiling with `--cfg test` or
/// running tests. It provides located declaration fixtures and the paths of
/// the clang dump fixtures.
#[cfg(test)]
pub mod test_support;

pub use binding::{BindError, BindOptions, BindingContext};
pub use core::{Decl, DeclKind, Header, RawType};
pub use ops::Session;
