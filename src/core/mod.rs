//! Core data structures for swivel.
//!
//! This module contains the foundational types used throughout swivel:
//! - The declaration tree produced by a front end
//! - The classified C type model
//! - Per-header declaration pools

pub mod ctype;
pub mod decl;
pub mod header;

pub use ctype::CType;
pub use decl::{Decl, DeclKind, RawType, SourceLocation, TokenSource};
pub use header::Header;
