//! The C front end.
//!
//! Headers are dumped by clang as JSON and turned into the declaration tree
//! that binders consume:
//! - [`clang`]: producing the dump, or reading a pre-dumped one
//! - `json`: walking the dump into [`Decl`](crate::core::decl::Decl)s
//! - [`qualtype`]: parsing clang's type spellings
//! - [`source`]: header text behind every source location

pub mod clang;
mod json;
mod macros;
mod params;
pub mod qualtype;
pub mod source;

use std::path::Path;

use anyhow::{Context, Result};

pub use clang::{AstProvider, ClangProvider, DumpDir};
pub use json::TranslationUnit;
pub use source::SourceMap;

/// Dump and load one header.
pub fn parse_header(provider: &dyn AstProvider, header: &Path) -> Result<TranslationUnit> {
    let json = provider.dump(header)?;
    TranslationUnit::from_json(&json, header)
        .with_context(|| format!("failed to load AST of {}", header.display()))
}
