//! High-level operations.
//!
//! This module contains the implementation of swivel commands.

pub mod generate;
pub mod inspect;

pub use generate::{generate, locate_header, GenerateOptions, GenerateResult, Session};
pub use inspect::{format_summaries, inspect, DeclSummary, InspectOptions};
