//! Implementation of `swivel inspect`.
//!
//! Lists what the front end sees in a header, to help write binding scripts.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::Result;
use serde::Serialize;

use crate::core::decl::{Decl, DeclKind};
use crate::frontend::{self, AstProvider};

/// One top-level declaration.
#[derive(Debug, Clone, Serialize)]
pub struct DeclSummary {
    pub kind: String,
    pub name: String,
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ty: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Fields, parameters or enum constants
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
}

impl DeclSummary {
    fn from_decl(decl: &Decl) -> Self {
        DeclSummary {
            kind: decl.kind.to_string(),
            name: display_name(decl),
            line: decl.location.line,
            ty: decl.ty.as_ref().map(|t| t.spelling.clone()),
            annotations: decl.annotations.iter().cloned().collect(),
            value: decl.value.clone(),
            members: decl.children.iter().map(|c| display_name(c)).collect(),
        }
    }
}

fn display_name(decl: &Decl) -> String {
    if decl.is_anonymous() {
        format!("(anonymous {})", decl.kind)
    } else {
        decl.spelling.clone()
    }
}

/// Options for the inspect command.
#[derive(Debug, Clone, Default)]
pub struct InspectOptions {
    /// Only declarations of these kinds (empty = all)
    pub kinds: Vec<DeclKind>,

    /// Only declarations whose name starts with this
    pub prefix: Option<String>,
}

/// Parse `header` and summarize its declarations in source order.
pub fn inspect(
    provider: &dyn AstProvider,
    header: &Path,
    opts: &InspectOptions,
) -> Result<Vec<DeclSummary>> {
    let unit = frontend::parse_header(provider, header)?;
    Ok(unit
        .decls()
        .iter()
        .filter(|d| opts.kinds.is_empty() || opts.kinds.contains(&d.kind))
        .filter(|d| {
            opts.prefix
                .as_deref()
                .map_or(true, |p| d.spelling.starts_with(p))
        })
        .map(|d| DeclSummary::from_decl(d))
        .collect())
}

/// Format summaries for the terminal.
pub fn format_summaries(summaries: &[DeclSummary]) -> String {
    let mut out = String::new();
    let width = summaries.iter().map(|s| s.kind.len()).max().unwrap_or(0);

    for s in summaries {
        let _ = write!(out, "{:>5}  {:<width$}  {}", s.line, s.kind, s.name, width = width);
        if let Some(ty) = &s.ty {
            let _ = write!(out, ": {}", ty);
        }
        if let Some(value) = &s.value {
            let _ = write!(out, " = {}", value);
        }
        for annotation in &s.annotations {
            let _ = write!(out, " [{}]", annotation);
        }
        out.push('\n');
        if !s.members.is_empty() {
            let _ = writeln!(out, "{:>5}  {:<width$}    {}", "", "", s.members.join(", "), width = width);
        }
    }
    out
}
