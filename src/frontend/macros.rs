//! Object-like `#define` constants from header text.
//!
//! The preprocessor is gone by the time clang dumps its AST, so constants
//! are scanned from the header source directly.

use anyhow::Result;
use regex::Regex;

/// One `#define NAME VALUE` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MacroDef {
    pub name: String,
    pub value: String,

    /// Offset of the `#`
    pub start: usize,

    /// Offset of the name
    pub name_offset: usize,
}

/// Scan `text` for object-like macros with a single-line value.
///
/// Function-like macros, macros continued with a backslash and bare
/// `#define GUARD` lines are skipped. Trailing comments are stripped from
/// the value.
pub fn scan(text: &str) -> Result<Vec<MacroDef>> {
    let re = Regex::new(r"(?m)^[ \t]*(#)[ \t]*define[ \t]+(\w+)([ \t]+)(.+)$")?;

    let mut defs = Vec::new();
    for cap in re.captures_iter(text) {
        let (Some(hash), Some(name), Some(value)) = (cap.get(1), cap.get(2), cap.get(4)) else {
            continue;
        };

        let value = value.as_str().trim_end_matches('\r');
        if value.trim_end().ends_with('\\') {
            tracing::trace!("Skipping multi-line macro {}", name.as_str());
            continue;
        }

        let value = strip_comment(value).trim();
        if value.is_empty() {
            continue;
        }

        defs.push(MacroDef {
            name: name.as_str().to_string(),
            value: value.to_string(),
            start: hash.start(),
            name_offset: name.start(),
        });
    }
    Ok(defs)
}

/// Cut a trailing `//` or `/* */` comment, leaving string literals alone.
fn strip_comment(value: &str) -> &str {
    let mut in_string = false;
    let mut escaped = false;
    for (i, c) in value.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '/' if !in_string => {
                let rest = &value[i..];
                if rest.starts_with("//") || rest.starts_with("/*") {
                    return &value[..i];
                }
            }
            _ => {}
        }
    }
    value
}
