//! User-facing diagnostic messages.
//!
//! Every error names the offending declaration, what went wrong, and what
//! to change: the C header annotation or the binding script.

use std::fmt;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when a declaration cannot be found in a header.
    pub const INSPECT_HEADER: &str =
        "help: Run `swivel inspect <header>` to list the declarations swivel sees";

    /// Suggestion when clang cannot be located.
    pub const CLANG_NOT_FOUND: &str =
        "help: Install clang or pass its path with `--clang` / `[clang] path` in swivel.toml";

    /// Suggestion when clang fails on a header.
    pub const CLANG_FAILED: &str =
        "help: Check the include directories and `[clang] args` used to parse the header";

    /// Suggestion when the binding script is unknown.
    pub const UNKNOWN_SCRIPT: &str = "help: Run `swivel generate --list` to list built-in scripts";
}

/// Severity level for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// A diagnostic message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Severity level
    pub severity: Severity,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related source location (`file:line:column`)
    pub location: Option<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Error,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Create a new warning diagnostic.
    pub fn warning(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            severity: Severity::Warning,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a source location.
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let severity_str = if color {
            match self.severity {
                Severity::Error => "\x1b[1;31merror\x1b[0m",
                Severity::Warning => "\x1b[1;33mwarning\x1b[0m",
            }
        } else {
            match self.severity {
                Severity::Error => "error",
                Severity::Warning => "warning",
            }
        };

        output.push_str(&format!("{}: {}\n", severity_str, self.message));

        if let Some(ref location) = self.location {
            output.push_str(&format!("  --> {}\n", location));
        }

        for ctx in &self.context {
            output.push_str(&format!("  = {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("duplicate method `free` in `RzCore`")
            .with_location("rz_core.h:120:8")
            .with_context("first bound from rz_core_free")
            .with_suggestion("Pass an explicit rename for one of the functions");

        let output = diag.format(false);
        assert!(output.contains("error: duplicate method"));
        assert!(output.contains("--> rz_core.h:120:8"));
        assert!(output.contains("= first bound from rz_core_free"));
        assert!(output.contains("help: consider:"));
        assert!(output.contains("1. Pass an explicit rename"));
    }

    #[test]
    fn test_warning_has_no_help_block() {
        let output = Diagnostic::warning("stale field").format(false);
        assert_eq!(output, "warning: stale field\n");
    }
}
