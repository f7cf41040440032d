//! Typemaps: argument patterns that get richer marshalling.
//!
//! A typemap names a contiguous run of `(type, name)` arguments such as a
//! buffer pointer followed by its length. Binding a function with a typemap
//! checks that the run is actually in its signature, so header drift is
//! caught instead of silently producing a raw pointer argument.

use crate::binding::errors::BindError;
use crate::binding::func::CFunc;

/// One `(type, name)` entry of a typemap pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypemapArg {
    pub ty: String,
    pub name: String,
}

impl TypemapArg {
    pub fn new(ty: impl Into<String>, name: impl Into<String>) -> Self {
        TypemapArg {
            ty: ty.into(),
            name: name.into(),
        }
    }

    fn declaration(&self) -> String {
        if self.ty.ends_with('*') {
            format!("{}{}", self.ty, self.name)
        } else {
            format!("{} {}", self.ty, self.name)
        }
    }
}

/// A named argument pattern, emitted as `%<name>_activate(...)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Typemap {
    pub name: String,
    pub args: Vec<TypemapArg>,
}

impl Typemap {
    pub fn new(name: impl Into<String>, args: Vec<TypemapArg>) -> Self {
        Typemap {
            name: name.into(),
            args,
        }
    }

    /// Arguments as written inside the activate/deactivate directives.
    pub fn directive_args(&self) -> String {
        self.args
            .iter()
            .map(TypemapArg::declaration)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether the pattern appears as a contiguous run of `cfunc`'s arguments.
    pub fn matches(&self, cfunc: &CFunc) -> bool {
        if self.args.is_empty() || self.args.len() > cfunc.args.len() {
            return false;
        }
        cfunc.args.windows(self.args.len()).any(|window| {
            window
                .iter()
                .zip(&self.args)
                .all(|(arg, pattern)| arg.name == pattern.name && same_type(&arg.ctype.spelling, &pattern.ty))
        })
    }

    /// Fail unless the pattern appears in `cfunc`.
    pub fn check(&self, cfunc: &CFunc) -> Result<(), BindError> {
        if self.matches(cfunc) {
            return Ok(());
        }
        Err(BindError::TypemapMismatch {
            function: cfunc.name.clone(),
            typemap: self.name.clone(),
            pattern: self.directive_args(),
            signature: cfunc.signature(),
            location: cfunc.location.clone(),
        })
    }
}

/// Compare type spellings, ignoring whitespace differences around `*`.
fn same_type(a: &str, b: &str) -> bool {
    fn squash(s: &str) -> String {
        s.split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace(" *", "*")
    }
    squash(a) == squash(b)
}
