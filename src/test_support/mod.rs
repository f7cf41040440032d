//! Test utilities for swivel unit tests.
//!
//! [`Fixture`] holds a piece of C source and builds [`Decl`]s whose
//! locations point into it, so annotation comments can be recovered the
//! same way they are from a real header.
//!
//! # Example
//!
//! ```rust,ignore
//! let fx = Fixture::new("struct s { RzList /*<int>*/ *items; };");
//! let field = fx.field("items", "RzList /*<int>*/ *items", list_ptr());
//! ```

use std::sync::Arc;

use crate::core::decl::{Decl, DeclKind, RawType, SourceLocation, TokenSource};
use crate::core::header::Header;
use crate::frontend::source::SourceMap;

/// File name used for fixture sources.
pub const FIXTURE_FILE: &str = "fixture.h";

/// A C source snippet with helpers for building located declarations.
pub struct Fixture {
    text: String,
    source: Arc<SourceMap>,
}

impl Fixture {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut map = SourceMap::new();
        map.insert(FIXTURE_FILE, text.clone());
        Fixture {
            text,
            source: Arc::new(map),
        }
    }

    pub fn source(&self) -> Arc<dyn TokenSource> {
        self.source.clone()
    }

    /// Location of the first occurrence of `needle`.
    pub fn loc(&self, needle: &str) -> SourceLocation {
        let offset = self
            .text
            .find(needle)
            .unwrap_or_else(|| panic!("`{}` not in fixture", needle));
        self.at(offset)
    }

    fn at(&self, offset: usize) -> SourceLocation {
        self.source
            .location(FIXTURE_FILE, offset)
            .unwrap_or_else(|| panic!("offset {} outside fixture", offset))
    }

    /// A declaration written as `snippet`.
    ///
    /// The type starts at the beginning of the snippet and the declared name
    /// is the last occurrence of `name` in it.
    pub fn decl(&self, kind: DeclKind, name: &str, snippet: &str) -> Decl {
        let start = self
            .text
            .find(snippet)
            .unwrap_or_else(|| panic!("`{}` not in fixture", snippet));
        let name_offset = snippet
            .rfind(name)
            .unwrap_or_else(|| panic!("`{}` not in `{}`", name, snippet));
        Decl::new(kind, name, self.at(start + name_offset)).with_type_start(self.at(start))
    }

    pub fn field(&self, name: &str, snippet: &str, ty: RawType) -> Decl {
        self.decl(DeclKind::Field, name, snippet).with_type(ty)
    }

    pub fn param(&self, name: &str, snippet: &str, ty: RawType) -> Decl {
        self.decl(DeclKind::Param, name, snippet).with_type(ty)
    }

    /// A function declaration; its prototype is built from the parameters.
    pub fn function(&self, name: &str, snippet: &str, result: RawType, params: Vec<Decl>) -> Decl {
        let args = params.iter().filter_map(|p| p.ty.clone()).collect();
        let mut decl = self
            .decl(DeclKind::Function, name, snippet)
            .with_type(RawType::function(result, args, false));
        for param in params {
            decl = decl.with_child(param);
        }
        decl
    }

    /// A header over this fixture's source.
    pub fn header(&self, decls: Vec<Decl>) -> Header {
        Header::from_decls(FIXTURE_FILE, self.source(), decls.into_iter().map(Arc::new))
            .expect("fixture declarations are unique")
    }
}

/// `struct name`.
pub fn record(name: &str) -> RawType {
    RawType::record(name)
}

/// `Typedef *` where `Typedef` names `struct tag`.
pub fn typedef_ptr(typedef: &str, tag: &str) -> RawType {
    RawType::pointer(RawType::typedef(typedef, RawType::record(tag), None))
}

/// `tests/fixtures`: headers under `include/` and their clang dumps under
/// `dumps/`.
pub fn fixtures_dir() -> std::path::PathBuf {
    std::path::Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures")
}
