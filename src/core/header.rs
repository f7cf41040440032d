//! Per-header declaration pool.
//!
//! Every declaration a binding claims is consumed from its header so two
//! entities can never bind the same function. Declarations are kept in
//! source order, which prefix scans rely on.

use std::collections::HashMap;
use std::sync::Arc;

use crate::binding::errors::BindError;
use crate::core::decl::{Decl, DeclKind, TokenSource};

#[derive(Debug)]
struct Entry {
    decl: Arc<Decl>,
    consumed: bool,
}

/// The declarations of one header, not yet claimed by a binding.
pub struct Header {
    name: String,
    source: Arc<dyn TokenSource>,
    entries: Vec<Entry>,
    index: HashMap<(DeclKind, String), usize>,
}

impl Header {
    /// Create an empty header.
    pub fn new(name: impl Into<String>, source: Arc<dyn TokenSource>) -> Self {
        Header {
            name: name.into(),
            source,
            entries: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Create a header from declarations in source order.
    pub fn from_decls(
        name: impl Into<String>,
        source: Arc<dyn TokenSource>,
        decls: impl IntoIterator<Item = Arc<Decl>>,
    ) -> Result<Self, BindError> {
        let mut header = Header::new(name, source);
        for decl in decls {
            header.insert(decl)?;
        }
        Ok(header)
    }

    /// Include name of the header, e.g. `rz_core.h`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Raw text of the parsed sources.
    pub fn source(&self) -> &dyn TokenSource {
        self.source.as_ref()
    }

    /// Add a declaration to the pool.
    ///
    /// Anonymous declarations are skipped. A struct or union definition
    /// replaces an earlier forward declaration, and a forward declaration
    /// after the definition is dropped; any other repeat is an error.
    pub fn insert(&mut self, decl: Arc<Decl>) -> Result<(), BindError> {
        if decl.is_anonymous() {
            return Ok(());
        }

        let key = (decl.kind, decl.spelling.clone());
        match self.index.get(&key) {
            Some(&i) => {
                let prev = &self.entries[i].decl;
                if decl.kind.is_record() && prev.is_forward_declaration() {
                    self.entries[i].decl = decl;
                } else if decl.kind.is_record() && decl.is_forward_declaration() {
                    tracing::trace!("Skipping forward declaration of {}", decl.spelling);
                } else {
                    return Err(BindError::Redeclaration {
                        kind: decl.kind.to_string(),
                        name: decl.spelling.clone(),
                        location: decl.location.clone(),
                    });
                }
            }
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(Entry {
                    decl,
                    consumed: false,
                });
            }
        }
        Ok(())
    }

    /// Look up an unclaimed declaration without consuming it.
    pub fn get(&self, kind: DeclKind, name: &str) -> Option<&Arc<Decl>> {
        let &i = self.index.get(&(kind, name.to_string()))?;
        let entry = &self.entries[i];
        (!entry.consumed).then_some(&entry.decl)
    }

    /// Claim a declaration.
    pub fn pop(&mut self, kind: DeclKind, name: &str) -> Result<Arc<Decl>, BindError> {
        match self.index.get(&(kind, name.to_string())) {
            Some(&i) if !self.entries[i].consumed => {
                self.entries[i].consumed = true;
                Ok(Arc::clone(&self.entries[i].decl))
            }
            found => Err(BindError::NotFound {
                kind: kind.to_string(),
                name: name.to_string(),
                header: self.name.clone(),
                consumed: found.is_some(),
            }),
        }
    }

    /// Claim a declaration by name, whatever its kind.
    ///
    /// Every kind declared under `name` is consumed, so `typedef struct Foo
    /// Foo` goes in one call.
    pub fn ignore(&mut self, name: &str) -> Result<(), BindError> {
        let mut found = false;
        for entry in self.entries.iter_mut() {
            if entry.decl.spelling == name && !entry.consumed {
                entry.consumed = true;
                found = true;
            }
        }
        if found {
            Ok(())
        } else {
            Err(BindError::NotFound {
                kind: "declaration".to_string(),
                name: name.to_string(),
                header: self.name.clone(),
                consumed: self.entries.iter().any(|e| e.decl.spelling == name),
            })
        }
    }

    /// Claim every unclaimed declaration starting with `prefix`.
    ///
    /// Returns how many were claimed.
    pub fn ignore_prefix(&mut self, prefix: &str) -> usize {
        let mut count = 0;
        for entry in self.entries.iter_mut() {
            if !entry.consumed && entry.decl.spelling.starts_with(prefix) {
                entry.consumed = true;
                count += 1;
            }
        }
        count
    }

    /// Unclaimed declarations of one kind, in source order.
    pub fn available(&self, kind: DeclKind) -> impl Iterator<Item = &Arc<Decl>> {
        self.entries
            .iter()
            .filter(move |e| !e.consumed && e.decl.kind == kind)
            .map(|e| &e.decl)
    }

    /// Names of unclaimed functions starting with `prefix`, in source order.
    pub fn functions_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.available(DeclKind::Function)
            .filter(|d| d.spelling.starts_with(prefix))
            .map(|d| d.spelling.clone())
            .collect()
    }

    /// Every declaration that no binding claimed.
    pub fn unclaimed(&self) -> impl Iterator<Item = &Arc<Decl>> {
        self.entries.iter().filter(|e| !e.consumed).map(|e| &e.decl)
    }

    /// Every declaration, claimed or not, in source order.
    pub fn decls(&self) -> impl Iterator<Item = &Arc<Decl>> {
        self.entries.iter().map(|e| &e.decl)
    }
}

impl std::fmt::Debug for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Header")
            .field("name", &self.name)
            .field("entries", &self.entries.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decl::SourceLocation;
    use crate::test_support::Fixture;

    fn decl(kind: DeclKind, name: &str) -> Arc<Decl> {
        Arc::new(Decl::new(kind, name, SourceLocation::new("a.h", 1, 1, 0)))
    }

    fn header(decls: Vec<Arc<Decl>>) -> Header {
        Header::from_decls("a.h", Fixture::new("").source(), decls).unwrap()
    }

    #[test]
    fn test_pop_consumes() {
        let mut h = header(vec![decl(DeclKind::Function, "rz_list_new")]);

        assert!(h.pop(DeclKind::Function, "rz_list_new").is_ok());
        let err = h.pop(DeclKind::Function, "rz_list_new").unwrap_err();
        assert!(matches!(err, BindError::NotFound { consumed: true, .. }));

        let err = h.pop(DeclKind::Function, "rz_list_free").unwrap_err();
        assert!(matches!(err, BindError::NotFound { consumed: false, .. }));
    }

    #[test]
    fn test_forward_declaration_replaced() {
        let loc = SourceLocation::new("a.h", 9, 8, 90);
        let def = Arc::new(
            Decl::new(DeclKind::Struct, "rz_list_t", loc.clone())
                .with_child(Decl::new(DeclKind::Field, "head", loc)),
        );
        let mut h = header(vec![
            decl(DeclKind::Struct, "rz_list_t"),
            def,
            decl(DeclKind::Struct, "rz_list_t"),
        ]);

        let found = h.pop(DeclKind::Struct, "rz_list_t").unwrap();
        assert_eq!(found.children.len(), 1);
    }

    #[test]
    fn test_redeclaration_is_error() {
        let result = Header::from_decls(
            "a.h",
            Fixture::new("").source(),
            vec![
                decl(DeclKind::Function, "rz_list_new"),
                decl(DeclKind::Function, "rz_list_new"),
            ],
        );
        assert!(matches!(result, Err(BindError::Redeclaration { .. })));
    }

    #[test]
    fn test_same_name_different_kinds() {
        let mut h = header(vec![
            decl(DeclKind::Struct, "RzFoo"),
            decl(DeclKind::Typedef, "RzFoo"),
        ]);
        h.ignore("RzFoo").unwrap();
        assert_eq!(h.unclaimed().count(), 0);
        assert!(h.ignore("RzFoo").is_err());
    }

    #[test]
    fn test_ignore_prefix_and_order() {
        let mut h = header(vec![
            decl(DeclKind::Function, "rz_list_new"),
            decl(DeclKind::Function, "rz_core_new"),
            decl(DeclKind::Function, "rz_list_free"),
            decl(DeclKind::Function, "rz_list_append"),
        ]);

        assert_eq!(
            h.functions_with_prefix("rz_list_"),
            vec!["rz_list_new", "rz_list_free", "rz_list_append"]
        );
        assert_eq!(h.ignore_prefix("rz_list_"), 3);
        assert_eq!(h.functions_with_prefix("rz_"), vec!["rz_core_new"]);
    }
}
