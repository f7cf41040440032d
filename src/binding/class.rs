//! Classes: C structs exposed with fields and bound functions.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::binding::errors::BindError;
use crate::binding::func::{BindingKind, CFunc, Func, FuncOptions};
use crate::binding::generic::GenericRegistry;
use crate::binding::specialize::Specializer;
use crate::core::ctype::{wrap_decl, CType};
use crate::core::decl::{Decl, DeclKind, SourceLocation};
use crate::core::header::Header;

/// What to do with ignore/rename names that match no field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StalePolicy {
    /// Log a warning and continue
    #[default]
    Warn,
    /// Fail the binding
    Deny,
}

/// How to bind a class.
#[derive(Debug, Clone, Default)]
pub struct ClassSpec {
    /// Typedef name, used as the class name
    pub typedef: String,
    /// Struct tag, when the typedef should not be looked up
    pub struct_tag: Option<String>,
    pub ignore_fields: BTreeSet<String>,
    pub rename_fields: BTreeMap<String, String>,
}

impl ClassSpec {
    pub fn new(typedef: impl Into<String>) -> Self {
        ClassSpec {
            typedef: typedef.into(),
            ..Default::default()
        }
    }

    /// Bind `struct tag` directly instead of resolving the typedef.
    pub fn with_struct(mut self, tag: impl Into<String>) -> Self {
        self.struct_tag = Some(tag.into());
        self
    }

    pub fn ignore_field(mut self, name: impl Into<String>) -> Self {
        self.ignore_fields.insert(name.into());
        self
    }

    pub fn rename_field(mut self, name: impl Into<String>, rename: impl Into<String>) -> Self {
        self.rename_fields.insert(name.into(), rename.into());
        self
    }
}

/// A bound struct field.
#[derive(Debug, Clone)]
pub struct Field {
    pub name: String,
    pub rename: Option<String>,
    pub ctype: CType,
    pub location: SourceLocation,
}

/// One storage slot of a struct.
#[derive(Debug, Clone)]
pub enum FieldSlot {
    Field(Field),
    /// Members of an anonymous union
    Union(Vec<Field>),
}

#[derive(Debug)]
pub struct Class {
    pub name: String,
    pub struct_name: String,
    pub fields: Vec<FieldSlot>,
    /// Static functions, by bound name
    pub funcs: Vec<(String, Func)>,
    /// Methods, by bound name
    pub methods: Vec<(String, Func)>,
    pub constructor: Option<Func>,
    pub destructor: Option<Func>,
}

impl Class {
    /// Bind the struct named by `spec` and its fields.
    ///
    /// Stale ignore/rename names are either returned as warnings or, under
    /// [`StalePolicy::Deny`], turned into an error.
    pub(crate) fn bind(
        generics: &mut GenericRegistry,
        header: &mut Header,
        spec: ClassSpec,
        stale: StalePolicy,
    ) -> Result<(Self, Vec<String>), BindError> {
        let record = match &spec.struct_tag {
            Some(tag) => header.pop(DeclKind::Struct, tag)?,
            None => {
                let typedef = header.pop(DeclKind::Typedef, &spec.typedef)?;
                let tag = match typedef.ty.as_ref().and_then(|t| t.record_name()) {
                    Some(tag) => tag.to_string(),
                    None => {
                        return Err(BindError::WrongUnderlying {
                            name: spec.typedef.clone(),
                            expected: "a struct",
                            found: typedef
                                .ty
                                .as_ref()
                                .map(|t| t.spelling.clone())
                                .unwrap_or_default(),
                            location: typedef.location.clone(),
                        })
                    }
                };
                header.pop(DeclKind::Struct, &tag)?
            }
        };

        let struct_name = if record.spelling.is_empty() {
            spec.typedef.clone()
        } else {
            record.spelling.clone()
        };

        let mut walker = FieldWalker {
            entity: &spec.typedef,
            specializer: Specializer::new(generics, header.source()),
            ignore: spec.ignore_fields,
            rename: spec.rename_fields,
            seen: HashSet::new(),
        };

        let mut fields = Vec::new();
        for child in &record.children {
            match child.kind {
                DeclKind::Field => {
                    if let Some(field) = walker.field(child)? {
                        fields.push(FieldSlot::Field(field));
                    }
                }
                DeclKind::Union if child.is_anonymous() => {
                    let mut members = Vec::new();
                    for member in &child.children {
                        match member.kind {
                            DeclKind::Field => {
                                if let Some(field) = walker.field(member)? {
                                    members.push(field);
                                }
                            }
                            DeclKind::Struct | DeclKind::Union => {
                                tracing::debug!(
                                    "{}: skipping nested record in union of {}",
                                    member.location,
                                    spec.typedef
                                );
                            }
                            _ => return Err(unexpected_child(member, &spec.typedef)),
                        }
                    }
                    if !members.is_empty() {
                        fields.push(FieldSlot::Union(members));
                    }
                }
                DeclKind::Struct | DeclKind::Union => {
                    tracing::debug!(
                        "{}: skipping nested {} {} of {}",
                        child.location,
                        child.kind,
                        child.spelling,
                        spec.typedef
                    );
                }
                _ => return Err(unexpected_child(child, &spec.typedef)),
            }
        }

        let mut warnings = Vec::new();
        for (action, names) in [
            ("ignored", walker.ignore.into_iter().collect::<Vec<_>>()),
            ("renamed", walker.rename.into_keys().collect::<Vec<_>>()),
        ] {
            if names.is_empty() {
                continue;
            }
            let err = BindError::StaleField {
                entity: spec.typedef.clone(),
                action,
                fields: names,
            };
            match stale {
                StalePolicy::Deny => return Err(err),
                StalePolicy::Warn => {
                    tracing::debug!("{}", err);
                    warnings.push(err.to_string());
                }
            }
        }

        tracing::debug!("Bound class {} ({} slots)", spec.typedef, fields.len());
        Ok((
            Class {
                name: spec.typedef,
                struct_name,
                fields,
                funcs: Vec::new(),
                methods: Vec::new(),
                constructor: None,
                destructor: None,
            },
            warnings,
        ))
    }

    /// Every field, union members included, in declaration order.
    pub fn all_fields(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().flat_map(|slot| match slot {
            FieldSlot::Field(field) => std::slice::from_ref(field).iter(),
            FieldSlot::Union(members) => members.iter(),
        })
    }

    /// Whether an `%extend` block is needed.
    pub fn has_functions(&self) -> bool {
        self.constructor.is_some()
            || self.destructor.is_some()
            || !self.funcs.is_empty()
            || !self.methods.is_empty()
    }

    pub(crate) fn add_constructor(
        &mut self,
        generics: &mut GenericRegistry,
        header: &mut Header,
        name: &str,
    ) -> Result<(), BindError> {
        let decl = header.pop(DeclKind::Function, name)?;
        if self.constructor.is_some() {
            return Err(self.duplicate("constructor", &decl));
        }
        let func = Func::bind(generics, header.source(), decl, BindingKind::Constructor, FuncOptions::new())?;
        self.constructor = Some(func);
        Ok(())
    }

    pub(crate) fn add_destructor(
        &mut self,
        generics: &mut GenericRegistry,
        header: &mut Header,
        name: &str,
    ) -> Result<(), BindError> {
        let decl = header.pop(DeclKind::Function, name)?;
        if self.destructor.is_some() {
            return Err(self.duplicate("destructor", &decl));
        }
        let func = Func::bind(generics, header.source(), decl, BindingKind::Destructor, FuncOptions::new())?;
        self.destructor = Some(func);
        Ok(())
    }

    pub(crate) fn add_method(
        &mut self,
        generics: &mut GenericRegistry,
        header: &mut Header,
        name: &str,
        rename: &str,
        options: FuncOptions,
    ) -> Result<(), BindError> {
        let decl = header.pop(DeclKind::Function, name)?;
        let func = Func::bind(generics, header.source(), decl, BindingKind::Method, options)?;
        self.insert(BindingKind::Method, rename.to_string(), func)
    }

    pub(crate) fn add_func(
        &mut self,
        generics: &mut GenericRegistry,
        header: &mut Header,
        name: &str,
        rename: &str,
        options: FuncOptions,
    ) -> Result<(), BindError> {
        let decl = header.pop(DeclKind::Function, name)?;
        let func = Func::bind(generics, header.source(), decl, BindingKind::Static, options)?;
        self.insert(BindingKind::Static, rename.to_string(), func)
    }

    /// Bind every visible `prefix*` function taking this struct as first
    /// argument as a method named after the rest of its name.
    ///
    /// Returns how many were bound.
    pub(crate) fn add_prefixed_methods(
        &mut self,
        generics: &mut GenericRegistry,
        header: &mut Header,
        prefix: &str,
        visibility: Option<&str>,
    ) -> Result<usize, BindError> {
        let mut count = 0;
        for name in header.functions_with_prefix(prefix) {
            let Some(decl) = header.get(DeclKind::Function, &name).cloned() else {
                continue;
            };
            if !is_visible(&decl, visibility) {
                continue;
            }
            if !CFunc::from_decl(Arc::clone(&decl))?.takes_receiver(&self.struct_name) {
                continue;
            }

            let decl = header.pop(DeclKind::Function, &name)?;
            let func = Func::bind(generics, header.source(), decl, BindingKind::Method, FuncOptions::new())?;
            self.insert(BindingKind::Method, name[prefix.len()..].to_string(), func)?;
            count += 1;
        }
        Ok(count)
    }

    /// Bind every visible `prefix*` function as a static function.
    pub(crate) fn add_prefixed_funcs(
        &mut self,
        generics: &mut GenericRegistry,
        header: &mut Header,
        prefix: &str,
        visibility: Option<&str>,
    ) -> Result<usize, BindError> {
        let mut count = 0;
        for name in header.functions_with_prefix(prefix) {
            let visible = header
                .get(DeclKind::Function, &name)
                .is_some_and(|decl| is_visible(decl, visibility));
            if !visible {
                continue;
            }

            let decl = header.pop(DeclKind::Function, &name)?;
            let func = Func::bind(generics, header.source(), decl, BindingKind::Static, FuncOptions::new())?;
            self.insert(BindingKind::Static, name[prefix.len()..].to_string(), func)?;
            count += 1;
        }
        Ok(count)
    }

    fn insert(&mut self, kind: BindingKind, name: String, func: Func) -> Result<(), BindError> {
        let table = match kind {
            BindingKind::Static => &mut self.funcs,
            _ => &mut self.methods,
        };
        if table.iter().any(|(n, _)| *n == name) {
            return Err(BindError::DuplicateMethod {
                entity: self.name.clone(),
                method: name,
                location: func.cfunc.location.clone(),
            });
        }
        table.push((name, func));
        Ok(())
    }

    fn duplicate(&self, what: &str, decl: &Decl) -> BindError {
        BindError::DuplicateMethod {
            entity: self.name.clone(),
            method: what.to_string(),
            location: decl.location.clone(),
        }
    }
}

fn is_visible(decl: &Decl, visibility: Option<&str>) -> bool {
    visibility.map_or(true, |marker| decl.has_annotation(marker))
}

fn unexpected_child(child: &Decl, entity: &str) -> BindError {
    BindError::UnexpectedDecl {
        kind: child.kind.to_string(),
        name: child.spelling.clone(),
        context: format!("struct of `{}`", entity),
        location: child.location.clone(),
    }
}

struct FieldWalker<'a> {
    entity: &'a str,
    specializer: Specializer<'a>,
    ignore: BTreeSet<String>,
    rename: BTreeMap<String, String>,
    seen: HashSet<String>,
}

impl FieldWalker<'_> {
    fn field(&mut self, decl: &Arc<Decl>) -> Result<Option<Field>, BindError> {
        let name = decl.spelling.clone();
        if self.ignore.remove(&name) {
            return Ok(None);
        }
        if !self.seen.insert(name.clone()) {
            return Err(BindError::DuplicateField {
                entity: self.entity.to_string(),
                field: name,
                location: decl.location.clone(),
            });
        }

        let rename = self.rename.remove(&name);
        let mut ctype = wrap_decl(decl)?;
        self.specializer.visit_decl(decl, &mut ctype)?;
        Ok(Some(Field {
            name,
            rename,
            ctype,
            location: decl.location.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::decl::{PrimitiveKind, RawType};
    use crate::test_support::{typedef_ptr, Fixture};

    const SOURCE: &str = "\
typedef struct rz_io_t {
\tint fd;
\tut64 off;
\tunion {
\t\tvoid *ptr;
\t\tut64 num;
\t};
\tstruct rz_io_inner_t { int x; } inner;
} RzIO;
RZ_API RzIO *rz_io_new(void);
RZ_API void rz_io_free(RzIO *io);
RZ_API int rz_io_fd_open(RzIO *io, const char *uri);
RZ_API int rz_io_fd_close(RzIO *io, int fd);
RZ_API bool rz_io_is_valid_offset(ut64 offset);
int rz_io_fd_private(RzIO *io);
";

    fn io_header(fx: &Fixture) -> Header {
        let ut64 = RawType::typedef("ut64", RawType::builtin(PrimitiveKind::ULongLong), None);
        let union = fx
            .decl(DeclKind::Union, "", "union {")
            .with_child(fx.field("ptr", "void *ptr", RawType::pointer(RawType::void())))
            .with_child(fx.field("num", "ut64 num", ut64.clone()));
        let inner = fx
            .decl(DeclKind::Struct, "rz_io_inner_t", "struct rz_io_inner_t")
            .with_child(fx.field("x", "int x", RawType::int()));

        let io = || typedef_ptr("RzIO", "rz_io_t");
        let io_param = || fx.param("io", "RzIO *io", io());

        fx.header(vec![
            fx.decl(DeclKind::Struct, "rz_io_t", "struct rz_io_t")
                .with_child(fx.field("fd", "int fd", RawType::int()))
                .with_child(fx.field("off", "ut64 off", ut64.clone()))
                .with_child(union)
                .with_child(inner)
                .with_child(fx.field("inner", "} inner", RawType::record("rz_io_inner_t"))),
            fx.decl(DeclKind::Typedef, "RzIO", "} RzIO;")
                .with_type(RawType::record("rz_io_t")),
            fx.function("rz_io_new", "RZ_API RzIO *rz_io_new", io(), vec![])
                .with_annotation("RZ_API"),
            fx.function("rz_io_free", "RZ_API void rz_io_free", RawType::void(), vec![io_param()])
                .with_annotation("RZ_API"),
            fx.function("rz_io_fd_open", "RZ_API int rz_io_fd_open", RawType::int(), vec![
                io_param(),
                fx.param("uri", "const char *uri", RawType::pointer(RawType::builtin(PrimitiveKind::Char))),
            ])
            .with_annotation("RZ_API"),
            fx.function("rz_io_fd_close", "RZ_API int rz_io_fd_close", RawType::int(), vec![
                io_param(),
                fx.param("fd", "int fd)", RawType::int()),
            ])
            .with_annotation("RZ_API"),
            fx.function(
                "rz_io_is_valid_offset",
                "RZ_API bool rz_io_is_valid_offset",
                RawType::builtin(PrimitiveKind::Bool),
                vec![fx.param("offset", "ut64 offset", ut64)],
            )
            .with_annotation("RZ_API"),
            fx.function("rz_io_fd_private", "int rz_io_fd_private", RawType::int(), vec![io_param()]),
        ])
    }

    #[test]
    fn test_fields_and_union_slot() {
        let fx = Fixture::new(SOURCE);
        let mut header = io_header(&fx);
        let mut generics = GenericRegistry::new();

        let (class, warnings) = Class::bind(
            &mut generics,
            &mut header,
            ClassSpec::new("RzIO").rename_field("off", "offset"),
            StalePolicy::Deny,
        )
        .unwrap();

        assert!(warnings.is_empty());
        assert_eq!(class.struct_name, "rz_io_t");
        assert_eq!(class.fields.len(), 4);
        assert!(matches!(&class.fields[2], FieldSlot::Union(m) if m.len() == 2));

        let names: Vec<&str> = class.all_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["fd", "off", "ptr", "num", "inner"]);
        assert_eq!(
            class.all_fields().nth(1).unwrap().rename.as_deref(),
            Some("offset")
        );
    }

    #[test]
    fn test_ignore_field() {
        let fx = Fixture::new(SOURCE);
        let mut header = io_header(&fx);
        let mut generics = GenericRegistry::new();

        let (class, _) = Class::bind(
            &mut generics,
            &mut header,
            ClassSpec::new("RzIO").ignore_field("fd").ignore_field("num"),
            StalePolicy::Deny,
        )
        .unwrap();

        let names: Vec<&str> = class.all_fields().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["off", "ptr", "inner"]);
    }

    #[test]
    fn test_stale_ignore_field() {
        let fx = Fixture::new(SOURCE);
        let mut generics = GenericRegistry::new();

        let mut header = io_header(&fx);
        let err = Class::bind(
            &mut generics,
            &mut header,
            ClassSpec::new("RzIO").ignore_field("gone"),
            StalePolicy::Deny,
        )
        .unwrap_err();
        assert!(matches!(err, BindError::StaleField { action: "ignored", .. }));

        let mut header = io_header(&fx);
        let (class, warnings) = Class::bind(
            &mut generics,
            &mut header,
            ClassSpec::new("RzIO").rename_field("gone", "x"),
            StalePolicy::Warn,
        )
        .unwrap();
        assert_eq!(class.all_fields().count(), 5);
        assert_eq!(warnings, vec!["stale renamed field(s) in `RzIO`: gone"]);
    }

    #[test]
    fn test_prefixed_methods_and_funcs() {
        let fx = Fixture::new(SOURCE);
        let mut header = io_header(&fx);
        let mut generics = GenericRegistry::new();

        let (mut class, _) = Class::bind(&mut generics, &mut header, ClassSpec::new("RzIO"), StalePolicy::Warn).unwrap();
        class.add_constructor(&mut generics, &mut header, "rz_io_new").unwrap();
        class.add_destructor(&mut generics, &mut header, "rz_io_free").unwrap();

        let methods = class
            .add_prefixed_methods(&mut generics, &mut header, "rz_io_", Some("RZ_API"))
            .unwrap();
        assert_eq!(methods, 2);
        let funcs = class
            .add_prefixed_funcs(&mut generics, &mut header, "rz_io_", Some("RZ_API"))
            .unwrap();
        assert_eq!(funcs, 1);

        let method_names: Vec<&str> = class.methods.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(method_names, vec!["fd_open", "fd_close"]);
        assert_eq!(class.funcs[0].0, "is_valid_offset");
        assert!(header.get(DeclKind::Function, "rz_io_fd_private").is_some());
    }

    #[test]
    fn test_claimed_function_cannot_be_bound_twice() {
        let fx = Fixture::new(SOURCE);
        let mut header = io_header(&fx);
        let mut generics = GenericRegistry::new();

        let (mut class, _) = Class::bind(&mut generics, &mut header, ClassSpec::new("RzIO"), StalePolicy::Warn).unwrap();
        class
            .add_method(&mut generics, &mut header, "rz_io_fd_open", "open", FuncOptions::new())
            .unwrap();
        let err = class
            .add_method(&mut generics, &mut header, "rz_io_fd_open", "open2", FuncOptions::new())
            .unwrap_err();
        assert!(matches!(err, BindError::NotFound { consumed: true, .. }));

        let err = class
            .add_method(&mut generics, &mut header, "rz_io_fd_close", "open", FuncOptions::new())
            .unwrap_err();
        assert!(matches!(err, BindError::DuplicateMethod { .. }));
    }

    #[test]
    fn test_duplicate_field_in_union() {
        let fx = Fixture::new(
            "typedef struct rz_io_desc_t {\n\tint fd;\n\tunion {\n\t\tut64 fd;\n\t\tvoid *ptr;\n\t};\n} RzIODesc;",
        );
        let ut64 = RawType::typedef("ut64", RawType::builtin(PrimitiveKind::ULongLong), None);
        let union = fx
            .decl(DeclKind::Union, "", "union {")
            .with_child(fx.field("fd", "ut64 fd", ut64))
            .with_child(fx.field("ptr", "void *ptr", RawType::pointer(RawType::void())));
        let mut header = fx.header(vec![
            fx.decl(DeclKind::Struct, "rz_io_desc_t", "struct rz_io_desc_t")
                .with_child(fx.field("fd", "int fd", RawType::int()))
                .with_child(union),
            fx.decl(DeclKind::Typedef, "RzIODesc", "} RzIODesc")
                .with_type(RawType::record("rz_io_desc_t")),
        ]);
        let mut generics = GenericRegistry::new();

        let err = Class::bind(&mut generics, &mut header, ClassSpec::new("RzIODesc"), StalePolicy::Warn)
            .unwrap_err();
        match err {
            BindError::DuplicateField {
                entity,
                field,
                location,
            } => {
                assert_eq!(entity, "RzIODesc");
                assert_eq!(field, "fd");
                assert_eq!(location, fx.decl(DeclKind::Field, "fd", "ut64 fd").location);
            }
            other => panic!("expected a duplicate field, got {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_child() {
        let fx = Fixture::new("struct odd { int x; };");
        let mut header = fx.header(vec![fx
            .decl(DeclKind::Struct, "odd", "struct odd")
            .with_child(fx.decl(DeclKind::Function, "x", "int x"))]);
        let mut generics = GenericRegistry::new();

        let err = Class::bind(
            &mut generics,
            &mut header,
            ClassSpec::new("Odd").with_struct("odd"),
            StalePolicy::Warn,
        )
        .unwrap_err();
        assert!(matches!(err, BindError::UnexpectedDecl { .. }));
    }
}
