//! Function bindings.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use crate::binding::errors::BindError;
use crate::binding::generic::GenericRegistry;
use crate::binding::specialize::Specializer;
use crate::binding::typemap::Typemap;
use crate::core::ctype::{wrap, wrap_decl, CType};
use crate::core::decl::{Decl, RawTypeKind, SourceLocation, TokenSource};

/// One argument of a C function.
#[derive(Debug, Clone)]
pub struct FuncArg {
    pub name: String,
    pub ctype: CType,
    pub annotations: BTreeSet<String>,
    /// Default value in the generated signature
    pub default: Option<String>,
    pub decl: Arc<Decl>,
}

/// A C function declaration, classified.
#[derive(Debug, Clone)]
pub struct CFunc {
    pub name: String,
    pub location: SourceLocation,
    pub annotations: BTreeSet<String>,
    pub args: Vec<FuncArg>,
    pub result: CType,
    pub decl: Arc<Decl>,
}

impl CFunc {
    pub fn from_decl(decl: Arc<Decl>) -> Result<Self, BindError> {
        let result = match decl.ty.as_ref().map(|t| &t.canonical().kind) {
            Some(RawTypeKind::FunctionProto { result, .. }) => {
                wrap(result).map_err(|e| e.at(&decl.location))?
            }
            _ => {
                return Err(BindError::UnexpectedShape {
                    name: decl.spelling.clone(),
                    detail: "declaration is not a function".to_string(),
                    location: decl.location.clone(),
                })
            }
        };

        let args = decl
            .params()
            .map(|param| -> Result<FuncArg, BindError> {
                Ok(FuncArg {
                    name: param.spelling.clone(),
                    ctype: wrap_decl(param)?,
                    annotations: param.annotations.clone(),
                    default: None,
                    decl: Arc::clone(param),
                })
            })
            .collect::<Result<Vec<_>, BindError>>()?;

        Ok(CFunc {
            name: decl.spelling.clone(),
            location: decl.location.clone(),
            annotations: decl.annotations.clone(),
            args,
            result,
            decl,
        })
    }

    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.contains(annotation)
    }

    /// Argument list as written in the header.
    pub fn signature(&self) -> String {
        self.args
            .iter()
            .map(|arg| {
                if arg.ctype.spelling.ends_with('*') {
                    format!("{}{}", arg.ctype.spelling, arg.name)
                } else {
                    format!("{} {}", arg.ctype.spelling, arg.name)
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether the first argument points to `struct_name`.
    pub fn takes_receiver(&self, struct_name: &str) -> bool {
        self.args
            .first()
            .and_then(|arg| arg.ctype.pointee_record())
            .is_some_and(|record| record.decl_spelling == struct_name)
    }
}

/// Which parts of a generic method use the placeholder type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenericMarkers {
    /// The return value is the element type
    pub ret: bool,
    /// Arguments holding the element type
    pub args: BTreeSet<String>,
}

impl GenericMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn returns(mut self) -> Self {
        self.ret = true;
        self
    }

    pub fn arg(mut self, name: impl Into<String>) -> Self {
        self.args.insert(name.into());
        self
    }
}

/// How a C function is exposed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingKind {
    Constructor,
    Destructor,
    Method,
    Static,
    Generic(GenericMarkers),
}

impl BindingKind {
    /// Whether the first C argument becomes the implicit `$self`.
    pub fn elides_receiver(&self) -> bool {
        matches!(
            self,
            BindingKind::Destructor | BindingKind::Method | BindingKind::Generic(_)
        )
    }

    pub fn markers(&self) -> Option<&GenericMarkers> {
        match self {
            BindingKind::Generic(markers) => Some(markers),
            _ => None,
        }
    }
}

/// Per-function options from the binding script.
#[derive(Debug, Clone, Default)]
pub struct FuncOptions {
    pub default_args: BTreeMap<String, String>,
    pub typemaps: Vec<Typemap>,
}

impl FuncOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn default_arg(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_args.insert(name.into(), value.into());
        self
    }

    pub fn typemap(mut self, typemap: Typemap) -> Self {
        self.typemaps.push(typemap);
        self
    }
}

/// A bound C function.
#[derive(Debug, Clone)]
pub struct Func {
    pub cfunc: CFunc,
    pub kind: BindingKind,
    pub typemaps: Vec<Typemap>,
}

impl Func {
    pub(crate) fn bind(
        generics: &mut GenericRegistry,
        source: &dyn TokenSource,
        decl: Arc<Decl>,
        kind: BindingKind,
        options: FuncOptions,
    ) -> Result<Self, BindError> {
        let mut cfunc = CFunc::from_decl(decl)?;

        for (name, value) in options.default_args {
            match cfunc.args.iter_mut().find(|a| a.name == name) {
                Some(arg) => arg.default = Some(value),
                None => {
                    return Err(BindError::UnknownArgument {
                        function: cfunc.name.clone(),
                        argument: name,
                        role: "default",
                        location: cfunc.location.clone(),
                    })
                }
            }
        }

        if kind.elides_receiver() && cfunc.args.is_empty() {
            return Err(BindError::UnexpectedShape {
                name: cfunc.name.clone(),
                detail: "expected a receiver as first argument".to_string(),
                location: cfunc.location.clone(),
            });
        }

        let mut specializer = Specializer::new(generics, source);
        match kind.markers() {
            Some(markers) => {
                for name in &markers.args {
                    if !cfunc.args.iter().skip(1).any(|a| a.name == *name) {
                        return Err(BindError::UnknownArgument {
                            function: cfunc.name.clone(),
                            argument: name.clone(),
                            role: "generic",
                            location: cfunc.location.clone(),
                        });
                    }
                }
                if !markers.ret {
                    specializer.visit_decl(&cfunc.decl, &mut cfunc.result)?;
                }
                for arg in cfunc.args.iter_mut().skip(1) {
                    if !markers.args.contains(&arg.name) {
                        specializer.visit_decl(&arg.decl, &mut arg.ctype)?;
                    }
                }
            }
            None => {
                for arg in cfunc.args.iter_mut() {
                    specializer.visit_decl(&arg.decl, &mut arg.ctype)?;
                }
                specializer.visit_decl(&cfunc.decl, &mut cfunc.result)?;
            }
        }

        for typemap in &options.typemaps {
            typemap.check(&cfunc)?;
        }

        Ok(Func {
            cfunc,
            kind,
            typemaps: options.typemaps,
        })
    }

    /// Arguments in the generated signature.
    pub fn bound_args(&self) -> &[FuncArg] {
        if self.kind.elides_receiver() {
            &self.cfunc.args[1..]
        } else {
            &self.cfunc.args
        }
    }

    /// Whether `arg` uses the placeholder type.
    pub fn is_generic_arg(&self, arg: &FuncArg) -> bool {
        self.kind
            .markers()
            .is_some_and(|m| m.args.contains(&arg.name))
    }

    pub fn is_generic_return(&self) -> bool {
        self.kind.markers().is_some_and(|m| m.ret)
    }
}
