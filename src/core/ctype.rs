//! The closed C type model.
//!
//! [`wrap`] classifies a [`RawType`] from the front end into one of six
//! variants. Pointer, array and function types are wrapped eagerly all the
//! way down because declarator emission needs the full chain.

use std::sync::Arc;

use crate::binding::errors::BindError;
use crate::core::decl::{Decl, PrimitiveKind, RawType, RawTypeKind, SourceLocation};

/// A classified C type.
#[derive(Debug, Clone)]
pub struct CType {
    pub kind: CTypeKind,

    /// Spelling of this position as written in the source
    pub spelling: String,

    /// Whether this level is const-qualified
    pub is_const: bool,
}

#[derive(Debug, Clone)]
pub enum CTypeKind {
    Primitive(PrimitiveKind),
    Pointer(Box<CType>),
    Array {
        element: Box<CType>,
        count: Option<u64>,
    },
    Typedef(TypedefType),
    Record(RecordType),
    Function(FunctionType),
}

/// A typedef use, keeping the typedef declaration around.
///
/// The declaration matters because a typedef may itself carry the generic
/// annotation comment, for instance behind a function-pointer typedef.
#[derive(Debug, Clone)]
pub struct TypedefType {
    pub name: String,

    /// Fully desugared form of the typedef
    pub canonical: Box<CType>,

    /// The typedef declaration, when the front end resolved it
    pub decl: Option<Arc<Decl>>,
}

#[derive(Debug, Clone)]
pub struct RecordType {
    /// Tag name of the struct or union
    pub decl_spelling: String,

    pub is_union: bool,

    /// Filled by the specialization pass when the record backs a generic
    pub binding: Option<GenericBinding>,
}

impl RecordType {
    /// `struct` or `union`.
    pub fn keyword(&self) -> &'static str {
        if self.is_union {
            "union"
        } else {
            "struct"
        }
    }
}

/// A record use resolved to one instantiation of a generic.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericBinding {
    pub generic: String,
    pub specialization: String,
}

#[derive(Debug, Clone)]
pub struct FunctionType {
    pub result: Box<CType>,
    pub args: Vec<CType>,

    /// Parameter names, filled from the declaring `Decl`'s parameters
    pub arg_names: Option<Vec<String>>,

    /// Ends in `...`
    pub variadic: bool,
}

impl CType {
    fn new(kind: CTypeKind, raw: &RawType) -> Self {
        CType {
            kind,
            spelling: raw.spelling.clone(),
            is_const: raw.is_const,
        }
    }

    pub fn pointee(&self) -> Option<&CType> {
        match &self.kind {
            CTypeKind::Pointer(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self.kind, CTypeKind::Primitive(PrimitiveKind::Void))
    }

    /// Look through typedefs.
    pub fn canonical(&self) -> &CType {
        match &self.kind {
            CTypeKind::Typedef(t) => t.canonical.canonical(),
            _ => self,
        }
    }

    /// The record this type names, after looking through typedefs.
    pub fn as_record(&self) -> Option<&RecordType> {
        match &self.canonical().kind {
            CTypeKind::Record(r) => Some(r),
            _ => None,
        }
    }

    /// A pointer to a function, directly or through typedefs.
    pub fn as_function_pointer(&self) -> Option<&FunctionType> {
        match &self.canonical().pointee()?.canonical().kind {
            CTypeKind::Function(f) => Some(f),
            _ => None,
        }
    }

    /// The struct a `T *` points to, if any.
    pub fn pointee_record(&self) -> Option<&RecordType> {
        self.canonical().pointee()?.as_record()
    }
}

/// Classify a raw type.
///
/// Elaborated sugar is stripped. Any kind outside the closed set is an
/// [`BindError::UnknownTypeKind`].
pub fn wrap(raw: &RawType) -> Result<CType, BindError> {
    let kind = match &raw.kind {
        RawTypeKind::Elaborated(inner) => {
            let mut ty = wrap(inner)?;
            ty.spelling = raw.spelling.clone();
            ty.is_const |= raw.is_const;
            return Ok(ty);
        }
        RawTypeKind::Builtin(kind) => CTypeKind::Primitive(*kind),
        RawTypeKind::Enum { .. } => CTypeKind::Primitive(PrimitiveKind::Enum),
        RawTypeKind::Pointer(pointee) => CTypeKind::Pointer(Box::new(wrap(pointee)?)),
        RawTypeKind::ConstantArray { element, count } => CTypeKind::Array {
            element: Box::new(wrap(element)?),
            count: Some(*count),
        },
        RawTypeKind::IncompleteArray(element) => CTypeKind::Array {
            element: Box::new(wrap(element)?),
            count: None,
        },
        RawTypeKind::Typedef { name, decl, .. } => CTypeKind::Typedef(TypedefType {
            name: name.clone(),
            canonical: Box::new(wrap(&raw.desugared())?),
            decl: decl.clone(),
        }),
        RawTypeKind::Record { name, is_union } => CTypeKind::Record(RecordType {
            decl_spelling: name.strip_prefix("const ").unwrap_or(name).to_string(),
            is_union: *is_union,
            binding: None,
        }),
        RawTypeKind::FunctionProto {
            result,
            args,
            variadic,
        } => CTypeKind::Function(FunctionType {
            result: Box::new(wrap(result)?),
            args: args.iter().map(wrap).collect::<Result<_, _>>()?,
            arg_names: None,
            variadic: *variadic,
        }),
        RawTypeKind::Unexposed(_) => {
            return Err(BindError::UnknownTypeKind {
                kind: raw.kind_name().to_string(),
                spelling: raw.spelling.clone(),
                location: SourceLocation::unknown(),
            })
        }
    };
    Ok(CType::new(kind, raw))
}

/// Classify the type of a declaration, reporting errors at its location.
pub fn wrap_decl(decl: &Decl) -> Result<CType, BindError> {
    let raw = decl.ty.as_ref().ok_or_else(|| BindError::UnexpectedShape {
        name: decl.spelling.clone(),
        detail: format!("{} has no type", decl.kind),
        location: decl.location.clone(),
    })?;
    wrap(raw).map_err(|e| e.at(&decl.location))
}
