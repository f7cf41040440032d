//! The declaration tree handed to the binder by a C front end.
//!
//! A [`Decl`] is a front-end neutral view of one C declaration: its kind,
//! spelling, where it lives in the source, the raw type clang computed for
//! it, and its children (fields, parameters, enum constants). Everything the
//! binder needs from the original source text goes through [`TokenSource`].

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

/// A position in a source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SourceLocation {
    /// File the position belongs to
    pub file: Arc<str>,

    /// 1-based line
    pub line: u32,

    /// 1-based column
    pub column: u32,

    /// Byte offset from the start of the file
    pub offset: usize,
}

impl SourceLocation {
    /// Create a new location.
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32, offset: usize) -> Self {
        SourceLocation {
            file: file.into(),
            line,
            column,
            offset,
        }
    }

    /// A placeholder for positions the front end could not report.
    pub fn unknown() -> Self {
        SourceLocation::new("<unknown>", 0, 0, 0)
    }

    /// Whether this is the [`SourceLocation::unknown`] placeholder.
    pub fn is_unknown(&self) -> bool {
        self.line == 0 && &*self.file == "<unknown>"
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// Raw access to the text of the parsed sources.
///
/// This is the only capability the binder needs from the original source:
/// generic arguments live in comments, which no C front end models as part
/// of the declaration.
pub trait TokenSource: Send + Sync {
    /// Text from `start` (inclusive) up to `end` (exclusive).
    ///
    /// Returns `None` when the two positions are in different files or out
    /// of range.
    fn text_between(&self, start: &SourceLocation, end: &SourceLocation) -> Option<&str>;
}

/// The kinds of declaration the binder understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DeclKind {
    Function,
    Param,
    Struct,
    Union,
    Field,
    Typedef,
    Enum,
    EnumConstant,
    Macro,
    Variable,
}

impl DeclKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeclKind::Function => "function",
            DeclKind::Param => "parameter",
            DeclKind::Struct => "struct",
            DeclKind::Union => "union",
            DeclKind::Field => "field",
            DeclKind::Typedef => "typedef",
            DeclKind::Enum => "enum",
            DeclKind::EnumConstant => "enum constant",
            DeclKind::Macro => "macro",
            DeclKind::Variable => "variable",
        }
    }

    /// Struct and union declarations.
    pub fn is_record(&self) -> bool {
        matches!(self, DeclKind::Struct | DeclKind::Union)
    }
}

impl fmt::Display for DeclKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One C declaration.
#[derive(Debug, Clone)]
pub struct Decl {
    /// What kind of declaration this is
    pub kind: DeclKind,

    /// Declared name (empty for anonymous records)
    pub spelling: String,

    /// Location of the declared name
    pub location: SourceLocation,

    /// Start of the type written before the declared name, if known
    pub type_start: Option<SourceLocation>,

    /// Declared type (function prototype for functions, underlying type for typedefs)
    pub ty: Option<RawType>,

    /// Fields, parameters or enum constants, in source order
    pub children: Vec<Arc<Decl>>,

    /// Annotation names attached with `__attribute__((annotate(..)))`
    pub annotations: BTreeSet<String>,

    /// Enum constant value or macro definition text
    pub value: Option<String>,
}

impl Decl {
    /// Create a new declaration without type or children.
    pub fn new(kind: DeclKind, spelling: impl Into<String>, location: SourceLocation) -> Self {
        Decl {
            kind,
            spelling: spelling.into(),
            location,
            type_start: None,
            ty: None,
            children: Vec::new(),
            annotations: BTreeSet::new(),
            value: None,
        }
    }

    /// Set the declared type.
    pub fn with_type(mut self, ty: RawType) -> Self {
        self.ty = Some(ty);
        self
    }

    /// Set the start of the type reference.
    pub fn with_type_start(mut self, start: SourceLocation) -> Self {
        self.type_start = Some(start);
        self
    }

    /// Add a child declaration.
    pub fn with_child(mut self, child: impl Into<Arc<Decl>>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Add an annotation name.
    pub fn with_annotation(mut self, annotation: impl Into<String>) -> Self {
        self.annotations.insert(annotation.into());
        self
    }

    /// Set the constant value or macro text.
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Whether the declaration carries the given annotation.
    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.contains(annotation)
    }

    pub fn is_anonymous(&self) -> bool {
        self.spelling.is_empty()
    }

    /// A struct or union without a body.
    pub fn is_forward_declaration(&self) -> bool {
        self.kind.is_record() && self.children.is_empty()
    }

    /// Parameter children, in order.
    pub fn params(&self) -> impl Iterator<Item = &Arc<Decl>> {
        self.children.iter().filter(|c| c.kind == DeclKind::Param)
    }

    /// Field children (including anonymous unions), in order.
    pub fn fields(&self) -> impl Iterator<Item = &Arc<Decl>> {
        self.children
            .iter()
            .filter(|c| matches!(c.kind, DeclKind::Field | DeclKind::Struct | DeclKind::Union))
    }
}

/// Arithmetic and void kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Int128,
    UInt128,
    Float,
    Double,
    LongDouble,
    Enum,
}

impl PrimitiveKind {
    /// Canonical C spelling.
    pub fn c_name(&self) -> &'static str {
        match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Bool => "_Bool",
            PrimitiveKind::Char => "char",
            PrimitiveKind::SChar => "signed char",
            PrimitiveKind::UChar => "unsigned char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::UShort => "unsigned short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::UInt => "unsigned int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::ULong => "unsigned long",
            PrimitiveKind::LongLong => "long long",
            PrimitiveKind::ULongLong => "unsigned long long",
            PrimitiveKind::Int128 => "__int128",
            PrimitiveKind::UInt128 => "unsigned __int128",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::LongDouble => "long double",
            PrimitiveKind::Enum => "int",
        }
    }
}

/// The front end's type tree, before classification.
#[derive(Debug, Clone)]
pub struct RawType {
    pub kind: RawTypeKind,

    /// Spelling as the front end printed it
    pub spelling: String,

    /// Whether this level is const-qualified
    pub is_const: bool,
}

#[derive(Debug, Clone)]
pub enum RawTypeKind {
    Builtin(PrimitiveKind),
    /// `struct foo` or `union foo` written with its tag keyword
    Elaborated(Box<RawType>),
    Pointer(Box<RawType>),
    ConstantArray {
        element: Box<RawType>,
        count: u64,
    },
    IncompleteArray(Box<RawType>),
    Typedef {
        name: String,
        underlying: Box<RawType>,
        decl: Option<Arc<Decl>>,
    },
    /// A struct or union, by declared name
    Record {
        name: String,
        is_union: bool,
    },
    Enum {
        name: String,
    },
    FunctionProto {
        result: Box<RawType>,
        args: Vec<RawType>,
        variadic: bool,
    },
    /// Anything the front end could not express (vectors, atomics, ...)
    Unexposed(String),
}

impl RawType {
    pub fn new(kind: RawTypeKind, spelling: impl Into<String>) -> Self {
        RawType {
            kind,
            spelling: spelling.into(),
            is_const: false,
        }
    }

    /// Const-qualify this level, prefixing the spelling.
    pub fn constant(mut self) -> Self {
        if !self.is_const {
            self.is_const = true;
            self.spelling = match self.kind {
                RawTypeKind::Pointer(_) => format!("{} const", self.spelling),
                _ => format!("const {}", self.spelling),
            };
        }
        self
    }

    pub fn builtin(kind: PrimitiveKind) -> Self {
        RawType::new(RawTypeKind::Builtin(kind), kind.c_name())
    }

    pub fn void() -> Self {
        RawType::builtin(PrimitiveKind::Void)
    }

    pub fn int() -> Self {
        RawType::builtin(PrimitiveKind::Int)
    }

    pub fn pointer(pointee: RawType) -> Self {
        let spelling = if pointee.spelling.ends_with('*') {
            format!("{}*", pointee.spelling)
        } else {
            format!("{} *", pointee.spelling)
        };
        RawType::new(RawTypeKind::Pointer(Box::new(pointee)), spelling)
    }

    /// `struct name`, wrapped in elaborated sugar.
    pub fn record(name: impl Into<String>) -> Self {
        Self::tagged(name.into(), false)
    }

    /// `union name`, wrapped in elaborated sugar.
    pub fn union(name: impl Into<String>) -> Self {
        Self::tagged(name.into(), true)
    }

    fn tagged(name: String, is_union: bool) -> Self {
        let keyword = if is_union { "union" } else { "struct" };
        let inner = RawType::new(
            RawTypeKind::Record {
                name: name.clone(),
                is_union,
            },
            name.clone(),
        );
        RawType::new(
            RawTypeKind::Elaborated(Box::new(inner)),
            format!("{} {}", keyword, name),
        )
    }

    pub fn enumeration(name: impl Into<String>) -> Self {
        let name = name.into();
        RawType::new(RawTypeKind::Enum { name: name.clone() }, format!("enum {}", name))
    }

    pub fn typedef(name: impl Into<String>, underlying: RawType, decl: Option<Arc<Decl>>) -> Self {
        let name = name.into();
        RawType::new(
            RawTypeKind::Typedef {
                name: name.clone(),
                underlying: Box::new(underlying),
                decl,
            },
            name,
        )
    }

    pub fn array(element: RawType, count: Option<u64>) -> Self {
        let spelling = match count {
            Some(n) => format!("{} [{}]", element.spelling, n),
            None => format!("{} []", element.spelling),
        };
        let kind = match count {
            Some(count) => RawTypeKind::ConstantArray {
                element: Box::new(element),
                count,
            },
            None => RawTypeKind::IncompleteArray(Box::new(element)),
        };
        RawType::new(kind, spelling)
    }

    pub fn function(result: RawType, args: Vec<RawType>, variadic: bool) -> Self {
        let mut params: Vec<&str> = args.iter().map(|a| a.spelling.as_str()).collect();
        if variadic {
            params.push("...");
        }
        let spelling = format!("{} ({})", result.spelling, params.join(", "));
        RawType::new(
            RawTypeKind::FunctionProto {
                result: Box::new(result),
                args,
                variadic,
            },
            spelling,
        )
    }

    pub fn pointee(&self) -> Option<&RawType> {
        match &self.kind {
            RawTypeKind::Pointer(p) => Some(p),
            _ => None,
        }
    }

    pub fn element(&self) -> Option<&RawType> {
        match &self.kind {
            RawTypeKind::ConstantArray { element, .. } | RawTypeKind::IncompleteArray(element) => {
                Some(element)
            }
            _ => None,
        }
    }

    pub fn result(&self) -> Option<&RawType> {
        match &self.kind {
            RawTypeKind::FunctionProto { result, .. } => Some(result),
            _ => None,
        }
    }

    pub fn arguments(&self) -> &[RawType] {
        match &self.kind {
            RawTypeKind::FunctionProto { args, .. } => args,
            _ => &[],
        }
    }

    /// Strip elaborated and typedef sugar from the outermost level.
    pub fn canonical(&self) -> &RawType {
        match &self.kind {
            RawTypeKind::Elaborated(inner) => inner.canonical(),
            RawTypeKind::Typedef { underlying, .. } => underlying.canonical(),
            _ => self,
        }
    }

    /// The fully desugared type, with const carried over from sugared levels.
    pub fn desugared(&self) -> RawType {
        let inner = match &self.kind {
            RawTypeKind::Elaborated(inner) => inner.desugared(),
            RawTypeKind::Typedef { underlying, .. } => underlying.desugared(),
            RawTypeKind::Pointer(pointee) => {
                let mut ty = RawType::pointer(pointee.desugared());
                ty.spelling = self.spelling.clone();
                ty
            }
            RawTypeKind::ConstantArray { element, count } => {
                let mut ty = RawType::array(element.desugared(), Some(*count));
                ty.spelling = self.spelling.clone();
                ty
            }
            RawTypeKind::IncompleteArray(element) => {
                let mut ty = RawType::array(element.desugared(), None);
                ty.spelling = self.spelling.clone();
                ty
            }
            RawTypeKind::FunctionProto {
                result,
                args,
                variadic,
            } => {
                let mut ty = RawType::function(
                    result.desugared(),
                    args.iter().map(RawType::desugared).collect(),
                    *variadic,
                );
                ty.spelling = self.spelling.clone();
                ty
            }
            _ => self.clone(),
        };
        if self.is_const {
            inner.constant()
        } else {
            inner
        }
    }

    /// Name of the struct/union this type refers to after desugaring.
    pub fn record_name(&self) -> Option<&str> {
        match &self.canonical().kind {
            RawTypeKind::Record { name, .. } => Some(name),
            _ => None,
        }
    }

    /// Short description of the kind, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            RawTypeKind::Builtin(_) => "builtin",
            RawTypeKind::Elaborated(_) => "elaborated",
            RawTypeKind::Pointer(_) => "pointer",
            RawTypeKind::ConstantArray { .. } => "constant array",
            RawTypeKind::IncompleteArray(_) => "incomplete array",
            RawTypeKind::Typedef { .. } => "typedef",
            RawTypeKind::Record { .. } => "record",
            RawTypeKind::Enum { .. } => "enum",
            RawTypeKind::FunctionProto { .. } => "function prototype",
            RawTypeKind::Unexposed(_) => "unexposed",
        }
    }
}
