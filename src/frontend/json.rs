//! Loader for clang's JSON AST dump.
//!
//! The dump is read in two passes. The first turns the JSON into a [`Node`]
//! tree with absolute source positions: clang only writes the file and line
//! of a location when they differ from the previous location it printed,
//! so every location has to be visited in output order. The second pass
//! builds [`Decl`]s for the declarations of the main header, resolving
//! typedef names against the whole translation unit.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde_json::Value;

use crate::binding::errors::BindError;
use crate::core::decl::{Decl, DeclKind, RawType, RawTypeKind, SourceLocation};
use crate::core::header::Header;
use crate::frontend::params::{self, ParamText};
use crate::frontend::qualtype::{self, anonymous_key, TypeNames};
use crate::frontend::{macros, source::SourceMap};

/// A resolved position.
#[derive(Debug, Clone)]
struct Point {
    file: Arc<str>,
    line: u32,
    column: u32,
    offset: usize,
    tok_len: usize,
}

impl Point {
    fn location(&self) -> SourceLocation {
        SourceLocation::new(Arc::clone(&self.file), self.line, self.column, self.offset)
    }

    /// The position just past the token.
    fn after(&self) -> SourceLocation {
        SourceLocation::new(
            Arc::clone(&self.file),
            self.line,
            self.column + self.tok_len as u32,
            self.offset + self.tok_len,
        )
    }
}

/// A location, split like clang splits macro locations.
#[derive(Debug, Clone, Default)]
struct Loc {
    spelling: Option<Point>,
    expansion: Option<Point>,
}

impl Loc {
    /// Where the text was written in the file being parsed.
    fn written(&self) -> Option<&Point> {
        self.expansion.as_ref().or(self.spelling.as_ref())
    }
}

#[derive(Debug, Default)]
struct Node {
    kind: String,
    name: String,
    loc: Loc,
    begin: Loc,
    end: Loc,
    qual_type: Option<String>,
    implicit: bool,
    complete: bool,
    tag: Option<String>,
    value: Option<String>,
    annotation: Option<String>,
    children: Vec<Node>,
}

impl Node {
    /// First evaluated value in this subtree.
    fn find_value(&self) -> Option<&str> {
        self.value
            .as_deref()
            .or_else(|| self.children.iter().find_map(Node::find_value))
    }
}

/// First pass: location tracking and anonymous record adoption.
#[derive(Default)]
struct Reader {
    file: Option<Arc<str>>,
    line: u32,
    anonymous: HashMap<String, String>,
}

impl Reader {
    fn node(&mut self, value: &Value) -> Node {
        let str_field = |key: &str| value.get(key).and_then(Value::as_str).map(str::to_string);

        let loc = self.loc(value.get("loc"));
        let range = value.get("range");
        let begin = self.loc(range.and_then(|r| r.get("begin")));
        let end = self.loc(range.and_then(|r| r.get("end")));

        let mut children: Vec<Node> = value
            .get("inner")
            .and_then(Value::as_array)
            .map(|inner| inner.iter().map(|child| self.node(child)).collect())
            .unwrap_or_default();
        self.adopt_anonymous(&mut children);

        Node {
            kind: str_field("kind").unwrap_or_default(),
            name: str_field("name").unwrap_or_default(),
            loc,
            begin,
            end,
            qual_type: value
                .get("type")
                .and_then(|t| t.get("qualType"))
                .and_then(Value::as_str)
                .map(str::to_string),
            implicit: value.get("isImplicit").and_then(Value::as_bool).unwrap_or(false),
            complete: value
                .get("completeDefinition")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            tag: str_field("tagUsed"),
            value: value.get("value").and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            }),
            annotation: str_field("annotation"),
            children,
        }
    }

    fn loc(&mut self, value: Option<&Value>) -> Loc {
        let Some(value) = value.filter(|v| v.is_object()) else {
            return Loc::default();
        };
        if value.get("spellingLoc").is_some() || value.get("expansionLoc").is_some() {
            // Written in this order, so tracked in this order
            let spelling = self.point(value.get("spellingLoc"));
            let expansion = self.point(value.get("expansionLoc"));
            Loc {
                spelling,
                expansion,
            }
        } else {
            let point = self.point(Some(value));
            Loc {
                spelling: point.clone(),
                expansion: point,
            }
        }
    }

    fn point(&mut self, value: Option<&Value>) -> Option<Point> {
        let value = value?;
        if let Some(file) = value.get("file").and_then(Value::as_str) {
            self.file = Some(file.into());
        }
        if let Some(line) = value.get("line").and_then(Value::as_u64) {
            self.line = line as u32;
        }
        let offset = value.get("offset").and_then(Value::as_u64)? as usize;
        let number = |key: &str| value.get(key).and_then(Value::as_u64).unwrap_or(0);

        Some(Point {
            file: Arc::clone(self.file.as_ref()?),
            line: self.line,
            column: number("col") as u32,
            offset,
            tok_len: number("tokLen") as usize,
        })
    }

    /// Name anonymous records and enums after the typedef that follows them.
    fn adopt_anonymous(&mut self, children: &mut [Node]) {
        for i in 1..children.len() {
            let (head, tail) = children.split_at_mut(i);
            let (record, typedef) = (&mut head[i - 1], &tail[0]);

            if !matches!(record.kind.as_str(), "RecordDecl" | "EnumDecl")
                || !record.name.is_empty()
                || typedef.kind != "TypedefDecl"
            {
                continue;
            }
            let Some(qual_type) = typedef.qual_type.as_deref() else {
                continue;
            };

            let tag = match record.kind.as_str() {
                "EnumDecl" => "enum",
                _ => record.tag.as_deref().unwrap_or("struct"),
            };
            let qual_type = qual_type.strip_prefix("const ").unwrap_or(qual_type).trim_end();
            let key = anonymous_key(qual_type);
            let direct = match key {
                Some(_) => qual_type.starts_with(tag) && qual_type.ends_with(')'),
                None => qual_type == format!("{} {}", tag, typedef.name),
            };
            if !direct {
                continue;
            }

            record.name = typedef.name.clone();
            if let Some(key) = key {
                self.anonymous.insert(key.to_string(), typedef.name.clone());
            }
        }
    }
}

/// Second pass: declarations of the main header.
struct Builder<'a> {
    main_path: &'a str,
    main_name: &'a str,
    main_text: &'a str,
    typedef_nodes: HashMap<&'a str, &'a Node>,
    anonymous: &'a HashMap<String, String>,
    /// `None` while a typedef is being built
    typedefs: RefCell<HashMap<String, Option<(Arc<Decl>, RawType)>>>,
    sources: RefCell<SourceMap>,
    unreadable: RefCell<HashSet<Arc<str>>>,
    annotate: Regex,
}

impl TypeNames for Builder<'_> {
    fn typedef(&self, name: &str) -> Option<RawType> {
        self.typedef_entry(name).map(|(_, ty)| ty)
    }

    fn anonymous(&self, key: &str) -> Option<String> {
        self.anonymous.get(key).cloned()
    }
}

impl<'a> Builder<'a> {
    fn is_main(&self, file: &str) -> bool {
        file == self.main_path
            || file == self.main_name
            || file
                .strip_suffix(self.main_name)
                .is_some_and(|dir| dir.ends_with('/') || dir.ends_with('\\'))
    }

    /// Make sure the text of `file` is in the source map.
    fn ensure_loaded(&self, file: &Arc<str>) {
        if self.sources.borrow().contains(file) || self.unreadable.borrow().contains(file) {
            return;
        }
        if self.is_main(file) {
            self.sources
                .borrow_mut()
                .insert(Arc::clone(file), self.main_text);
            return;
        }
        match crate::util::fs::read_to_string(Path::new(&**file)) {
            Ok(text) => self.sources.borrow_mut().insert(Arc::clone(file), text),
            Err(err) => {
                tracing::debug!("{:#}", err);
                self.unreadable.borrow_mut().insert(Arc::clone(file));
            }
        }
    }

    fn with_text<T>(&self, file: &Arc<str>, f: impl FnOnce(&str) -> Option<T>) -> Option<T> {
        self.ensure_loaded(file);
        let sources = self.sources.borrow();
        sources.text(file).and_then(f)
    }

    fn location_at(&self, file: &Arc<str>, offset: usize) -> Option<SourceLocation> {
        self.ensure_loaded(file);
        self.sources.borrow().location(file, offset)
    }

    fn typedef_entry(&self, name: &str) -> Option<(Arc<Decl>, RawType)> {
        if let Some(entry) = self.typedefs.borrow().get(name) {
            return entry.clone();
        }
        let node = *self.typedef_nodes.get(name)?;

        self.typedefs.borrow_mut().insert(name.to_string(), None);
        let decl = Arc::new(self.typedef_decl(node));
        let underlying = decl.ty.clone().unwrap_or_else(|| unexposed(""));
        let ty = RawType::typedef(name, underlying, Some(Arc::clone(&decl)));
        self.typedefs
            .borrow_mut()
            .insert(name.to_string(), Some((Arc::clone(&decl), ty.clone())));
        Some((decl, ty))
    }

    fn parse_type(&self, node: &Node) -> RawType {
        match node.qual_type.as_deref() {
            Some(qual_type) => qualtype::parse(qual_type, self),
            None => unexposed(""),
        }
    }

    /// A declaration with its location, type start and annotations.
    fn base_decl(&self, kind: DeclKind, node: &Node) -> Decl {
        let begin = node.begin.written().map(Point::location);
        let location = match node.loc.written() {
            // Unnamed parameters sit where the name would be: after the type
            Some(point) if !(kind == DeclKind::Param && node.name.is_empty()) => point.location(),
            _ => node
                .end
                .written()
                .map(Point::after)
                .or_else(|| begin.clone())
                .unwrap_or_else(SourceLocation::unknown),
        };

        let mut decl = Decl::new(kind, node.name.clone(), location);
        if let Some(begin) = begin {
            if begin.file == decl.location.file && begin.offset <= decl.location.offset {
                decl = decl.with_type_start(begin);
            }
        }
        for child in node.children.iter().filter(|c| c.kind == "AnnotateAttr") {
            if let Some(annotation) = self.annotation(child) {
                decl = decl.with_annotation(annotation);
            }
        }
        decl
    }

    /// Name given to `__attribute__((annotate(..)))`.
    ///
    /// Tried in order: the name clang reports, the string literal in the
    /// attribute's spelling, then the macro the attribute was expanded from.
    fn annotation(&self, attr: &Node) -> Option<String> {
        if let Some(annotation) = &attr.annotation {
            return Some(annotation.clone());
        }

        if let (Some(begin), Some(end)) = (&attr.begin.spelling, &attr.end.spelling) {
            if begin.file == end.file {
                let found = self.with_text(&begin.file, |text| {
                    let spelled = text.get(begin.offset..end.offset + end.tok_len)?;
                    let captures = self.annotate.captures(spelled)?;
                    Some(captures.get(1)?.as_str().to_string())
                });
                if found.is_some() {
                    return found;
                }
            }
        }

        let begin = attr.begin.expansion.as_ref()?;
        self.with_text(&begin.file, |text| {
            let rest = text.get(begin.offset..)?;
            let len = rest
                .bytes()
                .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
                .count();
            (len > 0).then(|| rest[..len].to_string())
        })
    }

    fn typedef_decl(&self, node: &Node) -> Decl {
        let underlying = self.parse_type(node);
        let decl = self.base_decl(DeclKind::Typedef, node);
        self.with_function_params(decl, underlying)
    }

    fn variable(&self, kind: DeclKind, node: &Node) -> Decl {
        let ty = self.parse_type(node);
        let decl = self.base_decl(kind, node);
        self.with_function_params(decl, ty)
    }

    fn function(&self, node: &Node) -> Decl {
        let ty = self.parse_type(node);
        let mut decl = self.base_decl(DeclKind::Function, node).with_type(ty);
        for param in node.children.iter().filter(|c| c.kind == "ParmVarDecl") {
            decl = decl.with_child(self.variable(DeclKind::Param, param));
        }
        decl
    }

    fn record(&self, node: &Node) -> Decl {
        let kind = match node.tag.as_deref() {
            Some("union") => DeclKind::Union,
            _ => DeclKind::Struct,
        };
        let mut decl = self.base_decl(kind, node);
        if node.complete {
            decl.children = self.record_children(node);
        }
        decl
    }

    fn record_children(&self, node: &Node) -> Vec<Arc<Decl>> {
        let mut children: Vec<Arc<Decl>> = Vec::new();
        for child in &node.children {
            match child.kind.as_str() {
                "FieldDecl" => {
                    if child.implicit || child.name.is_empty() {
                        continue;
                    }
                    let anonymous_type = child.qual_type.as_deref().and_then(anonymous_key).is_some();
                    let after_anonymous = children
                        .last()
                        .is_some_and(|c| c.kind.is_record() && c.is_anonymous());
                    if anonymous_type && after_anonymous {
                        children.pop();
                        tracing::debug!(
                            "Skipping field {} of anonymous type in {}",
                            child.name,
                            node.name
                        );
                        continue;
                    }
                    children.push(Arc::new(self.variable(DeclKind::Field, child)));
                }
                "RecordDecl" => children.push(Arc::new(self.record(child))),
                _ => {}
            }
        }
        children
    }

    fn enumeration(&self, node: &Node) -> Decl {
        let mut decl = self.base_decl(DeclKind::Enum, node);
        let mut previous: Option<(String, String)> = None;

        for constant in node.children.iter().filter(|c| c.kind == "EnumConstantDecl") {
            let value = match constant.find_value() {
                Some(value) => value.to_string(),
                None => match constant.children.iter().find(|c| !c.kind.ends_with("Attr")) {
                    Some(init) => self.range_text(init).unwrap_or_default(),
                    None => match &previous {
                        None => "0".to_string(),
                        Some((name, value)) => match parse_int(value) {
                            Some(n) => (n + 1).to_string(),
                            None => format!("{} + 1", name),
                        },
                    },
                },
            };
            decl = decl.with_child(self.base_decl(DeclKind::EnumConstant, constant).with_value(value.clone()));
            previous = Some((constant.name.clone(), value));
        }
        decl
    }

    fn range_text(&self, node: &Node) -> Option<String> {
        let (begin, end) = (node.begin.written()?, node.end.written()?);
        if begin.file != end.file {
            return None;
        }
        self.with_text(&begin.file, |text| {
            text.get(begin.offset..end.offset + end.tok_len)
                .map(|s| s.trim().to_string())
        })
    }

    /// Set the type, recovering parameter declarations of function pointers.
    fn with_function_params(&self, decl: Decl, ty: RawType) -> Decl {
        let params = match function_proto(&ty) {
            Some(proto) => {
                let file = Arc::clone(&decl.location.file);
                let after_name = decl.location.offset + decl.spelling.len();
                let texts = if decl.spelling.is_empty() {
                    None
                } else {
                    self.with_text(&file, |text| params::recover(text, after_name))
                };
                self.param_decls(&file, texts.as_deref(), proto, &decl)
            }
            None => Vec::new(),
        };

        let mut decl = decl.with_type(ty);
        for param in params {
            decl = decl.with_child(param);
        }
        decl
    }

    fn param_decls(
        &self,
        file: &Arc<str>,
        texts: Option<&[ParamText]>,
        proto: &RawType,
        owner: &Decl,
    ) -> Vec<Decl> {
        let args = proto.arguments();
        let texts = match texts {
            Some(texts) if texts.len() == args.len() => Some(texts),
            Some(texts) => {
                tracing::debug!(
                    "{}: found {} parameter names for {} arguments of {}",
                    owner.location,
                    texts.len(),
                    args.len(),
                    owner.spelling
                );
                None
            }
            None => None,
        };

        args.iter()
            .enumerate()
            .map(|(i, arg)| {
                let text = texts.map(|t| &t[i]);
                let mut param = match text {
                    Some(text) => {
                        let location = self
                            .location_at(file, text.name_offset)
                            .unwrap_or_else(|| owner.location.clone());
                        let mut param = Decl::new(DeclKind::Param, text.name.clone(), location);
                        if let Some(start) = self.location_at(file, text.start) {
                            param = param.with_type_start(start);
                        }
                        param
                    }
                    None => Decl::new(DeclKind::Param, "", owner.location.clone()),
                }
                .with_type(arg.clone());

                if let Some(nested) = function_proto(arg) {
                    let nested_texts = text.and_then(|t| t.nested.as_deref());
                    let children = self.param_decls(file, nested_texts, nested, &param);
                    for child in children {
                        param = param.with_child(child);
                    }
                }
                param
            })
            .collect()
    }
}

fn unexposed(spelling: &str) -> RawType {
    RawType::new(RawTypeKind::Unexposed(spelling.to_string()), spelling)
}

/// The prototype behind a function, function pointer or array of them.
fn function_proto(ty: &RawType) -> Option<&RawType> {
    match &ty.kind {
        RawTypeKind::FunctionProto { .. } => Some(ty),
        RawTypeKind::Pointer(inner) => function_proto(inner),
        RawTypeKind::ConstantArray { element, .. } | RawTypeKind::IncompleteArray(element) => {
            function_proto(element)
        }
        _ => None,
    }
}

fn parse_int(value: &str) -> Option<i64> {
    let value = value.trim();
    match value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        Some(hex) => i64::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

/// The declarations of one parsed header.
pub struct TranslationUnit {
    name: String,
    decls: Vec<Arc<Decl>>,
    source: Arc<SourceMap>,
}

impl TranslationUnit {
    /// Load a JSON dump of `header`, reading the header text from disk.
    pub fn from_json(json: &str, header: &Path) -> Result<Self> {
        let root: Value = serde_json::from_str(json)
            .with_context(|| format!("invalid clang AST dump for {}", header.display()))?;
        let text = crate::util::fs::read_to_string(header)?;
        Self::from_dump(&root, &header.to_string_lossy(), &text)
    }

    /// Build from a parsed dump and the text of the header it was made from.
    ///
    /// Only declarations written in the header itself are kept; everything
    /// else in the translation unit is used to resolve typedef names.
    pub fn from_dump(root: &Value, header_path: &str, text: &str) -> Result<Self> {
        let mut reader = Reader::default();
        let root = reader.node(root);
        if root.kind != "TranslationUnitDecl" {
            bail!(
                "expected a TranslationUnitDecl at the root of the AST dump, found `{}`",
                root.kind
            );
        }

        let name = Path::new(header_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| header_path.to_string());

        let mut typedef_nodes = HashMap::new();
        for node in root.children.iter().filter(|n| n.kind == "TypedefDecl") {
            typedef_nodes.entry(node.name.as_str()).or_insert(node);
        }

        let builder = Builder {
            main_path: header_path,
            main_name: &name,
            main_text: text,
            typedef_nodes,
            anonymous: &reader.anonymous,
            typedefs: RefCell::new(HashMap::new()),
            sources: RefCell::new(SourceMap::new()),
            unreadable: RefCell::new(HashSet::new()),
            annotate: Regex::new(r#"annotate\s*\(\s*"([^"]*)""#)?,
        };

        let mut main_file: Option<Arc<str>> = None;
        let mut seen = HashSet::new();
        let mut decls = Vec::new();
        for node in root.children.iter().filter(|n| !n.implicit) {
            let Some(point) = node.loc.written() else {
                continue;
            };
            if !builder.is_main(&point.file) {
                continue;
            }
            builder.ensure_loaded(&point.file);
            main_file.get_or_insert_with(|| Arc::clone(&point.file));

            let decl = match node.kind.as_str() {
                "FunctionDecl" => Arc::new(builder.function(node)),
                "RecordDecl" => Arc::new(builder.record(node)),
                "EnumDecl" => Arc::new(builder.enumeration(node)),
                "VarDecl" => Arc::new(builder.variable(DeclKind::Variable, node)),
                "TypedefDecl" => match builder.typedef_entry(&node.name) {
                    Some((decl, _)) => decl,
                    None => continue,
                },
                _ => continue,
            };

            if !decl.kind.is_record()
                && !decl.is_anonymous()
                && !seen.insert((decl.kind, decl.spelling.clone()))
            {
                tracing::trace!("Skipping redeclaration of {}", decl.spelling);
                continue;
            }
            decls.push(decl);
        }

        let main_file = main_file.unwrap_or_else(|| Arc::from(header_path));
        builder.ensure_loaded(&main_file);
        for def in macros::scan(text)? {
            let location = builder.location_at(&main_file, def.name_offset);
            let start = builder.location_at(&main_file, def.start);
            let (Some(location), Some(start)) = (location, start) else {
                continue;
            };
            if seen.insert((DeclKind::Macro, def.name.clone())) {
                decls.push(Arc::new(
                    Decl::new(DeclKind::Macro, def.name, location)
                        .with_type_start(start)
                        .with_value(def.value),
                ));
            }
        }
        decls.sort_by_key(|d| d.location.offset);

        let source = Arc::new(builder.sources.into_inner());
        tracing::debug!("Loaded {} declarations from {}", decls.len(), name);
        Ok(TranslationUnit {
            name,
            decls,
            source,
        })
    }

    /// Include name of the header.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declarations in source order.
    pub fn decls(&self) -> &[Arc<Decl>] {
        &self.decls
    }

    pub fn source(&self) -> &Arc<SourceMap> {
        &self.source
    }

    /// Turn into the declaration pool bindings are claimed from.
    pub fn into_header(self) -> Result<Header, BindError> {
        Header::from_decls(self.name, self.source, self.decls)
    }
}
