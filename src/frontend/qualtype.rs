//! Parser for clang's printed `qualType` strings.
//!
//! clang's JSON dump describes every type as the string it would print
//! (`"const char *"`, `"bool (*)(RzBinFile *, RzBuffer *)"`). This module
//! turns those strings back into a [`RawType`] tree, resolving typedef names
//! and anonymous records through [`TypeNames`].

use thiserror::Error;

use crate::core::decl::{PrimitiveKind, RawType, RawTypeKind};

/// Name lookups the parser needs from the translation unit.
pub trait TypeNames {
    /// The type a typedef name stands for, as a `RawTypeKind::Typedef`.
    fn typedef(&self, name: &str) -> Option<RawType>;

    /// The name adopted by an anonymous record or enum, keyed by the text
    /// clang prints inside the parentheses (`unnamed struct at a.h:3:9`).
    fn anonymous(&self, key: &str) -> Option<String>;
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum QualTypeError {
    #[error("unexpected character `{0}`")]
    UnexpectedChar(char),

    #[error("unbalanced parentheses")]
    Unbalanced,

    #[error("unexpected token {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of type")]
    UnexpectedEnd,

    #[error("anonymous {0} was not adopted by a typedef")]
    UnknownAnonymous(String),

    #[error("invalid builtin `{0}`")]
    InvalidBuiltin(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token<'a> {
    Ident(&'a str),
    Punct(char),
    Number(u64),
    Ellipsis,
    /// Parenthesized text after a tag keyword
    Anon(&'a str),
}

impl std::fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Ident(s) => write!(f, "`{}`", s),
            Token::Punct(c) => write!(f, "`{}`", c),
            Token::Number(n) => write!(f, "`{}`", n),
            Token::Ellipsis => f.write_str("`...`"),
            Token::Anon(s) => write!(f, "`({})`", s),
        }
    }
}

const BUILTIN_WORDS: &[&str] = &[
    "void", "_Bool", "bool", "char", "short", "int", "long", "float", "double", "signed",
    "unsigned", "__int128",
];

const IGNORED_QUALIFIERS: &[&str] = &[
    "volatile",
    "restrict",
    "__restrict",
    "__restrict__",
    "_Nonnull",
    "_Nullable",
    "_Null_unspecified",
];

fn is_tag(word: &str) -> bool {
    matches!(word, "struct" | "union" | "enum")
}

/// Text inside the parentheses that follow a tag keyword, if any.
///
/// `struct (unnamed struct at a.h:3:9) *` yields `unnamed struct at a.h:3:9`.
pub fn anonymous_key(qual_type: &str) -> Option<&str> {
    let open = ["(unnamed", "(anonymous"]
        .iter()
        .filter_map(|marker| qual_type.find(marker))
        .min()?;
    let close = matching_paren(qual_type, open)?;
    Some(&qual_type[open + 1..close])
}

fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in text[open..].char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn tokenize(text: &str) -> Result<Vec<Token<'_>>, QualTypeError> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < bytes.len() {
        let c = bytes[i] as char;
        if c.is_ascii_whitespace() {
            i += 1;
        } else if c.is_ascii_alphabetic() || c == '_' {
            let start = i;
            while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
                i += 1;
            }
            let word = &text[start..i];
            tokens.push(Token::Ident(word));

            if is_tag(word) {
                let rest = text[i..].trim_start();
                if rest.starts_with('(') {
                    let open = text.len() - rest.len();
                    let close = matching_paren(text, open).ok_or(QualTypeError::Unbalanced)?;
                    tokens.push(Token::Anon(&text[open + 1..close]));
                    i = close + 1;
                }
            }
        } else if c.is_ascii_digit() {
            let start = i;
            while i < bytes.len() && bytes[i].is_ascii_digit() {
                i += 1;
            }
            let n = text[start..i]
                .parse()
                .map_err(|_| QualTypeError::UnexpectedChar(c))?;
            tokens.push(Token::Number(n));
        } else if text[i..].starts_with("...") {
            tokens.push(Token::Ellipsis);
            i += 3;
        } else if "*()[],".contains(c) {
            tokens.push(Token::Punct(c));
            i += 1;
        } else {
            return Err(QualTypeError::UnexpectedChar(c));
        }
    }

    Ok(tokens)
}

struct Parser<'t, 'n> {
    tokens: Vec<Token<'t>>,
    pos: usize,
    names: &'n dyn TypeNames,
}

impl<'t, 'n> Parser<'t, 'n> {
    fn peek(&self) -> Option<&Token<'t>> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'t>> {
        self.tokens.get(self.pos + offset)
    }

    fn bump(&mut self) -> Option<Token<'t>> {
        let token = self.tokens.get(self.pos).cloned();
        self.pos += 1;
        token
    }

    fn expect(&mut self, c: char) -> Result<(), QualTypeError> {
        match self.bump() {
            Some(Token::Punct(p)) if p == c => Ok(()),
            Some(other) => Err(QualTypeError::UnexpectedToken(other.to_string())),
            None => Err(QualTypeError::UnexpectedEnd),
        }
    }

    fn is_punct(&self, c: char) -> bool {
        matches!(self.peek(), Some(Token::Punct(p)) if *p == c)
    }

    /// A full type name: specifiers followed by an abstract declarator.
    fn type_name(&mut self) -> Result<RawType, QualTypeError> {
        let base = self.specifiers()?;
        self.declarator(base)
    }

    fn specifiers(&mut self) -> Result<RawType, QualTypeError> {
        let mut is_const = false;
        let mut words: Vec<&str> = Vec::new();
        let mut base: Option<RawType> = None;

        while let Some(Token::Ident(word)) = self.peek().cloned() {
            if word == "const" {
                is_const = true;
                self.pos += 1;
            } else if IGNORED_QUALIFIERS.contains(&word) {
                self.pos += 1;
            } else if is_tag(word) && base.is_none() && words.is_empty() {
                self.pos += 1;
                base = Some(self.tagged(word)?);
            } else if BUILTIN_WORDS.contains(&word) && base.is_none() {
                words.push(word);
                self.pos += 1;
            } else if base.is_none() && words.is_empty() {
                self.pos += 1;
                base = Some(
                    self.names
                        .typedef(word)
                        .unwrap_or_else(|| RawType::new(RawTypeKind::Unexposed(word.to_string()), word)),
                );
            } else {
                break;
            }
        }

        let base = match base {
            Some(base) => base,
            None if words.is_empty() => {
                return Err(match self.peek() {
                    Some(token) => QualTypeError::UnexpectedToken(token.to_string()),
                    None => QualTypeError::UnexpectedEnd,
                })
            }
            None => {
                let mut ty = RawType::builtin(builtin(&words)?);
                ty.spelling = words.join(" ");
                ty
            }
        };

        Ok(if is_const { base.constant() } else { base })
    }

    fn tagged(&mut self, tag: &str) -> Result<RawType, QualTypeError> {
        let name = match self.bump() {
            Some(Token::Ident(name)) => name.to_string(),
            Some(Token::Anon(key)) => self
                .names
                .anonymous(key)
                .ok_or_else(|| QualTypeError::UnknownAnonymous(key.to_string()))?,
            Some(other) => return Err(QualTypeError::UnexpectedToken(other.to_string())),
            None => return Err(QualTypeError::UnexpectedEnd),
        };

        Ok(match tag {
            "enum" => RawType::enumeration(name),
            "union" => RawType::union(name),
            _ => RawType::record(name),
        })
    }

    fn declarator(&mut self, base: RawType) -> Result<RawType, QualTypeError> {
        let mut ty = base;

        while self.is_punct('*') {
            self.pos += 1;
            ty = RawType::pointer(ty);
            while let Some(Token::Ident(word)) = self.peek().cloned() {
                if word == "const" {
                    ty = ty.constant();
                } else if !IGNORED_QUALIFIERS.contains(&word) {
                    break;
                }
                self.pos += 1;
            }
        }

        // `(*)` or `(*[4])` wraps a nested declarator; anything else after
        // `(` is a parameter list
        let nested = self.is_punct('(')
            && matches!(self.peek_at(1), Some(Token::Punct('*')) | Some(Token::Punct('(')));
        if !nested {
            return self.suffixes(ty);
        }

        let open = self.pos;
        let close = self.group_end(open)?;
        self.pos = close + 1;
        let ty = self.suffixes(ty)?;
        let after = self.pos;

        self.pos = open + 1;
        let ty = self.declarator(ty)?;
        if self.pos != close {
            return Err(match self.peek() {
                Some(token) => QualTypeError::UnexpectedToken(token.to_string()),
                None => QualTypeError::UnexpectedEnd,
            });
        }
        self.pos = after;
        Ok(ty)
    }

    /// Index of the `)` closing the group opened at `open`.
    fn group_end(&self, open: usize) -> Result<usize, QualTypeError> {
        let mut depth = 0usize;
        for (i, token) in self.tokens.iter().enumerate().skip(open) {
            match token {
                Token::Punct('(') => depth += 1,
                Token::Punct(')') => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(i);
                    }
                }
                _ => {}
            }
        }
        Err(QualTypeError::Unbalanced)
    }

    fn suffixes(&mut self, ty: RawType) -> Result<RawType, QualTypeError> {
        enum Suffix {
            Array(Option<u64>),
            Function(Vec<RawType>, bool),
        }

        let mut suffixes = Vec::new();
        loop {
            if self.is_punct('[') {
                self.pos += 1;
                let count = match self.peek() {
                    Some(Token::Number(n)) => {
                        let n = *n;
                        self.pos += 1;
                        Some(n)
                    }
                    _ => None,
                };
                self.expect(']')?;
                suffixes.push(Suffix::Array(count));
            } else if self.is_punct('(') {
                self.pos += 1;
                let (args, variadic) = self.params()?;
                suffixes.push(Suffix::Function(args, variadic));
            } else {
                break;
            }
        }

        let mut ty = ty;
        for suffix in suffixes.into_iter().rev() {
            ty = match suffix {
                Suffix::Array(count) => RawType::array(ty, count),
                Suffix::Function(args, variadic) => RawType::function(ty, args, variadic),
            };
        }
        Ok(ty)
    }

    /// Parameters after the opening `(`, consuming the closing `)`.
    fn params(&mut self) -> Result<(Vec<RawType>, bool), QualTypeError> {
        let mut args = Vec::new();
        let mut variadic = false;

        if self.is_punct(')') {
            self.pos += 1;
            return Ok((args, variadic));
        }

        loop {
            if self.peek() == Some(&Token::Ellipsis) {
                self.pos += 1;
                variadic = true;
            } else {
                args.push(self.type_name()?);
            }

            match self.bump() {
                Some(Token::Punct(',')) => continue,
                Some(Token::Punct(')')) => break,
                Some(other) => return Err(QualTypeError::UnexpectedToken(other.to_string())),
                None => return Err(QualTypeError::UnexpectedEnd),
            }
        }

        if let [only] = args.as_slice() {
            if matches!(only.kind, RawTypeKind::Builtin(PrimitiveKind::Void)) && !only.is_const {
                args.clear();
            }
        }
        Ok((args, variadic))
    }
}

fn builtin(words: &[&str]) -> Result<PrimitiveKind, QualTypeError> {
    let count = |w: &str| words.iter().filter(|&&x| x == w).count();
    let unsigned = count("unsigned") > 0;
    let invalid = || QualTypeError::InvalidBuiltin(words.join(" "));

    let kind = if count("void") > 0 {
        PrimitiveKind::Void
    } else if count("_Bool") > 0 || count("bool") > 0 {
        PrimitiveKind::Bool
    } else if count("char") > 0 {
        if unsigned {
            PrimitiveKind::UChar
        } else if count("signed") > 0 {
            PrimitiveKind::SChar
        } else {
            PrimitiveKind::Char
        }
    } else if count("float") > 0 {
        PrimitiveKind::Float
    } else if count("double") > 0 {
        if count("long") > 0 {
            PrimitiveKind::LongDouble
        } else {
            PrimitiveKind::Double
        }
    } else if count("__int128") > 0 {
        if unsigned {
            PrimitiveKind::UInt128
        } else {
            PrimitiveKind::Int128
        }
    } else if count("short") > 0 {
        if unsigned {
            PrimitiveKind::UShort
        } else {
            PrimitiveKind::Short
        }
    } else {
        match (count("long"), unsigned) {
            (0, false) => PrimitiveKind::Int,
            (0, true) => PrimitiveKind::UInt,
            (1, false) => PrimitiveKind::Long,
            (1, true) => PrimitiveKind::ULong,
            (2, false) => PrimitiveKind::LongLong,
            (2, true) => PrimitiveKind::ULongLong,
            _ => return Err(invalid()),
        }
    };
    Ok(kind)
}

/// Parse a `qualType` string.
pub fn try_parse(qual_type: &str, names: &dyn TypeNames) -> Result<RawType, QualTypeError> {
    let mut parser = Parser {
        tokens: tokenize(qual_type)?,
        pos: 0,
        names,
    };
    let mut ty = parser.type_name()?;
    if let Some(token) = parser.peek() {
        return Err(QualTypeError::UnexpectedToken(token.to_string()));
    }
    ty.spelling = qual_type.trim().to_string();
    Ok(ty)
}

/// Parse a `qualType` string, falling back to an unexposed type.
pub fn parse(qual_type: &str, names: &dyn TypeNames) -> RawType {
    try_parse(qual_type, names).unwrap_or_else(|err| {
        tracing::debug!("Cannot parse type `{}`: {}", qual_type, err);
        RawType::new(RawTypeKind::Unexposed(qual_type.to_string()), qual_type.trim())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Names {
        typedefs: HashMap<&'static str, RawType>,
        anonymous: HashMap<&'static str, &'static str>,
    }

    impl TypeNames for Names {
        fn typedef(&self, name: &str) -> Option<RawType> {
            self.typedefs.get(name).cloned()
        }

        fn anonymous(&self, key: &str) -> Option<String> {
            self.anonymous.get(key).map(|s| s.to_string())
        }
    }

    fn names() -> Names {
        let mut names = Names::default();
        for (name, tag) in [
            ("RzBinFile", "rz_bin_file_t"),
            ("RzBuffer", "rz_buffer_t"),
            ("RzList", "rz_list_t"),
        ] {
            names
                .typedefs
                .insert(name, RawType::typedef(name, RawType::record(tag), None));
        }
        names.typedefs.insert(
            "ut8",
            RawType::typedef("ut8", RawType::builtin(PrimitiveKind::UChar), None),
        );
        names
            .anonymous
            .insert("unnamed struct at rz_bin.h:12:9", "RzBinAddr");
        names
    }

    #[test]
    fn test_builtins() {
        let n = names();
        let ty = parse("unsigned long long", &n);
        assert!(matches!(ty.kind, RawTypeKind::Builtin(PrimitiveKind::ULongLong)));
        assert_eq!(ty.spelling, "unsigned long long");

        let ty = parse("const char *", &n);
        let pointee = ty.pointee().unwrap();
        assert!(pointee.is_const);
        assert!(matches!(pointee.kind, RawTypeKind::Builtin(PrimitiveKind::Char)));

        assert!(matches!(
            parse("_Bool", &n).kind,
            RawTypeKind::Builtin(PrimitiveKind::Bool)
        ));
        assert!(matches!(
            parse("long double", &n).kind,
            RawTypeKind::Builtin(PrimitiveKind::LongDouble)
        ));
    }

    #[test]
    fn test_typedef_pointer() {
        let n = names();
        let ty = parse("const ut8 *", &n);
        assert_eq!(ty.spelling, "const ut8 *");
        let pointee = ty.pointee().unwrap();
        assert!(pointee.is_const);
        assert!(matches!(
            pointee.canonical().kind,
            RawTypeKind::Builtin(PrimitiveKind::UChar)
        ));

        let ty = parse("RzList *const", &n);
        assert!(ty.is_const);
        assert_eq!(ty.pointee().and_then(|p| p.record_name()), Some("rz_list_t"));
    }

    #[test]
    fn test_function_pointer() {
        let n = names();
        let ty = parse("bool (*)(RzBinFile *, RzBuffer *)", &n);
        let proto = ty.pointee().unwrap();
        assert!(matches!(
            proto.result().unwrap().kind,
            RawTypeKind::Builtin(PrimitiveKind::Bool)
        ));
        assert_eq!(proto.arguments().len(), 2);
        assert_eq!(
            proto.arguments()[1].pointee().and_then(|p| p.record_name()),
            Some("rz_buffer_t")
        );
    }

    #[test]
    fn test_function_prototypes() {
        let n = names();
        let ty = parse("void (void)", &n);
        assert!(ty.arguments().is_empty());

        let ty = parse("int (const char *, ...)", &n);
        match &ty.kind {
            RawTypeKind::FunctionProto { args, variadic, .. } => {
                assert_eq!(args.len(), 1);
                assert!(*variadic);
            }
            other => panic!("expected prototype, got {:?}", other),
        }

        // Pointer to a function returning a pointer to a function
        let ty = parse("void (*(*)(int))(char)", &n);
        let outer = ty.pointee().unwrap();
        assert_eq!(outer.arguments().len(), 1);
        let inner = outer.result().unwrap().pointee().unwrap();
        assert!(matches!(
            inner.arguments()[0].kind,
            RawTypeKind::Builtin(PrimitiveKind::Char)
        ));
    }

    #[test]
    fn test_arrays() {
        let n = names();
        let ty = parse("int (*)[8]", &n);
        match &ty.pointee().unwrap().kind {
            RawTypeKind::ConstantArray { count, .. } => assert_eq!(*count, 8),
            other => panic!("expected array, got {:?}", other),
        }

        let ty = parse("char [2][16]", &n);
        match &ty.kind {
            RawTypeKind::ConstantArray { element, count } => {
                assert_eq!(*count, 2);
                assert!(matches!(element.kind, RawTypeKind::ConstantArray { count: 16, .. }));
            }
            other => panic!("expected array, got {:?}", other),
        }

        assert!(matches!(
            parse("ut8 []", &n).kind,
            RawTypeKind::IncompleteArray(_)
        ));
    }

    #[test]
    fn test_tags() {
        let n = names();
        assert_eq!(parse("struct rz_core_t *", &n).pointee().and_then(|p| p.record_name()), Some("rz_core_t"));

        let ty = parse("union rz_reg_value", &n);
        assert_eq!(ty.record_name(), Some("rz_reg_value"));
        assert_eq!(ty.spelling, "union rz_reg_value");
        assert!(matches!(
            ty.canonical().kind,
            RawTypeKind::Record { is_union: true, .. }
        ));

        assert!(matches!(
            parse("enum rz_bin_type", &n).kind,
            RawTypeKind::Enum { .. }
        ));

        let ty = parse("struct (unnamed struct at rz_bin.h:12:9)", &n);
        assert_eq!(ty.record_name(), Some("RzBinAddr"));
        assert_eq!(ty.spelling, "struct (unnamed struct at rz_bin.h:12:9)");
    }

    #[test]
    fn test_unknown_is_unexposed() {
        let n = names();
        assert!(matches!(
            parse("__builtin_va_list", &n).kind,
            RawTypeKind::Unexposed(_)
        ));
        assert!(matches!(
            parse("struct (unnamed struct at other.h:1:1)", &n).kind,
            RawTypeKind::Unexposed(_)
        ));
        assert!(matches!(
            parse("int __attribute__((ext_vector_type(4)))", &n).kind,
            RawTypeKind::Unexposed(_)
        ));
        assert!(try_parse("int (", &n).is_err());
    }

    #[test]
    fn test_anonymous_key() {
        assert_eq!(
            anonymous_key("struct (unnamed struct at /src/rz_bin.h:12:9) *"),
            Some("unnamed struct at /src/rz_bin.h:12:9")
        );
        assert_eq!(anonymous_key("enum (anonymous enum at a.h:3:1)"), Some("anonymous enum at a.h:3:1"));
        assert_eq!(anonymous_key("struct rz_list_t"), None);
    }
}
