//! Parameter names of function pointer declarations.
//!
//! clang does not dump parameter declarations for a function pointer type
//! written in a field, a typedef or a parameter. They are recovered from the
//! source text following the declared name: `bool (*load)(RzBinFile *bf)`
//! yields one parameter `bf` whose type text spans `RzBinFile *`.

/// One parameter as written in the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamText {
    /// Declared name, empty when the parameter is unnamed
    pub name: String,

    /// Offset of the first character of the type
    pub start: usize,

    /// Offset of the name, or of the end of the type when unnamed
    pub name_offset: usize,

    /// Parameters of a nested function pointer, e.g. a callback argument
    pub nested: Option<Vec<ParamText>>,
}

const TYPE_KEYWORDS: &[&str] = &[
    "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned", "_Bool",
    "bool", "const", "volatile", "restrict", "struct", "union", "enum",
];

/// Skip whitespace and comments starting at `i`.
fn skip_trivia(text: &str, mut i: usize) -> usize {
    loop {
        let rest = &text[i..];
        let trimmed = rest.trim_start();
        i += rest.len() - trimmed.len();
        if trimmed.starts_with("/*") {
            match trimmed.find("*/") {
                Some(end) => i += end + 2,
                None => return text.len(),
            }
        } else if trimmed.starts_with("//") {
            match trimmed.find('\n') {
                Some(end) => i += end + 1,
                None => return text.len(),
            }
        } else {
            return i;
        }
    }
}

/// Length of the block comment starting at `i`, if one does.
fn comment_len(bytes: &[u8], i: usize, end: usize) -> Option<usize> {
    if !bytes[i..end].starts_with(b"/*") {
        return None;
    }
    let close = bytes[i + 2..end]
        .windows(2)
        .position(|w| w == b"*/")
        .map(|p| p + 4)
        .unwrap_or(end - i);
    Some(close)
}

/// Offset of the bracket closing the one at `open`, skipping comments.
fn matching(text: &str, open: usize, left: u8, right: u8) -> Option<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        if let Some(len) = comment_len(bytes, i, bytes.len()) {
            i += len;
            continue;
        }
        if bytes[i] == left {
            depth += 1;
        } else if bytes[i] == right {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
        i += 1;
    }
    None
}

/// Recover the parameter list that follows a declared name.
///
/// `text` is the file contents and `after_name` the offset just past the
/// name. Returns `None` when no parameter list can be found.
pub fn recover(text: &str, after_name: usize) -> Option<Vec<ParamText>> {
    let mut i = after_name;
    loop {
        i = skip_trivia(text, i);
        match text.as_bytes().get(i)? {
            b')' => i += 1,
            b'[' => i = matching(text, i, b'[', b']')? + 1,
            b'(' => break,
            _ => return None,
        }
    }

    let close = matching(text, i, b'(', b')')?;
    let mut params = Vec::new();
    for (start, end) in split(text, i + 1, close) {
        if let Some(param) = piece(text, start, end) {
            params.push(param);
        }
    }

    // `(void)` declares no parameters
    if let [only] = params.as_slice() {
        if only.name.is_empty() && text[only.start..only.name_offset].trim() == "void" {
            params.clear();
        }
    }
    Some(params)
}

/// Byte ranges of the comma-separated pieces between `start` and `end`.
fn split(text: &str, start: usize, end: usize) -> Vec<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut pieces = Vec::new();
    let mut depth = 0usize;
    let mut piece_start = start;
    let mut i = start;

    while i < end {
        if let Some(len) = comment_len(bytes, i, end) {
            i += len;
            continue;
        }
        match bytes[i] {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                pieces.push((piece_start, i));
                piece_start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    pieces.push((piece_start, end));
    pieces
}

fn piece(text: &str, start: usize, end: usize) -> Option<ParamText> {
    let start = skip_leading_space(text, start, end);
    let body = text[start..end].trim_end();
    if body.is_empty() || body == "..." {
        return None;
    }

    // Nested function pointer: the name follows `(*`
    if let Some(star) = body.find("(*") {
        let bytes = text.as_bytes();
        let mut name_start = start + star + 2;
        while name_start < end && (bytes[name_start] == b'*' || bytes[name_start].is_ascii_whitespace()) {
            name_start += 1;
        }
        let name_len = identifier_len(&text[name_start..end]);
        let name = text[name_start..name_start + name_len].to_string();
        let nested = recover(&text[..end], name_start + name_len);
        return Some(ParamText {
            name_offset: if name.is_empty() { start + star } else { name_start },
            name,
            start,
            nested,
        });
    }

    let words = words(text, start, start + body.len());
    let named = match words.as_slice() {
        [.., (prev, _), (last, _)] => {
            !TYPE_KEYWORDS.contains(&last.as_str())
                && !matches!(prev.as_str(), "struct" | "union" | "enum")
                && !body.trim_end_matches(']').ends_with('*')
        }
        _ => false,
    };

    let unnamed = ParamText {
        name: String::new(),
        start,
        name_offset: start + body.len(),
        nested: None,
    };
    if !named {
        return Some(unnamed);
    }
    match words.last() {
        Some((name, offset)) => Some(ParamText {
            name: name.clone(),
            start,
            name_offset: *offset,
            nested: None,
        }),
        None => Some(unnamed),
    }
}

fn skip_leading_space(text: &str, start: usize, end: usize) -> usize {
    let rest = &text[start..end];
    start + rest.len() - rest.trim_start().len()
}

fn identifier_len(text: &str) -> usize {
    text.bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'_')
        .count()
}

/// Identifiers outside comments and array suffixes, with their offsets.
fn words(text: &str, start: usize, end: usize) -> Vec<(String, usize)> {
    let bytes = text.as_bytes();
    let mut words = Vec::new();
    let mut i = start;

    while i < end {
        if let Some(len) = comment_len(bytes, i, end) {
            i += len;
        } else if bytes[i] == b'[' {
            i = matching(&text[..end], i, b'[', b']').map(|c| c + 1).unwrap_or(end);
        } else if bytes[i].is_ascii_alphabetic() || bytes[i] == b'_' {
            let len = identifier_len(&text[i..end]);
            words.push((text[i..i + len].to_string(), i));
            i += len;
        } else {
            i += 1;
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(params: &[ParamText]) -> Vec<&str> {
        params.iter().map(|p| p.name.as_str()).collect()
    }

    fn after(text: &str, name: &str) -> usize {
        text.find(name).unwrap() + name.len()
    }

    #[test]
    fn test_field_hook() {
        let text = "\tbool (*load_buffer)(RzBinFile *bf, RzBuffer *buf, ut64 loadaddr);";
        let params = recover(text, after(text, "load_buffer")).unwrap();
        assert_eq!(names(&params), vec!["bf", "buf", "loadaddr"]);
        assert_eq!(&text[params[0].start..params[0].name_offset], "RzBinFile *");
    }

    #[test]
    fn test_unnamed_and_void() {
        let text = "void (*destroy)(RzBinFile *, struct rz_buffer_t, const int);";
        let params = recover(text, after(text, "destroy")).unwrap();
        assert_eq!(names(&params), vec!["", "", ""]);
        assert_eq!(&text[params[1].start..params[1].name_offset], "struct rz_buffer_t");

        let text = "typedef void (*RzListFree)(void);";
        assert!(recover(text, after(text, "RzListFree")).unwrap().is_empty());

        let text = "typedef int RzCmp(const void *a, const void *b);";
        assert_eq!(names(&recover(text, after(text, "RzCmp")).unwrap()), vec!["a", "b"]);
    }

    #[test]
    fn test_annotation_comment_kept_in_type() {
        let text = "void (*on_list)(RzList /*<RzBinSymbol *>*/ *symbols, int n);";
        let params = recover(text, after(text, "on_list")).unwrap();
        assert_eq!(names(&params), vec!["symbols", "n"]);
        assert_eq!(
            &text[params[0].start..params[0].name_offset],
            "RzList /*<RzBinSymbol *>*/ *"
        );
    }

    #[test]
    fn test_nested_callback() {
        let text = "int (*walk)(void *user, int (*cb)(void *item, int depth), ...);";
        let params = recover(text, after(text, "walk")).unwrap();
        assert_eq!(names(&params), vec!["user", "cb"]);
        let nested = params[1].nested.as_ref().unwrap();
        assert_eq!(names(nested), vec!["item", "depth"]);
    }

    #[test]
    fn test_arrays_and_missing_list() {
        let text = "void (*hooks[4])(ut8 data[16]);";
        let params = recover(text, after(text, "hooks")).unwrap();
        assert_eq!(names(&params), vec!["data"]);

        let text = "int count;";
        assert!(recover(text, after(text, "count")).is_none());
    }
}
