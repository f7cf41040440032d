//! In-memory source files.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::core::decl::{SourceLocation, TokenSource};

#[derive(Debug)]
struct SourceFile {
    text: String,
    /// Byte offset of the start of every line
    line_starts: Vec<usize>,
}

impl SourceFile {
    fn new(text: String) -> Self {
        let line_starts = std::iter::once(0)
            .chain(text.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        SourceFile { text, line_starts }
    }
}

/// Source text of every file a translation unit was parsed from.
#[derive(Debug, Default)]
pub struct SourceMap {
    files: HashMap<Arc<str>, SourceFile>,
}

impl SourceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a file's contents under `name`.
    pub fn insert(&mut self, name: impl Into<Arc<str>>, text: impl Into<String>) {
        self.files.insert(name.into(), SourceFile::new(text.into()));
    }

    /// Read a file from disk, registering it under its path.
    pub fn load(&mut self, path: &Path) -> Result<Arc<str>> {
        let text = crate::util::fs::read_to_string(path)
            .with_context(|| format!("failed to read source {}", path.display()))?;
        let name: Arc<str> = path.to_string_lossy().into();
        self.insert(Arc::clone(&name), text);
        Ok(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.files.contains_key(name)
    }

    /// Full text of a file.
    pub fn text(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(|f| f.text.as_str())
    }

    /// Registered file names, sorted.
    pub fn file_names(&self) -> Vec<Arc<str>> {
        let mut names: Vec<_> = self.files.keys().cloned().collect();
        names.sort();
        names
    }

    /// Build the location of a byte offset in `file`.
    pub fn location(&self, file: &str, offset: usize) -> Option<SourceLocation> {
        let (name, source) = self.files.get_key_value(file)?;
        if offset > source.text.len() {
            return None;
        }
        let line = match source.line_starts.binary_search(&offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        let column = offset - source.line_starts[line] + 1;
        Some(SourceLocation::new(
            Arc::clone(name),
            line as u32 + 1,
            column as u32,
            offset,
        ))
    }
}

impl TokenSource for SourceMap {
    fn text_between(&self, start: &SourceLocation, end: &SourceLocation) -> Option<&str> {
        if start.file != end.file || start.offset > end.offset {
            return None;
        }
        let text = &self.files.get(&*start.file)?.text;
        text.get(start.offset..end.offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_of_offset() {
        let mut map = SourceMap::new();
        map.insert("a.h", "int a;\nint b;\n");

        let loc = map.location("a.h", 11).unwrap();
        assert_eq!((loc.line, loc.column), (2, 5));
        assert!(map.location("a.h", 100).is_none());
        assert!(map.location("b.h", 0).is_none());
    }

    #[test]
    fn test_text_between() {
        let mut map = SourceMap::new();
        map.insert("a.h", "RzList /*<int>*/ *items;");

        let start = map.location("a.h", 0).unwrap();
        let end = map.location("a.h", 18).unwrap();
        assert_eq!(map.text_between(&start, &end), Some("RzList /*<int>*/ *"));
        assert_eq!(map.text_between(&end, &start), None);
    }
}
