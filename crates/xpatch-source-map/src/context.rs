//! Source context for managing files

use crate::types::{FileId, Location, SourceSpan};
use crate::utils::offset_to_location;
use serde::{Deserialize, Serialize};

/// Registry of the files a run has read.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceContext {
    files: Vec<SourceFile>,
}

/// A source file with content
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceFile {
    /// File path or identifier
    pub path: String,
    /// File content. When `None`, the content is read from `path` on demand.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl SourceFile {
    /// Get the file content, reading it from disk for disk-backed files.
    pub fn read_content(&self) -> Option<String> {
        match &self.content {
            Some(c) => Some(c.clone()),
            None => std::fs::read_to_string(&self.path).ok(),
        }
    }
}

impl SourceContext {
    /// Create a new empty source context
    pub fn new() -> Self {
        Self { files: Vec::new() }
    }

    /// Add a file to the context and return its ID
    ///
    /// - If content is Some: the file is in-memory and the content is kept.
    /// - If content is None: the file is disk-backed and read when needed.
    pub fn add_file(&mut self, path: impl Into<String>, content: Option<String>) -> FileId {
        let id = FileId(self.files.len());
        self.files.push(SourceFile {
            path: path.into(),
            content,
        });
        id
    }

    /// Get a file by ID
    pub fn get_file(&self, id: FileId) -> Option<&SourceFile> {
        self.files.get(id.0)
    }

    /// Get the path of a file by ID
    pub fn path(&self, id: FileId) -> Option<&str> {
        self.get_file(id).map(|f| f.path.as_str())
    }

    /// Map the start of a span to a row/column location.
    pub fn location(&self, span: &SourceSpan) -> Option<Location> {
        let file = self.get_file(span.file?)?;
        let content = file.read_content()?;
        offset_to_location(&content, span.start)
    }

    /// Format a span as `path:line:column` (1-indexed) for plain-text output.
    pub fn describe(&self, span: &SourceSpan) -> Option<String> {
        let file = self.get_file(span.file?)?;
        let loc = self.location(span)?;
        Some(format!("{}:{}:{}", file.path, loc.row + 1, loc.column + 1))
    }

    /// Number of registered files
    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_and_get_file() {
        let mut ctx = SourceContext::new();
        let id = ctx.add_file("a.xml", Some("<a/>".into()));

        assert_eq!(id, FileId(0));
        assert_eq!(ctx.path(id), Some("a.xml"));
        assert_eq!(ctx.len(), 1);
        assert!(ctx.get_file(FileId(5)).is_none());
    }

    #[test]
    fn test_describe_span() {
        let mut ctx = SourceContext::new();
        let id = ctx.add_file("patch.xml", Some("<Patch>\n  <Update/>\n</Patch>".into()));

        let span = SourceSpan::new(id, 10, 19);
        assert_eq!(ctx.describe(&span).as_deref(), Some("patch.xml:2:3"));
    }

    #[test]
    fn test_detached_span_has_no_location() {
        let mut ctx = SourceContext::new();
        ctx.add_file("x.xml", Some("<x/>".into()));
        assert!(ctx.location(&SourceSpan::detached(0, 1)).is_none());
    }
}
