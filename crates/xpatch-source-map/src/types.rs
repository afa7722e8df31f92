//! Core types for source mapping

use serde::{Deserialize, Serialize};

/// A unique identifier for a source file registered in a
/// [`SourceContext`](crate::SourceContext).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(pub usize);

/// A location in source text (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    /// Byte offset from start of source
    pub offset: usize,
    /// Row number (0-indexed)
    pub row: usize,
    /// Column number (0-indexed, in characters not bytes)
    pub column: usize,
}

/// A byte range inside one source file.
///
/// `end` is exclusive. Spans without a file (`file == None`) come from
/// in-memory text that was never registered; they still carry offsets so
/// tests and plain-text diagnostics can use them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SourceSpan {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<FileId>,
    pub start: usize,
    pub end: usize,
}

impl SourceSpan {
    /// Create a span inside a registered file.
    pub fn new(file: FileId, start: usize, end: usize) -> Self {
        Self {
            file: Some(file),
            start,
            end,
        }
    }

    /// Create a span for text that is not registered in any context.
    pub fn detached(start: usize, end: usize) -> Self {
        Self {
            file: None,
            start,
            end,
        }
    }

    /// Create a span with the given file, or a detached span if `file` is `None`.
    pub fn in_file(file: Option<FileId>, start: usize, end: usize) -> Self {
        Self { file, start, end }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    /// Narrow this span to a sub-range relative to its start.
    ///
    /// The result is clamped to the bounds of `self`.
    pub fn sub_span(&self, rel_start: usize, rel_end: usize) -> Self {
        let start = (self.start + rel_start).min(self.end);
        let end = (self.start + rel_end).clamp(start, self.end);
        Self {
            file: self.file,
            start,
            end,
        }
    }

    /// The smallest span covering both `self` and `other`.
    ///
    /// Spans from different files keep `self`.
    pub fn join(&self, other: &SourceSpan) -> Self {
        if self.file != other.file {
            return *self;
        }
        Self {
            file: self.file,
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_id_equality() {
        assert_eq!(FileId(0), FileId(0));
        assert_ne!(FileId(0), FileId(1));
    }

    #[test]
    fn test_location_ordering() {
        let loc1 = Location {
            offset: 0,
            row: 0,
            column: 0,
        };
        let loc2 = Location {
            offset: 10,
            row: 1,
            column: 0,
        };
        assert!(loc1 < loc2);
    }

    #[test]
    fn test_sub_span_is_clamped() {
        let span = SourceSpan::new(FileId(3), 10, 20);

        let inner = span.sub_span(2, 5);
        assert_eq!(inner, SourceSpan::new(FileId(3), 12, 15));

        let overflow = span.sub_span(8, 50);
        assert_eq!(overflow, SourceSpan::new(FileId(3), 18, 20));
    }

    #[test]
    fn test_join() {
        let a = SourceSpan::new(FileId(0), 4, 8);
        let b = SourceSpan::new(FileId(0), 6, 12);
        assert_eq!(a.join(&b), SourceSpan::new(FileId(0), 4, 12));

        let other_file = SourceSpan::new(FileId(1), 0, 100);
        assert_eq!(a.join(&other_file), a);
    }

    #[test]
    fn test_detached_span_serialization() {
        let span = SourceSpan::detached(1, 2);
        let json = serde_json::to_string(&span).unwrap();
        assert_eq!(json, r#"{"start":1,"end":2}"#);
    }
}
