//! Error types for parsing and tree mutation.

use crate::node::{NodeId, NodeKind};
use thiserror::Error;
use xpatch_source_map::SourceSpan;

/// Result type alias for parse operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while parsing XML text.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// XML syntax error from quick-xml.
    #[error("XML syntax error: {message}{}", position.map(|p| format!(" at byte {}", p)).unwrap_or_default())]
    XmlSyntax {
        message: String,
        /// Byte offset where the error occurred.
        position: Option<u64>,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof {
        expected: String,
        location: Option<SourceSpan>,
    },

    /// Mismatched end tag.
    #[error("Mismatched end tag: expected </{expected}>, found </{found}>")]
    MismatchedEndTag {
        expected: String,
        found: String,
        location: Option<SourceSpan>,
    },

    /// Invalid XML structure.
    #[error("Invalid XML structure: {message}")]
    InvalidStructure {
        message: String,
        location: Option<SourceSpan>,
    },

    /// Empty document (no root element).
    #[error("Empty XML document: no root element found")]
    EmptyDocument,

    /// Multiple root elements.
    #[error("Invalid XML: multiple root elements")]
    MultipleRoots { location: Option<SourceSpan> },
}

impl Error {
    /// Source location of the error, when one is known.
    pub fn location(&self) -> Option<SourceSpan> {
        match self {
            Error::UnexpectedEof { location, .. }
            | Error::MismatchedEndTag { location, .. }
            | Error::InvalidStructure { location, .. }
            | Error::MultipleRoots { location } => *location,
            Error::XmlSyntax { .. } | Error::EmptyDocument => None,
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlSyntax {
            message: err.to_string(),
            position: None,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlSyntax {
            message: format!("Attribute error: {}", err),
            position: None,
        }
    }
}

/// Errors raised by structural edits on a [`Document`](crate::Document).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    #[error("node {node} has no parent")]
    NoParent { node: NodeId },

    #[error("node {node} already has a parent")]
    AlreadyAttached { node: NodeId },

    #[error("node {node} is not a child of {parent}")]
    NotAChild { node: NodeId, parent: NodeId },

    #[error("inserting {node} under {parent} would create a cycle")]
    Cycle { node: NodeId, parent: NodeId },

    #[error("a {kind} node cannot have children")]
    NotAContainer { kind: NodeKind },

    #[error("expected an element, found a {kind} node")]
    NotAnElement { kind: NodeKind },

    #[error("a {kind} node has no text value")]
    NoValue { kind: NodeKind },

    #[error("the document already has a root element")]
    MultipleRoots,

    #[error("a {kind} node cannot be placed at document level")]
    InvalidDocumentChild { kind: NodeKind },

    #[error("the document node cannot be moved or copied")]
    DocumentNode,
}
