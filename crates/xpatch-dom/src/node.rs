//! Node payload types.

use serde::{Deserialize, Serialize};
use xpatch_source_map::SourceSpan;

/// Handle of a node inside a [`Document`](crate::Document) arena.
///
/// Handles are only meaningful for the document that created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discriminant of [`NodeData`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    Comment,
    ProcessingInstruction,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Element => "element",
            NodeKind::Text => "text",
            NodeKind::Comment => "comment",
            NodeKind::ProcessingInstruction => "processing-instruction",
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The payload of a node.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    /// The document node. Exactly one per arena, always at index 0.
    Document,

    /// An element with its attributes in document order.
    Element {
        name: String,
        attributes: Vec<Attribute>,
    },

    /// Character data (text and CDATA sections).
    Text(String),

    /// A comment, without the `<!--`/`-->` delimiters.
    Comment(String),

    /// A processing instruction `<?target data?>`.
    ProcessingInstruction { target: String, data: String },
}

impl NodeData {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::Document => NodeKind::Document,
            NodeData::Element { .. } => NodeKind::Element,
            NodeData::Text(_) => NodeKind::Text,
            NodeData::Comment(_) => NodeKind::Comment,
            NodeData::ProcessingInstruction { .. } => NodeKind::ProcessingInstruction,
        }
    }

    pub fn element(name: impl Into<String>) -> Self {
        NodeData::Element {
            name: name.into(),
            attributes: Vec::new(),
        }
    }
}

/// An attribute with optional source spans for its name and value.
///
/// Spans survive import into another document, so an attribute copied out of
/// a patch file still points at the patch file.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
    pub name_span: Option<SourceSpan>,
    /// Span of the value including its quotes.
    pub value_span: Option<SourceSpan>,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            name_span: None,
            value_span: None,
        }
    }
}
