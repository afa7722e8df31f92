//! Error types for loading and applying patches.

use crate::context::{OpRef, PatchRef};
use std::fmt;
use thiserror::Error;
use xpatch_dom::{NodeKind, TreeError};
use xpatch_path::{EvalError, ParseError};
use xpatch_source_map::SourceSpan;

/// What went wrong, independent of where.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PatchError {
    #[error("invalid path '{path}': {source}")]
    PathSyntax {
        path: String,
        source: ParseError,
        span: Option<SourceSpan>,
    },

    #[error("{message}")]
    Configuration {
        message: String,
        span: Option<SourceSpan>,
    },

    #[error("cannot merge a {kind} node into an element")]
    UnsupportedMergeContent {
        kind: NodeKind,
        span: Option<SourceSpan>,
    },

    #[error("{message}")]
    TemplateShape {
        message: String,
        span: Option<SourceSpan>,
    },

    #[error("unknown operation <{tag}>")]
    UnknownOperation {
        tag: String,
        span: Option<SourceSpan>,
    },

    #[error("cannot {action} {target}")]
    UnsupportedTarget {
        action: &'static str,
        target: String,
    },

    #[error("path evaluation failed: {0}")]
    Query(#[from] EvalError),

    #[error("document edit failed: {0}")]
    Tree(#[from] TreeError),

    #[error("malformed patch document: {0}")]
    Xml(#[from] xpatch_dom::Error),
}

impl PatchError {
    pub fn configuration(message: impl Into<String>) -> Self {
        PatchError::Configuration {
            message: message.into(),
            span: None,
        }
    }

    pub fn template_shape(message: impl Into<String>) -> Self {
        PatchError::TemplateShape {
            message: message.into(),
            span: None,
        }
    }

    /// Attach a span unless the error already carries one.
    pub fn with_span(mut self, new_span: Option<SourceSpan>) -> Self {
        match &mut self {
            PatchError::PathSyntax { span, .. }
            | PatchError::Configuration { span, .. }
            | PatchError::UnsupportedMergeContent { span, .. }
            | PatchError::TemplateShape { span, .. }
            | PatchError::UnknownOperation { span, .. } => {
                if span.is_none() {
                    *span = new_span;
                }
            }
            _ => {}
        }
        self
    }

    /// Where in a patch or document the problem is, when known.
    pub fn span(&self) -> Option<SourceSpan> {
        match self {
            PatchError::PathSyntax { span, .. }
            | PatchError::Configuration { span, .. }
            | PatchError::UnsupportedMergeContent { span, .. }
            | PatchError::TemplateShape { span, .. }
            | PatchError::UnknownOperation { span, .. } => *span,
            PatchError::Xml(err) => err.location(),
            PatchError::UnsupportedTarget { .. } | PatchError::Query(_) | PatchError::Tree(_) => {
                None
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, PatchError>;

/// A patch that could not be built.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to load patch '{name}': {kind}")]
pub struct LoadError {
    pub name: String,
    #[source]
    pub kind: PatchError,
}

/// A failure while applying a patch, with the patch, operation and target
/// node it happened at.
///
/// Mutations made before the failure stay in the document.
#[derive(Debug, Clone, PartialEq)]
pub struct ApplyError {
    pub kind: PatchError,
    pub patch: Option<PatchRef>,
    pub operation: Option<OpRef>,
    /// Literal rendering of the target node.
    pub target: Option<String>,
}

impl ApplyError {
    pub fn new(kind: PatchError) -> Self {
        Self {
            kind,
            patch: None,
            operation: None,
            target: None,
        }
    }

    /// Record the operation unless an inner one already did.
    pub fn within_op(mut self, op: &OpRef) -> Self {
        if self.operation.is_none() {
            self.operation = Some(op.clone());
        }
        self
    }

    pub fn within_patch(mut self, patch: &PatchRef) -> Self {
        if self.patch.is_none() {
            self.patch = Some(patch.clone());
        }
        self
    }

    pub fn at_target(mut self, target: String) -> Self {
        if self.target.is_none() {
            self.target = Some(target);
        }
        self
    }
}

impl From<PatchError> for ApplyError {
    fn from(kind: PatchError) -> Self {
        ApplyError::new(kind)
    }
}

impl fmt::Display for ApplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.patch {
            Some(patch) => write!(f, "patch '{}' failed", patch.name)?,
            None => f.write_str("patch failed")?,
        }
        if let Some(op) = &self.operation {
            write!(f, " in <{}> #{} (Path=\"{}\")", op.tag, op.id, op.path)?;
        }
        if let Some(target) = &self.target {
            write!(f, " at {}", target)?;
        }
        write!(f, ": {}", self.kind)
    }
}

impl std::error::Error for ApplyError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}
