/*
 * mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Execution contexts threaded through patch evaluation.
 */

//! Execution contexts.
//!
//! Every operation runs inside a context that knows the navigation cursor,
//! the patch being applied and the operation being executed. Contexts are
//! derived, never mutated: entering a patch, moving the cursor, executing an
//! operation and performing an action each produce a child context.
//! [`DefaultContext`] forgets children as soon as they go out of scope;
//! [`DebugContext`] appends each one to a [`Trace`].

mod debug;
mod default;

pub use debug::{ContextId, ContextType, DebugContext, Trace, TraceNode};
pub use default::DefaultContext;

use crate::op::{Op, OpId};
use crate::position::Position;
use serde::Serialize;
use std::sync::Arc;
use xpatch_dom::NodeId;
use xpatch_path::Item;
use xpatch_source_map::SourceSpan;

/// Identity of a patch within a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchRef {
    /// Position in the run order.
    pub index: usize,
    pub name: Arc<str>,
}

/// Identity of an operation, cheap to clone into contexts and errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OpRef {
    pub id: OpId,
    pub tag: &'static str,
    pub path: Arc<str>,
    /// The element the operation was loaded from, in its patch document.
    pub element: NodeId,
    pub span: Option<SourceSpan>,
}

impl OpRef {
    pub fn of(op: &Op) -> Self {
        Self {
            id: op.id,
            tag: op.kind.tag(),
            path: op.path_source(),
            element: op.element,
            span: op.span,
        }
    }
}

/// An operation paired with the context it executes in.
#[derive(Debug)]
pub struct Execution<C> {
    pub op: OpRef,
    pub context: C,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActionKind {
    /// Fold a template element into the target.
    Merge,
    SetAttribute,
    /// Replace element content or a node's character data.
    SetText,
    Insert,
    Delete,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Merge => "merge",
            ActionKind::SetAttribute => "set-attribute",
            ActionKind::SetText => "set-text",
            ActionKind::Insert => "insert",
            ActionKind::Delete => "delete",
        }
    }
}

/// What an action put into the document.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum ActionSource {
    /// An element of the patch document.
    Template(NodeId),
    Text(String),
    /// A node created in the target document.
    Node(NodeId),
}

/// One document mutation as seen by a context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Action {
    pub op: Option<OpRef>,
    pub kind: ActionKind,
    pub target: Item,
    pub source: Option<ActionSource>,
    pub position: Position,
}

/// The capability surface operations evaluate against.
pub trait ExecContext: Sized {
    /// The node relative paths resolve from.
    fn cursor(&self) -> NodeId;

    fn with_patch(&self, patch: &PatchRef) -> Self;

    fn with_nav(&self, cursor: NodeId) -> Self;

    fn execution(&self, op: &Op) -> Execution<Self>;

    fn action(
        &self,
        kind: ActionKind,
        target: Item,
        source: Option<ActionSource>,
        position: Position,
    ) -> Action;

    /// Close this scope. Scopes left open mark where a run failed.
    fn end(&self);
}
