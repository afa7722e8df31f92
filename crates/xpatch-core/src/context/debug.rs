/*
 * debug.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Context that records every scope into a trace.
 */

use super::{Action, ActionKind, ActionSource, ExecContext, Execution, OpRef, PatchRef};
use crate::load::Patch;
use crate::op::{Op, describe_item};
use crate::position::Position;
use serde::Serialize;
use std::cell::{Ref, RefCell};
use std::fmt::Write;
use std::rc::Rc;
use xpatch_dom::display::render_inline;
use xpatch_dom::{Document, NodeId};
use xpatch_path::Item;

/// Handle of a context inside a [`Trace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ContextId(u32);

impl ContextId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Why a traced context was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ContextType {
    Root,
    Patch,
    Nav,
    Exec,
    Action,
}

/// One recorded context.
#[derive(Debug, Clone, Serialize)]
pub struct TraceNode {
    parent: Option<ContextId>,
    kind: ContextType,
    cursor: NodeId,
    patch: Option<PatchRef>,
    exec: Option<OpRef>,
    action: Option<Action>,
    children: Vec<ContextId>,
    ended: bool,
}

impl TraceNode {
    pub fn parent(&self) -> Option<ContextId> {
        self.parent
    }

    pub fn kind(&self) -> ContextType {
        self.kind
    }

    pub fn cursor(&self) -> NodeId {
        self.cursor
    }

    /// The patch in effect, inherited from the parent.
    pub fn patch(&self) -> Option<&PatchRef> {
        self.patch.as_ref()
    }

    /// The operation in effect, inherited from the parent.
    pub fn exec(&self) -> Option<&OpRef> {
        self.exec.as_ref()
    }

    pub fn action(&self) -> Option<&Action> {
        self.action.as_ref()
    }

    pub fn children(&self) -> &[ContextId] {
        &self.children
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

/// Arena of every context a [`DebugContext`] produced, rooted at index 0.
#[derive(Debug, Clone, Serialize)]
pub struct Trace {
    nodes: Vec<TraceNode>,
}

impl Trace {
    fn new(cursor: NodeId) -> Self {
        Self {
            nodes: vec![TraceNode {
                parent: None,
                kind: ContextType::Root,
                cursor,
                patch: None,
                exec: None,
                action: None,
                children: Vec::new(),
                ended: false,
            }],
        }
    }

    pub fn root(&self) -> ContextId {
        ContextId(0)
    }

    pub fn node(&self, id: ContextId) -> &TraceNode {
        &self.nodes[id.index()]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Contexts in creation order.
    pub fn iter(&self) -> impl Iterator<Item = (ContextId, &TraceNode)> {
        self.nodes
            .iter()
            .enumerate()
            .map(|(i, node)| (ContextId(i as u32), node))
    }

    /// Every recorded action in the order it happened.
    pub fn actions(&self) -> impl Iterator<Item = &Action> {
        self.nodes.iter().filter_map(|node| node.action.as_ref())
    }

    /// Scopes that were entered but never ended, excluding the root.
    pub fn unended(&self) -> Vec<ContextId> {
        self.iter()
            .filter(|(_, node)| {
                !node.ended && !matches!(node.kind, ContextType::Root | ContextType::Action)
            })
            .map(|(id, _)| id)
            .collect()
    }

    fn push(&mut self, parent: ContextId, mut node: TraceNode) -> ContextId {
        let id = ContextId(self.nodes.len() as u32);
        let parent_node = &self.nodes[parent.index()];
        if node.patch.is_none() {
            node.patch = parent_node.patch.clone();
        }
        if node.exec.is_none() {
            node.exec = parent_node.exec.clone();
        }
        node.parent = Some(parent);
        self.nodes.push(node);
        self.nodes[parent.index()].children.push(id);
        id
    }

    /// Indented text rendering of the context tree.
    ///
    /// Nodes are rendered from `doc` as it is now, and template sources from
    /// the patch each context belongs to.
    pub fn render_text(&self, doc: &Document, patches: &[Patch]) -> String {
        let mut out = String::new();
        let mut stack = vec![(self.root(), 0usize)];
        while let Some((id, depth)) = stack.pop() {
            let node = self.node(id);
            let _ = write!(out, "{:indent$}", "", indent = depth * 2);
            self.render_line(&mut out, node, doc, patches);
            if !node.ended && !matches!(node.kind, ContextType::Root | ContextType::Action) {
                out.push_str(" (not ended)");
            }
            out.push('\n');
            for &child in node.children.iter().rev() {
                stack.push((child, depth + 1));
            }
        }
        out
    }

    fn render_line(&self, out: &mut String, node: &TraceNode, doc: &Document, patches: &[Patch]) {
        match node.kind {
            ContextType::Root => out.push_str("root"),
            ContextType::Patch => match &node.patch {
                Some(patch) => {
                    let _ = write!(out, "patch {} \"{}\"", patch.index, patch.name);
                }
                None => out.push_str("patch"),
            },
            ContextType::Nav => {
                let _ = write!(out, "nav {}", describe_item(doc, &Item::Node(node.cursor)));
            }
            ContextType::Exec => match &node.exec {
                Some(op) => {
                    let _ = write!(out, "exec <{}> #{} Path=\"{}\"", op.tag, op.id, op.path);
                }
                None => out.push_str("exec"),
            },
            ContextType::Action => {
                let Some(action) = &node.action else {
                    out.push_str("action");
                    return;
                };
                let _ = write!(
                    out,
                    "{} {}",
                    action.kind.as_str(),
                    describe_item(doc, &action.target)
                );
                if action.position != Position::Default {
                    let _ = write!(out, " [{}]", action.position);
                }
                if let Some(source) = &action.source {
                    let template = node
                        .patch
                        .as_ref()
                        .and_then(|p| patches.get(p.index))
                        .map(Patch::document);
                    let _ = write!(out, " <- {}", render_source(doc, template, source));
                }
            }
        }
    }
}

fn render_source(doc: &Document, template: Option<&Document>, source: &ActionSource) -> String {
    match source {
        ActionSource::Template(id) => match template {
            Some(template) => render_inline(template, *id),
            None => format!("template {}", id),
        },
        ActionSource::Text(text) => format!("\"{}\"", text),
        ActionSource::Node(id) => render_inline(doc, *id),
    }
}

/// Context that records every scope into a shared [`Trace`].
///
/// Clones share the trace. The trace lives as long as any context does.
#[derive(Debug, Clone)]
pub struct DebugContext {
    trace: Rc<RefCell<Trace>>,
    id: ContextId,
    cursor: NodeId,
}

impl DebugContext {
    pub fn root(cursor: NodeId) -> Self {
        Self {
            trace: Rc::new(RefCell::new(Trace::new(cursor))),
            id: ContextId(0),
            cursor,
        }
    }

    pub fn id(&self) -> ContextId {
        self.id
    }

    pub fn trace(&self) -> Ref<'_, Trace> {
        self.trace.borrow()
    }

    /// A copy of the trace as recorded so far.
    pub fn snapshot(&self) -> Trace {
        self.trace.borrow().clone()
    }

    fn child(
        &self,
        kind: ContextType,
        cursor: NodeId,
        patch: Option<PatchRef>,
        exec: Option<OpRef>,
        action: Option<Action>,
    ) -> Self {
        let ended = kind == ContextType::Action;
        let id = self.trace.borrow_mut().push(
            self.id,
            TraceNode {
                parent: None,
                kind,
                cursor,
                patch,
                exec,
                action,
                children: Vec::new(),
                ended,
            },
        );
        Self {
            trace: Rc::clone(&self.trace),
            id,
            cursor,
        }
    }
}

impl ExecContext for DebugContext {
    fn cursor(&self) -> NodeId {
        self.cursor
    }

    fn with_patch(&self, patch: &PatchRef) -> Self {
        self.child(ContextType::Patch, self.cursor, Some(patch.clone()), None, None)
    }

    fn with_nav(&self, cursor: NodeId) -> Self {
        self.child(ContextType::Nav, cursor, None, None, None)
    }

    fn execution(&self, op: &Op) -> Execution<Self> {
        let op = OpRef::of(op);
        let context = self.child(ContextType::Exec, self.cursor, None, Some(op.clone()), None);
        Execution { op, context }
    }

    fn action(
        &self,
        kind: ActionKind,
        target: Item,
        source: Option<ActionSource>,
        position: Position,
    ) -> Action {
        let action = Action {
            op: self.trace.borrow().node(self.id).exec.clone(),
            kind,
            target,
            source,
            position,
        };
        self.child(ContextType::Action, self.cursor, None, None, Some(action.clone()));
        action
    }

    fn end(&self) {
        self.trace.borrow_mut().nodes[self.id.index()].ended = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn patch_ref() -> PatchRef {
        PatchRef {
            index: 0,
            name: Arc::from("p"),
        }
    }

    #[test]
    fn test_children_are_retained() {
        let doc = Document::new();
        let root = DebugContext::root(doc.document_node());
        let patch = root.with_patch(&patch_ref());
        let nav = patch.with_nav(doc.document_node());
        nav.end();
        patch.end();

        let trace = root.trace();
        assert_eq!(trace.len(), 3);
        let patch_node = trace.node(patch.id());
        assert_eq!(patch_node.kind(), ContextType::Patch);
        assert_eq!(patch_node.children(), &[nav.id()]);
        assert!(patch_node.is_ended());
    }

    #[test]
    fn test_patch_is_inherited() {
        let doc = Document::new();
        let root = DebugContext::root(doc.document_node());
        let nav = root.with_patch(&patch_ref()).with_nav(doc.document_node());
        let trace = root.trace();
        assert_eq!(trace.node(nav.id()).patch(), Some(&patch_ref()));
        assert_eq!(trace.node(nav.id()).kind(), ContextType::Nav);
    }

    #[test]
    fn test_unended_scopes() {
        let doc = Document::new();
        let root = DebugContext::root(doc.document_node());
        let open = root.with_patch(&patch_ref());
        let closed = root.with_nav(doc.document_node());
        closed.end();
        assert_eq!(root.trace().unended(), vec![open.id()]);
    }

    #[test]
    fn test_action_is_recorded_and_ended() {
        let doc = Document::new();
        let root = DebugContext::root(doc.document_node());
        let action = root.action(
            ActionKind::Delete,
            Item::Node(doc.document_node()),
            None,
            Position::Default,
        );
        let trace = root.snapshot();
        assert_eq!(trace.actions().collect::<Vec<_>>(), vec![&action]);
        assert!(trace.unended().is_empty());
    }
}
