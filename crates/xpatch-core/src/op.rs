/*
 * op.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Patch operations and their evaluation.
 */

//! The operation tree and its evaluation.

use crate::context::{ActionKind, ActionSource, ExecContext, Execution};
use crate::error::{ApplyError, PatchError};
use crate::inserter::Inserter;
use crate::merge::{import_template, merge};
use crate::position::Position;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace};
use xpatch_dom::display::render_open;
use xpatch_dom::{Document, NodeData, NodeId, NodeKind};
use xpatch_path::{Item, Path};
use xpatch_source_map::SourceSpan;

/// Pre-order index of an operation within its patch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct OpId(pub u32);

impl fmt::Display for OpId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One template item: literal text or an element of the patch document.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentItem {
    Text(String),
    Element(NodeId),
}

/// The literal payload of `Update` and `Copy`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Content {
    items: Vec<ContentItem>,
}

/// How a [`Content`] is laid out.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentShape<'a> {
    Empty,
    Text(&'a str),
    Elements(Vec<NodeId>),
    Mixed,
}

impl Content {
    pub fn new(items: Vec<ContentItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[ContentItem] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn shape(&self) -> ContentShape<'_> {
        match self.items.as_slice() {
            [] => ContentShape::Empty,
            [ContentItem::Text(text)] => ContentShape::Text(text),
            items => {
                let elements: Vec<NodeId> = items
                    .iter()
                    .filter_map(|item| match item {
                        ContentItem::Element(id) => Some(*id),
                        ContentItem::Text(_) => None,
                    })
                    .collect();
                if elements.len() == items.len() {
                    ContentShape::Elements(elements)
                } else {
                    ContentShape::Mixed
                }
            }
        }
    }

    /// The content as a scalar: empty, or exactly one text item.
    pub fn string_value(&self) -> Result<&str, PatchError> {
        match self.shape() {
            ContentShape::Empty => Ok(""),
            ContentShape::Text(text) => Ok(text),
            _ => Err(PatchError::template_shape(
                "content must be a single string for this target",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OpKind {
    Collection(Vec<Op>),
    Update(Content),
    Delete,
    Copy { content: Content, position: Position },
    If(Vec<Op>),
    IfAny(Vec<Op>),
    IfNone(Vec<Op>),
    With(Vec<Op>),
}

impl OpKind {
    pub fn tag(&self) -> &'static str {
        match self {
            OpKind::Collection(_) => "Patch",
            OpKind::Update(_) => "Update",
            OpKind::Delete => "Delete",
            OpKind::Copy { .. } => "Copy",
            OpKind::If(_) => "If",
            OpKind::IfAny(_) => "IfAny",
            OpKind::IfNone(_) => "IfNone",
            OpKind::With(_) => "With",
        }
    }

    /// Nested operations, empty for leaf kinds.
    pub fn children(&self) -> &[Op] {
        match self {
            OpKind::Collection(ops)
            | OpKind::If(ops)
            | OpKind::IfAny(ops)
            | OpKind::IfNone(ops)
            | OpKind::With(ops) => ops,
            OpKind::Update(_) | OpKind::Delete | OpKind::Copy { .. } => &[],
        }
    }
}

/// A loaded operation.
#[derive(Debug, Clone, PartialEq)]
pub struct Op {
    pub id: OpId,
    pub kind: OpKind,
    pub path: Path,
    /// Element of the patch document this operation was loaded from. Used for
    /// diagnostics only.
    pub element: NodeId,
    pub span: Option<SourceSpan>,
    path_source: Arc<str>,
}

impl Op {
    pub fn new(
        id: OpId,
        kind: OpKind,
        path: Path,
        element: NodeId,
        span: Option<SourceSpan>,
    ) -> Self {
        let path_source = Arc::from(path.source());
        Self {
            id,
            kind,
            path,
            element,
            span,
            path_source,
        }
    }

    pub fn path_source(&self) -> Arc<str> {
        Arc::clone(&self.path_source)
    }

    /// Operations in pre-order, this one first.
    pub fn walk(&self) -> Vec<&Op> {
        let mut out = Vec::new();
        let mut stack = vec![self];
        while let Some(op) = stack.pop() {
            out.push(op);
            stack.extend(op.kind.children().iter().rev());
        }
        out
    }

    /// Evaluate against the context cursor. `template` is the patch document
    /// content items refer to.
    ///
    /// # Errors
    ///
    /// The first failure aborts evaluation; earlier mutations stay applied.
    pub fn execute<C: ExecContext>(
        &self,
        doc: &mut Document,
        template: &Document,
        ctx: &C,
    ) -> Result<(), ApplyError> {
        let Execution { op, context } = ctx.execution(self);
        debug!(op = %op.id, tag = op.tag, path = %op.path, "Executing operation");

        let result = self.run(doc, template, &context);
        if result.is_ok() {
            context.end();
        }
        result.map_err(|err| err.within_op(&op))
    }

    fn run<C: ExecContext>(
        &self,
        doc: &mut Document,
        template: &Document,
        ctx: &C,
    ) -> Result<(), ApplyError> {
        let targets = self
            .path
            .select(doc, ctx.cursor())
            .map_err(PatchError::from)?;
        trace!(op = %self.id, targets = targets.len(), "Resolved path");

        match &self.kind {
            OpKind::Collection(ops) => {
                for target in &targets {
                    let id = self.node_target(doc, target, "run a patch on")?;
                    if id == ctx.cursor() {
                        run_all(ops, doc, template, ctx)?;
                    } else {
                        let nav = ctx.with_nav(id);
                        run_all(ops, doc, template, &nav)?;
                        nav.end();
                    }
                }
            }
            OpKind::Update(content) => {
                for target in &targets {
                    self.update(content, doc, template, ctx, target)
                        .map_err(|err| self.fail(doc, target, err))?;
                }
            }
            OpKind::Delete => {
                for target in &targets {
                    self.delete(doc, ctx, target)
                        .map_err(|err| self.fail(doc, target, err))?;
                }
            }
            OpKind::Copy { content, position } => {
                for target in &targets {
                    self.copy(content, *position, doc, template, ctx, target)
                        .map_err(|err| self.fail(doc, target, err))?;
                }
            }
            OpKind::If(ops) | OpKind::IfAny(ops) | OpKind::IfNone(ops) => {
                let taken = match self.kind {
                    OpKind::If(_) => targets.len() == 1,
                    OpKind::IfAny(_) => !targets.is_empty(),
                    _ => targets.is_empty(),
                };
                debug!(op = %self.id, matches = targets.len(), taken, "Evaluated condition");
                if taken {
                    run_all(ops, doc, template, ctx)?;
                }
            }
            OpKind::With(ops) => {
                for target in &targets {
                    let id = self.node_target(doc, target, "scope to")?;
                    let nav = ctx.with_nav(id);
                    run_all(ops, doc, template, &nav)?;
                    nav.end();
                }
            }
        }
        Ok(())
    }

    fn fail(&self, doc: &Document, target: &Item, err: PatchError) -> ApplyError {
        ApplyError::new(err.with_span(self.span)).at_target(describe_item(doc, target))
    }

    fn node_target(
        &self,
        doc: &Document,
        target: &Item,
        action: &'static str,
    ) -> Result<NodeId, ApplyError> {
        match target {
            Item::Node(id) => Ok(*id),
            Item::Attribute { .. } => Err(self.fail(
                doc,
                target,
                PatchError::UnsupportedTarget {
                    action,
                    target: "an attribute".to_string(),
                },
            )),
        }
    }

    fn update<C: ExecContext>(
        &self,
        content: &Content,
        doc: &mut Document,
        template: &Document,
        ctx: &C,
        target: &Item,
    ) -> Result<(), PatchError> {
        let id = match target {
            Item::Attribute { owner, name } => {
                let value = content.string_value()?;
                ctx.action(
                    ActionKind::SetAttribute,
                    target.clone(),
                    Some(ActionSource::Text(value.to_string())),
                    Position::Default,
                );
                doc.set_attribute(*owner, name, value)?;
                return Ok(());
            }
            Item::Node(id) => *id,
        };

        match doc.kind(id) {
            NodeKind::Document => Err(PatchError::UnsupportedTarget {
                action: "update",
                target: "the document node".to_string(),
            }),
            NodeKind::Element => match content.shape() {
                ContentShape::Empty => Ok(()),
                ContentShape::Text(text) => {
                    ctx.action(
                        ActionKind::SetText,
                        target.clone(),
                        Some(ActionSource::Text(text.to_string())),
                        Position::Default,
                    );
                    doc.set_text_content(id, text)?;
                    Ok(())
                }
                ContentShape::Elements(elements) => {
                    merge_all(&elements, doc, template, ctx, id)
                }
                ContentShape::Mixed => Err(PatchError::template_shape(
                    "cannot mix text and elements when updating an element",
                )),
            },
            NodeKind::Text | NodeKind::Comment | NodeKind::ProcessingInstruction => {
                let value = content.string_value()?;
                ctx.action(
                    ActionKind::SetText,
                    target.clone(),
                    Some(ActionSource::Text(value.to_string())),
                    Position::Default,
                );
                doc.set_value(id, value)?;
                Ok(())
            }
        }
    }

    fn delete<C: ExecContext>(
        &self,
        doc: &mut Document,
        ctx: &C,
        target: &Item,
    ) -> Result<(), PatchError> {
        match target {
            Item::Attribute { owner, name } => {
                if doc.has_attribute(*owner, name) {
                    ctx.action(ActionKind::Delete, target.clone(), None, Position::Default);
                    doc.remove_attribute(*owner, name);
                }
            }
            Item::Node(id) => {
                if doc.kind(*id) == NodeKind::Document {
                    return Err(PatchError::UnsupportedTarget {
                        action: "delete",
                        target: "the document node".to_string(),
                    });
                }
                if doc.parent(*id).is_some() {
                    ctx.action(ActionKind::Delete, target.clone(), None, Position::Default);
                    doc.detach(*id);
                }
            }
        }
        Ok(())
    }

    fn copy<C: ExecContext>(
        &self,
        content: &Content,
        position: Position,
        doc: &mut Document,
        template: &Document,
        ctx: &C,
        target: &Item,
    ) -> Result<(), PatchError> {
        let Item::Node(id) = target else {
            return Err(PatchError::UnsupportedTarget {
                action: "copy into",
                target: "an attribute".to_string(),
            });
        };
        let id = *id;

        if position == Position::Merge {
            return match content.shape() {
                ContentShape::Empty => Ok(()),
                ContentShape::Elements(elements) => merge_all(&elements, doc, template, ctx, id),
                _ => Err(PatchError::template_shape(
                    "Pos=\"Merge\" requires element content",
                )),
            };
        }

        let position = match position {
            Position::Default => Position::Append,
            other => other,
        };
        let mut inserter = Inserter::new(id, position)?;
        for item in content.items() {
            let node = match item {
                ContentItem::Text(text) => doc.create_text(text.as_str()),
                ContentItem::Element(element) => import_template(doc, template, *element)?,
            };
            ctx.action(
                ActionKind::Insert,
                target.clone(),
                Some(ActionSource::Node(node)),
                position,
            );
            inserter.insert(doc, node)?;
        }
        Ok(())
    }
}

fn run_all<C: ExecContext>(
    ops: &[Op],
    doc: &mut Document,
    template: &Document,
    ctx: &C,
) -> Result<(), ApplyError> {
    for op in ops {
        op.execute(doc, template, ctx)?;
    }
    Ok(())
}

fn merge_all<C: ExecContext>(
    elements: &[NodeId],
    doc: &mut Document,
    template: &Document,
    ctx: &C,
    target: NodeId,
) -> Result<(), PatchError> {
    for &element in elements {
        ctx.action(
            ActionKind::Merge,
            Item::Node(target),
            Some(ActionSource::Template(element)),
            Position::Merge,
        );
        merge(doc, target, template, element)?;
    }
    Ok(())
}

/// Literal rendering of a selected item: the start tag of an element, the
/// text of other nodes, `/` for the document and `@name="value"` for
/// attributes.
pub fn describe_item(doc: &Document, item: &Item) -> String {
    match item {
        Item::Node(id) => match doc.data(*id) {
            NodeData::Document => "/".to_string(),
            _ => render_open(doc, *id),
        },
        Item::Attribute { owner, name } => match doc.attribute(*owner, name) {
            Some(value) => format!("@{}=\"{}\"", name, value),
            None => format!("@{}", name),
        },
    }
}
