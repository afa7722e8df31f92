//! The document arena and its editing surface.

use crate::error::TreeError;
use crate::node::{Attribute, NodeData, NodeId, NodeKind};
use xpatch_source_map::SourceSpan;

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    span: Option<SourceSpan>,
}

/// A mutable XML document.
///
/// Index 0 always holds the document node. Nodes created with the
/// `create_*` methods start detached and become part of the tree once
/// inserted under an attached container.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<Node>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
                span: None,
            }],
        }
    }

    /// The document node.
    pub fn document_node(&self) -> NodeId {
        NodeId(0)
    }

    /// The single element child of the document node, if any.
    pub fn root_element(&self) -> Option<NodeId> {
        self.child_elements(self.document_node()).next()
    }

    fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut Node {
        &mut self.nodes[id.index()]
    }

    fn alloc(&mut self, data: NodeData, span: Option<SourceSpan>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
            span,
        });
        id
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    pub fn create_element(&mut self, name: impl Into<String>) -> NodeId {
        self.alloc(NodeData::element(name), None)
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Text(text.into()), None)
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.alloc(NodeData::Comment(text.into()), None)
    }

    pub fn create_processing_instruction(
        &mut self,
        target: impl Into<String>,
        data: impl Into<String>,
    ) -> NodeId {
        self.alloc(
            NodeData::ProcessingInstruction {
                target: target.into(),
                data: data.into(),
            },
            None,
        )
    }

    /// Allocate a detached node with the given payload and span.
    ///
    /// Passing [`NodeData::Document`] allocates an ordinary element named
    /// `#document`; there is only ever one document node.
    pub fn create_node(&mut self, data: NodeData, span: Option<SourceSpan>) -> NodeId {
        let data = match data {
            NodeData::Document => NodeData::element("#document"),
            other => other,
        };
        self.alloc(data, span)
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    pub fn data(&self, id: NodeId) -> &NodeData {
        &self.node(id).data
    }

    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.node(id).data.kind()
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.kind(id) == NodeKind::Element
    }

    /// Element name, or PI target.
    pub fn name(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Element { name, .. } => Some(name),
            NodeData::ProcessingInstruction { target, .. } => Some(target),
            _ => None,
        }
    }

    pub fn span(&self, id: NodeId) -> Option<SourceSpan> {
        self.node(id).span
    }

    pub fn set_span(&mut self, id: NodeId, span: Option<SourceSpan>) {
        self.node_mut(id).span = span;
    }

    /// Character data of a text, comment or PI node.
    pub fn value(&self, id: NodeId) -> Option<&str> {
        match &self.node(id).data {
            NodeData::Text(text) | NodeData::Comment(text) => Some(text),
            NodeData::ProcessingInstruction { data, .. } => Some(data),
            _ => None,
        }
    }

    pub fn set_value(&mut self, id: NodeId, value: impl Into<String>) -> Result<(), TreeError> {
        let kind = self.kind(id);
        match &mut self.node_mut(id).data {
            NodeData::Text(text) | NodeData::Comment(text) => *text = value.into(),
            NodeData::ProcessingInstruction { data, .. } => *data = value.into(),
            _ => return Err(TreeError::NoValue { kind }),
        }
        Ok(())
    }

    /// XPath string-value: concatenated descendant text for containers, the
    /// character data otherwise.
    pub fn string_value(&self, id: NodeId) -> String {
        match &self.node(id).data {
            NodeData::Document | NodeData::Element { .. } => {
                let mut out = String::new();
                for desc in self.descendants(id) {
                    if let NodeData::Text(text) = &self.node(desc).data {
                        out.push_str(text);
                    }
                }
                out
            }
            NodeData::Text(text) | NodeData::Comment(text) => text.clone(),
            NodeData::ProcessingInstruction { data, .. } => data.clone(),
        }
    }

    // ------------------------------------------------------------------
    // Attributes
    // ------------------------------------------------------------------

    /// Attributes of an element in document order; empty for other kinds.
    pub fn attributes(&self, id: NodeId) -> &[Attribute] {
        match &self.node(id).data {
            NodeData::Element { attributes, .. } => attributes,
            _ => &[],
        }
    }

    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attribute_node(id, name).map(|a| a.value.as_str())
    }

    pub fn attribute_node(&self, id: NodeId, name: &str) -> Option<&Attribute> {
        self.attributes(id).iter().find(|a| a.name == name)
    }

    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute_node(id, name).is_some()
    }

    /// Set an attribute, keeping its position if it already exists.
    pub fn set_attribute(
        &mut self,
        id: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), TreeError> {
        self.put_attribute(id, Attribute::new(name, value))
    }

    /// Like [`set_attribute`](Self::set_attribute), but keeps the spans of
    /// the given attribute.
    pub fn put_attribute(&mut self, id: NodeId, attribute: Attribute) -> Result<(), TreeError> {
        let kind = self.kind(id);
        let NodeData::Element { attributes, .. } = &mut self.node_mut(id).data else {
            return Err(TreeError::NotAnElement { kind });
        };
        match attributes.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => *existing = attribute,
            None => attributes.push(attribute),
        }
        Ok(())
    }

    /// Remove an attribute, returning its old value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        let NodeData::Element { attributes, .. } = &mut self.node_mut(id).data else {
            return None;
        };
        let index = attributes.iter().position(|a| a.name == name)?;
        Some(attributes.remove(index).value)
    }

    // ------------------------------------------------------------------
    // Navigation
    // ------------------------------------------------------------------

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.node(id).parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    pub fn child_elements(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|&child| self.is_element(child))
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent(id)?;
        self.children(parent).iter().position(|&c| c == id)
    }

    /// Ancestors from the parent upwards.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Whether `id` is reachable from the document node.
    pub fn is_attached(&self, id: NodeId) -> bool {
        id == self.document_node() || self.ancestors(id).any(|a| a == self.document_node())
    }

    /// Descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        let mut stack: Vec<NodeId> = self.children(id).to_vec();
        stack.reverse();
        Descendants { doc: self, stack }
    }

    /// Sort key giving document order within one tree: the child index at
    /// every level from the topmost ancestor down to `id`.
    pub fn document_order_key(&self, id: NodeId) -> Vec<usize> {
        let mut key = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            key.push(self.index_in_parent(current).unwrap_or(0));
            current = parent;
        }
        key.reverse();
        key
    }

    // ------------------------------------------------------------------
    // Structural edits
    // ------------------------------------------------------------------

    fn check_insert(&self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        if child == self.document_node() {
            return Err(TreeError::DocumentNode);
        }
        let parent_kind = self.kind(parent);
        if !matches!(parent_kind, NodeKind::Element | NodeKind::Document) {
            return Err(TreeError::NotAContainer { kind: parent_kind });
        }
        if self.parent(child).is_some() {
            return Err(TreeError::AlreadyAttached { node: child });
        }
        if parent == child || self.ancestors(parent).any(|a| a == child) {
            return Err(TreeError::Cycle {
                node: child,
                parent,
            });
        }
        if parent_kind == NodeKind::Document {
            match self.kind(child) {
                NodeKind::Element if self.root_element().is_some() => {
                    return Err(TreeError::MultipleRoots);
                }
                NodeKind::Text => {
                    return Err(TreeError::InvalidDocumentChild {
                        kind: NodeKind::Text,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Insert `child` at `index` among the children of `parent`. An index
    /// past the end appends.
    pub fn insert_child(
        &mut self,
        parent: NodeId,
        index: usize,
        child: NodeId,
    ) -> Result<(), TreeError> {
        self.check_insert(parent, child)?;
        let children = &mut self.node_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
        self.node_mut(child).parent = Some(parent);
        Ok(())
    }

    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        let len = self.children(parent).len();
        self.insert_child(parent, len, child)
    }

    pub fn prepend_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), TreeError> {
        self.insert_child(parent, 0, child)
    }

    /// Insert `node` as the sibling just before `reference`.
    pub fn insert_before(&mut self, reference: NodeId, node: NodeId) -> Result<(), TreeError> {
        let parent = self
            .parent(reference)
            .ok_or(TreeError::NoParent { node: reference })?;
        let index = self.index_in_parent(reference).unwrap_or(0);
        self.insert_child(parent, index, node)
    }

    /// Insert `node` as the sibling just after `reference`.
    pub fn insert_after(&mut self, reference: NodeId, node: NodeId) -> Result<(), TreeError> {
        let parent = self
            .parent(reference)
            .ok_or(TreeError::NoParent { node: reference })?;
        let index = self.index_in_parent(reference).unwrap_or(0);
        self.insert_child(parent, index + 1, node)
    }

    /// Insert `node` under `parent` right after the child `after`, or at the
    /// front when `after` is `None`.
    pub fn prepend_after(
        &mut self,
        parent: NodeId,
        after: Option<NodeId>,
        node: NodeId,
    ) -> Result<(), TreeError> {
        let Some(after) = after else {
            return self.prepend_child(parent, node);
        };
        if self.parent(after) != Some(parent) {
            return Err(TreeError::NotAChild {
                node: after,
                parent,
            });
        }
        let index = self.index_in_parent(after).unwrap_or(0);
        self.insert_child(parent, index + 1, node)
    }

    /// Detach `id` from its parent. Returns `false` if it had none.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.parent(id) else {
            return false;
        };
        self.node_mut(parent).children.retain(|&c| c != id);
        self.node_mut(id).parent = None;
        true
    }

    /// Detach every child of `id`.
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.node_mut(id).children);
        for child in children {
            self.node_mut(child).parent = None;
        }
    }

    /// Replace the children of a container with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) -> Result<(), TreeError> {
        let kind = self.kind(id);
        if !matches!(kind, NodeKind::Element | NodeKind::Document) {
            return Err(TreeError::NotAContainer { kind });
        }
        self.clear_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node)?;
        }
        Ok(())
    }

    /// Deep-copy `id` out of `source` into this document, detached.
    pub fn import_node(&mut self, source: &Document, id: NodeId) -> Result<NodeId, TreeError> {
        self.import_node_filtered(source, id, &|_| true)
    }

    /// Deep-copy `id` out of `source`, keeping only attributes for which
    /// `keep` returns true, at every level of the copy.
    pub fn import_node_filtered(
        &mut self,
        source: &Document,
        id: NodeId,
        keep: &dyn Fn(&Attribute) -> bool,
    ) -> Result<NodeId, TreeError> {
        if source.kind(id) == NodeKind::Document {
            return Err(TreeError::DocumentNode);
        }
        let copy = self.copy_one(source, id, keep);
        let mut pending = vec![(id, copy)];
        while let Some((from, to)) = pending.pop() {
            for &child in source.children(from) {
                let child_copy = self.copy_one(source, child, keep);
                self.node_mut(child_copy).parent = Some(to);
                self.node_mut(to).children.push(child_copy);
                pending.push((child, child_copy));
            }
        }
        Ok(copy)
    }

    fn copy_one(
        &mut self,
        source: &Document,
        id: NodeId,
        keep: &dyn Fn(&Attribute) -> bool,
    ) -> NodeId {
        let data = match source.data(id) {
            NodeData::Element { name, attributes } => NodeData::Element {
                name: name.clone(),
                attributes: attributes.iter().filter(|a| keep(a)).cloned().collect(),
            },
            other => other.clone(),
        };
        self.alloc(data, source.span(id))
    }
}

/// Pre-order iterator over the descendants of a node.
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let next = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(next).iter().rev().copied());
        Some(next)
    }
}
