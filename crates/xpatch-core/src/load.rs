/*
 * load.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Operation registry and patch loading.
 */

//! Building operation trees from patch documents.

use crate::context::ExecContext;
use crate::error::{ApplyError, LoadError, PatchError};
use crate::op::{Content, ContentItem, Op, OpId, OpKind};
use crate::position::Position;
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::debug;
use xpatch_dom::{Document, FileId, NodeData, NodeId, ParseOptions, parse_with_options};
use xpatch_path::Path;

/// Builds the [`OpKind`] for one element. The loader has already assigned
/// the operation id and compiled its `Path`.
pub type OpConstructor = fn(&mut Loader<'_>, NodeId) -> Result<OpKind, PatchError>;

pub const PATH_ATTR: &str = "Path";
pub const POS_ATTR: &str = "Pos";
/// Root tag of a patch and of patches embedded in a document.
pub const PATCH_TAG: &str = "Patch";

/// Tag name to constructor table.
#[derive(Debug, Clone)]
pub struct OpRegistry {
    constructors: IndexMap<String, OpConstructor>,
}

impl OpRegistry {
    /// A registry that knows no tags.
    pub fn new() -> Self {
        Self {
            constructors: IndexMap::new(),
        }
    }

    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PATCH_TAG, load_patch);
        registry.register("Update", load_update);
        registry.register("Delete", load_delete);
        registry.register("Copy", load_copy);
        registry.register("If", load_if);
        registry.register("IfAny", load_if_any);
        registry.register("IfNone", load_if_none);
        registry.register("With", load_with);
        registry
    }

    /// Register a constructor, replacing any previous one for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, constructor: OpConstructor) {
        self.constructors.insert(tag.into(), constructor);
    }

    /// Make `alias` build the same operation as `tag`. Returns `false` if
    /// `tag` is unknown.
    pub fn alias(&mut self, alias: impl Into<String>, tag: &str) -> bool {
        match self.get(tag) {
            Some(constructor) => {
                self.register(alias, constructor);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, tag: &str) -> Option<OpConstructor> {
        self.constructors.get(tag).copied()
    }

    /// Registered tags, in registration order.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.constructors.keys().map(String::as_str)
    }
}

impl Default for OpRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

fn load_patch(loader: &mut Loader<'_>, element: NodeId) -> Result<OpKind, PatchError> {
    Ok(OpKind::Collection(loader.load_collection(element)?))
}

fn load_if(loader: &mut Loader<'_>, element: NodeId) -> Result<OpKind, PatchError> {
    Ok(OpKind::If(loader.load_collection(element)?))
}

fn load_if_any(loader: &mut Loader<'_>, element: NodeId) -> Result<OpKind, PatchError> {
    Ok(OpKind::IfAny(loader.load_collection(element)?))
}

fn load_if_none(loader: &mut Loader<'_>, element: NodeId) -> Result<OpKind, PatchError> {
    Ok(OpKind::IfNone(loader.load_collection(element)?))
}

fn load_with(loader: &mut Loader<'_>, element: NodeId) -> Result<OpKind, PatchError> {
    Ok(OpKind::With(loader.load_collection(element)?))
}

fn load_update(loader: &mut Loader<'_>, element: NodeId) -> Result<OpKind, PatchError> {
    Ok(OpKind::Update(loader.load_content(element)?))
}

fn load_delete(_loader: &mut Loader<'_>, _element: NodeId) -> Result<OpKind, PatchError> {
    Ok(OpKind::Delete)
}

fn load_copy(loader: &mut Loader<'_>, element: NodeId) -> Result<OpKind, PatchError> {
    // An empty `Pos` reads as an absent one, like an empty `_MergePos`.
    let position = match loader.document().attribute_node(element, POS_ATTR) {
        Some(attr) if attr.value.is_empty() => Position::Default,
        Some(attr) => attr
            .value
            .parse::<Position>()
            .map_err(|err| err.with_span(attr.value_span))?,
        None => Position::Default,
    };
    Ok(OpKind::Copy {
        content: loader.load_content(element)?,
        position,
    })
}

/// Walks a patch document and builds its operations.
pub struct Loader<'d> {
    doc: &'d Document,
    registry: &'d OpRegistry,
    next_id: u32,
}

impl<'d> Loader<'d> {
    pub fn new(doc: &'d Document, registry: &'d OpRegistry) -> Self {
        Self {
            doc,
            registry,
            next_id: 0,
        }
    }

    pub fn document(&self) -> &'d Document {
        self.doc
    }

    /// Load `element` as a collection regardless of its tag.
    pub fn load_root(&mut self, element: NodeId) -> Result<Op, PatchError> {
        self.build(element, load_patch)
    }

    /// Load one operation element through the registry.
    pub fn load_op(&mut self, element: NodeId) -> Result<Op, PatchError> {
        let doc = self.doc;
        let tag = doc.name(element).unwrap_or_default();
        let Some(constructor) = self.registry.get(tag) else {
            return Err(PatchError::UnknownOperation {
                tag: tag.to_string(),
                span: doc.span(element),
            });
        };
        self.build(element, constructor)
    }

    /// The child operations of `element`. Whitespace, comments and
    /// processing instructions are skipped.
    pub fn load_collection(&mut self, element: NodeId) -> Result<Vec<Op>, PatchError> {
        let doc = self.doc;
        let mut ops = Vec::new();
        for &child in doc.children(element) {
            match doc.data(child) {
                NodeData::Element { .. } => ops.push(self.load_op(child)?),
                NodeData::Text(text) if !text.trim().is_empty() => {
                    return Err(PatchError::TemplateShape {
                        message: format!(
                            "unexpected text '{}' between operations",
                            text.trim()
                        ),
                        span: doc.span(child),
                    });
                }
                _ => {}
            }
        }
        Ok(ops)
    }

    /// The literal template held by `element`. Comments are authoring
    /// notes and are skipped; processing instructions cannot be templated.
    pub fn load_content(&self, element: NodeId) -> Result<Content, PatchError> {
        let doc = self.doc;
        let mut items = Vec::new();
        for &child in doc.children(element) {
            match doc.data(child) {
                NodeData::Text(text) => items.push(ContentItem::Text(text.clone())),
                NodeData::Element { .. } => items.push(ContentItem::Element(child)),
                NodeData::Comment(_) => {}
                other => {
                    return Err(PatchError::TemplateShape {
                        message: format!("template content cannot hold a {}", other.kind()),
                        span: doc.span(child),
                    });
                }
            }
        }
        Ok(Content::new(items))
    }

    fn build(&mut self, element: NodeId, constructor: OpConstructor) -> Result<Op, PatchError> {
        let id = OpId(self.next_id);
        self.next_id += 1;
        let path = self.read_path(element)?;
        let kind = constructor(self, element)
            .map_err(|err| err.with_span(self.doc.span(element)))?;
        Ok(Op::new(id, kind, path, element, self.doc.span(element)))
    }

    fn read_path(&self, element: NodeId) -> Result<Path, PatchError> {
        let Some(attr) = self.doc.attribute_node(element, PATH_ATTR) else {
            return Ok(Path::current());
        };
        Path::parse(&attr.value).map_err(|source| {
            // Skip the opening quote of the value span.
            let at = source.position + 1;
            PatchError::PathSyntax {
                path: attr.value.clone(),
                span: attr
                    .value_span
                    .map(|span| span.sub_span(at, at + 1))
                    .or(self.doc.span(element)),
                source,
            }
        })
    }
}

/// A loaded patch: the patch document and the operation tree built from it.
#[derive(Debug, Clone)]
pub struct Patch {
    name: Arc<str>,
    doc: Document,
    root: Op,
    file: Option<FileId>,
}

impl Patch {
    /// Parse and load a patch with the default operations.
    ///
    /// # Errors
    ///
    /// Malformed XML, unknown operations, invalid paths and invalid
    /// positions.
    pub fn parse(name: &str, text: &str, file: Option<FileId>) -> Result<Self, LoadError> {
        Self::parse_with(name, text, file, &OpRegistry::with_defaults())
    }

    pub fn parse_with(
        name: &str,
        text: &str,
        file: Option<FileId>,
        registry: &OpRegistry,
    ) -> Result<Self, LoadError> {
        let options = ParseOptions {
            file,
            keep_comments: false,
            ..ParseOptions::default()
        };
        let doc = parse_with_options(text, &options).map_err(|err| LoadError {
            name: name.to_string(),
            kind: PatchError::Xml(err),
        })?;
        Self::from_document(name, doc, file, registry)
    }

    /// Load a patch from an already parsed document. The root element is the
    /// root collection.
    pub fn from_document(
        name: &str,
        doc: Document,
        file: Option<FileId>,
        registry: &OpRegistry,
    ) -> Result<Self, LoadError> {
        let load_error = |kind| LoadError {
            name: name.to_string(),
            kind,
        };
        let root_element = doc
            .root_element()
            .ok_or_else(|| load_error(PatchError::Xml(xpatch_dom::Error::EmptyDocument)))?;
        let root = Loader::new(&doc, registry)
            .load_root(root_element)
            .map_err(load_error)?;
        debug!(patch = name, ops = root.walk().len(), "Loaded patch");
        Ok(Self {
            name: Arc::from(name),
            doc,
            root,
            file,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn name_arc(&self) -> Arc<str> {
        Arc::clone(&self.name)
    }

    /// The patch document templates refer to.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn root(&self) -> &Op {
        &self.root
    }

    pub fn file(&self) -> Option<FileId> {
        self.file
    }

    /// Evaluate the root collection in `ctx`.
    pub fn apply<C: ExecContext>(&self, doc: &mut Document, ctx: &C) -> Result<(), ApplyError> {
        self.root.execute(doc, &self.doc, ctx)
    }
}

/// Detach every `Patch` element of `doc` and load each as a patch named
/// `embedded-{n}`, in document order. Patches nested inside another patch
/// stay part of it.
///
/// # Errors
///
/// The first patch that fails to load. `doc` is left untouched in that case.
pub fn extract_embedded_patches(
    doc: &mut Document,
    file: Option<FileId>,
    registry: &OpRegistry,
) -> Result<Vec<Patch>, LoadError> {
    let mut found: Vec<NodeId> = Vec::new();
    for id in doc.descendants(doc.document_node()) {
        if doc.name(id) == Some(PATCH_TAG)
            && doc.is_element(id)
            && !doc.ancestors(id).any(|a| found.contains(&a))
        {
            found.push(id);
        }
    }

    let mut patches = Vec::with_capacity(found.len());
    for (index, &id) in found.iter().enumerate() {
        let name = format!("embedded-{}", index);
        let mut patch_doc = Document::new();
        let copy = patch_doc.import_node(doc, id).map_err(|err| LoadError {
            name: name.clone(),
            kind: err.into(),
        })?;
        let document_node = patch_doc.document_node();
        patch_doc
            .append_child(document_node, copy)
            .map_err(|err| LoadError {
                name: name.clone(),
                kind: err.into(),
            })?;
        patches.push(Patch::from_document(&name, patch_doc, file, registry)?);
    }

    for &id in &found {
        doc.detach(id);
    }
    Ok(patches)
}
