//! XML serialization.

use crate::document::Document;
use crate::node::{NodeData, NodeId, NodeKind};
use quick_xml::escape::{escape, partial_escape};

/// Serialization options.
#[derive(Debug, Clone, Default)]
pub struct WriteOptions {
    /// Spaces per nesting level. `None` writes everything on one line.
    pub indent: Option<usize>,
    /// Emit `<?xml version="1.0" encoding="utf-8"?>` first.
    pub declaration: bool,
}

impl WriteOptions {
    pub fn indented(width: usize) -> Self {
        Self {
            indent: Some(width),
            declaration: false,
        }
    }
}

/// Serialize the whole document compactly.
pub fn to_string(doc: &Document) -> String {
    to_string_with(doc, &WriteOptions::default())
}

pub fn to_string_with(doc: &Document, options: &WriteOptions) -> String {
    let mut out = String::new();
    if options.declaration {
        out.push_str(r#"<?xml version="1.0" encoding="utf-8"?>"#);
        if options.indent.is_some() {
            out.push('\n');
        }
    }
    let mut first = true;
    for &child in doc.children(doc.document_node()) {
        if options.indent.is_some() && !first {
            out.push('\n');
        }
        first = false;
        write_node(&mut out, doc, child, options, 0);
    }
    if options.indent.is_some() {
        out.push('\n');
    }
    out
}

/// Serialize one node and its subtree.
pub fn node_to_string(doc: &Document, id: NodeId, options: &WriteOptions) -> String {
    if doc.kind(id) == NodeKind::Document {
        return to_string_with(doc, options);
    }
    let mut out = String::new();
    write_node(&mut out, doc, id, options, 0);
    out
}

fn write_node(out: &mut String, doc: &Document, id: NodeId, options: &WriteOptions, depth: usize) {
    match doc.data(id) {
        NodeData::Document => {
            for &child in doc.children(id) {
                write_node(out, doc, child, options, depth);
            }
        }
        NodeData::Element { name, attributes } => {
            out.push('<');
            out.push_str(name);
            for attr in attributes {
                out.push(' ');
                out.push_str(&attr.name);
                out.push_str("=\"");
                out.push_str(&escape(attr.value.as_str()));
                out.push('"');
            }

            let children = doc.children(id);
            if children.is_empty() {
                out.push_str("/>");
                return;
            }
            out.push('>');

            let pretty = options
                .indent
                .filter(|_| !children.iter().any(|&c| doc.kind(c) == NodeKind::Text));
            for &child in children {
                if let Some(width) = pretty {
                    newline(out, width, depth + 1);
                }
                write_node(out, doc, child, options, depth + 1);
            }
            if let Some(width) = pretty {
                newline(out, width, depth);
            }

            out.push_str("</");
            out.push_str(name);
            out.push('>');
        }
        NodeData::Text(text) => out.push_str(&partial_escape(text.as_str())),
        NodeData::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeData::ProcessingInstruction { target, data } => {
            out.push_str("<?");
            out.push_str(target);
            if !data.is_empty() {
                out.push(' ');
                out.push_str(data);
            }
            out.push_str("?>");
        }
    }
}

fn newline(out: &mut String, width: usize, depth: usize) {
    out.push('\n');
    out.extend(std::iter::repeat_n(' ', width * depth));
}
