//! Literal one-line rendering of nodes for diagnostics and traces.
//!
//! Unlike [`writer`](crate::writer), nothing is escaped: the output shows
//! values exactly as they are stored.

use crate::document::Document;
use crate::node::{NodeData, NodeId};

/// Accumulates a single display line.
#[derive(Debug, Default)]
pub struct DisplayBuilder {
    line: String,
}

impl DisplayBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn line(&self) -> &str {
        &self.line
    }

    pub fn reset(&mut self) {
        self.line.clear();
    }

    pub fn finish(self) -> String {
        self.line
    }

    pub fn push_str(&mut self, s: &str) {
        self.line.push_str(s);
    }

    /// Render a node and its whole subtree.
    pub fn node_inline(&mut self, doc: &Document, id: NodeId) {
        match doc.data(id) {
            NodeData::Document => {
                for &child in doc.children(id) {
                    self.node_inline(doc, child);
                }
            }
            NodeData::Element { name, .. } => {
                let children = doc.children(id);
                self.element_open(doc, id, children.is_empty());
                if !children.is_empty() {
                    for &child in children {
                        self.node_inline(doc, child);
                    }
                    self.element_close(name);
                }
            }
            NodeData::Text(text) => self.line.push_str(text),
            NodeData::Comment(text) => {
                self.line.push_str("<!--");
                self.line.push_str(text);
                self.line.push_str("-->");
            }
            NodeData::ProcessingInstruction { target, data } => {
                self.line.push_str("<?");
                self.line.push_str(target);
                self.line.push(' ');
                self.line.push_str(data);
                self.line.push_str("?>");
            }
        }
    }

    /// Render an element's start tag. Non-elements render inline.
    pub fn element_open(&mut self, doc: &Document, id: NodeId, self_close: bool) {
        let NodeData::Element { name, attributes } = doc.data(id) else {
            self.node_inline(doc, id);
            return;
        };
        self.line.push('<');
        self.line.push_str(name);
        for attr in attributes {
            self.line.push(' ');
            self.attribute(&attr.name, &attr.value);
        }
        self.line.push_str(if self_close { " />" } else { ">" });
    }

    pub fn element_close(&mut self, name: &str) {
        self.line.push_str("</");
        self.line.push_str(name);
        self.line.push('>');
    }

    pub fn attribute(&mut self, name: &str, value: &str) {
        self.line.push_str(name);
        self.line.push_str("=\"");
        self.line.push_str(value);
        self.line.push('"');
    }
}

/// Render a node and its subtree on one line.
pub fn render_inline(doc: &Document, id: NodeId) -> String {
    let mut builder = DisplayBuilder::new();
    builder.node_inline(doc, id);
    builder.finish()
}

/// Render only the start tag of an element (or the node itself otherwise).
pub fn render_open(doc: &Document, id: NodeId) -> String {
    let mut builder = DisplayBuilder::new();
    let self_close = doc.children(id).is_empty();
    builder.element_open(doc, id, self_close);
    builder.finish()
}

/// Whether an element reads well on one line: it is empty, or its only
/// child is a single-line text or comment. Other node kinds always inline.
pub fn should_inline(doc: &Document, id: NodeId) -> bool {
    if !doc.is_element(id) {
        return true;
    }
    match doc.children(id) {
        [] => true,
        [only] => match doc.data(*only) {
            NodeData::Text(text) | NodeData::Comment(text) => !text.contains('\n'),
            _ => false,
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parse;

    #[test]
    fn test_render_inline() {
        let doc = parse(r#"<a x="1"><b/>t<!--c--><?p d?></a>"#).unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(
            render_inline(&doc, a),
            r#"<a x="1"><b />t<!--c--><?p d?></a>"#
        );
    }

    #[test]
    fn test_no_escaping() {
        let doc = parse(r#"<a v="&lt;">&amp;</a>"#).unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(render_inline(&doc, a), r#"<a v="<">&</a>"#);
    }

    #[test]
    fn test_render_open() {
        let doc = parse(r#"<a x="1"><b/></a>"#).unwrap();
        let a = doc.root_element().unwrap();
        assert_eq!(render_open(&doc, a), r#"<a x="1">"#);
        assert_eq!(render_open(&doc, doc.children(a)[0]), "<b />");
    }

    #[test]
    fn test_should_inline() {
        let doc = parse("<a><b>line\nbreak</b><c/></a>").unwrap();
        let a = doc.root_element().unwrap();
        assert!(!should_inline(&doc, a));
        assert!(!should_inline(&doc, doc.children(a)[0]));
        assert!(should_inline(&doc, doc.children(a)[1]));

        let doc = parse("<a><!--short--></a>").unwrap();
        assert!(should_inline(&doc, doc.root_element().unwrap()));
    }

    #[test]
    fn test_builder_reset() {
        let doc = parse("<a/>").unwrap();
        let mut builder = DisplayBuilder::new();
        builder.node_inline(&doc, doc.root_element().unwrap());
        builder.reset();
        builder.element_close("a");
        assert_eq!(builder.line(), "</a>");
    }
}
