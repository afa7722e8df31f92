//! End-to-end tests for parsing, editing and writing documents.

use xpatch_dom::writer::{self, WriteOptions};
use xpatch_dom::{Error, NodeKind, TreeError, parse};

// ============================================================================
// Parse, edit, write
// ============================================================================

#[test]
fn test_edit_then_write() {
    let mut doc = parse(r#"<Root><Item Id="a" v="1"/></Root>"#).unwrap();
    let root = doc.root_element().unwrap();
    let item = doc.children(root)[0];

    doc.set_attribute(item, "v", "2").unwrap();
    let extra = doc.create_element("Item");
    doc.set_attribute(extra, "Id", "b").unwrap();
    doc.insert_after(item, extra).unwrap();

    assert_eq!(
        writer::to_string(&doc),
        r#"<Root><Item Id="a" v="2"/><Item Id="b"/></Root>"#
    );
}

#[test]
fn test_import_between_documents_keeps_spans() {
    let template = parse("<T><Child k=\"v\">text</Child></T>").unwrap();
    let child = template.children(template.root_element().unwrap())[0];

    let mut doc = parse("<Root/>").unwrap();
    let root = doc.root_element().unwrap();
    let copy = doc.import_node(&template, child).unwrap();
    doc.append_child(root, copy).unwrap();

    assert_eq!(doc.span(copy), template.span(child));
    assert_eq!(
        doc.attribute_node(copy, "k").unwrap().value_span,
        template.attribute_node(child, "k").unwrap().value_span
    );
    assert_eq!(
        writer::to_string(&doc),
        r#"<Root><Child k="v">text</Child></Root>"#
    );
}

#[test]
fn test_detached_nodes_are_not_written() {
    let mut doc = parse("<Root><A/><B/></Root>").unwrap();
    let root = doc.root_element().unwrap();
    let a = doc.children(root)[0];
    doc.detach(a);
    assert!(!doc.is_attached(a));
    assert_eq!(writer::to_string(&doc), "<Root><B/></Root>");
}

#[test]
fn test_mixed_content_keeps_inline_layout() {
    let doc = parse("<Root><P>a <B>b</B> c</P><Q/></Root>").unwrap();
    let out = writer::to_string_with(&doc, &WriteOptions::indented(1));
    assert!(out.contains("<P>a <B>b</B> c</P>"), "Got: {}", out);
}

// ============================================================================
// Errors
// ============================================================================

#[test]
fn test_parse_error_display() {
    let err = parse("<a>").unwrap_err();
    assert!(matches!(err, Error::UnexpectedEof { .. }));
    assert!(err.to_string().contains("</a>"), "Got: {}", err);
    assert!(err.location().is_some());
}

#[test]
fn test_tree_error_display() {
    let err = TreeError::NotAContainer {
        kind: NodeKind::Comment,
    };
    assert_eq!(err.to_string(), "a comment node cannot have children");
}

#[test]
fn test_insert_under_comment_fails() {
    let mut doc = parse("<Root><!--c--></Root>").unwrap();
    let root = doc.root_element().unwrap();
    let comment = doc.children(root)[0];
    let node = doc.create_element("X");
    assert_eq!(
        doc.append_child(comment, node),
        Err(TreeError::NotAContainer {
            kind: NodeKind::Comment
        })
    );
}
