/*
 * merge.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Structural merge of template elements.
 */

//! Recursive merge of a template element into a document element.
//!
//! Attributes of the template overwrite those of the target. Each template
//! child element is matched against the target's children by name and by
//! the value of an identifying attribute; matches are merged recursively,
//! everything else is inserted. Two reserved attributes steer matching and
//! never reach the target document:
//!
//! - `_MergeId` names the identifying attribute. `*` matches any same-named
//!   element, `-` never matches. Without it, `Id` is used when the template
//!   element has one, otherwise `*`.
//! - `_MergePos` (`Append` or `Prepend`) says where unmatched children go.

use crate::error::PatchError;
use crate::inserter::Inserter;
use crate::position::Position;
use xpatch_dom::{Attribute, Document, NodeData, NodeId, TreeError};

pub const MERGE_ID_ATTR: &str = "_MergeId";
pub const MERGE_POS_ATTR: &str = "_MergePos";
pub const DEFAULT_MERGE_ID: &str = "Id";
/// `_MergeId` value matching any element with the same name.
pub const MATCH_ANY: &str = "*";
/// `_MergeId` value matching nothing.
pub const MATCH_NONE: &str = "-";

/// Whether an attribute only steers merging.
pub fn is_reserved(name: &str) -> bool {
    name == MERGE_ID_ATTR || name == MERGE_POS_ATTR
}

/// Deep-copy a template node into `doc` without reserved attributes.
pub fn import_template(
    doc: &mut Document,
    template: &Document,
    node: NodeId,
) -> Result<NodeId, TreeError> {
    doc.import_node_filtered(template, node, &|attr: &Attribute| !is_reserved(&attr.name))
}

/// Merge the template element `source` (of `template`) into `target`.
///
/// # Errors
///
/// An invalid `_MergePos`, or a comment or processing instruction among the
/// template's children. Work done before the error stays applied.
pub fn merge(
    doc: &mut Document,
    target: NodeId,
    template: &Document,
    source: NodeId,
) -> Result<(), PatchError> {
    for attr in template.attributes(source) {
        if !is_reserved(&attr.name) {
            doc.put_attribute(target, attr.clone())?;
        }
    }

    let position = insert_position(template, source)?;
    let mut inserter = Inserter::new(target, position)?;

    for &child in template.children(source) {
        match template.data(child) {
            NodeData::Text(text) => {
                let node = doc.create_text(text.as_str());
                inserter.insert(doc, node)?;
            }
            NodeData::Element { name, .. } => match find_match(doc, target, template, child, name) {
                Some(existing) => merge(doc, existing, template, child)?,
                None => {
                    let node = import_template(doc, template, child)?;
                    inserter.insert(doc, node)?;
                }
            },
            other => {
                return Err(PatchError::UnsupportedMergeContent {
                    kind: other.kind(),
                    span: template.span(child),
                });
            }
        }
    }
    Ok(())
}

fn insert_position(template: &Document, source: NodeId) -> Result<Position, PatchError> {
    let Some(attr) = template.attribute_node(source, MERGE_POS_ATTR) else {
        return Ok(Position::Append);
    };
    if attr.value.is_empty() {
        return Ok(Position::Append);
    }
    match attr.value.parse::<Position>() {
        Ok(position @ (Position::Append | Position::Prepend)) => Ok(position),
        Ok(_) | Err(_) => Err(PatchError::Configuration {
            message: format!(
                "{} must be Append or Prepend, found '{}'",
                MERGE_POS_ATTR, attr.value
            ),
            span: attr.value_span.or(template.span(source)),
        }),
    }
}

/// The identifying attribute of a template element.
pub fn merge_id<'t>(template: &'t Document, element: NodeId) -> &'t str {
    match template.attribute(element, MERGE_ID_ATTR) {
        Some(id) if !id.is_empty() => id,
        _ if template.has_attribute(element, DEFAULT_MERGE_ID) => DEFAULT_MERGE_ID,
        _ => MATCH_ANY,
    }
}

fn find_match(
    doc: &Document,
    target: NodeId,
    template: &Document,
    element: NodeId,
    name: &str,
) -> Option<NodeId> {
    let id_attr = merge_id(template, element);
    if id_attr == MATCH_NONE {
        return None;
    }
    let wanted = template.attribute(element, id_attr).unwrap_or("");
    doc.child_elements(target).find(|&candidate| {
        doc.name(candidate) == Some(name)
            && (id_attr == MATCH_ANY || doc.attribute(candidate, id_attr).unwrap_or("") == wanted)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use insta::assert_snapshot;
    use xpatch_dom::{parse, writer};

    fn merged(target: &str, template: &str) -> Result<String, PatchError> {
        let mut doc = parse(target).unwrap();
        let tpl = parse(template).unwrap();
        let root = doc.root_element().unwrap();
        merge(&mut doc, root, &tpl, tpl.root_element().unwrap())?;
        Ok(writer::to_string(&doc))
    }

    #[test]
    fn test_merge_by_id() {
        let out = merged(
            r#"<Root><Item Id="a" v="1"/></Root>"#,
            r#"<Root><Item Id="a" v="2"/><Item Id="b" v="9"/></Root>"#,
        )
        .unwrap();
        assert_eq!(out, r#"<Root><Item Id="a" v="2"/><Item Id="b" v="9"/></Root>"#);
    }

    #[test]
    fn test_merge_any_matches_first_same_name() {
        let out = merged("<R><S><a/></S><S/></R>", "<R><S><b/></S></R>").unwrap();
        assert_eq!(out, "<R><S><a/><b/></S><S/></R>");
    }

    #[test]
    fn test_merge_none_always_inserts() {
        let out = merged(
            r#"<R><S k="1"/></R>"#,
            r#"<R><S _MergeId="-" k="2"/></R>"#,
        )
        .unwrap();
        assert_eq!(out, r#"<R><S k="1"/><S k="2"/></R>"#);
    }

    #[test]
    fn test_merge_custom_id_attribute() {
        let out = merged(
            r#"<R><P Name="x" v="1"/><P Name="y" v="1"/></R>"#,
            r#"<R><P _MergeId="Name" Name="y" v="2"/></R>"#,
        )
        .unwrap();
        assert_eq!(out, r#"<R><P Name="x" v="1"/><P Name="y" v="2"/></R>"#);
    }

    #[test]
    fn test_missing_id_matches_empty() {
        let out = merged(r#"<R><P/></R>"#, r#"<R><P _MergeId="Key" v="1"/></R>"#).unwrap();
        assert_eq!(out, r#"<R><P v="1"/></R>"#);
    }

    #[test]
    fn test_merge_prepend() {
        let out = merged(
            "<R><a/></R>",
            r#"<R _MergePos="Prepend"><x _MergeId="-"/><y/></R>"#,
        )
        .unwrap();
        assert_snapshot!(out, @"<R><x/><y/><a/></R>");
    }

    #[test]
    fn test_empty_merge_pos_appends() {
        let out = merged("<R><a/></R>", r#"<R _MergePos=""><x/></R>"#).unwrap();
        assert_snapshot!(out, @"<R><a/><x/></R>");
    }

    #[test]
    fn test_invalid_merge_pos() {
        let err = merged("<R/>", r#"<R _MergePos="After"><x/></R>"#).unwrap_err();
        assert!(matches!(err, PatchError::Configuration { .. }));
        assert!(err.to_string().contains("After"));
    }

    #[test]
    fn test_comment_in_template_rejected() {
        let err = merged("<R/>", "<R><!-- no --></R>").unwrap_err();
        assert!(matches!(
            err,
            PatchError::UnsupportedMergeContent {
                kind: xpatch_dom::NodeKind::Comment,
                ..
            }
        ));
    }

    #[test]
    fn test_reserved_attributes_never_copied() {
        let out = merged(
            r#"<R/>"#,
            r#"<R _MergePos="Append"><S _MergeId="-" _MergePos="Prepend"><T _MergeId="*"/></S></R>"#,
        )
        .unwrap();
        assert_eq!(out, "<R><S><T/></S></R>");
    }

    #[test]
    fn test_text_children_are_inserted() {
        let out = merged("<R><a/></R>", "<R>tail</R>").unwrap();
        assert_eq!(out, "<R><a/>tail</R>");
    }
}
