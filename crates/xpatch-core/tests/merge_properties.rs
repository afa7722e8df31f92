//! Property tests for the structural merge.

use proptest::prelude::*;
use xpatch_core::merge;
use xpatch_dom::{Document, NodeId, parse, writer};

const NAMES: &[&str] = &["a", "b", "c"];

fn element(name: u8, id: Option<u8>, extra: &str) -> String {
    let name = NAMES[name as usize % NAMES.len()];
    match id {
        Some(id) => format!(r#"<{name} Id="{id}"{extra}/>"#),
        None => format!("<{name}{extra}/>"),
    }
}

fn target_xml(children: &[(u8, Option<u8>)]) -> String {
    let body: String = children
        .iter()
        .map(|&(name, id)| element(name, id, ""))
        .collect();
    format!("<R>{body}</R>")
}

fn merge_root(doc: &mut Document, template: &Document) {
    let target = doc.root_element().unwrap();
    merge(doc, target, template, template.root_element().unwrap()).unwrap();
}

fn child_list(doc: &Document) -> Vec<NodeId> {
    doc.children(doc.root_element().unwrap()).to_vec()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_disjoint_merge_keeps_every_child(
        existing in prop::collection::vec((0u8..3, prop::option::of(0u8..3)), 0..6),
        incoming in prop::collection::vec((0u8..3, 0u8..9), 0..6),
    ) {
        let mut doc = parse(&target_xml(&existing)).unwrap();
        let before = child_list(&doc);

        let body: String = incoming
            .iter()
            .map(|&(name, v)| element(name, None, &format!(r#" _MergeId="-" v="{v}""#)))
            .collect();
        let template = parse(&format!("<R>{body}</R>")).unwrap();
        merge_root(&mut doc, &template);

        let after = child_list(&doc);
        prop_assert_eq!(after.len(), before.len() + incoming.len());
        prop_assert_eq!(&after[..before.len()], &before[..]);
        prop_assert!(!writer::to_string(&doc).contains("_Merge"));
    }

    #[test]
    fn prop_identity_merge_is_idempotent(
        existing in prop::collection::vec((0u8..3, prop::option::of(0u8..3)), 0..6),
        incoming in prop::collection::vec((0u8..3, 0u8..3, 0u8..9), 0..6),
    ) {
        let body: String = incoming
            .iter()
            .map(|&(name, id, v)| element(name, Some(id), &format!(r#" v="{v}""#)))
            .collect();
        let template = parse(&format!("<R>{body}</R>")).unwrap();

        let mut doc = parse(&target_xml(&existing)).unwrap();
        merge_root(&mut doc, &template);
        let once = writer::to_string(&doc);
        merge_root(&mut doc, &template);
        prop_assert_eq!(writer::to_string(&doc), once);
    }

    #[test]
    fn prop_identity_merge_never_duplicates(
        incoming in prop::collection::vec((0u8..3, 0u8..3), 1..8),
    ) {
        let body: String = incoming
            .iter()
            .map(|&(name, id)| element(name, Some(id), ""))
            .collect();
        let template = parse(&format!("<R>{body}</R>")).unwrap();

        let mut doc = parse("<R/>").unwrap();
        merge_root(&mut doc, &template);
        merge_root(&mut doc, &template);

        let mut seen = Vec::new();
        for child in child_list(&doc) {
            let key = (
                doc.name(child).unwrap_or_default().to_string(),
                doc.attribute(child, "Id").unwrap_or_default().to_string(),
            );
            prop_assert!(!seen.contains(&key), "duplicate {:?}", key);
            seen.push(key);
        }
    }
}
