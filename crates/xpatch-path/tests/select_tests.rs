//! Selection tests against realistic documents.

use proptest::prelude::*;
use xpatch_dom::{Document, NodeId, parse};
use xpatch_path::{EvalError, Item, Path};

const PARTS: &str = r#"<Parts>
  <Part Id="engine" Mass="120">
    <Mount Id="top"/>
    <Mount Id="bottom"/>
  </Part>
  <Part Id="tank" Mass="40">
    <?tool keep?>
    <Mount Id="top"/>
    <!--fuel-->
    <Label>Main tank</Label>
  </Part>
</Parts>"#;

fn select(doc: &Document, cursor: NodeId, path: &str) -> Vec<Item> {
    Path::parse(path).unwrap().select(doc, cursor).unwrap()
}

fn ids(doc: &Document, items: &[Item]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            doc.attribute(item.owner(), "Id")
                .unwrap_or("-")
                .to_string()
        })
        .collect()
}

// ============================================================================
// Location paths
// ============================================================================

#[test]
fn test_child_and_descendant() {
    let doc = parse(PARTS).unwrap();
    let root = doc.document_node();
    assert_eq!(
        ids(&doc, &select(&doc, root, "Parts/Part")),
        vec!["engine", "tank"]
    );
    assert_eq!(
        ids(&doc, &select(&doc, root, "//Mount")),
        vec!["top", "bottom", "top"]
    );
    assert_eq!(select(&doc, root, "descendant::Mount").len(), 3);
}

#[test]
fn test_relative_to_cursor() {
    let doc = parse(PARTS).unwrap();
    let parts = doc.root_element().unwrap();
    let tank = doc.child_elements(parts).nth(1).unwrap();
    assert_eq!(select(&doc, tank, "Mount").len(), 1);
    assert_eq!(select(&doc, tank, "."), vec![Item::Node(tank)]);
    assert_eq!(select(&doc, tank, ".."), vec![Item::Node(parts)]);
    assert_eq!(ids(&doc, &select(&doc, tank, "/Parts/Part[1]")), vec!["engine"]);
}

#[test]
fn test_attribute_items() {
    let doc = parse(PARTS).unwrap();
    let found = select(&doc, doc.document_node(), "Parts/Part/@Mass");
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(Item::is_attribute));
    assert_eq!(found[0].string_value(&doc), "120");
    assert_eq!(select(&doc, doc.document_node(), "Parts/Part[1]/@*").len(), 2);
}

#[test]
fn test_attribute_parent() {
    let doc = parse(PARTS).unwrap();
    let found = select(&doc, doc.document_node(), "//@Mass[. > 100]/..");
    assert_eq!(ids(&doc, &found), vec!["engine"]);
}

#[test]
fn test_node_type_tests() {
    let doc = parse(PARTS).unwrap();
    let root = doc.document_node();
    assert_eq!(select(&doc, root, "//comment()").len(), 1);
    assert_eq!(select(&doc, root, "//processing-instruction('tool')").len(), 1);
    assert_eq!(select(&doc, root, "//processing-instruction('other')").len(), 0);
    let text = select(&doc, root, "//Label/text()");
    assert_eq!(text.len(), 1);
    assert_eq!(text[0].string_value(&doc), "Main tank");
}

#[test]
fn test_sibling_axes() {
    let doc = parse(PARTS).unwrap();
    let root = doc.document_node();
    assert_eq!(
        ids(&doc, &select(&doc, root, "//Mount[@Id='top']/following-sibling::Mount")),
        vec!["bottom"]
    );
    // Reverse axis: [1] is the nearest preceding sibling.
    assert_eq!(
        ids(&doc, &select(&doc, root, "//Mount[@Id='bottom']/preceding-sibling::*[1]")),
        vec!["top"]
    );
}

#[test]
fn test_following_and_preceding_axes() {
    let doc = parse(PARTS).unwrap();
    let root = doc.document_node();
    assert_eq!(
        ids(&doc, &select(&doc, root, "//Mount[@Id='bottom']/following::Mount")),
        vec!["top"]
    );
    // Ancestors are not preceding nodes.
    assert_eq!(
        ids(&doc, &select(&doc, root, "//Part[2]/preceding::*")),
        vec!["engine", "top", "bottom"]
    );
    // Reverse axis: [2] counts back from the context node.
    assert_eq!(
        ids(&doc, &select(&doc, root, "//Label/preceding::*[2]")),
        vec!["bottom"]
    );
    // Following an attribute includes its owner's descendants.
    assert_eq!(
        ids(&doc, &select(&doc, root, "//Part[1]/@Mass/following::Mount")),
        vec!["top", "bottom", "top"]
    );
    assert!(select(&doc, root, "following::node()").is_empty());
}

#[test]
fn test_ancestor_axis_positions() {
    let doc = parse(PARTS).unwrap();
    let root = doc.document_node();
    let found = select(&doc, root, "//Label/ancestor::*[1]");
    assert_eq!(ids(&doc, &found), vec!["tank"]);
    assert_eq!(select(&doc, root, "//Label/ancestor-or-self::*").len(), 3);
}

#[test]
fn test_union_is_document_ordered() {
    let doc = parse(PARTS).unwrap();
    let found = select(&doc, doc.document_node(), "//Label | //Part[1] | //Part[1]");
    assert_eq!(found.len(), 2);
    assert_eq!(ids(&doc, &found), vec!["engine", "-"]);
}

#[test]
fn test_predicate_functions() {
    let doc = parse(PARTS).unwrap();
    let root = doc.document_node();
    assert_eq!(ids(&doc, &select(&doc, root, "//Part[count(Mount) = 2]")), vec!["engine"]);
    assert_eq!(ids(&doc, &select(&doc, root, "//Part[not(Label)]")), vec!["engine"]);
    assert_eq!(
        ids(&doc, &select(&doc, root, "//Part[starts-with(@Id, 'ta') or @Mass < 50]")),
        vec!["tank"]
    );
}

#[test]
fn test_arithmetic_predicates() {
    let doc = parse(PARTS).unwrap();
    let root = doc.document_node();
    let found = select(&doc, root, "//Part/Mount[last()-1]");
    assert_eq!(ids(&doc, &found), vec!["top"]);
    assert_eq!(doc.attribute(doc.parent(found[0].owner()).unwrap(), "Id"), Some("engine"));
    assert_eq!(ids(&doc, &select(&doc, root, "//Part[@Mass * 2 > 100]")), vec!["engine"]);
    assert_eq!(ids(&doc, &select(&doc, root, "//Part[@Mass div 40 = 1]")), vec!["tank"]);
    assert_eq!(ids(&doc, &select(&doc, root, "//Part[@Mass mod 100 = 20]")), vec!["engine"]);
    assert_eq!(select(&doc, root, "Parts[sum(Part/@Mass) = 160]").len(), 1);
    assert_eq!(ids(&doc, &select(&doc, root, "//Part[round(@Mass div 100) = 1]")), vec!["engine"]);
}

#[test]
fn test_string_predicates() {
    let doc = parse(PARTS).unwrap();
    let root = doc.document_node();
    assert_eq!(
        ids(&doc, &select(&doc, root, "//Part[substring(@Id, 1, 3) = 'eng']")),
        vec!["engine"]
    );
    assert_eq!(
        ids(&doc, &select(&doc, root, "//Mount[translate(@Id, 'opt', 'OPT') = 'TOP']")),
        vec!["top", "top"]
    );
    assert_eq!(select(&doc, root, "//Label[substring-after(., ' ') = 'tank']").len(), 1);
    assert_eq!(
        ids(&doc, &select(&doc, root, "//Part[substring-before(@Id, 'k') = 'tan']")),
        vec!["tank"]
    );
}

#[test]
fn test_detached_subtree() {
    let mut doc = parse(PARTS).unwrap();
    let parts = doc.root_element().unwrap();
    let engine = doc.child_elements(parts).next().unwrap();
    doc.detach(engine);
    // Absolute paths resolve against the top of the cursor's own tree.
    assert_eq!(select(&doc, engine, "/Mount").len(), 2);
    assert_eq!(select(&doc, doc.document_node(), "//Mount").len(), 1);
}

#[test]
fn test_non_node_set_is_rejected() {
    let doc = parse(PARTS).unwrap();
    let err = Path::parse("count(//Part)")
        .unwrap()
        .select(&doc, doc.document_node())
        .unwrap_err();
    assert_eq!(err, EvalError::NotANodeSet { found: "number" });
}

// ============================================================================
// Properties
// ============================================================================

fn flat_document(names: &[bool]) -> Document {
    let mut doc = Document::new();
    let root = doc.create_element("Root");
    doc.append_child(doc.document_node(), root).unwrap();
    for (i, &is_a) in names.iter().enumerate() {
        let child = doc.create_element(if is_a { "A" } else { "B" });
        doc.set_attribute(child, "n", i.to_string()).unwrap();
        doc.append_child(root, child).unwrap();
    }
    doc
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_union_is_ordered_and_unique(names in proptest::collection::vec(any::<bool>(), 0..12)) {
        let doc = flat_document(&names);
        let found = select(&doc, doc.document_node(), "Root/B | Root/A | Root/*");
        let order: Vec<usize> = found
            .iter()
            .map(|item| doc.attribute(item.owner(), "n").unwrap().parse().unwrap())
            .collect();
        let expected: Vec<usize> = (0..names.len()).collect();
        prop_assert_eq!(order, expected);
    }

    #[test]
    fn prop_position_predicate_selects_one(names in proptest::collection::vec(any::<bool>(), 1..12), pick in 0usize..12) {
        let doc = flat_document(&names);
        let index = pick % names.len();
        let found = select(&doc, doc.document_node(), &format!("Root/*[{}]", index + 1));
        prop_assert_eq!(found.len(), 1);
        let expected = index.to_string();
        prop_assert_eq!(doc.attribute(found[0].owner(), "n"), Some(expected.as_str()));
    }
}
