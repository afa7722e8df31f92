//! Result values and the items a path can select.

use serde::Serialize;
use xpatch_dom::{Document, NodeData, NodeId};

/// A selected item: a tree node or one attribute of an element.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Item {
    Node(NodeId),
    Attribute { owner: NodeId, name: String },
}

impl Item {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Item::Node(id) => Some(*id),
            Item::Attribute { .. } => None,
        }
    }

    /// The node itself, or the element owning the attribute.
    pub fn owner(&self) -> NodeId {
        match self {
            Item::Node(id) => *id,
            Item::Attribute { owner, .. } => *owner,
        }
    }

    pub fn is_attribute(&self) -> bool {
        matches!(self, Item::Attribute { .. })
    }

    /// XPath string-value.
    pub fn string_value(&self, doc: &Document) -> String {
        match self {
            Item::Node(id) => doc.string_value(*id),
            Item::Attribute { owner, name } => {
                doc.attribute(*owner, name).unwrap_or_default().to_string()
            }
        }
    }

    /// Qualified name: element or attribute name, PI target, or empty.
    pub fn name<'d>(&'d self, doc: &'d Document) -> &'d str {
        match self {
            Item::Node(id) => match doc.data(*id) {
                NodeData::Element { name, .. } => name,
                NodeData::ProcessingInstruction { target, .. } => target,
                _ => "",
            },
            Item::Attribute { name, .. } => name,
        }
    }

    /// Sort key for document order. Attributes sort after their owner and
    /// before its children.
    pub(crate) fn order_key(&self, doc: &Document) -> (Vec<usize>, Option<usize>) {
        match self {
            Item::Node(id) => (doc.document_order_key(*id), None),
            Item::Attribute { owner, name } => {
                let index = doc
                    .attributes(*owner)
                    .iter()
                    .position(|a| &a.name == name)
                    .unwrap_or(usize::MAX);
                (doc.document_order_key(*owner), Some(index))
            }
        }
    }
}

/// The four XPath 1.0 value types.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Nodes(Vec<Item>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nodes(_) => "node-set",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
        }
    }

    pub fn to_boolean(&self) -> bool {
        match self {
            Value::Nodes(items) => !items.is_empty(),
            Value::Boolean(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
        }
    }

    pub fn to_number(&self, doc: &Document) -> f64 {
        match self {
            Value::Nodes(_) => string_to_number(&self.to_string_value(doc)),
            Value::Boolean(b) => {
                if *b {
                    1.0
                } else {
                    0.0
                }
            }
            Value::Number(n) => *n,
            Value::String(s) => string_to_number(s),
        }
    }

    /// String conversion; a node-set converts via its first item.
    pub fn to_string_value(&self, doc: &Document) -> String {
        match self {
            Value::Nodes(items) => items
                .first()
                .map(|item| item.string_value(doc))
                .unwrap_or_default(),
            Value::Boolean(b) => b.to_string(),
            Value::Number(n) => number_to_string(*n),
            Value::String(s) => s.clone(),
        }
    }
}

/// XPath `number()` on a string: optional sign, digits, optional fraction.
/// Anything else is NaN.
pub(crate) fn string_to_number(s: &str) -> f64 {
    let trimmed = s.trim();
    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    let valid = !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit() || c == '.')
        && digits.chars().filter(|&c| c == '.').count() <= 1
        && digits != ".";
    if valid {
        trimmed.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

pub(crate) fn number_to_string(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == n.trunc() && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_to_number() {
        assert_eq!(string_to_number(" 42 "), 42.0);
        assert_eq!(string_to_number("-1.5"), -1.5);
        assert_eq!(string_to_number(".5"), 0.5);
        assert!(string_to_number("1e3").is_nan());
        assert!(string_to_number("inf").is_nan());
        assert!(string_to_number("").is_nan());
        assert!(string_to_number(".").is_nan());
    }

    #[test]
    fn test_number_to_string() {
        assert_eq!(number_to_string(3.0), "3");
        assert_eq!(number_to_string(-0.0), "0");
        assert_eq!(number_to_string(2.5), "2.5");
        assert_eq!(number_to_string(f64::NAN), "NaN");
        assert_eq!(number_to_string(f64::NEG_INFINITY), "-Infinity");
    }

    #[test]
    fn test_boolean_conversion() {
        assert!(!Value::Number(f64::NAN).to_boolean());
        assert!(!Value::String(String::new()).to_boolean());
        assert!(Value::String("false".to_string()).to_boolean());
        assert!(!Value::Nodes(vec![]).to_boolean());
    }
}
