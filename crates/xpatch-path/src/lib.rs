//! Path queries over [`xpatch_dom`] documents.
//!
//! This crate implements the XPath 1.0 expression language that patch
//! authors use to address nodes: location paths over every axis except
//! `namespace`, predicates, arithmetic, comparisons, unions and the core
//! string, number and boolean functions. Variables, namespaces and the `id()`
//! and `lang()` functions are not supported.
//!
//! # Example
//!
//! ```
//! use xpatch_dom::parse;
//! use xpatch_path::{Item, Path};
//!
//! let doc = parse(r#"<Root><Item Id="a"/><Item Id="b"/></Root>"#).unwrap();
//! let path = Path::parse("Root/Item[@Id='b']").unwrap();
//!
//! let found = path.select(&doc, doc.document_node()).unwrap();
//! assert_eq!(found.len(), 1);
//! let Item::Node(item) = found[0] else { panic!() };
//! assert_eq!(doc.attribute(item, "Id"), Some("b"));
//! ```

pub mod ast;
mod error;
mod eval;
mod parser;
mod value;

pub use ast::{ArithmeticOp, Axis, CompareOp, Expr, Function, LocationPath, NodeTest, Step};
pub use error::{EvalError, ParseError, ParseErrorKind};
pub use value::{Item, Value};

use std::fmt;
use std::str::FromStr;
use xpatch_dom::{Document, NodeId};

/// A compiled path expression together with its source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    source: String,
    expr: Expr,
}

impl Path {
    /// Compile an expression.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] with the byte offset of the problem.
    pub fn parse(source: &str) -> Result<Self, ParseError> {
        let expr = parser::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            expr,
        })
    }

    /// The path `.`, which selects the cursor itself.
    pub fn current() -> Self {
        Self {
            source: ".".to_string(),
            expr: Expr::Path(LocationPath {
                absolute: false,
                steps: vec![Step::new(Axis::SelfAxis, NodeTest::Node)],
            }),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn expr(&self) -> &Expr {
        &self.expr
    }

    /// Evaluate against `cursor` and return the selected items in document
    /// order without duplicates.
    ///
    /// # Errors
    ///
    /// Fails if the expression does not produce a node-set.
    pub fn select(&self, doc: &Document, cursor: NodeId) -> Result<Vec<Item>, EvalError> {
        match self.evaluate(doc, cursor)? {
            Value::Nodes(items) => Ok(items),
            other => Err(EvalError::NotANodeSet {
                found: other.type_name(),
            }),
        }
    }

    /// Evaluate against `cursor`, returning any value type.
    pub fn evaluate(&self, doc: &Document, cursor: NodeId) -> Result<Value, EvalError> {
        eval::Evaluator::new(doc).evaluate(&self.expr, Item::Node(cursor))
    }
}

impl FromStr for Path {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}
