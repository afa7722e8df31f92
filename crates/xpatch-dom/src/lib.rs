//! Mutable XML document tree with source tracking.
//!
//! The patch engine edits documents in place, so unlike a read-only parse
//! tree this crate stores nodes in an arena ([`Document`]) addressed by
//! [`NodeId`]. Parent links are plain indices; nodes removed from the tree
//! stay in the arena but are no longer reachable from the document node.
//!
//! # Overview
//!
//! - [`Document`]: the arena and its mutation surface
//! - [`NodeData`]: element, text, comment and processing-instruction payloads
//! - [`parse`]: build a document from text with [`quick-xml`]
//! - [`writer`]: serialize a document back to XML
//! - [`display`]: render nodes literally for diagnostics
//!
//! # Example
//!
//! ```rust
//! use xpatch_dom::{parse, writer};
//!
//! let mut doc = parse(r#"<Root><Item Id="a"/></Root>"#).unwrap();
//! let root = doc.root_element().unwrap();
//! let item = doc.create_element("Item");
//! doc.set_attribute(item, "Id", "b").unwrap();
//! doc.append_child(root, item).unwrap();
//!
//! assert_eq!(
//!     writer::to_string(&doc),
//!     r#"<Root><Item Id="a"/><Item Id="b"/></Root>"#
//! );
//! ```

pub mod display;
pub mod document;
pub mod error;
pub mod node;
pub mod parser;
pub mod writer;

pub use document::{Descendants, Document};
pub use error::{Error, Result, TreeError};
pub use node::{Attribute, NodeData, NodeId, NodeKind};
pub use parser::{ParseOptions, parse, parse_with_options};
pub use xpatch_source_map::{FileId, SourceSpan};
