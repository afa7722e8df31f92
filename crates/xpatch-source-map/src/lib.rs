//! Source location tracking for xpatch.
//!
//! Patch files and documents are registered in a [`SourceContext`]; every
//! parsed node and attribute carries a [`SourceSpan`] pointing back into the
//! file it came from. Diagnostics use the context to turn spans into
//! line/column positions and source snippets.
//!
//! # Example
//!
//! ```rust
//! use xpatch_source_map::*;
//!
//! let mut ctx = SourceContext::new();
//! let file = ctx.add_file("patch.xml", Some("<Patch>\n  <Delete/>\n</Patch>".into()));
//!
//! let span = SourceSpan::new(file, 10, 19);
//! let loc = ctx.location(&span).unwrap();
//! assert_eq!((loc.row, loc.column), (1, 2));
//! ```

pub mod context;
pub mod types;
pub mod utils;

pub use context::{SourceContext, SourceFile};
pub use types::{FileId, Location, SourceSpan};
pub use utils::{line_col_to_offset, offset_to_location};
