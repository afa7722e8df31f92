//! Declarative XML patching.
//!
//! A [`Patch`] is an XML document whose root element holds an ordered list of
//! operations (`Update`, `Delete`, `Copy`, `If`, `IfAny`, `IfNone`, `With`).
//! Each operation addresses nodes of the target document with a path
//! expression relative to the current cursor. Patches are applied in order
//! by a [`PatchRunner`], which threads an [`ExecContext`] through the
//! evaluation: [`DefaultContext`] keeps nothing, [`DebugContext`] records the
//! whole evaluation as a [`Trace`].
//!
//! # Example
//!
//! ```
//! use xpatch_core::{Patch, apply_patches};
//! use xpatch_dom::{parse, writer};
//!
//! let mut doc = parse(r#"<Root><Item Id="a" v="1"/></Root>"#).unwrap();
//! let patch = Patch::parse(
//!     "bump",
//!     r#"<Patch>
//!          <Update Path="Root">
//!            <Root><Item Id="a" v="2"/><Item Id="b" v="9"/></Root>
//!          </Update>
//!        </Patch>"#,
//!     None,
//! )
//! .unwrap();
//!
//! apply_patches(&mut doc, &[patch]).unwrap();
//! assert_eq!(
//!     writer::to_string(&doc),
//!     r#"<Root><Item Id="a" v="2"/><Item Id="b" v="9"/></Root>"#
//! );
//! ```

pub mod context;
pub mod diagnostic;
pub mod error;
pub mod inserter;
pub mod load;
pub mod merge;
pub mod op;
pub mod position;
pub mod runner;

pub use context::{
    Action, ActionKind, ActionSource, ContextId, ContextType, DebugContext, DefaultContext,
    ExecContext, Execution, OpRef, PatchRef, Trace, TraceNode,
};
pub use error::{ApplyError, LoadError, PatchError, Result};
pub use inserter::Inserter;
pub use load::{Loader, OpConstructor, OpRegistry, Patch, extract_embedded_patches};
pub use merge::merge;
pub use op::{Content, ContentItem, ContentShape, Op, OpId, OpKind};
pub use position::Position;
pub use runner::{PatchRunner, apply_patches, apply_patches_traced};
