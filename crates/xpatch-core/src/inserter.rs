/*
 * inserter.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Ordered positional insertion.
 */

//! Positional insertion of a run of nodes relative to one element.

use crate::error::PatchError;
use crate::position::Position;
use xpatch_dom::{Document, NodeId, TreeError};

/// Inserts nodes one after another at a [`Position`] relative to `element`,
/// so that a run of inserted nodes keeps its order.
#[derive(Debug, Clone)]
pub struct Inserter {
    element: NodeId,
    position: Position,
    last: Option<NodeId>,
}

impl Inserter {
    /// # Errors
    ///
    /// `Merge` and `Default` are not positional and are rejected.
    pub fn new(element: NodeId, position: Position) -> Result<Self, PatchError> {
        match position {
            Position::Merge | Position::Default => Err(PatchError::configuration(format!(
                "position '{}' is not valid for insertion",
                position
            ))),
            _ => Ok(Self {
                element,
                position,
                last: None,
            }),
        }
    }

    pub fn element(&self) -> NodeId {
        self.element
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// The node inserted most recently.
    pub fn last(&self) -> Option<NodeId> {
        self.last
    }

    pub fn insert(&mut self, doc: &mut Document, node: NodeId) -> Result<(), TreeError> {
        match (self.position, self.last) {
            (Position::Prepend, last) => doc.prepend_after(self.element, last, node)?,
            (Position::After, last) => doc.insert_after(last.unwrap_or(self.element), node)?,
            (Position::Before, None) => doc.insert_before(self.element, node)?,
            (Position::Before, Some(last)) => doc.insert_after(last, node)?,
            _ => doc.append_child(self.element, node)?,
        }
        self.last = Some(node);
        Ok(())
    }
}
