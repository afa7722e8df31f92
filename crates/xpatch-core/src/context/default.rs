/*
 * default.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Context that retains no history.
 */

use super::{Action, ActionKind, ActionSource, ExecContext, Execution, OpRef, PatchRef};
use crate::op::Op;
use crate::position::Position;
use xpatch_dom::NodeId;
use xpatch_path::Item;

/// Context that keeps only what the current scope needs.
#[derive(Debug, Clone)]
pub struct DefaultContext {
    cursor: NodeId,
    patch: Option<PatchRef>,
    op: Option<OpRef>,
}

impl DefaultContext {
    pub fn root(cursor: NodeId) -> Self {
        Self {
            cursor,
            patch: None,
            op: None,
        }
    }

    pub fn patch(&self) -> Option<&PatchRef> {
        self.patch.as_ref()
    }

    pub fn op(&self) -> Option<&OpRef> {
        self.op.as_ref()
    }
}

impl ExecContext for DefaultContext {
    fn cursor(&self) -> NodeId {
        self.cursor
    }

    fn with_patch(&self, patch: &PatchRef) -> Self {
        Self {
            cursor: self.cursor,
            patch: Some(patch.clone()),
            op: None,
        }
    }

    fn with_nav(&self, cursor: NodeId) -> Self {
        Self {
            cursor,
            patch: self.patch.clone(),
            op: None,
        }
    }

    fn execution(&self, op: &Op) -> Execution<Self> {
        let op = OpRef::of(op);
        Execution {
            context: Self {
                cursor: self.cursor,
                patch: self.patch.clone(),
                op: Some(op.clone()),
            },
            op,
        }
    }

    fn action(
        &self,
        kind: ActionKind,
        target: Item,
        source: Option<ActionSource>,
        position: Position,
    ) -> Action {
        Action {
            op: self.op.clone(),
            kind,
            target,
            source,
            position,
        }
    }

    fn end(&self) {}
}
