/*
 * runner.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Ordered application of patches.
 */

//! Applying an ordered list of patches.

use crate::context::{DebugContext, DefaultContext, ExecContext, PatchRef, Trace};
use crate::error::ApplyError;
use crate::load::Patch;
use tracing::{info, warn};
use xpatch_dom::Document;

/// Applies patches one at a time, in order, under a root context.
///
/// A failing patch stops the run. Mutations it made before failing stay in
/// the document.
pub struct PatchRunner<'p, C: ExecContext> {
    patches: &'p [Patch],
    root: C,
    next: usize,
}

impl<'p, C: ExecContext> PatchRunner<'p, C> {
    pub fn new(patches: &'p [Patch], root: C) -> Self {
        Self {
            patches,
            root,
            next: 0,
        }
    }

    /// Patches not yet applied.
    pub fn remaining(&self) -> usize {
        self.patches.len() - self.next
    }

    /// The patch `run_next` will apply.
    pub fn current(&self) -> Option<&'p Patch> {
        self.patches.get(self.next)
    }

    /// Apply the next patch. `None` once every patch has run.
    pub fn run_next(&mut self, doc: &mut Document) -> Option<Result<(), ApplyError>> {
        let patch = self.current()?;
        let patch_ref = PatchRef {
            index: self.next,
            name: patch.name_arc(),
        };
        self.next += 1;

        info!(patch = %patch_ref.name, index = patch_ref.index, "Applying patch");
        let ctx = self.root.with_patch(&patch_ref);
        let result = patch.apply(doc, &ctx);
        match result {
            Ok(()) => {
                ctx.end();
                Some(Ok(()))
            }
            Err(err) => {
                let err = err.within_patch(&patch_ref);
                warn!(patch = %patch_ref.name, error = %err, "Patch failed");
                Some(Err(err))
            }
        }
    }

    /// Apply every remaining patch, stopping at the first failure. Returns
    /// how many patches were applied.
    pub fn run_all(&mut self, doc: &mut Document) -> Result<usize, ApplyError> {
        let mut applied = 0;
        while let Some(result) = self.run_next(doc) {
            result?;
            applied += 1;
        }
        Ok(applied)
    }

    pub fn into_context(self) -> C {
        self.root
    }
}

/// Apply `patches` in order with a [`DefaultContext`].
pub fn apply_patches(doc: &mut Document, patches: &[Patch]) -> Result<(), ApplyError> {
    let root = DefaultContext::root(doc.document_node());
    PatchRunner::new(patches, root).run_all(doc)?;
    Ok(())
}

/// Apply `patches` in order with a [`DebugContext`], returning the recorded
/// trace along with the outcome. The trace is complete up to the failure.
pub fn apply_patches_traced(
    doc: &mut Document,
    patches: &[Patch],
) -> (Trace, Result<(), ApplyError>) {
    let root = DebugContext::root(doc.document_node());
    let mut runner = PatchRunner::new(patches, root);
    let result = runner.run_all(doc).map(|_| ());
    let root = runner.into_context();
    (root.snapshot(), result)
}
