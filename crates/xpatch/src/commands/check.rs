/*
 * check.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Check command implementation
 */

//! Check command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use xpatch_core::OpRegistry;

use crate::config::Manifest;
use crate::inputs::{Sources, collect_patch_files};

/// Arguments for the check command
#[derive(Debug)]
pub struct CheckArgs {
    pub patches: Vec<PathBuf>,
    pub config: Option<PathBuf>,
}

/// Execute the check command
pub fn execute(args: CheckArgs) -> Result<()> {
    let patches = if args.patches.is_empty() {
        let cwd = std::env::current_dir().context("cannot determine the working directory")?;
        Manifest::discover(args.config.as_deref(), &cwd)?.patches
    } else {
        args.patches
    };
    if patches.is_empty() {
        bail!("no patches given and none set in the manifest");
    }

    let files = collect_patch_files(&patches)?;
    let loaded = Sources::new().load_patches(&files, &OpRegistry::default())?;
    let ops: usize = loaded.iter().map(|patch| patch.root().walk().len()).sum();
    eprintln!("{} patch(es) OK, {} operation(s)", loaded.len(), ops);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_reports_load_errors() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good.xml");
        let bad = dir.path().join("bad.xml");
        std::fs::write(&good, r#"<Patch><With Path="R"><Delete Path="x"/></With></Patch>"#).unwrap();
        std::fs::write(&bad, r#"<Patch><Delete Path="R["/></Patch>"#).unwrap();

        execute(CheckArgs {
            patches: vec![good.clone()],
            config: None,
        })
        .unwrap();
        assert!(
            execute(CheckArgs {
                patches: vec![good, bad],
                config: None,
            })
            .is_err()
        );
    }
}
