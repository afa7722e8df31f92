//! The `xpatch.toml` manifest.
//!
//! ```toml
//! document = "scene.xml"
//! patches = ["patches/", "extra.xml"]
//! output = "out/scene.xml"
//! embedded = true
//! indent = 2
//! trace = false
//! ```
//!
//! Relative paths are resolved against the directory holding the manifest.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::debug;

pub const MANIFEST_NAME: &str = "xpatch.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
    pub document: Option<PathBuf>,
    pub patches: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub embedded: bool,
    pub indent: Option<usize>,
    pub trace: bool,
}

impl Manifest {
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let mut manifest: Manifest =
            toml::from_str(&text).with_context(|| format!("invalid manifest {}", path.display()))?;
        if let Some(base) = path.parent() {
            manifest.resolve_relative_to(base);
        }
        debug!(path = %path.display(), "Loaded manifest");
        Ok(manifest)
    }

    /// The manifest given explicitly, else `xpatch.toml` in `dir` if there is
    /// one, else an empty manifest.
    pub fn discover(explicit: Option<&Path>, dir: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        let candidate = dir.join(MANIFEST_NAME);
        if candidate.is_file() {
            Self::from_file(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    fn resolve_relative_to(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        self.document.iter_mut().for_each(resolve);
        self.output.iter_mut().for_each(resolve);
        self.patches.iter_mut().for_each(resolve);
    }
}
