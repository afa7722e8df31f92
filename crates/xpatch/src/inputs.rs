//! Reading documents and patches from disk.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use tracing::debug;
use walkdir::WalkDir;
use xpatch_core::{OpRegistry, Patch, diagnostic};
use xpatch_dom::{Document, ParseOptions, parse_with_options};
use xpatch_source_map::{FileId, SourceContext};

/// Expand `paths` into patch files. Directories contribute every `*.xml`
/// file below them, sorted by path; files are taken as given.
pub fn collect_patch_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let mut found: Vec<PathBuf> = WalkDir::new(path)
                .follow_links(true)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .map(|e| e.into_path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "xml"))
                .collect();
            found.sort();
            debug!(dir = %path.display(), count = found.len(), "Collected patches");
            files.extend(found);
        } else if path.is_file() {
            files.push(path.clone());
        } else {
            bail!("no such patch file or directory: {}", path.display());
        }
    }
    Ok(files)
}

/// Source files read during a run, for diagnostics.
#[derive(Debug, Default)]
pub struct Sources {
    pub context: SourceContext,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a document, returning it with the id it was registered under.
    pub fn load_document(&mut self, path: &Path) -> Result<(Document, FileId)> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let file = self
            .context
            .add_file(path.display().to_string(), Some(text.clone()));
        let options = ParseOptions {
            file: Some(file),
            ..ParseOptions::default()
        };
        let doc = parse_with_options(&text, &options)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok((doc, file))
    }

    /// Load every patch, reporting each failure to stderr. Fails if any
    /// patch failed to load.
    pub fn load_patches(&mut self, files: &[PathBuf], registry: &OpRegistry) -> Result<Vec<Patch>> {
        let mut patches = Vec::with_capacity(files.len());
        let mut failed = 0;
        for path in files {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            let name = path.display().to_string();
            let file = self.context.add_file(name.clone(), Some(text.clone()));
            match Patch::parse_with(&name, &text, Some(file), registry) {
                Ok(patch) => patches.push(patch),
                Err(err) => {
                    failed += 1;
                    eprint!("{}", self.render(&err));
                }
            }
        }
        if failed > 0 {
            bail!("{} of {} patch(es) failed to load", failed, files.len());
        }
        Ok(patches)
    }

    pub fn render(&self, err: &impl diagnostic::Reportable) -> String {
        use std::io::IsTerminal;
        diagnostic::render(err, &self.context, std::io::stderr().is_terminal())
    }
}
