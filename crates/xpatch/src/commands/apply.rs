/*
 * apply.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Apply command implementation
 */

//! Apply command implementation.

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow, bail};
use tracing::info;
use xpatch_core::{OpRegistry, Patch, apply_patches, apply_patches_traced, extract_embedded_patches};
use xpatch_dom::writer::{self, WriteOptions};

use crate::TraceFormat;
use crate::config::Manifest;
use crate::inputs::{Sources, collect_patch_files};

/// Arguments for the apply command
#[derive(Debug)]
pub struct ApplyArgs {
    pub document: Option<PathBuf>,
    pub patches: Vec<PathBuf>,
    pub output: Option<PathBuf>,
    pub indent: Option<usize>,
    pub trace: bool,
    pub trace_format: TraceFormat,
    pub embedded: bool,
    pub config: Option<PathBuf>,
}

/// Command-line arguments layered over the manifest.
#[derive(Debug, PartialEq)]
struct Settings {
    document: PathBuf,
    patches: Vec<PathBuf>,
    output: Option<PathBuf>,
    indent: Option<usize>,
    trace: bool,
    embedded: bool,
}

impl Settings {
    fn resolve(args: ApplyArgs, manifest: Manifest) -> Result<Self> {
        let document = args
            .document
            .or(manifest.document)
            .ok_or_else(|| anyhow!("no document given and none set in the manifest"))?;
        let patches = if args.patches.is_empty() {
            manifest.patches
        } else {
            args.patches
        };
        Ok(Self {
            document,
            patches,
            output: args.output.or(manifest.output),
            indent: args.indent.or(manifest.indent),
            trace: args.trace || manifest.trace,
            embedded: args.embedded || manifest.embedded,
        })
    }
}

/// Execute the apply command
pub fn execute(args: ApplyArgs) -> Result<()> {
    let cwd = std::env::current_dir().context("cannot determine the working directory")?;
    let manifest = Manifest::discover(args.config.as_deref(), &cwd)?;
    let trace_format = args.trace_format;
    let settings = Settings::resolve(args, manifest)?;

    let registry = OpRegistry::default();
    let mut sources = Sources::new();
    let (mut doc, file) = sources.load_document(&settings.document)?;

    let mut patches: Vec<Patch> = Vec::new();
    if settings.embedded {
        match extract_embedded_patches(&mut doc, Some(file), &registry) {
            Ok(found) => {
                info!(count = found.len(), "Extracted embedded patches");
                patches.extend(found);
            }
            Err(err) => {
                eprint!("{}", sources.render(&err));
                bail!("embedded patch failed to load");
            }
        }
    }
    let files = collect_patch_files(&settings.patches)?;
    patches.extend(sources.load_patches(&files, &registry)?);

    let result = if settings.trace {
        let (trace, result) = apply_patches_traced(&mut doc, &patches);
        match trace_format {
            TraceFormat::Text => eprint!("{}", trace.render_text(&doc, &patches)),
            TraceFormat::Json => eprintln!(
                "{}",
                serde_json::to_string_pretty(&trace).context("failed to serialize the trace")?
            ),
        }
        result
    } else {
        apply_patches(&mut doc, &patches)
    };
    if let Err(err) = result {
        eprint!("{}", sources.render(&err));
        bail!("failed to apply patches to {}", settings.document.display());
    }
    info!(patches = patches.len(), "Applied patches");

    let options = WriteOptions {
        indent: settings.indent,
        declaration: false,
    };
    let text = writer::to_string_with(&doc, &options);
    match &settings.output {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create {}", parent.display()))?;
            }
            std::fs::write(path, text)
                .with_context(|| format!("failed to write {}", path.display()))?;
        }
        None => print!("{}", text),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> ApplyArgs {
        ApplyArgs {
            document: None,
            patches: Vec::new(),
            output: None,
            indent: None,
            trace: false,
            trace_format: TraceFormat::Text,
            embedded: false,
            config: None,
        }
    }

    #[test]
    fn test_arguments_override_manifest() {
        let manifest = Manifest {
            document: Some("m.xml".into()),
            patches: vec!["m-patches".into()],
            output: Some("m-out.xml".into()),
            embedded: true,
            indent: Some(4),
            trace: false,
        };
        let settings = Settings::resolve(
            ApplyArgs {
                document: Some("cli.xml".into()),
                patches: vec!["cli.xml".into()],
                indent: Some(2),
                ..args()
            },
            manifest,
        )
        .unwrap();
        assert_eq!(
            settings,
            Settings {
                document: "cli.xml".into(),
                patches: vec!["cli.xml".into()],
                output: Some("m-out.xml".into()),
                indent: Some(2),
                trace: false,
                embedded: true,
            }
        );
    }

    #[test]
    fn test_document_is_required() {
        assert!(Settings::resolve(args(), Manifest::default()).is_err());
    }

    #[test]
    fn test_apply_writes_output() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("doc.xml");
        let patch_dir = dir.path().join("patches");
        std::fs::create_dir(&patch_dir).unwrap();
        std::fs::write(&doc, r#"<R><Patch><Copy Path="R"><e/></Copy></Patch><a/></R>"#).unwrap();
        std::fs::write(
            patch_dir.join("01.xml"),
            r#"<Patch><Update Path="R/a"><a v="1"/></Update></Patch>"#,
        )
        .unwrap();
        std::fs::write(
            patch_dir.join("02.xml"),
            r#"<Patch><Copy Path="R/a" Pos="Before"><b/></Copy></Patch>"#,
        )
        .unwrap();
        let output = dir.path().join("out/result.xml");

        execute(ApplyArgs {
            document: Some(doc),
            patches: vec![patch_dir],
            output: Some(output.clone()),
            embedded: true,
            config: Some(dir.path().join("missing.toml")),
            ..args()
        })
        .unwrap_err();

        std::fs::write(dir.path().join("xpatch.toml"), "").unwrap();
        execute(ApplyArgs {
            document: Some(dir.path().join("doc.xml")),
            patches: vec![dir.path().join("patches")],
            output: Some(output.clone()),
            embedded: true,
            config: Some(dir.path().join("xpatch.toml")),
            ..args()
        })
        .unwrap();
        assert_eq!(
            std::fs::read_to_string(&output).unwrap(),
            r#"<R><b/><a v="1"/><e/></R>"#
        );
    }

    #[test]
    fn test_apply_failure_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let doc = dir.path().join("doc.xml");
        let patch = dir.path().join("p.xml");
        std::fs::write(&doc, "<R/>").unwrap();
        std::fs::write(&patch, r#"<Patch><Delete Path="/"/></Patch>"#).unwrap();
        std::fs::write(dir.path().join("xpatch.toml"), "").unwrap();

        let err = execute(ApplyArgs {
            document: Some(doc),
            patches: vec![patch],
            trace: true,
            config: Some(dir.path().join("xpatch.toml")),
            ..args()
        })
        .unwrap_err();
        assert!(err.to_string().starts_with("failed to apply patches"));
    }
}
