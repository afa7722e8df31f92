/*
 * diagnostic.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Source-annotated rendering of patch errors.
 */

//! Rendering load and apply errors against their source files.

use crate::error::{ApplyError, LoadError, PatchError};
use ariadne::{Color, Config, Label, Report, ReportKind, Source};
use xpatch_source_map::{SourceContext, SourceSpan};

/// An error that may point into a registered source file.
pub trait Reportable {
    /// Headline of the report.
    fn message(&self) -> String;

    /// Text attached to the highlighted span.
    fn label(&self) -> String;

    fn span(&self) -> Option<SourceSpan>;
}

impl Reportable for PatchError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn label(&self) -> String {
        self.to_string()
    }

    fn span(&self) -> Option<SourceSpan> {
        PatchError::span(self)
    }
}

impl Reportable for LoadError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn label(&self) -> String {
        self.kind.to_string()
    }

    fn span(&self) -> Option<SourceSpan> {
        self.kind.span()
    }
}

impl Reportable for ApplyError {
    fn message(&self) -> String {
        self.to_string()
    }

    fn label(&self) -> String {
        match &self.operation {
            Some(op) => format!("while executing <{}> #{}: {}", op.tag, op.id, self.kind),
            None => self.kind.to_string(),
        }
    }

    /// The error's own span, else the failing operation's element.
    fn span(&self) -> Option<SourceSpan> {
        self.kind
            .span()
            .or_else(|| self.operation.as_ref().and_then(|op| op.span))
    }
}

/// Render `err` as a source snippet when its span resolves to a file with
/// content, and as a single `error:` line otherwise.
pub fn render(err: &impl Reportable, ctx: &SourceContext, color: bool) -> String {
    err.span()
        .and_then(|span| render_snippet(err, &span, ctx, color))
        .unwrap_or_else(|| render_plain(err, ctx))
}

fn render_plain(err: &impl Reportable, ctx: &SourceContext) -> String {
    match err.span().and_then(|span| ctx.describe(&span)) {
        Some(location) => format!("error: {}\n  --> {}\n", err.message(), location),
        None => format!("error: {}\n", err.message()),
    }
}

fn render_snippet(
    err: &impl Reportable,
    span: &SourceSpan,
    ctx: &SourceContext,
    color: bool,
) -> Option<String> {
    let file = ctx.get_file(span.file?)?;
    let content = file.read_content()?;

    // ariadne counts characters, spans count bytes.
    let start = char_offset(&content, span.start)?;
    let end = char_offset(&content, span.end)?.max(start);

    let report = Report::build(ReportKind::Error, file.path.clone(), start)
        .with_config(Config::default().with_color(color))
        .with_message(err.message())
        .with_label(
            Label::new((file.path.clone(), start..end))
                .with_message(err.label())
                .with_color(Color::Red),
        )
        .finish();

    let mut output = Vec::new();
    report
        .write((file.path.clone(), Source::from(content.as_str())), &mut output)
        .ok()?;
    String::from_utf8(output).ok()
}

fn char_offset(content: &str, byte: usize) -> Option<usize> {
    if byte > content.len() || !content.is_char_boundary(byte) {
        return None;
    }
    Some(content[..byte].chars().count())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::load::Patch;

    #[test]
    fn test_load_error_snippet() {
        let text = "<Patch>\n  <Delete Path=\"Item]\"/>\n</Patch>\n";
        let mut ctx = SourceContext::new();
        let file = ctx.add_file("fix.xml", Some(text.to_string()));
        let err = Patch::parse("fix", text, Some(file)).unwrap_err();

        let out = render(&err, &ctx, false);
        assert!(out.contains("failed to load patch 'fix'"), "{out}");
        assert!(out.contains("fix.xml:2:"), "{out}");
        assert!(out.contains("<Delete Path=\"Item]\"/>"), "{out}");
    }

    #[test]
    fn test_plain_fallback_without_span() {
        let ctx = SourceContext::new();
        let err = PatchError::configuration("bad position");
        assert_eq!(render(&err, &ctx, false), "error: bad position\n");
    }

    #[test]
    fn test_char_offset() {
        assert_eq!(char_offset("aé b", 0), Some(0));
        assert_eq!(char_offset("aé b", 3), Some(2));
        assert_eq!(char_offset("aé b", 2), None);
        assert_eq!(char_offset("ab", 9), None);
    }
}
