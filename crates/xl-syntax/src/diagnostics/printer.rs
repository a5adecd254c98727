//! Renders diagnostics with annotated source excerpts.

use std::fmt::Write;

use annotate_snippets::{AnnotationKind, Group, Level, Renderer, Snippet};
use xl_core::Positions;

use super::Diagnostics;
use super::message::Severity;

/// Builder for rendering diagnostics with various options.
pub struct DiagnosticsPrinter<'d> {
    diagnostics: &'d Diagnostics,
    positions: Option<&'d Positions>,
    colored: bool,
}

impl<'d> DiagnosticsPrinter<'d> {
    pub fn new(diagnostics: &'d Diagnostics) -> Self {
        Self {
            diagnostics,
            positions: None,
            colored: false,
        }
    }

    /// Resolve offsets through a position table, enabling source excerpts.
    pub fn positions(mut self, positions: &'d Positions) -> Self {
        self.positions = Some(positions);
        self
    }

    pub fn colored(mut self, value: bool) -> Self {
        self.colored = value;
        self
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        self.format(&mut out).expect("String write never fails");
        out
    }

    pub fn format(&self, w: &mut impl Write) -> std::fmt::Result {
        let Some(positions) = self.positions else {
            return self.format_plain(w);
        };

        let renderer = if self.colored {
            Renderer::styled()
        } else {
            Renderer::plain()
        };

        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }

            let level = severity_to_level(diag.severity);
            let Some(location) = positions.resolve(diag.pos) else {
                // No source attached to this position; title line only.
                let report: Vec<Group> = vec![Group::with_title(level.primary_title(&diag.message))];
                write!(w, "{}", renderer.render(&report))?;
                continue;
            };
            let (path, source) = positions
                .source_of(diag.pos)
                .expect("resolved position has a source");
            let offset = span_in(source, &location);

            let mut snippet = Snippet::source(source).line_start(1).path(path).annotation(
                AnnotationKind::Primary
                    .span(offset)
                    .label(&diag.message),
            );
            for related in &diag.related {
                if let Some(rel) = positions.resolve(related.pos)
                    && positions.source_of(related.pos).map(|(p, _)| p) == Some(path)
                {
                    snippet = snippet.annotation(
                        AnnotationKind::Context
                            .span(span_in(source, &rel))
                            .label(&related.message),
                    );
                }
            }

            let report: Vec<Group> = vec![level.primary_title(&diag.message).element(snippet)];
            write!(w, "{}", renderer.render(&report))?;
        }

        Ok(())
    }

    fn format_plain(&self, w: &mut impl Write) -> std::fmt::Result {
        for (i, diag) in self.diagnostics.iter().enumerate() {
            if i > 0 {
                w.write_char('\n')?;
            }
            write!(w, "{diag}")?;
        }
        Ok(())
    }
}

fn severity_to_level(severity: Severity) -> Level<'static> {
    match severity {
        Severity::Error => Level::ERROR,
        Severity::Warning => Level::WARNING,
    }
}

/// Byte span of the located character within its whole source.
fn span_in(source: &str, location: &xl_core::SourceLocation<'_>) -> std::ops::Range<usize> {
    let mut line_start = 0usize;
    for _ in 1..location.line {
        match source[line_start..].find('\n') {
            Some(at) => line_start += at + 1,
            None => break,
        }
    }
    let start = (line_start + location.column as usize - 1).min(source.len());
    start..(start + 1).min(source.len())
}
