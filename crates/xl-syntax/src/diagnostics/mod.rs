//! Diagnostics infrastructure for the frontend.
//!
//! Lexical and syntactic problems never abort parsing: they accumulate here
//! and the caller decides whether to proceed (the evaluator refuses to run a
//! program whose sink holds errors). Positions are offsets into the global
//! [`Positions`] space, resolved only when a message is rendered.
//!
//! [`Positions`]: xl_core::Positions

mod message;
mod printer;

#[cfg(test)]
mod diagnostics_tests;

use xl_core::Position;

pub use message::{DiagnosticMessage, RelatedInfo, Severity};
pub use printer::DiagnosticsPrinter;

/// Collection of diagnostic messages from scanning and parsing.
#[derive(Debug, Clone, Default)]
pub struct Diagnostics {
    messages: Vec<DiagnosticMessage>,
}

/// Builder for constructing a diagnostic message.
#[must_use = "diagnostic not emitted, call .emit()"]
pub struct DiagnosticBuilder<'a> {
    diagnostics: &'a mut Diagnostics,
    message: DiagnosticMessage,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn error(&mut self, msg: impl Into<String>, pos: Position) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            message: DiagnosticMessage::new(Severity::Error, pos, msg),
            diagnostics: self,
        }
    }

    pub fn warning(&mut self, msg: impl Into<String>, pos: Position) -> DiagnosticBuilder<'_> {
        DiagnosticBuilder {
            message: DiagnosticMessage::new(Severity::Warning, pos, msg),
            diagnostics: self,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn has_errors(&self) -> bool {
        self.messages.iter().any(|d| d.is_error())
    }

    pub fn iter(&self) -> impl Iterator<Item = &DiagnosticMessage> {
        self.messages.iter()
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.messages.extend(other.messages);
    }

    pub fn printer(&self) -> DiagnosticsPrinter<'_> {
        DiagnosticsPrinter::new(self)
    }
}

impl DiagnosticBuilder<'_> {
    pub fn related_to(mut self, msg: impl Into<String>, pos: Position) -> Self {
        self.message.related.push(RelatedInfo::new(pos, msg));
        self
    }

    pub fn emit(self) {
        self.diagnostics.messages.push(self.message);
    }
}
