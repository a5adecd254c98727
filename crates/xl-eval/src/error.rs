//! Evaluation errors.
//!
//! Message templates use `$1`, `$2` placeholders substituted with rendered
//! trees before the error is built, so an [`EvalError`] is self-contained:
//! a category, a finished message, and the source position of the failing
//! node (plus related positions, e.g. both sides of a type conflict).

use xl_core::Position;

/// Category of an evaluation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No candidate rewrite matched and the form is not `data`.
    Shape,
    /// A type annotation could not be satisfied.
    Type,
    /// Every candidate's `when` clause evaluated to false.
    Guard,
    /// Recursion depth or memory limits exceeded.
    Resource,
    /// Arithmetic failure such as division by zero.
    Arithmetic,
    /// The host requested a stop.
    Cancelled,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ErrorKind::Shape => "shape",
            ErrorKind::Type => "type",
            ErrorKind::Guard => "guard",
            ErrorKind::Resource => "resource",
            ErrorKind::Arithmetic => "arithmetic",
            ErrorKind::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// An evaluation failure with its source position.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{message}")]
pub struct EvalError {
    pub kind: ErrorKind,
    pub message: String,
    pub pos: Position,
    /// Further locations involved, e.g. the conflicting declaration.
    pub related: Vec<(String, Position)>,
}

impl EvalError {
    pub fn new(kind: ErrorKind, message: impl Into<String>, pos: Position) -> Self {
        Self {
            kind,
            message: message.into(),
            pos,
            related: Vec::new(),
        }
    }

    pub fn related(mut self, message: impl Into<String>, pos: Position) -> Self {
        self.related.push((message.into(), pos));
        self
    }

    /// Substitute `$1`, `$2`... with the rendered arguments.
    pub fn substitute(template: &str, args: &[String]) -> String {
        let mut message = template.to_owned();
        for (i, arg) in args.iter().enumerate() {
            message = message.replace(&format!("${}", i + 1), arg);
        }
        message
    }
}

/// Result type for evaluation.
pub type Result<T> = std::result::Result<T, EvalError>;
