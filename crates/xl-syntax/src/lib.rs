//! Frontend for XL: scanner, syntax table, parser and renderer.
//!
//! Source text becomes tokens ([`scanner`]), tokens become parse trees
//! ([`parser`]) under the operator priorities of a runtime-loadable table
//! ([`syntax`]), and trees become text again ([`renderer`]), such that
//! parsing the rendered form of a parsed tree reproduces it.
//!
//! Lexical and syntactic problems accumulate in a [`Diagnostics`] sink and
//! never abort parsing; fatal conditions (unreadable syntax or style files)
//! surface as [`Error`].

pub mod diagnostics;
pub mod parser;
pub mod renderer;
pub mod scanner;
pub mod syntax;

#[cfg(test)]
mod parser_tests;
#[cfg(test)]
mod test_utils;
#[cfg(test)]
mod scanner_tests;
#[cfg(test)]
mod syntax_tests;

pub use diagnostics::{Diagnostics, DiagnosticsPrinter, Severity};
pub use parser::{ParseResult, Parser, parse_source};
pub use renderer::{Renderer, StyleSheet};
pub use scanner::{Scanner, Token, normalize};
pub use syntax::{ChildSyntax, Syntax};

/// Fatal frontend errors. Problems in user programs are diagnostics, not
/// errors; these are configuration failures.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("cannot load syntax file {path}: {message}")]
    SyntaxFile { path: String, message: String },

    #[error("cannot load style sheet {path}: {message}")]
    StyleFile { path: String, message: String },
}

/// Result type for frontend operations.
pub type Result<T> = std::result::Result<T, Error>;
