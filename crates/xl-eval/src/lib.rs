//! Runtime for XL: scopes, pattern matching, type inference and the
//! rewrite evaluator.
//!
//! Programs are parse trees from `xl-syntax`; evaluation rewrites them
//! under the rules stored in scoped symbol tables ([`scope`]). The
//! [`bind`] module matches values against patterns, [`types`] unifies
//! type trees, and [`eval`] drives the iterative rewrite loop with
//! closures, guards and resource limits. Native arithmetic and output
//! primitives live in [`builtins`].

pub mod bind;
pub mod builtins;
pub mod error;
pub mod eval;
pub mod scope;
pub mod trace;
pub mod types;

#[cfg(test)]
mod scope_tests;

pub use bind::{ArgMode, Condition, Match, Strength};
pub use builtins::install as install_builtins;
pub use error::{ErrorKind, EvalError, Result};
pub use eval::Context;
pub use scope::{Binding, NativeCtx, NativeFn, Rewrite, RewriteKind, ScopeArena, ScopeId};
pub use trace::{NoopTracer, PrintTracer, TRACE_NAMES, Tracer};
pub use types::{TypeInference, UnifyMode};
