//! Evaluation tracing.
//!
//! The evaluator is generic over a [`Tracer`]; [`NoopTracer`] calls compile
//! to nothing, while [`PrintTracer`] narrates evaluation to stderr for the
//! `-t` flags. Each trace category toggles independently: `eval` narrates
//! evaluation steps and results, `match` the candidate patterns tried, and
//! `rewrites` the rules actually applied.

use xl_core::{Arena, NodeId};

/// Trace categories selectable with `-t NAME`.
pub const TRACE_NAMES: &[&str] = &["eval", "match", "rewrites"];

/// Hooks called by the evaluator at interesting points.
pub trait Tracer {
    fn trace_eval(&mut self, arena: &Arena, expr: NodeId) {
        let _ = (arena, expr);
    }
    fn trace_candidate(&mut self, arena: &Arena, pattern: NodeId) {
        let _ = (arena, pattern);
    }
    fn trace_rewrite(&mut self, arena: &Arena, from: NodeId, to: Option<NodeId>) {
        let _ = (arena, from, to);
    }
    fn trace_result(&mut self, arena: &Arena, value: NodeId) {
        let _ = (arena, value);
    }
}

/// Tracer that does nothing; optimized away entirely.
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Tracer that prints the enabled categories to stderr.
pub struct PrintTracer {
    depth: usize,
    eval: bool,
    candidates: bool,
    rewrites: bool,
}

impl PrintTracer {
    /// Every category enabled.
    pub fn new() -> Self {
        Self {
            depth: 0,
            eval: true,
            candidates: true,
            rewrites: true,
        }
    }

    /// Only the named categories enabled; unknown names enable nothing
    /// (callers diagnose them with [`PrintTracer::is_known`]).
    pub fn with_categories<'a>(names: impl IntoIterator<Item = &'a str>) -> Self {
        let mut tracer = Self {
            depth: 0,
            eval: false,
            candidates: false,
            rewrites: false,
        };
        for name in names {
            match name {
                "eval" => tracer.eval = true,
                "match" => tracer.candidates = true,
                "rewrites" => tracer.rewrites = true,
                _ => {}
            }
        }
        tracer
    }

    /// Whether `name` is a trace category this tracer understands.
    pub fn is_known(name: &str) -> bool {
        TRACE_NAMES.contains(&name)
    }

    fn show(arena: &Arena, id: NodeId) -> String {
        match arena.node(id) {
            xl_core::Node::Integer(value) => value.to_string(),
            xl_core::Node::Real(value) => value.to_string(),
            xl_core::Node::Name(name) => name.clone(),
            xl_core::Node::Text { value, .. } => format!("{value:?}"),
            xl_core::Node::Block { .. } => "<block>".to_owned(),
            xl_core::Node::Prefix { .. } => "<prefix>".to_owned(),
            xl_core::Node::Postfix { .. } => "<postfix>".to_owned(),
            xl_core::Node::Infix { name, .. } => format!("<infix {name}>"),
        }
    }
}

impl Default for PrintTracer {
    fn default() -> Self {
        Self::new()
    }
}

impl Tracer for PrintTracer {
    fn trace_eval(&mut self, arena: &Arena, expr: NodeId) {
        if !self.eval {
            return;
        }
        eprintln!("{:width$}eval {}", "", Self::show(arena, expr), width = self.depth);
        self.depth += 1;
    }

    fn trace_candidate(&mut self, arena: &Arena, pattern: NodeId) {
        if !self.candidates {
            return;
        }
        eprintln!(
            "{:width$}try {}",
            "",
            Self::show(arena, pattern),
            width = self.depth
        );
    }

    fn trace_rewrite(&mut self, arena: &Arena, from: NodeId, _to: Option<NodeId>) {
        if !self.rewrites {
            return;
        }
        eprintln!(
            "{:width$}rewrite {}",
            "",
            Self::show(arena, from),
            width = self.depth
        );
    }

    fn trace_result(&mut self, arena: &Arena, value: NodeId) {
        if !self.eval {
            return;
        }
        self.depth = self.depth.saturating_sub(1);
        eprintln!(
            "{:width$}=> {}",
            "",
            Self::show(arena, value),
            width = self.depth
        );
    }
}
