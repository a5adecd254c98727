//! The rewrite evaluator.
//!
//! `eval` reduces a tree by repeatedly selecting the first rewrite whose
//! pattern matches, binding its parameters in a child scope and continuing
//! with its body. The loop replaces the expression and environment in place
//! for tail positions, so recursive rewrites in tail position run in
//! constant stack. Nested evaluations (arguments, guards, sequence steps)
//! consume depth from a configurable limit and fail with a resource error
//! rather than overflowing the host stack.
//!
//! Collection points are the beginnings of eval steps; the cancel flag is
//! checked there too. Arguments bound to untyped parameters travel as
//! closures over the caller's environment and are re-entered on each use;
//! typed parameters are evaluated left-to-right before the call.

use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use xl_core::{Arena, Info, NodeId, Node, Position};
use xl_syntax::{Renderer, Syntax};

use crate::bind::{self, ArgMode, BindFailure, Condition, Match};
use crate::error::{ErrorKind, EvalError, Result};
use crate::scope::{NativeCtx, RewriteKind, RewriteRef, ScopeArena, ScopeId};
use crate::trace::{NoopTracer, Tracer};
use crate::types::{self, TypeInference};

/// Marks a node as fully reduced: evaluation returns it unchanged.
#[derive(Clone)]
pub struct ReducedInfo;

impl Info for ReducedInfo {
    fn dup(&self) -> Box<dyn Info> {
        Box::new(self.clone())
    }
    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

/// The runtime evaluation record: current scopes, resource limits, cancel
/// flag, error handler and output sink.
pub struct Context {
    pub scopes: ScopeArena,
    depth_limit: u32,
    cancel: Arc<AtomicBool>,
    error_handler: Option<NodeId>,
    output: Box<dyn io::Write>,
    /// Nodes held by active evaluator frames, part of the GC root set.
    machine_roots: Vec<NodeId>,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            scopes: ScopeArena::new(),
            depth_limit: 1024,
            cancel: Arc::new(AtomicBool::new(false)),
            error_handler: None,
            output: Box::new(io::stdout()),
            machine_roots: Vec::new(),
        }
    }

    /// Bound on nested (non-tail) evaluation depth.
    pub fn with_depth_limit(mut self, limit: u32) -> Self {
        self.depth_limit = limit;
        self
    }

    /// Where `write` and friends print.
    pub fn with_output(mut self, output: Box<dyn io::Write>) -> Self {
        self.output = output;
        self
    }

    /// Shared flag the host sets to stop evaluation at the next rewrite
    /// boundary.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        self.cancel.clone()
    }

    /// Install a tree evaluated as `handler "message"` when evaluation
    /// fails; errors escape to the caller when none is set.
    pub fn set_error_handler(&mut self, handler: Option<NodeId>) {
        self.error_handler = handler;
    }

    /// Evaluate an expression in the global scope.
    pub fn eval(&mut self, arena: &mut Arena, syntax: &Syntax, expr: NodeId) -> Result<NodeId> {
        self.eval_with(arena, syntax, expr, &mut NoopTracer)
    }

    /// Evaluate with a tracer; `NoopTracer` calls compile away.
    pub fn eval_with<T: Tracer>(
        &mut self,
        arena: &mut Arena,
        syntax: &Syntax,
        expr: NodeId,
        tracer: &mut T,
    ) -> Result<NodeId> {
        let mark = self.scopes.watermark();
        let global = self.scopes.global();
        let handler = self.error_handler;
        self.machine_roots.push(expr);
        let mut machine = Evaluator {
            arena,
            syntax,
            ctx: self,
            tracer,
            depth: 0,
        };
        let mut result = machine.eval(global, expr);

        let caught = match (&result, handler) {
            (Err(error), Some(_)) => Some((error.to_string(), error.pos)),
            _ => None,
        };
        if let (Some((text, pos)), Some(handler)) = (caught, handler) {
            let message = machine.arena.alloc(
                Node::Text {
                    value: text,
                    opening: "\"".to_owned(),
                    closing: "\"".to_owned(),
                },
                pos,
            );
            let call = machine.arena.alloc(
                Node::Prefix {
                    left: handler,
                    right: message,
                },
                pos,
            );
            // The handler runs without itself being handled.
            machine.ctx.error_handler = None;
            result = machine.eval(global, call);
            machine.ctx.error_handler = Some(handler);
        }

        self.machine_roots.clear();
        self.scopes.truncate(mark);
        result
    }
}

/// Control flow of one reduction step: a finished value, or a tail
/// continuation replacing the current expression and environment.
enum Flow {
    Value(NodeId),
    Tail(ScopeId, NodeId),
}

/// Failures observed across candidates, reported when nothing matched.
#[derive(Default)]
struct Failures {
    type_error: Option<EvalError>,
    guard_failed: bool,
}

struct Evaluator<'a, T: Tracer> {
    arena: &'a mut Arena,
    syntax: &'a Syntax,
    ctx: &'a mut Context,
    tracer: &'a mut T,
    depth: u32,
}

impl<T: Tracer> Evaluator<'_, T> {
    /// The iterative evaluation loop. Tail positions (rewrite bodies, block
    /// children, closure entries, the last statement of a sequence) replace
    /// `expr` and `scope` in place.
    fn eval(&mut self, mut scope: ScopeId, mut expr: NodeId) -> Result<NodeId> {
        loop {
            self.safepoint(expr)?;
            self.tracer.trace_eval(self.arena, expr);

            if self.arena.info::<ReducedInfo>(expr).is_some() {
                self.tracer.trace_result(self.arena, expr);
                return Ok(expr);
            }

            match self.arena.node(expr).clone() {
                Node::Integer(_) | Node::Real(_) | Node::Text { .. } => {
                    self.tracer.trace_result(self.arena, expr);
                    return Ok(expr);
                }
                Node::Name(name) => {
                    if Self::self_evaluating(&name) {
                        self.tracer.trace_result(self.arena, expr);
                        return Ok(expr);
                    }
                    if let Some((_, binding)) = self.ctx.scopes.lookup(scope, &name) {
                        match binding.closure {
                            // Re-enter the closure: the argument expression
                            // evaluates in the caller's environment on each
                            // use.
                            Some(env) => {
                                scope = env;
                                expr = binding.value;
                                continue;
                            }
                            None => {
                                self.tracer.trace_result(self.arena, binding.value);
                                return Ok(binding.value);
                            }
                        }
                    }
                    // Not a parameter: rewrites may define this name.
                }
                Node::Block { child, .. } => {
                    // A block is its child; local declarations stay local.
                    scope = self.ctx.scopes.new_child(scope);
                    expr = child;
                    continue;
                }
                Node::Infix { ref name, .. } if name == ";" || name == "\n" => {
                    match self.eval_sequence(scope, expr)? {
                        Flow::Value(value) => {
                            self.tracer.trace_result(self.arena, value);
                            return Ok(value);
                        }
                        Flow::Tail(next_scope, next) => {
                            scope = next_scope;
                            expr = next;
                            continue;
                        }
                    }
                }
                _ if Self::is_declaration(self.arena, expr) => {
                    self.declare_one(scope, expr);
                    let value = self.nil(self.arena.pos(expr));
                    self.tracer.trace_result(self.arena, value);
                    return Ok(value);
                }
                _ => {}
            }

            match self.reduce(scope, expr)? {
                Flow::Value(value) => {
                    self.tracer.trace_result(self.arena, value);
                    return Ok(value);
                }
                Flow::Tail(next_scope, next) => {
                    scope = next_scope;
                    expr = next;
                }
            }
        }
    }

    fn self_evaluating(name: &str) -> bool {
        name.is_empty() || name == "true" || name == "false" || name == "nil"
    }

    /// Nested, non-tail evaluation: consumes depth.
    fn eval_sub(&mut self, scope: ScopeId, expr: NodeId) -> Result<NodeId> {
        if self.depth >= self.ctx.depth_limit {
            return Err(self.error(
                ErrorKind::Resource,
                "recursion depth exceeded evaluating $1",
                &[expr],
                expr,
            ));
        }
        self.depth += 1;
        self.ctx.machine_roots.push(expr);
        let result = self.eval(scope, expr);
        self.ctx.machine_roots.pop();
        self.depth -= 1;
        result
    }

    // ------------------------------------------------------------------
    // Sequences and declarations
    // ------------------------------------------------------------------

    /// Two-phase sequence evaluation: declarations first so every rewrite
    /// in the block is visible before anything runs, then the statements in
    /// order, the last one in tail position.
    fn eval_sequence(&mut self, scope: ScopeId, seq: NodeId) -> Result<Flow> {
        let items = self.sequence_items(seq);
        for &item in &items {
            if Self::is_declaration(self.arena, item) {
                self.declare_one(scope, item);
            }
        }
        let last = items
            .iter()
            .rposition(|&item| !Self::is_declaration(self.arena, item));
        let Some(last) = last else {
            return Ok(Flow::Value(self.nil(self.arena.pos(seq))));
        };
        for &item in &items[..last] {
            if !Self::is_declaration(self.arena, item) {
                self.eval_sub(scope, item)?;
            }
        }
        Ok(Flow::Tail(scope, items[last]))
    }

    /// Flatten a `;` / newline spine, left to right.
    fn sequence_items(&self, seq: NodeId) -> Vec<NodeId> {
        let mut items = Vec::new();
        let mut stack = vec![seq];
        while let Some(id) = stack.pop() {
            match self.arena.node(id) {
                Node::Infix { name, left, right } if name == ";" || name == "\n" => {
                    stack.push(*right);
                    stack.push(*left);
                }
                _ => items.push(id),
            }
        }
        items
    }

    fn is_declaration(arena: &Arena, item: NodeId) -> bool {
        match arena.node(item) {
            Node::Infix { name, .. } => name == "->" || name == "is",
            Node::Prefix { left, .. } => {
                matches!(arena.node(*left), Node::Name(n) if n == "data" || n == "syntax")
            }
            _ => false,
        }
    }

    fn declare_one(&mut self, scope: ScopeId, item: NodeId) {
        let kind = if self.ctx.scopes.is_global(scope) {
            RewriteKind::Global
        } else {
            RewriteKind::Local
        };
        match self.arena.node(item).clone() {
            Node::Infix { name, left, right } if name == "->" || name == "is" => {
                self.ctx.scopes.define(self.arena, scope, left, right, kind);
            }
            Node::Prefix { left, right } => match self.arena.node(left) {
                Node::Name(n) if n == "data" => {
                    self.ctx.scopes.define_data(self.arena, scope, right);
                }
                // Syntax directives acted at parse time; inert here.
                _ => {}
            },
            _ => {}
        }
    }

    // ------------------------------------------------------------------
    // Reduction
    // ------------------------------------------------------------------

    fn reduce(&mut self, scope: ScopeId, expr: NodeId) -> Result<Flow> {
        let mut failures = Failures::default();

        if let Some(flow) = self.try_candidates(scope, expr, &mut failures)? {
            return Ok(flow);
        }

        // Inert data forms construct themselves, children evaluated.
        let shape = self.ctx.scopes.shape_of(self.arena, expr);
        if self.ctx.scopes.is_data(scope, shape) {
            let value = self.eval_data(scope, expr)?;
            self.arena.set_info(value, ReducedInfo);
            return Ok(Flow::Value(value));
        }

        // Evaluate children and retry once with the reduced form. The
        // rebuilt node is rooted by hand: nothing else reaches it while its
        // siblings' evaluation may trigger a collection.
        if let Some(rebuilt) = self.eval_children(scope, expr)? {
            self.ctx.machine_roots.push(rebuilt);
            let retried = self.try_candidates(scope, rebuilt, &mut failures);
            self.ctx.machine_roots.pop();
            if let Some(flow) = retried? {
                return Ok(flow);
            }
            let shape = self.ctx.scopes.shape_of(self.arena, rebuilt);
            if self.ctx.scopes.is_data(scope, shape) {
                self.arena.set_info(rebuilt, ReducedInfo);
                return Ok(Flow::Value(rebuilt));
            }
        }

        if let Some(error) = failures.type_error {
            return Err(error);
        }
        if failures.guard_failed {
            return Err(self.error(
                ErrorKind::Guard,
                "guard failed in every candidate for $1",
                &[expr],
                expr,
            ));
        }
        Err(self.error(ErrorKind::Shape, "no form matches $1", &[expr], expr))
    }

    /// Try every admissible rewrite in scope order; the first whose
    /// bindings and conditions hold wins.
    fn try_candidates(
        &mut self,
        scope: ScopeId,
        expr: NodeId,
        failures: &mut Failures,
    ) -> Result<Option<Flow>> {
        let shape = self.ctx.scopes.shape_of(self.arena, expr);
        let candidates = self.ctx.scopes.candidates(scope, shape);

        for rewrite in candidates {
            self.tracer.trace_candidate(self.arena, rewrite.from);
            let mut failure = BindFailure::default();
            let matched = bind::bind(
                self.arena,
                &self.ctx.scopes,
                rewrite.scope,
                rewrite.from,
                expr,
                &mut failure,
            );
            let Some(matched) = matched else {
                if let Some(conflict) = failure.type_conflict {
                    failures
                        .type_error
                        .get_or_insert(self.type_error(conflict));
                }
                continue;
            };

            match self.apply_candidate(scope, expr, rewrite, matched, failures)? {
                Applied::Flow(flow) => return Ok(Some(flow)),
                Applied::Rejected => continue,
            }
        }
        Ok(None)
    }

    fn apply_candidate(
        &mut self,
        scope: ScopeId,
        expr: NodeId,
        rewrite: RewriteRef,
        matched: Match,
        failures: &mut Failures,
    ) -> Result<Applied> {
        let strict = rewrite.native.is_some();
        let child = self.ctx.scopes.new_child(rewrite.scope);
        let roots_mark = self.ctx.machine_roots.len();

        let mut values = Vec::with_capacity(matched.bindings.len());
        let mut bindings = VecDeque::from(matched.bindings);
        let mut conditions = VecDeque::from(matched.conditions);
        if let Some(guard) = rewrite.guard {
            conditions.push_back(Condition::Guard { expr: guard });
        }

        // Bindings left to right: typed (and builtin) parameters evaluate
        // now, untyped ones close over the caller's environment.
        let accepted = loop {
            if let Some(spec) = bindings.pop_front() {
                match spec.mode {
                    ArgMode::Lazy if !strict => {
                        values.push(spec.value);
                        self.ctx.scopes.bind_lazy(child, spec.name, spec.value, scope);
                    }
                    ArgMode::Lazy => {
                        let value = self.eval_sub(scope, spec.value)?;
                        self.ctx.machine_roots.push(value);
                        self.ctx.scopes.bind(child, spec.name, value);
                        values.push(value);
                    }
                    ArgMode::Typed(ty) => {
                        let value = self.eval_sub(scope, spec.value)?;
                        match types::check_value(self.arena, value, ty) {
                            Ok(value) => {
                                self.ctx.machine_roots.push(value);
                                self.ctx.scopes.bind(child, spec.name, value);
                                values.push(value);
                            }
                            Err(found) => {
                                failures.type_error.get_or_insert(self.type_error(
                                    bind::TypeConflict {
                                        value: spec.value,
                                        declared: ty,
                                        found,
                                    },
                                ));
                                break false;
                            }
                        }
                    }
                }
                continue;
            }
            let Some(condition) = conditions.pop_front() else {
                break true;
            };
            match condition {
                Condition::Equal { value, expect } => {
                    let have = self.eval_sub(scope, value)?;
                    if !xl_core::trees_equal(self.arena, have, expect) {
                        break false;
                    }
                }
                Condition::EqualBinding { value, name } => {
                    let have = self.eval_sub(scope, value)?;
                    let Some((_, binding)) = self.ctx.scopes.lookup(child, &name) else {
                        break false;
                    };
                    let bound = match binding.closure {
                        Some(env) => self.eval_sub(env, binding.value)?,
                        None => binding.value,
                    };
                    if !xl_core::trees_equal(self.arena, have, bound) {
                        break false;
                    }
                }
                Condition::Guard { expr: guard } => {
                    let value = self.eval_sub(child, guard)?;
                    if !matches!(self.arena.node(value), Node::Name(n) if n == "true") {
                        failures.guard_failed = true;
                        break false;
                    }
                }
                Condition::Shape { value, pattern } => {
                    let have = self.eval_sub(scope, value)?;
                    let mut failure = BindFailure::default();
                    let Some(sub) = bind::bind(
                        self.arena,
                        &self.ctx.scopes,
                        rewrite.scope,
                        pattern,
                        have,
                        &mut failure,
                    ) else {
                        if let Some(conflict) = failure.type_conflict {
                            failures
                                .type_error
                                .get_or_insert(self.type_error(conflict));
                        }
                        break false;
                    };
                    // The sub-match contributes more bindings and checks.
                    for spec in sub.bindings.into_iter().rev() {
                        bindings.push_front(spec);
                    }
                    conditions.extend(sub.conditions);
                }
            }
        };

        self.ctx.machine_roots.truncate(roots_mark);
        if !accepted {
            return Ok(Applied::Rejected);
        }

        if let Some(native) = rewrite.native {
            self.tracer.trace_rewrite(self.arena, rewrite.from, None);
            let pos = self.arena.pos(expr);
            let mut native_ctx = NativeCtx {
                arena: &mut *self.arena,
                syntax: self.syntax,
                out: self.ctx.output.as_mut(),
                pos,
            };
            let value = native(&mut native_ctx, &values)?;
            return Ok(Applied::Flow(Flow::Value(value)));
        }

        let Some(body) = rewrite.to else {
            return Ok(Applied::Rejected);
        };

        // Type-check the body on first use with this argument shape.
        let args = self.ctx.scopes.shape_of(self.arena, expr);
        let checked = match self.ctx.scopes.check_cache(rewrite, args) {
            Some(checked) => checked,
            None => {
                let mut inference = TypeInference::new();
                let checked = inference.check_body(self.arena, body);
                self.ctx.scopes.record_check(rewrite, args, checked);
                checked
            }
        };
        if !checked {
            failures.type_error.get_or_insert(self.error(
                ErrorKind::Type,
                "type annotations in the definition of $1 cannot be satisfied",
                &[rewrite.from],
                body,
            ));
            return Ok(Applied::Rejected);
        }

        self.tracer.trace_rewrite(self.arena, rewrite.from, Some(body));
        Ok(Applied::Flow(Flow::Tail(child, body)))
    }

    /// Evaluate the children of a compound, keeping operator names in
    /// place. Returns `None` when nothing changed.
    fn eval_children(&mut self, scope: ScopeId, expr: NodeId) -> Result<Option<NodeId>> {
        let pos = self.arena.pos(expr);
        let roots_mark = self.ctx.machine_roots.len();
        let rebuilt = match self.arena.node(expr).clone() {
            Node::Prefix { left, right } => {
                let new_left = if matches!(self.arena.node(left), Node::Name(_)) {
                    left
                } else {
                    let value = self.eval_sub(scope, left)?;
                    self.ctx.machine_roots.push(value);
                    value
                };
                let new_right = self.eval_sub(scope, right)?;
                if new_left == left && new_right == right {
                    None
                } else {
                    Some(Node::Prefix {
                        left: new_left,
                        right: new_right,
                    })
                }
            }
            Node::Postfix { left, right } => {
                let new_left = self.eval_sub(scope, left)?;
                if new_left == left {
                    None
                } else {
                    Some(Node::Postfix {
                        left: new_left,
                        right,
                    })
                }
            }
            Node::Infix { name, left, right } => {
                let new_left = self.eval_sub(scope, left)?;
                self.ctx.machine_roots.push(new_left);
                let new_right = self.eval_sub(scope, right)?;
                if new_left == left && new_right == right {
                    None
                } else {
                    Some(Node::Infix {
                        name,
                        left: new_left,
                        right: new_right,
                    })
                }
            }
            _ => None,
        };
        self.ctx.machine_roots.truncate(roots_mark);
        Ok(rebuilt.map(|node| self.arena.alloc(node, pos)))
    }

    /// Structure-preserving evaluation for data forms: the constructor
    /// skeleton (head names, blocks, comma lists) stays, everything inside
    /// it reduces.
    fn eval_data(&mut self, scope: ScopeId, expr: NodeId) -> Result<NodeId> {
        let pos = self.arena.pos(expr);
        match self.arena.node(expr).clone() {
            Node::Block {
                child,
                opening,
                closing,
            } => {
                let child = self.eval_data(scope, child)?;
                Ok(self.arena.alloc(
                    Node::Block {
                        child,
                        opening,
                        closing,
                    },
                    pos,
                ))
            }
            Node::Infix { name, left, right } if name == "," || name == ";" || name == "\n" => {
                let left = self.eval_data(scope, left)?;
                self.ctx.machine_roots.push(left);
                let right = self.eval_data(scope, right)?;
                self.ctx.machine_roots.pop();
                Ok(self.arena.alloc(Node::Infix { name, left, right }, pos))
            }
            Node::Prefix { left, right } if matches!(self.arena.node(left), Node::Name(_)) => {
                let right = self.eval_data(scope, right)?;
                Ok(self.arena.alloc(Node::Prefix { left, right }, pos))
            }
            Node::Postfix { left, right } if matches!(self.arena.node(right), Node::Name(_)) => {
                let left = self.eval_data(scope, left)?;
                Ok(self.arena.alloc(Node::Postfix { left, right }, pos))
            }
            Node::Name(_) => Ok(expr),
            _ => self.eval_sub(scope, expr),
        }
    }

    // ------------------------------------------------------------------
    // Support
    // ------------------------------------------------------------------

    /// Cancel check and cooperative collection point.
    fn safepoint(&mut self, expr: NodeId) -> Result<()> {
        if self.ctx.cancel.load(Ordering::Relaxed) {
            return Err(self.error(
                ErrorKind::Cancelled,
                "evaluation cancelled",
                &[],
                expr,
            ));
        }
        if self.arena.gc_pending() {
            let roots: Vec<NodeId> = self
                .ctx
                .scopes
                .gc_roots()
                .chain(self.ctx.machine_roots.iter().copied())
                .chain(self.ctx.error_handler)
                .chain([expr])
                .collect();
            self.arena.collect(roots);
        }
        Ok(())
    }

    fn nil(&mut self, pos: Position) -> NodeId {
        self.arena.alloc(Node::Name("nil".to_owned()), pos)
    }

    fn render(&self, id: NodeId) -> String {
        Renderer::new(self.syntax).render(self.arena, id)
    }

    fn error(
        &self,
        kind: ErrorKind,
        template: &str,
        args: &[NodeId],
        at: NodeId,
    ) -> EvalError {
        let rendered: Vec<String> = args.iter().map(|&id| self.render(id)).collect();
        EvalError::new(
            kind,
            EvalError::substitute(template, &rendered),
            self.arena.pos(at),
        )
    }

    fn type_error(&self, conflict: bind::TypeConflict) -> EvalError {
        let value = self.render(conflict.value);
        let declared = self.render(conflict.declared);
        EvalError::new(
            ErrorKind::Type,
            format!(
                "type mismatch for {value}: expected {declared}, found {}",
                conflict.found
            ),
            self.arena.pos(conflict.value),
        )
        .related(
            format!("declared {declared} here"),
            self.arena.pos(conflict.declared),
        )
    }
}

enum Applied {
    Flow(Flow),
    Rejected,
}
