//! Symbol tables: scoped name bindings and rewrite storage.
//!
//! Scopes live in their own arena and form a parent chain. A scope holds
//! direct name bindings (parameters, with optional closure environments for
//! call-by-need), an ordered list of rewrites bucketed by shape hash, and
//! the set of `data` forms declared inert. Lookup searches the chain from
//! the innermost scope out; candidate enumeration preserves declaration
//! order, local scope first, and uses the shape hash as a coarse admission
//! filter.

use indexmap::IndexMap;

use xl_core::shape::{pattern_root, pattern_shape, value_shape};
use xl_core::{Arena, NodeId, Node, Position, Shape};

use crate::error::Result;

/// Handle to a scope in a [`ScopeArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScopeId(u32);

/// Where a rewrite came from; affects nothing but diagnostics and dumps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteKind {
    Local,
    Global,
    Builtin,
}

/// Context handed to native builtins.
pub struct NativeCtx<'a> {
    pub arena: &'a mut Arena,
    pub syntax: &'a xl_syntax::Syntax,
    pub out: &'a mut dyn std::io::Write,
    /// Position of the call site, for error reporting.
    pub pos: Position,
}

/// A native implementation of a builtin rewrite.
pub type NativeFn = fn(&mut NativeCtx<'_>, &[NodeId]) -> Result<NodeId>;

/// One rewrite rule: `from -> to`, optionally guarded, bucketed by the
/// shape hash of `from`.
#[derive(Debug, Clone)]
pub struct Rewrite {
    pub from: NodeId,
    pub to: Option<NodeId>,
    pub guard: Option<NodeId>,
    pub hash: u64,
    pub shape: Shape,
    pub kind: RewriteKind,
    pub native: Option<NativeFn>,
    /// Type-check results memoized per argument shape.
    pub checked: std::collections::HashMap<u64, bool>,
}

/// Copyable view of a rewrite, used while iterating candidates.
#[derive(Debug, Clone, Copy)]
pub struct RewriteRef {
    pub scope: ScopeId,
    pub index: usize,
    pub from: NodeId,
    pub to: Option<NodeId>,
    pub guard: Option<NodeId>,
    pub shape: Shape,
    pub kind: RewriteKind,
    pub native: Option<NativeFn>,
}

/// A direct name binding. `closure` marks a call-by-need parameter: the
/// value is an unevaluated expression to run in that environment.
#[derive(Debug, Clone, Copy)]
pub struct Binding {
    pub value: NodeId,
    pub closure: Option<ScopeId>,
}

#[derive(Debug, Default)]
struct Scope {
    names: IndexMap<String, Binding>,
    rewrites: Vec<Rewrite>,
    data_forms: Vec<(Shape, NodeId)>,
    parent: Option<ScopeId>,
    is_global: bool,
}

/// Arena of scopes; index 0 is the global scope.
#[derive(Debug)]
pub struct ScopeArena {
    scopes: Vec<Scope>,
}

impl Default for ScopeArena {
    fn default() -> Self {
        Self::new()
    }
}

impl ScopeArena {
    pub fn new() -> Self {
        Self {
            scopes: vec![Scope {
                is_global: true,
                ..Scope::default()
            }],
        }
    }

    pub fn global(&self) -> ScopeId {
        ScopeId(0)
    }

    /// Whether definitions entered here are visible across files.
    pub fn is_global(&self, scope: ScopeId) -> bool {
        self.scopes[scope.0 as usize].is_global
    }

    pub fn new_child(&mut self, parent: ScopeId) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(parent),
            ..Scope::default()
        });
        ScopeId(self.scopes.len() as u32 - 1)
    }

    pub fn parent(&self, scope: ScopeId) -> Option<ScopeId> {
        self.scopes[scope.0 as usize].parent
    }

    /// Current scope count; pairs with [`ScopeArena::truncate`] to reclaim
    /// call scopes after a top-level evaluation completes.
    pub fn watermark(&self) -> usize {
        self.scopes.len()
    }

    pub fn truncate(&mut self, mark: usize) {
        self.scopes.truncate(mark.max(1));
    }

    // ------------------------------------------------------------------
    // Name bindings
    // ------------------------------------------------------------------

    pub fn bind(&mut self, scope: ScopeId, name: impl Into<String>, value: NodeId) {
        self.scopes[scope.0 as usize].names.insert(
            name.into(),
            Binding {
                value,
                closure: None,
            },
        );
    }

    /// Bind a call-by-need parameter: `value` is unevaluated and will run
    /// in `env` when first used.
    pub fn bind_lazy(
        &mut self,
        scope: ScopeId,
        name: impl Into<String>,
        value: NodeId,
        env: ScopeId,
    ) {
        self.scopes[scope.0 as usize].names.insert(
            name.into(),
            Binding {
                value,
                closure: Some(env),
            },
        );
    }

    /// Search `scope` then its ancestors for a binding.
    pub fn lookup(&self, scope: ScopeId, name: &str) -> Option<(ScopeId, Binding)> {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = &self.scopes[id.0 as usize];
            if let Some(binding) = entry.names.get(name) {
                return Some((id, *binding));
            }
            current = entry.parent;
        }
        None
    }

    /// Whether `name` is bound anywhere in the chain (parameters only, not
    /// rewrites): used by the matcher to decide reference vs fresh binding.
    pub fn is_bound(&self, scope: ScopeId, name: &str) -> bool {
        self.lookup(scope, name).is_some()
    }

    // ------------------------------------------------------------------
    // Rewrites
    // ------------------------------------------------------------------

    /// Register `from -> to`. The pattern is stored with outer blocks and
    /// the `when` clause stripped; the guard moves to its own field. Later
    /// definitions land at the end of their bucket, so the first matching
    /// rewrite in declaration order wins.
    pub fn define(
        &mut self,
        arena: &Arena,
        scope: ScopeId,
        from: NodeId,
        to: NodeId,
        kind: RewriteKind,
    ) {
        self.define_rewrite(arena, scope, from, Some(to), kind, None);
    }

    /// Register a builtin backed by native code.
    pub fn define_native(
        &mut self,
        arena: &Arena,
        scope: ScopeId,
        from: NodeId,
        native: NativeFn,
    ) {
        self.define_rewrite(arena, scope, from, None, RewriteKind::Builtin, Some(native));
    }

    fn define_rewrite(
        &mut self,
        arena: &Arena,
        scope: ScopeId,
        from: NodeId,
        to: Option<NodeId>,
        kind: RewriteKind,
        native: Option<NativeFn>,
    ) {
        let mut stripped = from;
        while let Node::Block { child, .. } = arena.node(stripped) {
            stripped = *child;
        }
        let (pattern, guard) = match arena.node(stripped) {
            Node::Infix { name, left, right } if name == "when" => (*left, Some(*right)),
            _ => (stripped, None),
        };
        let shape = pattern_shape(arena, pattern);
        self.scopes[scope.0 as usize].rewrites.push(Rewrite {
            from: pattern,
            to,
            guard,
            hash: shape.as_u64(),
            shape,
            kind,
            native,
            checked: std::collections::HashMap::new(),
        });
    }

    /// Declare a form inert: matching values construct themselves.
    pub fn define_data(&mut self, arena: &Arena, scope: ScopeId, pattern: NodeId) {
        let stripped = pattern_root(arena, pattern);
        let shape = pattern_shape(arena, stripped);
        self.scopes[scope.0 as usize]
            .data_forms
            .push((shape, stripped));
    }

    /// Rewrites whose shape admits `value`, in scope-chain order, local
    /// scope first, declaration order within a scope.
    pub fn candidates(&self, scope: ScopeId, value: Shape) -> Vec<RewriteRef> {
        let mut found = Vec::new();
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = &self.scopes[id.0 as usize];
            for (index, rewrite) in entry.rewrites.iter().enumerate() {
                if rewrite.shape.admits(value) {
                    found.push(RewriteRef {
                        scope: id,
                        index,
                        from: rewrite.from,
                        to: rewrite.to,
                        guard: rewrite.guard,
                        shape: rewrite.shape,
                        kind: rewrite.kind,
                        native: rewrite.native,
                    });
                }
            }
            current = entry.parent;
        }
        found
    }

    /// Whether a `data` declaration in scope admits this value shape.
    pub fn is_data(&self, scope: ScopeId, value: Shape) -> bool {
        let mut current = Some(scope);
        while let Some(id) = current {
            let entry = &self.scopes[id.0 as usize];
            if entry.data_forms.iter().any(|(shape, _)| shape.admits(value)) {
                return true;
            }
            current = entry.parent;
        }
        false
    }

    /// Memoized type-check result for a rewrite, per argument shape.
    pub fn check_cache(&self, rewrite: RewriteRef, args: Shape) -> Option<bool> {
        self.scopes[rewrite.scope.0 as usize].rewrites[rewrite.index]
            .checked
            .get(&args.as_u64())
            .copied()
    }

    pub fn record_check(&mut self, rewrite: RewriteRef, args: Shape, ok: bool) {
        self.scopes[rewrite.scope.0 as usize].rewrites[rewrite.index]
            .checked
            .insert(args.as_u64(), ok);
    }

    /// Every node the scope graph keeps alive, for the collector's root set.
    pub fn gc_roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.scopes.iter().flat_map(|scope| {
            let names = scope.names.values().map(|b| b.value);
            let rewrites = scope.rewrites.iter().flat_map(|r| {
                [Some(r.from), r.to, r.guard].into_iter().flatten()
            });
            let data = scope.data_forms.iter().map(|(_, pattern)| *pattern);
            names.chain(rewrites).chain(data)
        })
    }

    /// Evaluate a value shape for candidate lookup.
    pub fn shape_of(&self, arena: &Arena, value: NodeId) -> Shape {
        value_shape(arena, value)
    }
}
