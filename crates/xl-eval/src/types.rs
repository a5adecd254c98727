//! Type inference by unification over tree shapes.
//!
//! Types are themselves trees: the names `integer`, `real`, `text`,
//! `character`, `boolean` and `nil`, unions built with `|`, function shapes
//! built with `->`, and free type variables (names starting with `#`).
//! Unification succeeds on structural equality after substitution, on the
//! `integer ⊂ real` subtyping step in `Use` mode, on union membership, or
//! against a free variable.
//!
//! Inference runs lazily, per rewrite, on first call with a given argument
//! shape; the evaluator memoizes the verdict on the rewrite itself.

use std::collections::HashMap;

use xl_core::{Arena, NOWHERE, NodeId, Node};

pub const INTEGER: &str = "integer";
pub const REAL: &str = "real";
pub const TEXT: &str = "text";
pub const CHARACTER: &str = "character";
pub const BOOLEAN: &str = "boolean";
pub const NIL: &str = "nil";
/// The top type: every tree has it.
pub const TREE: &str = "tree";

/// How a unification is used: `Use` permits subtyping (an integer value
/// flows into a real slot), `Declaration` requires the declared shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnifyMode {
    Use,
    Declaration,
}

fn is_type_var(name: &str) -> bool {
    name.starts_with('#')
}

/// A provisional inference context: per-expression types and a substitution
/// for type variables. Child contexts are merged into their parent with
/// [`TypeInference::commit`] only when a candidate binds successfully.
#[derive(Debug, Default, Clone)]
pub struct TypeInference {
    types: HashMap<NodeId, NodeId>,
    substitutions: HashMap<String, NodeId>,
    counter: u32,
}

impl TypeInference {
    pub fn new() -> Self {
        Self::default()
    }

    /// A fresh type variable.
    pub fn fresh(&mut self, arena: &mut Arena) -> NodeId {
        self.counter += 1;
        arena.alloc(Node::Name(format!("#{}", self.counter)), NOWHERE)
    }

    /// Declare the type of an expression (e.g. a typed parameter).
    pub fn declare(&mut self, expr: NodeId, ty: NodeId) {
        self.types.insert(expr, ty);
    }

    /// Assign or retrieve a type for an expression.
    pub fn type_of(&mut self, arena: &mut Arena, expr: NodeId) -> NodeId {
        if let Some(&ty) = self.types.get(&expr) {
            return ty;
        }
        let constant = match arena.node(expr) {
            Node::Integer(_) => Some(INTEGER),
            Node::Real(_) => Some(REAL),
            Node::Text { .. } => {
                if arena.node(expr).is_character() {
                    Some(CHARACTER)
                } else {
                    Some(TEXT)
                }
            }
            Node::Name(name) if name == "true" || name == "false" => Some(BOOLEAN),
            Node::Block { child, .. } => {
                let child = *child;
                let ty = self.type_of(arena, child);
                self.types.insert(expr, ty);
                return ty;
            }
            _ => None,
        };
        let ty = match constant {
            Some(name) => arena.alloc(Node::Name(name.to_owned()), NOWHERE),
            None => self.fresh(arena),
        };
        self.types.insert(expr, ty);
        ty
    }

    /// Resolve a type through the substitution, one step at a time.
    fn resolve(&self, arena: &Arena, ty: NodeId) -> NodeId {
        let mut current = ty;
        for _ in 0..64 {
            match arena.node(current) {
                Node::Name(name) if is_type_var(name) => {
                    match self.substitutions.get(name) {
                        Some(&next) if next != current => current = next,
                        _ => return current,
                    }
                }
                _ => return current,
            }
        }
        current
    }

    /// Attempt to unify two types. On failure the substitution is left
    /// unchanged.
    pub fn unify(&mut self, arena: &Arena, t1: NodeId, t2: NodeId, mode: UnifyMode) -> bool {
        let snapshot = self.substitutions.clone();
        if self.unify_in(arena, t1, t2, mode) {
            true
        } else {
            self.substitutions = snapshot;
            false
        }
    }

    fn unify_in(&mut self, arena: &Arena, t1: NodeId, t2: NodeId, mode: UnifyMode) -> bool {
        let t1 = self.resolve(arena, t1);
        let t2 = self.resolve(arena, t2);
        if t1 == t2 {
            return true;
        }
        match (arena.node(t1), arena.node(t2)) {
            // Free variables bind to the other side.
            (Node::Name(name), _) if is_type_var(name) => {
                self.substitutions.insert(name.clone(), t2);
                true
            }
            (_, Node::Name(name)) if is_type_var(name) => {
                self.substitutions.insert(name.clone(), t1);
                true
            }
            (Node::Name(a), Node::Name(b)) => {
                if a == b || b == TREE {
                    return true;
                }
                // A value type flows into a wider declared type.
                mode == UnifyMode::Use && a == INTEGER && b == REAL
            }
            // Union on the declared side: any member may accept the value.
            (_, Node::Infix { name, left, right }) if name == "|" => {
                let (left, right) = (*left, *right);
                self.unify(arena, t1, left, mode) || self.unify(arena, t1, right, mode)
            }
            // Union on the value side: every member must be accepted.
            (Node::Infix { name, left, right }, _) if name == "|" => {
                let (left, right) = (*left, *right);
                self.unify_in(arena, left, t2, mode) && self.unify_in(arena, right, t2, mode)
            }
            // Function and constructor shapes unify structurally.
            (
                Node::Infix {
                    name: n1,
                    left: l1,
                    right: r1,
                },
                Node::Infix {
                    name: n2,
                    left: l2,
                    right: r2,
                },
            ) if n1 == n2 => {
                let (l1, r1, l2, r2) = (*l1, *r1, *l2, *r2);
                self.unify_in(arena, l1, l2, mode) && self.unify_in(arena, r1, r2, mode)
            }
            (
                Node::Prefix {
                    left: l1,
                    right: r1,
                },
                Node::Prefix {
                    left: l2,
                    right: r2,
                },
            ) => {
                let (l1, r1, l2, r2) = (*l1, *r1, *l2, *r2);
                self.unify_in(arena, l1, l2, mode) && self.unify_in(arena, r1, r2, mode)
            }
            (Node::Block { child: c1, .. }, Node::Block { child: c2, .. }) => {
                let (c1, c2) = (*c1, *c2);
                self.unify_in(arena, c1, c2, mode)
            }
            _ => false,
        }
    }

    /// Merge a child inference context into this one. Fails when the child
    /// bound a variable this context already bound differently.
    pub fn commit(&mut self, arena: &Arena, child: TypeInference) -> bool {
        for (name, ty) in child.substitutions {
            if let Some(&existing) = self.substitutions.get(&name) {
                if !self.unify(arena, existing, ty, UnifyMode::Use) {
                    return false;
                }
            } else {
                self.substitutions.insert(name, ty);
            }
        }
        self.types.extend(child.types);
        self.counter = self.counter.max(child.counter);
        true
    }

    /// Walk a rewrite body checking every explicit type annotation against
    /// the inferred type of its left-hand side.
    pub fn check_body(&mut self, arena: &mut Arena, body: NodeId) -> bool {
        match arena.node(body).clone() {
            Node::Infix { name, left, right } if name == ":" || name == "as" => {
                let lhs = self.type_of(arena, left);
                if !self.unify(arena, lhs, right, UnifyMode::Declaration) {
                    return false;
                }
                self.check_body(arena, left)
            }
            Node::Infix { left, right, .. } => {
                self.check_body(arena, left) && self.check_body(arena, right)
            }
            Node::Prefix { right, .. } | Node::Postfix { left: right, .. } => {
                self.check_body(arena, right)
            }
            Node::Block { child, .. } => self.check_body(arena, child),
            _ => true,
        }
    }
}

/// Name of the canonical type of a value, for error messages.
pub fn type_name(arena: &Arena, value: NodeId) -> &'static str {
    match arena.node(value) {
        Node::Integer(_) => INTEGER,
        Node::Real(_) => REAL,
        Node::Text { .. } => {
            if arena.node(value).is_character() {
                CHARACTER
            } else {
                TEXT
            }
        }
        Node::Name(name) if name == "true" || name == "false" => BOOLEAN,
        Node::Name(name) if name == "nil" => NIL,
        _ => TREE,
    }
}

/// Check an evaluated value against a declared type, coercing an integer
/// into a real slot. `Err` carries the found type name.
pub fn check_value(
    arena: &mut Arena,
    value: NodeId,
    ty: NodeId,
) -> std::result::Result<NodeId, &'static str> {
    let declared = match arena.node(ty) {
        Node::Name(name) => name.clone(),
        Node::Block { child, .. } => return check_value(arena, value, *child),
        Node::Infix { name, left, right } if name == "|" => {
            let (left, right) = (*left, *right);
            return check_value(arena, value, left)
                .or_else(|_| check_value(arena, value, right));
        }
        // Structural types are resolved by pattern matching, not here.
        _ => return Ok(value),
    };
    let found = type_name(arena, value);
    match declared.as_str() {
        TREE => Ok(value),
        REAL if found == INTEGER => {
            let integral = arena.as_integer(value).expect("found type says integer");
            let pos = arena.pos(value);
            Ok(arena.alloc(Node::Real(integral as f64), pos))
        }
        name if name == found => Ok(value),
        // A user-defined type name: accept, rewrites give it meaning.
        name if !matches!(name, INTEGER | REAL | TEXT | CHARACTER | BOOLEAN | NIL) => Ok(value),
        _ => Err(found),
    }
}
