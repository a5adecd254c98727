//! Structural pattern matching.
//!
//! `bind` matches a value against a rewrite pattern and produces the
//! bindings to make and the conditions to check at run time. Strength
//! reports how sure the match is: `Perfect` means no later candidate need
//! be considered; `Possible` means the outcome depends on the conditions.
//! A failed match returns `None`, with any type conflict recorded on the
//! side so the caller can report a type error when no candidate survives.
//!
//! The defining name of a pattern (its leftmost non-variable) matches only
//! itself; any other name is a parameter on first sight and an equality
//! constraint when it is already bound, in the pattern or in the scope
//! chain the rewrite was defined in.

use xl_core::{Arena, NodeId, Node};

use crate::scope::{ScopeArena, ScopeId};
use crate::types;

/// Match confidence. Failure is the absence of a [`Match`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Strength {
    Possible,
    Perfect,
}

/// How a matched argument is passed.
#[derive(Debug, Clone, Copy)]
pub enum ArgMode {
    /// Unevaluated, in a closure over the caller's environment.
    Lazy,
    /// Evaluated to canonical form of the given type before the call.
    Typed(NodeId),
}

/// One parameter binding the pattern produces.
#[derive(Debug, Clone)]
pub struct BindingSpec {
    pub name: String,
    pub value: NodeId,
    pub mode: ArgMode,
}

/// A deferred runtime check.
#[derive(Debug, Clone)]
pub enum Condition {
    /// The value must evaluate to the same tree as `expect`.
    Equal { value: NodeId, expect: NodeId },
    /// The value must evaluate to the same tree as an existing binding.
    EqualBinding { value: NodeId, name: String },
    /// The guard must evaluate to `true` in the callee's scope.
    Guard { expr: NodeId },
    /// The value must evaluate to something the sub-pattern matches.
    Shape { value: NodeId, pattern: NodeId },
}

/// A successful structural match.
#[derive(Debug, Clone)]
pub struct Match {
    pub strength: Strength,
    pub bindings: Vec<BindingSpec>,
    pub conditions: Vec<Condition>,
}

/// Type conflict observed while a candidate failed; reported only when no
/// candidate matches at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct BindFailure {
    pub type_conflict: Option<TypeConflict>,
}

#[derive(Debug, Clone, Copy)]
pub struct TypeConflict {
    pub value: NodeId,
    pub declared: NodeId,
    pub found: &'static str,
}

/// Match `value` against `pattern`. `defn_scope` is the chain the rewrite
/// was defined in, searched to distinguish fresh parameters from references
/// to enclosing bindings.
pub fn bind(
    arena: &Arena,
    scopes: &ScopeArena,
    defn_scope: ScopeId,
    pattern: NodeId,
    value: NodeId,
    failure: &mut BindFailure,
) -> Option<Match> {
    let defined = defined_name(arena, pattern);
    let mut m = Match {
        strength: Strength::Perfect,
        bindings: Vec::new(),
        conditions: Vec::new(),
    };
    let matcher = Matcher {
        arena,
        scopes,
        defn_scope,
        defined,
    };
    if matcher.bind_rec(pattern, value, &mut m, failure) {
        Some(m)
    } else {
        None
    }
}

/// The leftmost non-variable of a pattern: `pi` in `pi -> 3.14`, `f` in
/// `f X`, `!` in `N!`. Infix patterns carry their operator in the node
/// itself, so they have none.
pub fn defined_name(arena: &Arena, pattern: NodeId) -> Option<NodeId> {
    match arena.node(pattern) {
        Node::Name(_) => Some(pattern),
        Node::Prefix { left, .. } if matches!(arena.node(*left), Node::Name(_)) => Some(*left),
        Node::Postfix { right, .. } if matches!(arena.node(*right), Node::Name(_)) => {
            Some(*right)
        }
        _ => None,
    }
}

struct Matcher<'a> {
    arena: &'a Arena,
    scopes: &'a ScopeArena,
    defn_scope: ScopeId,
    defined: Option<NodeId>,
}

impl Matcher<'_> {
    fn weaken(m: &mut Match) {
        m.strength = m.strength.min(Strength::Possible);
    }

    /// Whether a value could still reduce to something else: anything but a
    /// literal or a self-evaluating name can.
    fn evaluable(&self, value: NodeId) -> bool {
        match self.arena.node(value) {
            Node::Integer(_) | Node::Real(_) | Node::Text { .. } => false,
            Node::Name(name) => !matches!(name.as_str(), "true" | "false" | "nil"),
            _ => true,
        }
    }

    /// Blocks are purely syntactic on both sides of a match.
    fn deblock(&self, mut id: NodeId) -> NodeId {
        while let Node::Block { child, .. } = self.arena.node(id) {
            id = *child;
        }
        id
    }

    fn bind_rec(
        &self,
        pattern: NodeId,
        value: NodeId,
        m: &mut Match,
        failure: &mut BindFailure,
    ) -> bool {
        let value = self.deblock(value);
        match self.arena.node(pattern) {
            Node::Integer(want) => {
                let want = *want;
                match self.arena.node(value) {
                    Node::Integer(have) => want == *have,
                    _ if self.evaluable(value) => {
                        m.conditions.push(Condition::Equal {
                            value,
                            expect: pattern,
                        });
                        Self::weaken(m);
                        true
                    }
                    _ => false,
                }
            }
            Node::Real(want) => {
                let want = *want;
                match self.arena.node(value) {
                    Node::Real(have) => want == *have,
                    _ if self.evaluable(value) => {
                        m.conditions.push(Condition::Equal {
                            value,
                            expect: pattern,
                        });
                        Self::weaken(m);
                        true
                    }
                    _ => false,
                }
            }
            Node::Text {
                value: want,
                opening,
                ..
            } => match self.arena.node(value) {
                Node::Text {
                    value: have,
                    opening: have_opening,
                    ..
                } => want == have && opening == have_opening,
                _ if self.evaluable(value) => {
                    m.conditions.push(Condition::Equal {
                        value,
                        expect: pattern,
                    });
                    Self::weaken(m);
                    true
                }
                _ => false,
            },
            Node::Name(name) => self.bind_name(pattern, name.clone(), value, m),
            Node::Infix { name, left, right } => {
                let (name, left, right) = (name.clone(), *left, *right);
                self.bind_infix(pattern, &name, left, right, value, m, failure)
            }
            Node::Prefix { left, right } => {
                let (pleft, pright) = (*left, *right);
                let Node::Name(want) = self.arena.node(pleft) else {
                    return false;
                };
                let Node::Prefix { left, right } = self.arena.node(value) else {
                    return false;
                };
                let (vleft, vright) = (*left, *right);
                let Node::Name(have) = self.arena.node(vleft) else {
                    return false;
                };
                if want != have {
                    return false;
                }
                self.bind_rec(pright, vright, m, failure)
            }
            Node::Postfix { left, right } => {
                let (pleft, pright) = (*left, *right);
                let Node::Name(want) = self.arena.node(pright) else {
                    return false;
                };
                let Node::Postfix { left, right } = self.arena.node(value) else {
                    return false;
                };
                let (vleft, vright) = (*left, *right);
                let Node::Name(have) = self.arena.node(vright) else {
                    return false;
                };
                if want != have {
                    return false;
                }
                self.bind_rec(pleft, vleft, m, failure)
            }
            // Blocks are purely syntactic: look inside.
            Node::Block { child, .. } => {
                let child = *child;
                self.bind_rec(child, value, m, failure)
            }
        }
    }

    fn bind_name(&self, pattern: NodeId, name: String, value: NodeId, m: &mut Match) -> bool {
        // The defining name stands for itself.
        if self.defined == Some(pattern) {
            return matches!(self.arena.node(value), Node::Name(have) if *have == name);
        }

        // Boolean literals in patterns match by value.
        if name == "true" || name == "false" {
            if matches!(self.arena.node(value), Node::Name(have) if *have == name) {
                return true;
            }
            if self.evaluable(value) {
                m.conditions.push(Condition::Equal {
                    value,
                    expect: pattern,
                });
                Self::weaken(m);
                return true;
            }
            return false;
        }

        // Rebinding and references to enclosing bindings compare values.
        let already = m.bindings.iter().any(|b| b.name == name)
            || self.scopes.is_bound(self.defn_scope, &name);
        if already {
            m.conditions.push(Condition::EqualBinding { value, name });
        } else {
            m.bindings.push(BindingSpec {
                name,
                value,
                mode: ArgMode::Lazy,
            });
        }
        Self::weaken(m);
        true
    }

    fn bind_infix(
        &self,
        pattern: NodeId,
        name: &str,
        left: NodeId,
        right: NodeId,
        value: NodeId,
        m: &mut Match,
        failure: &mut BindFailure,
    ) -> bool {
        // Type annotation: bind the parameter, then constrain its type.
        if name == ":" || name == "as" {
            let saved = m.strength;
            let before = m.bindings.len();
            if !self.bind_rec(left, value, m, failure) {
                return false;
            }
            // A literal argument has a known canonical type; conflicts fail
            // the candidate now and surface as a type error if nothing else
            // matches.
            if !self.evaluable(value) || matches!(self.arena.node(value), Node::Name(n) if n == "true" || n == "false")
            {
                if !self.literal_fits(value, right, failure) {
                    return false;
                }
            }
            if m.bindings.len() > before {
                let spec = m.bindings.last_mut().expect("bindings grew");
                spec.mode = ArgMode::Typed(right);
            }
            // An annotation that binds makes the match strong.
            m.strength = saved;
            return true;
        }

        // Guard: bind the pattern, then require the guard to hold.
        if name == "when" {
            if !self.bind_rec(left, value, m, failure) {
                return false;
            }
            m.conditions.push(Condition::Guard { expr: right });
            Self::weaken(m);
            return true;
        }

        if let Node::Infix {
            name: have,
            left: vleft,
            right: vright,
        } = self.arena.node(value)
        {
            if have == name {
                let (vleft, vright) = (*vleft, *vright);
                return self.bind_rec(left, vleft, m, failure)
                    && self.bind_rec(right, vright, m, failure);
            }
        }

        // The value may still evaluate to a matching infix.
        if self.evaluable(value) {
            m.conditions.push(Condition::Shape { value, pattern });
            Self::weaken(m);
            return true;
        }
        false
    }

    /// Static type admission for literal arguments against a declared type.
    fn literal_fits(&self, value: NodeId, ty: NodeId, failure: &mut BindFailure) -> bool {
        let declared = match self.arena.node(ty) {
            Node::Name(name) => name.as_str(),
            _ => return true,
        };
        if !matches!(
            declared,
            types::INTEGER | types::REAL | types::TEXT | types::CHARACTER | types::BOOLEAN
        ) {
            return true;
        }
        let found = types::type_name(self.arena, value);
        let fits = found == declared || (found == types::INTEGER && declared == types::REAL);
        if !fits && failure.type_conflict.is_none() {
            failure.type_conflict = Some(TypeConflict {
                value,
                declared: ty,
                found,
            });
        }
        fits
    }
}
