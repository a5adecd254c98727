//! Structural shape hashing for rewrite candidate filtering.
//!
//! A [`Shape`] condenses the top of a tree into one `u64`: the root kind, a
//! checksum of the root operator name, and the kinds of the immediate
//! children. Pattern positions occupied by variables become wildcards, so a
//! pattern shape *admits* every value shape it could possibly match; the
//! filter over-approximates and the matcher makes the final call.

use crate::arena::{Arena, NodeId};
use crate::tree::Node;

/// Field value meaning "matches anything" in a pattern shape.
const WILD: u8 = 0xFF;
/// Name checksum meaning "any name".
const WILD_NAME: u32 = 0;

/// Packed structural skeleton: root kind, operator checksum, child kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape(u64);

impl Shape {
    fn pack(kind: u8, name: u32, left: u8, right: u8) -> Self {
        let mut bits = kind as u64;
        bits |= (name as u64) << 8;
        bits |= (left as u64) << 40;
        bits |= (right as u64) << 48;
        Shape(bits)
    }

    fn kind(self) -> u8 {
        self.0 as u8
    }
    fn name(self) -> u32 {
        (self.0 >> 8) as u32
    }
    fn left(self) -> u8 {
        (self.0 >> 40) as u8
    }
    fn right(self) -> u8 {
        (self.0 >> 48) as u8
    }

    /// Stored form for the rewrite record.
    pub fn as_u64(self) -> u64 {
        self.0
    }

    /// Whether a value of shape `value` could match a pattern of shape
    /// `self`. Wildcard fields admit anything; concrete fields must agree.
    pub fn admits(self, value: Shape) -> bool {
        (self.kind() == WILD || self.kind() == value.kind())
            && (self.name() == WILD_NAME || self.name() == value.name())
            && (self.left() == WILD || self.left() == value.left())
            && (self.right() == WILD || self.right() == value.right())
    }
}

fn checksum(name: &str) -> u32 {
    // 0 is reserved for the wildcard; fold collisions away from it.
    match crc32fast::hash(name.as_bytes()) {
        WILD_NAME => 1,
        sum => sum,
    }
}

fn kind_tag(node: &Node) -> u8 {
    node.kind() as u8
}

/// Strip syntactic wrappers that do not contribute to a pattern's shape:
/// blocks, `when` guards and top-level type annotations.
pub fn pattern_root(arena: &Arena, mut id: NodeId) -> NodeId {
    loop {
        match arena.node(id) {
            Node::Block { child, .. } => id = *child,
            Node::Infix { name, left, .. } if name == "when" => id = *left,
            _ => return id,
        }
    }
}

/// Shape of a fully-evaluated value; contains no wildcards.
pub fn value_shape(arena: &Arena, id: NodeId) -> Shape {
    shape(arena, id, false)
}

/// Shape of a rewrite pattern; variable positions become wildcards.
pub fn pattern_shape(arena: &Arena, id: NodeId) -> Shape {
    shape(arena, pattern_root(arena, id), true)
}

fn shape(arena: &Arena, id: NodeId, pattern: bool) -> Shape {
    let node = arena.node(id);
    match node {
        Node::Integer(_) | Node::Real(_) | Node::Text { .. } => {
            Shape::pack(kind_tag(node), WILD_NAME, 0, 0)
        }
        // A bare name in a pattern is the defined name itself and matches
        // only itself, so it keeps its checksum on both sides.
        Node::Name(name) => Shape::pack(kind_tag(node), checksum(name), 0, 0),
        Node::Block {
            child, opening, ..
        } => Shape::pack(
            kind_tag(node),
            checksum(opening),
            child_tag(arena, *child, pattern),
            0,
        ),
        Node::Prefix { left, right } => {
            // The head name is the operator; a non-name head is a wildcard
            // pattern position (or a computed value, hashed by kind alone).
            let name = match arena.node(*left) {
                Node::Name(name) => checksum(name),
                _ => WILD_NAME,
            };
            Shape::pack(kind_tag(node), name, 0, child_tag(arena, *right, pattern))
        }
        Node::Postfix { left, right } => {
            let name = match arena.node(*right) {
                Node::Name(name) => checksum(name),
                _ => WILD_NAME,
            };
            Shape::pack(kind_tag(node), name, child_tag(arena, *left, pattern), 0)
        }
        Node::Infix { name, left, right } => Shape::pack(
            kind_tag(node),
            checksum(name),
            child_tag(arena, *left, pattern),
            child_tag(arena, *right, pattern),
        ),
    }
}

fn child_tag(arena: &Arena, id: NodeId, pattern: bool) -> u8 {
    let node = arena.node(id);
    if pattern {
        // Any name is a potential parameter; annotated and guarded children
        // match by their underlying shape, which we cannot pin down here.
        match node {
            Node::Name(_) => return WILD,
            Node::Block { .. } => return WILD,
            Node::Infix { name, .. } if name == ":" || name == "when" => return WILD,
            _ => {}
        }
    }
    kind_tag(node)
}
