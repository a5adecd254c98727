//! Core data structures for XL parse trees.
//!
//! Everything in the language is a tree of eight node shapes, stored in an
//! [`Arena`] and referenced by [`NodeId`] handles. This crate owns:
//! - the node shapes and arena with mark-sweep collection ([`tree`], [`arena`])
//! - per-node metadata ([`arena::Info`])
//! - the global source position table ([`position`])
//! - structural shape hashing for rewrite filtering ([`shape`])
//! - the binary tree serialization format ([`serialize`])

pub mod arena;
pub mod position;
pub mod serialize;
pub mod shape;
pub mod tree;

#[cfg(test)]
mod arena_tests;
#[cfg(test)]
mod serialize_tests;
#[cfg(test)]
mod shape_tests;

pub use arena::{Arena, Info, NodeId};
pub use position::{Positions, SourceLocation};
pub use serialize::{Deserializer, ReadError, Serializer};
pub use shape::{Shape, pattern_shape, value_shape};
pub use tree::{INDENT, Kind, NOWHERE, Node, Position, UNINDENT};

/// Structural equality of two trees, delimiter-sensitive: `'a'` and `"a"`
/// differ, `(x)` and `[x]` differ, positions and info records are ignored.
pub fn trees_equal(arena: &Arena, a: NodeId, b: NodeId) -> bool {
    if a == b {
        return true;
    }
    match (arena.node(a), arena.node(b)) {
        (Node::Integer(x), Node::Integer(y)) => x == y,
        (Node::Real(x), Node::Real(y)) => x == y,
        (Node::Name(x), Node::Name(y)) => x == y,
        (
            Node::Text {
                value: xv,
                opening: xo,
                closing: xc,
            },
            Node::Text {
                value: yv,
                opening: yo,
                closing: yc,
            },
        ) => xv == yv && xo == yo && xc == yc,
        (
            Node::Block {
                child: xchild,
                opening: xo,
                closing: xc,
            },
            Node::Block {
                child: ychild,
                opening: yo,
                closing: yc,
            },
        ) => xo == yo && xc == yc && trees_equal(arena, *xchild, *ychild),
        (
            Node::Prefix {
                left: xl,
                right: xr,
            },
            Node::Prefix {
                left: yl,
                right: yr,
            },
        )
        | (
            Node::Postfix {
                left: xl,
                right: xr,
            },
            Node::Postfix {
                left: yl,
                right: yr,
            },
        ) => trees_equal(arena, *xl, *yl) && trees_equal(arena, *xr, *yr),
        (
            Node::Infix {
                name: xn,
                left: xl,
                right: xr,
            },
            Node::Infix {
                name: yn,
                left: yl,
                right: yr,
            },
        ) => xn == yn && trees_equal(arena, *xl, *yl) && trees_equal(arena, *xr, *yr),
        _ => false,
    }
}
