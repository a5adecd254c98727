//! JSON dump of parse trees for `--ast`.

use serde::Serialize;

use xl_core::{Arena, NodeId, Node};

#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum JsonTree {
    Integer {
        value: i64,
    },
    Real {
        value: f64,
    },
    Text {
        value: String,
        opening: String,
        closing: String,
    },
    Name {
        name: String,
    },
    Block {
        opening: String,
        closing: String,
        child: Box<JsonTree>,
    },
    Prefix {
        left: Box<JsonTree>,
        right: Box<JsonTree>,
    },
    Postfix {
        left: Box<JsonTree>,
        right: Box<JsonTree>,
    },
    Infix {
        name: String,
        left: Box<JsonTree>,
        right: Box<JsonTree>,
    },
}

pub fn to_json(arena: &Arena, id: NodeId) -> JsonTree {
    match arena.node(id) {
        Node::Integer(value) => JsonTree::Integer { value: *value },
        Node::Real(value) => JsonTree::Real { value: *value },
        Node::Text {
            value,
            opening,
            closing,
        } => JsonTree::Text {
            value: value.clone(),
            opening: opening.clone(),
            closing: closing.clone(),
        },
        Node::Name(name) => JsonTree::Name { name: name.clone() },
        Node::Block {
            child,
            opening,
            closing,
        } => JsonTree::Block {
            opening: opening.clone(),
            closing: closing.clone(),
            child: Box::new(to_json(arena, *child)),
        },
        Node::Prefix { left, right } => JsonTree::Prefix {
            left: Box::new(to_json(arena, *left)),
            right: Box::new(to_json(arena, *right)),
        },
        Node::Postfix { left, right } => JsonTree::Postfix {
            left: Box::new(to_json(arena, *left)),
            right: Box::new(to_json(arena, *right)),
        },
        Node::Infix { name, left, right } => JsonTree::Infix {
            name: name.clone(),
            left: Box::new(to_json(arena, *left)),
            right: Box::new(to_json(arena, *right)),
        },
    }
}
