//! Shared helpers for frontend tests.

use xl_core::{Arena, NodeId, Node, Positions};

use crate::parser::parse_source;
use crate::syntax::Syntax;

pub(crate) struct Parsed {
    pub arena: Arena,
    pub syntax: Syntax,
    pub root: Option<NodeId>,
    pub diagnostics: crate::Diagnostics,
}

pub(crate) fn parse(source: &str) -> Parsed {
    let mut arena = Arena::new();
    let mut syntax = Syntax::standard();
    let mut positions = Positions::new();
    let result = parse_source("test.xl", source, &mut arena, &mut syntax, &mut positions);
    Parsed {
        arena,
        syntax,
        root: result.root,
        diagnostics: result.diagnostics,
    }
}

/// Compact s-expression dump of a tree, for structural assertions.
pub(crate) fn dump(arena: &Arena, id: NodeId) -> String {
    match arena.node(id) {
        Node::Integer(value) => value.to_string(),
        Node::Real(value) => format!("{value:?}"),
        Node::Text {
            value,
            opening,
            closing,
        } => format!("{opening}{value}{closing}"),
        Node::Name(name) if name.is_empty() => "(empty)".to_owned(),
        Node::Name(name) => name.clone(),
        Node::Block {
            child,
            opening,
            closing,
        } => {
            if opening == xl_core::INDENT {
                format!("(block indent {})", dump(arena, *child))
            } else {
                format!("(block {opening} {closing} {})", dump(arena, *child))
            }
        }
        Node::Prefix { left, right } => {
            format!("(prefix {} {})", dump(arena, *left), dump(arena, *right))
        }
        Node::Postfix { left, right } => {
            format!("(postfix {} {})", dump(arena, *left), dump(arena, *right))
        }
        Node::Infix { name, left, right } => {
            let shown = if name == "\n" { "<nl>" } else { name };
            format!(
                "(infix {shown} {} {})",
                dump(arena, *left),
                dump(arena, *right)
            )
        }
    }
}
