use xl_core::{Arena, NodeId, Positions};
use xl_syntax::{Syntax, parse_source};

use crate::scope::{RewriteKind, ScopeArena};

fn tree(arena: &mut Arena, source: &str) -> NodeId {
    let mut syntax = Syntax::standard();
    let mut positions = Positions::new();
    let result = parse_source("scope.xl", source, arena, &mut syntax, &mut positions);
    assert!(!result.diagnostics.has_errors());
    result.root.expect("parses")
}

#[test]
fn lookup_searches_self_then_ancestors() {
    let mut arena = Arena::new();
    let mut scopes = ScopeArena::new();
    let outer_value = tree(&mut arena, "1");
    let inner_value = tree(&mut arena, "2");

    let global = scopes.global();
    let inner = scopes.new_child(global);
    scopes.bind(global, "x", outer_value);
    scopes.bind(global, "y", outer_value);
    scopes.bind(inner, "x", inner_value);

    assert_eq!(scopes.lookup(inner, "x").map(|(_, b)| b.value), Some(inner_value));
    assert_eq!(scopes.lookup(inner, "y").map(|(_, b)| b.value), Some(outer_value));
    assert_eq!(scopes.lookup(global, "x").map(|(_, b)| b.value), Some(outer_value));
    assert!(scopes.lookup(inner, "z").is_none());
}

#[test]
fn candidates_preserve_declaration_order_local_first() {
    let mut arena = Arena::new();
    let mut scopes = ScopeArena::new();
    let global = scopes.global();
    let inner = scopes.new_child(global);

    let p1 = tree(&mut arena, "f X");
    let p2 = tree(&mut arena, "f 0");
    let p3 = tree(&mut arena, "f Y");
    let body = tree(&mut arena, "1");
    scopes.define(&arena, global, p1, body, RewriteKind::Global);
    scopes.define(&arena, global, p2, body, RewriteKind::Global);
    scopes.define(&arena, inner, p3, body, RewriteKind::Local);

    let value = tree(&mut arena, "f 0");
    let shape = scopes.shape_of(&arena, value);
    let found: Vec<NodeId> = scopes
        .candidates(inner, shape)
        .iter()
        .map(|r| r.from)
        .collect();
    // Local scope first, then the parent in declaration order. The guard
    // pattern stripping keeps `from` comparable by node id.
    assert_eq!(found, vec![p3, p1, p2]);
}

#[test]
fn shape_filter_excludes_impossible_candidates() {
    let mut arena = Arena::new();
    let mut scopes = ScopeArena::new();
    let global = scopes.global();

    let postfix = tree(&mut arena, "N!");
    let prefix = tree(&mut arena, "f X");
    let body = tree(&mut arena, "1");
    scopes.define(&arena, global, postfix, body, RewriteKind::Global);
    scopes.define(&arena, global, prefix, body, RewriteKind::Global);

    let value = tree(&mut arena, "5!");
    let shape = scopes.shape_of(&arena, value);
    let found: Vec<NodeId> = scopes
        .candidates(global, shape)
        .iter()
        .map(|r| r.from)
        .collect();
    assert_eq!(found, vec![postfix]);
}

#[test]
fn guards_are_split_from_patterns() {
    let mut arena = Arena::new();
    let mut scopes = ScopeArena::new();
    let global = scopes.global();

    let pattern = tree(&mut arena, "N! when N > 0");
    let body = tree(&mut arena, "1");
    scopes.define(&arena, global, pattern, body, RewriteKind::Global);

    let value = tree(&mut arena, "5!");
    let shape = scopes.shape_of(&arena, value);
    let found = scopes.candidates(global, shape);
    assert_eq!(found.len(), 1);
    assert!(found[0].guard.is_some());
    // The stored pattern is the postfix, not the whole `when` clause.
    assert!(matches!(
        arena.node(found[0].from),
        xl_core::Node::Postfix { .. }
    ));
}

#[test]
fn data_forms_admit_matching_shapes() {
    let mut arena = Arena::new();
    let mut scopes = ScopeArena::new();
    let global = scopes.global();

    let form = tree(&mut arena, "point(X,Y)");
    scopes.define_data(&arena, global, form);

    let yes = tree(&mut arena, "point(1, 2)");
    let no = tree(&mut arena, "circle(1, 2)");
    assert!(scopes.is_data(global, scopes.shape_of(&arena, yes)));
    assert!(!scopes.is_data(global, scopes.shape_of(&arena, no)));
}

#[test]
fn truncate_reclaims_call_scopes() {
    let mut scopes = ScopeArena::new();
    let mark = scopes.watermark();
    let global = scopes.global();
    scopes.new_child(global);
    scopes.new_child(global);
    assert_eq!(scopes.watermark(), mark + 2);
    scopes.truncate(mark);
    assert_eq!(scopes.watermark(), mark);
}

#[test]
fn gc_roots_cover_bindings_and_rewrites() {
    let mut arena = Arena::new();
    let mut scopes = ScopeArena::new();
    let global = scopes.global();

    let bound = tree(&mut arena, "41");
    scopes.bind(global, "x", bound);
    let pattern = tree(&mut arena, "f X");
    let body = tree(&mut arena, "X + 1");
    scopes.define(&arena, global, pattern, body, RewriteKind::Global);

    let roots: Vec<NodeId> = scopes.gc_roots().collect();
    assert!(roots.contains(&bound));
    assert!(roots.contains(&pattern));
    assert!(roots.contains(&body));
}
