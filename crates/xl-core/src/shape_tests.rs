use crate::arena::{Arena, NodeId};
use crate::shape::{pattern_shape, value_shape};
use crate::tree::{NOWHERE, Node};

fn int(arena: &mut Arena, value: i64) -> NodeId {
    arena.alloc(Node::Integer(value), NOWHERE)
}

fn name(arena: &mut Arena, text: &str) -> NodeId {
    arena.alloc(Node::Name(text.to_owned()), NOWHERE)
}

fn infix(arena: &mut Arena, op: &str, left: NodeId, right: NodeId) -> NodeId {
    arena.alloc(
        Node::Infix {
            name: op.to_owned(),
            left,
            right,
        },
        NOWHERE,
    )
}

fn postfix(arena: &mut Arena, left: NodeId, op: &str) -> NodeId {
    let right = name(arena, op);
    arena.alloc(Node::Postfix { left, right }, NOWHERE)
}

fn prefix(arena: &mut Arena, head: &str, right: NodeId) -> NodeId {
    let left = name(arena, head);
    arena.alloc(Node::Prefix { left, right }, NOWHERE)
}

#[test]
fn variable_positions_admit_any_value() {
    let mut arena = Arena::new();
    // Pattern: X + Y
    let x = name(&mut arena, "X");
    let y = name(&mut arena, "Y");
    let pat = infix(&mut arena, "+", x, y);

    // Value: 2 + (3 * 4)
    let two = int(&mut arena, 2);
    let three = int(&mut arena, 3);
    let four = int(&mut arena, 4);
    let product = infix(&mut arena, "*", three, four);
    let value = infix(&mut arena, "+", two, product);

    assert!(pattern_shape(&arena, pat).admits(value_shape(&arena, value)));
}

#[test]
fn operator_name_discriminates() {
    let mut arena = Arena::new();
    let x = name(&mut arena, "X");
    let y = name(&mut arena, "Y");
    let pat = infix(&mut arena, "+", x, y);

    let two = int(&mut arena, 2);
    let three = int(&mut arena, 3);
    let value = infix(&mut arena, "*", two, three);

    assert!(!pattern_shape(&arena, pat).admits(value_shape(&arena, value)));
}

#[test]
fn literal_child_requires_matching_kind() {
    let mut arena = Arena::new();
    // Pattern: 0!
    let zero = int(&mut arena, 0);
    let pat = postfix(&mut arena, zero, "!");

    // 5! is admitted (kinds agree; values are the matcher's business).
    let five = int(&mut arena, 5);
    let v1 = postfix(&mut arena, five, "!");
    assert!(pattern_shape(&arena, pat).admits(value_shape(&arena, v1)));

    // (n - 1)! is not, until its child is evaluated.
    let n = name(&mut arena, "n");
    let one = int(&mut arena, 1);
    let diff = infix(&mut arena, "-", n, one);
    let v2 = postfix(&mut arena, diff, "!");
    assert!(!pattern_shape(&arena, pat).admits(value_shape(&arena, v2)));
}

#[test]
fn guard_and_blocks_are_stripped_from_patterns() {
    let mut arena = Arena::new();
    // Pattern: (N! when N > 0)
    let n = name(&mut arena, "N");
    let fact = postfix(&mut arena, n, "!");
    let n2 = name(&mut arena, "N");
    let zero = int(&mut arena, 0);
    let guard = infix(&mut arena, ">", n2, zero);
    let guarded = infix(&mut arena, "when", fact, guard);
    let block = arena.alloc(
        Node::Block {
            child: guarded,
            opening: "(".to_owned(),
            closing: ")".to_owned(),
        },
        NOWHERE,
    );

    let five = int(&mut arena, 5);
    let value = postfix(&mut arena, five, "!");
    assert!(pattern_shape(&arena, block).admits(value_shape(&arena, value)));
}

#[test]
fn prefix_head_names_must_agree() {
    let mut arena = Arena::new();
    let x = name(&mut arena, "X");
    let pat = prefix(&mut arena, "f", x);

    let three = int(&mut arena, 3);
    let call_f = prefix(&mut arena, "f", three);
    let call_g = prefix(&mut arena, "g", three);

    assert!(pattern_shape(&arena, pat).admits(value_shape(&arena, call_f)));
    assert!(!pattern_shape(&arena, pat).admits(value_shape(&arena, call_g)));
}

#[test]
fn defining_name_matches_only_itself() {
    let mut arena = Arena::new();
    let pat = name(&mut arena, "pi");
    let same = name(&mut arena, "pi");
    let other = name(&mut arena, "tau");
    assert!(pattern_shape(&arena, pat).admits(value_shape(&arena, same)));
    assert!(!pattern_shape(&arena, pat).admits(value_shape(&arena, other)));
}
