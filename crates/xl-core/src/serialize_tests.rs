use crate::arena::{Arena, NodeId};
use crate::serialize::{Deserializer, ReadError, Serializer};
use crate::tree::{NOWHERE, Node};
use crate::trees_equal;

fn sample_tree(arena: &mut Arena) -> NodeId {
    // write "hello"; x + 1.5
    let write = arena.alloc(Node::Name("write".to_owned()), NOWHERE);
    let hello = arena.alloc(
        Node::Text {
            value: "hello".to_owned(),
            opening: "\"".to_owned(),
            closing: "\"".to_owned(),
        },
        NOWHERE,
    );
    let call = arena.alloc(
        Node::Prefix {
            left: write,
            right: hello,
        },
        NOWHERE,
    );
    let x = arena.alloc(Node::Name("x".to_owned()), NOWHERE);
    let rate = arena.alloc(Node::Real(1.5), NOWHERE);
    let sum = arena.alloc(
        Node::Infix {
            name: "+".to_owned(),
            left: x,
            right: rate,
        },
        NOWHERE,
    );
    let body = arena.alloc(
        Node::Infix {
            name: ";".to_owned(),
            left: call,
            right: sum,
        },
        NOWHERE,
    );
    arena.alloc(
        Node::Block {
            child: body,
            opening: "{".to_owned(),
            closing: "}".to_owned(),
        },
        NOWHERE,
    )
}

fn round_trip(arena: &mut Arena, root: NodeId) -> NodeId {
    let mut bytes = Vec::new();
    let mut writer = Serializer::new(&mut bytes).unwrap();
    writer.write_tree(arena, Some(root)).unwrap();

    let mut reader = Deserializer::new(bytes.as_slice(), NOWHERE).unwrap();
    reader.read_tree(arena).unwrap().unwrap()
}

#[test]
fn round_trip_preserves_structure() {
    let mut arena = Arena::new();
    let root = sample_tree(&mut arena);
    let back = round_trip(&mut arena, root);
    assert!(trees_equal(&arena, root, back));
}

#[test]
fn round_trip_preserves_extreme_leaves() {
    let mut arena = Arena::new();
    for node in [
        Node::Integer(i64::MIN),
        Node::Integer(i64::MAX),
        Node::Integer(0),
        Node::Real(f64::INFINITY),
        Node::Real(-0.0),
        Node::Text {
            value: "één\n'quote'".to_owned(),
            opening: "<<".to_owned(),
            closing: ">>".to_owned(),
        },
    ] {
        let root = arena.alloc(node, NOWHERE);
        let back = round_trip(&mut arena, root);
        assert!(trees_equal(&arena, root, back));
    }
}

#[test]
fn repeated_text_is_interned() {
    let mut arena = Arena::new();
    let a = arena.alloc(Node::Name("repeated_name".to_owned()), NOWHERE);
    let b = arena.alloc(Node::Name("repeated_name".to_owned()), NOWHERE);
    let both = arena.alloc(
        Node::Infix {
            name: ";".to_owned(),
            left: a,
            right: b,
        },
        NOWHERE,
    );
    let single = arena.alloc(Node::Name("repeated_name".to_owned()), NOWHERE);

    let mut two_bytes = Vec::new();
    let mut writer = Serializer::new(&mut two_bytes).unwrap();
    writer.write_tree(&arena, Some(both)).unwrap();

    let mut one_bytes = Vec::new();
    let mut writer = Serializer::new(&mut one_bytes).unwrap();
    writer.write_tree(&arena, Some(single)).unwrap();

    // The second occurrence is an index, not a second copy of the bytes.
    assert!(two_bytes.len() < one_bytes.len() * 2);

    let mut reader = Deserializer::new(two_bytes.as_slice(), NOWHERE).unwrap();
    let back = reader.read_tree(&mut arena).unwrap().unwrap();
    assert!(trees_equal(&arena, both, back));
}

#[test]
fn null_tree_round_trips() {
    let mut arena = Arena::new();
    let mut bytes = Vec::new();
    let mut writer = Serializer::new(&mut bytes).unwrap();
    writer.write_tree(&arena, None).unwrap();

    let mut reader = Deserializer::new(bytes.as_slice(), NOWHERE).unwrap();
    assert!(reader.read_tree(&mut arena).unwrap().is_none());
}

#[test]
fn bad_magic_is_rejected() {
    let bytes = [0u8; 16];
    let err = Deserializer::new(bytes.as_slice(), NOWHERE)
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, ReadError::BadMagic { found: 0 }));
}
