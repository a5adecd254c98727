use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::arena::{Arena, Info, NodeId};
use crate::tree::{Kind, NOWHERE, Node};

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

#[test]
fn downcasts_return_none_on_mismatch() {
    let mut arena = Arena::new();
    let n = int(&mut arena, 42);
    assert_eq!(arena.as_integer(n), Some(42));
    assert_eq!(arena.as_real(n), None);
    assert_eq!(arena.as_name(n), None);
    assert_eq!(arena.kind(n), Some(Kind::Integer));
}

#[test]
fn shared_children_form_a_dag() {
    let mut arena = Arena::new();
    let shared = int(&mut arena, 1);
    let sum = infix(&mut arena, "+", shared, shared);
    let children: Vec<_> = arena.node(sum).children().collect();
    assert_eq!(children, vec![shared, shared]);
}

#[derive(Clone)]
struct CountedInfo {
    drops: Rc<RefCell<Vec<u32>>>,
    tag: u32,
}

impl Info for CountedInfo {
    fn finalize(&mut self) {
        self.drops.borrow_mut().push(self.tag);
    }
    fn dup(&self) -> Box<dyn Info> {
        Box::new(self.clone())
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Clone)]
struct ParentInfo {
    parent: Option<NodeId>,
}

impl Info for ParentInfo {
    fn sweep_refs(&mut self, is_dead: &mut dyn FnMut(NodeId) -> bool) {
        if let Some(parent) = self.parent
            && is_dead(parent)
        {
            self.parent = None;
        }
    }
    fn dup(&self) -> Box<dyn Info> {
        Box::new(self.clone())
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[test]
fn info_is_typed_and_single_per_type() {
    let mut arena = Arena::new();
    let drops = Rc::new(RefCell::new(Vec::new()));
    let n = int(&mut arena, 7);

    arena.set_info(
        n,
        CountedInfo {
            drops: drops.clone(),
            tag: 1,
        },
    );
    assert_eq!(arena.info::<CountedInfo>(n).map(|i| i.tag), Some(1));

    // Replacing finalizes the replaced record.
    arena.set_info(
        n,
        CountedInfo {
            drops: drops.clone(),
            tag: 2,
        },
    );
    assert_eq!(*drops.borrow(), vec![1]);
    assert_eq!(arena.info::<CountedInfo>(n).map(|i| i.tag), Some(2));
}

#[test]
fn collect_reclaims_unreachable_and_finalizes_once() {
    let mut arena = Arena::new();
    let drops = Rc::new(RefCell::new(Vec::new()));

    let kept = int(&mut arena, 1);
    let lost = int(&mut arena, 2);
    arena.set_info(
        lost,
        CountedInfo {
            drops: drops.clone(),
            tag: 9,
        },
    );
    arena.pin(kept);

    // Young nodes survive the first cycle.
    assert_eq!(arena.collect([]), 0);
    // Unpinned and no longer young: reclaimed exactly once.
    assert_eq!(arena.collect([]), 1);
    assert_eq!(*drops.borrow(), vec![9]);
    assert!(arena.get(lost).is_none());
    assert!(arena.get(kept).is_some());

    assert_eq!(arena.collect([]), 0);
    assert_eq!(*drops.borrow(), vec![9]);
}

#[test]
fn roots_keep_whole_subtrees_alive() {
    let mut arena = Arena::new();
    let left = int(&mut arena, 1);
    let right = int(&mut arena, 2);
    let sum = infix(&mut arena, "+", left, right);

    arena.collect([]);
    assert_eq!(arena.collect([sum]), 0);
    assert!(arena.get(left).is_some());

    // Dropping the root reclaims the subtree in one cycle.
    assert_eq!(arena.collect([]), 3);
    assert!(arena.get(sum).is_none());
}

#[test]
fn weak_info_references_are_cleared() {
    let mut arena = Arena::new();
    let parent = int(&mut arena, 1);
    let child = int(&mut arena, 2);
    arena.set_info(
        child,
        ParentInfo {
            parent: Some(parent),
        },
    );
    arena.pin(child);

    // The info reference does not root the parent.
    arena.collect([]);
    arena.collect([]);
    assert!(arena.get(parent).is_none());
    assert_eq!(arena.info::<ParentInfo>(child).unwrap().parent, None);
}

#[test]
fn copy_tree_copies_info_chain() {
    let mut arena = Arena::new();
    let drops = Rc::new(RefCell::new(Vec::new()));
    let left = int(&mut arena, 1);
    let right = name(&mut arena, "x");
    let sum = infix(&mut arena, "+", left, right);
    arena.set_info(
        sum,
        CountedInfo {
            drops: drops.clone(),
            tag: 3,
        },
    );

    let copy = arena.copy_tree(sum);
    assert_ne!(copy, sum);
    assert!(crate::trees_equal(&arena, copy, sum));
    assert_eq!(arena.info::<CountedInfo>(copy).map(|i| i.tag), Some(3));
}

#[test]
fn gc_threshold_reports_pending() {
    let mut arena = Arena::new().with_gc_threshold(4);
    for i in 0..3 {
        int(&mut arena, i);
    }
    assert!(!arena.gc_pending());
    int(&mut arena, 3);
    assert!(arena.gc_pending());
    arena.collect([]);
    assert!(!arena.gc_pending());
}

#[test]
fn purge_removes_type_from_subtree() {
    let mut arena = Arena::new();
    let drops = Rc::new(RefCell::new(Vec::new()));
    let left = int(&mut arena, 1);
    let right = int(&mut arena, 2);
    let sum = infix(&mut arena, "+", left, right);
    for (tag, node) in [(1, left), (2, right), (3, sum)] {
        arena.set_info(
            node,
            CountedInfo {
                drops: drops.clone(),
                tag,
            },
        );
    }

    arena.purge::<CountedInfo>(sum);
    let mut finalized = drops.borrow().clone();
    finalized.sort_unstable();
    assert_eq!(finalized, vec![1, 2, 3]);
    assert!(arena.info::<CountedInfo>(left).is_none());
}
