use indoc::indoc;

use crate::test_utils::{dump, parse};

fn tree(source: &str) -> String {
    let parsed = parse(source);
    assert!(
        !parsed.diagnostics.has_errors(),
        "unexpected diagnostics: {}",
        parsed.diagnostics.printer().render()
    );
    let root = parsed.root.expect("source parses to a tree");
    dump(&parsed.arena, root)
}

#[test]
fn priorities_order_arithmetic() {
    assert_eq!(tree("2 + 3 * 4"), "(infix + 2 (infix * 3 4))");
    assert_eq!(tree("2 * 3 + 4"), "(infix + (infix * 2 3) 4)");
}

#[test]
fn equal_priorities_associate_left() {
    assert_eq!(tree("1 + 2 - 3"), "(infix - (infix + 1 2) 3)");
}

#[test]
fn odd_priorities_associate_right() {
    assert_eq!(tree("a ^ b ^ c"), "(infix ^ a (infix ^ b c))");
    assert_eq!(tree("a, b, c"), "(infix , a (infix , b c))");
}

#[test]
fn parentheses_override_priorities() {
    assert_eq!(
        tree("(2 + 3) * 4"),
        "(infix * (block ( ) (infix + 2 3)) 4)"
    );
}

#[test]
fn rewrite_arrow_is_low_priority() {
    assert_eq!(tree("0! -> 1"), "(infix -> (postfix 0 !) 1)");
}

#[test]
fn guarded_rewrite() {
    insta::assert_snapshot!(
        tree("N! when N > 0 -> N * (N-1)!"),
        @"(infix -> (infix when (postfix N !) (infix > N 0)) (infix * N (postfix (block ( ) (infix - N 1)) !)))"
    );
}

#[test]
fn typed_parameter_and_newline_sequence() {
    insta::assert_snapshot!(
        tree("f X:integer -> X+1\nf \"hello\""),
        @r#"(infix <nl> (infix -> (prefix f (infix : X integer)) (infix + X 1)) (prefix f "hello"))"#
    );
}

#[test]
fn semicolon_joins_a_definition_body() {
    // `;` binds tighter than `->`: the whole sequence is the body.
    insta::assert_snapshot!(
        tree("twice F -> F; F"),
        @"(infix -> (prefix twice F) (infix ; F F))"
    );
}

#[test]
fn juxtaposition_nests_right() {
    assert_eq!(tree("A B C"), "(prefix A (prefix B C))");
}

#[test]
fn application_binds_looser_than_arithmetic() {
    assert_eq!(tree("write X+1"), "(prefix write (infix + X 1))");
    assert_eq!(tree("f 1, 2"), "(prefix f (infix , 1 2))");
}

#[test]
fn spacing_disambiguates_prefix_minus() {
    assert_eq!(tree("write -3"), "(prefix write (prefix - 3))");
    assert_eq!(tree("write - 3"), "(infix - write 3)");
}

#[test]
fn newlines_chain_statements() {
    assert_eq!(tree("a\nb\nc"), "(infix <nl> (infix <nl> a b) c)");
}

#[test]
fn indentation_makes_blocks() {
    let source = indoc! {"
        twice F ->
            F; F
    "};
    assert_eq!(
        tree(source),
        "(infix -> (prefix twice F) (block indent (infix ; F F)))"
    );
}

#[test]
fn indented_block_chains_with_following_statement() {
    let source = indoc! {"
        a
            b
        c
    "};
    assert_eq!(
        tree(source),
        "(infix <nl> (prefix a (block indent b)) c)"
    );
}

#[test]
fn data_declaration() {
    assert_eq!(
        tree("data point(X,Y)"),
        "(prefix data (prefix point (block ( ) (infix , X Y))))"
    );
}

#[test]
fn empty_block() {
    assert_eq!(tree("()"), "(block ( ) (empty))");
}

#[test]
fn declared_prefix_binds_at_its_priority() {
    assert_eq!(tree("not x = y"), "(infix = (prefix not x) y)");
    assert_eq!(tree("-x + y"), "(infix + (prefix - x) y)");
}

#[test]
fn unknown_operator_is_diagnosed_and_demoted() {
    let parsed = parse("2 ⊕ 3");
    assert!(parsed.diagnostics.has_errors());
    assert!(parsed.root.is_some());
}

#[test]
fn mismatched_closer_is_diagnosed() {
    let parsed = parse("(a]");
    assert!(parsed.diagnostics.has_errors());
    let root = parsed.root.expect("recovered tree");
    assert_eq!(dump(&parsed.arena, root), "(block ( ) a)");
}

#[test]
fn missing_closer_is_diagnosed() {
    let parsed = parse("(a");
    assert!(parsed.diagnostics.has_errors());
    assert!(parsed.root.is_some());
}

#[test]
fn syntax_directive_declares_new_operators() {
    let source = indoc! {"
        syntax {INFIX 400 '⊗'}
        1 ⊗ 2
    "};
    let parsed = parse(source);
    assert!(
        !parsed.diagnostics.has_errors(),
        "unexpected diagnostics: {}",
        parsed.diagnostics.printer().render()
    );
    let root = parsed.root.expect("parses");
    let text = dump(&parsed.arena, root);
    assert!(text.ends_with("(infix ⊗ 1 2))"), "got: {text}");
    assert_eq!(parsed.syntax.infix_priority("⊗"), Some(400));
}

#[test]
fn lexical_errors_become_diagnostics() {
    let parsed = parse("\"unterminated\ntext");
    assert!(parsed.diagnostics.has_errors());
}
