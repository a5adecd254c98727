use indoc::indoc;

use crate::scanner::{Scanner, Token, normalize};
use crate::syntax::Syntax;

fn scan(source: &str) -> Vec<Token> {
    let syntax = Syntax::standard();
    let mut scanner = Scanner::new(normalize(source), 0);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token(&syntax);
        let done = token == Token::Eof;
        tokens.push(token);
        if done {
            break;
        }
    }
    tokens
}

fn name(text: &str) -> Token {
    Token::Name(text.to_owned())
}

fn symbol(text: &str) -> Token {
    Token::Symbol(text.to_owned())
}

#[test]
fn arithmetic_tokens() {
    assert_eq!(
        scan("2 + 3 * 4"),
        vec![
            Token::Integer(2),
            symbol("+"),
            Token::Integer(3),
            symbol("*"),
            Token::Integer(4),
            Token::Eof,
        ]
    );
}

#[test]
fn based_numbers() {
    assert_eq!(scan("16#FF"), vec![Token::Integer(255), Token::Eof]);
    assert_eq!(scan("2#1010"), vec![Token::Integer(10), Token::Eof]);
    assert_eq!(scan("16#FF#E2"), vec![Token::Integer(0xFF00), Token::Eof]);
    assert_eq!(scan("1_980_000"), vec![Token::Integer(1_980_000), Token::Eof]);
    assert_eq!(scan("1E3"), vec![Token::Integer(1000), Token::Eof]);
}

#[test]
fn real_numbers() {
    assert_eq!(scan("1.5"), vec![Token::Real(1.5), Token::Eof]);
    assert_eq!(scan("2#1.1"), vec![Token::Real(1.5), Token::Eof]);
    assert_eq!(scan("1.5E2"), vec![Token::Real(150.0), Token::Eof]);
    match &scan("1E-3")[..] {
        [Token::Real(value), Token::Eof] => assert!((value - 0.001).abs() < 1e-12),
        other => panic!("expected a real, got {other:?}"),
    }
}

#[test]
fn integer_overflow_is_an_error() {
    assert!(matches!(
        scan("99999999999999999999")[0],
        Token::Error(_)
    ));
    assert!(matches!(scan("16#FFFFFFFFFFFFFFFF")[0], Token::Error(_)));
}

#[test]
fn names_join_on_single_underscore() {
    assert_eq!(
        scan("hello World_2 a_b a__b"),
        vec![
            name("hello"),
            name("World_2"),
            name("a_b"),
            name("a"),
            symbol("__"),
            name("b"),
            Token::Eof,
        ]
    );
}

#[test]
fn quoted_text_and_doubling() {
    assert_eq!(
        scan(r#""he said ""hi""""#),
        vec![Token::Text("he said \"hi\"".to_owned()), Token::Eof]
    );
    assert_eq!(scan("'a'"), vec![Token::Quote("a".to_owned()), Token::Eof]);
}

#[test]
fn unterminated_text_is_an_error() {
    assert!(matches!(&scan("\"oops\nnext")[0], Token::Error(_)));
}

#[test]
fn symbols_are_maximal_runs() {
    assert_eq!(
        scan("a->b"),
        vec![name("a"), symbol("->"), name("b"), Token::Eof]
    );
    assert_eq!(
        scan("---x"),
        vec![symbol("---"), name("x"), Token::Eof]
    );
}

#[test]
fn brackets_stand_alone() {
    assert_eq!(
        scan("--((x))"),
        vec![
            symbol("--"),
            Token::ParOpen('('),
            Token::ParOpen('('),
            name("x"),
            Token::ParClose(')'),
            Token::ParClose(')'),
            Token::Eof,
        ]
    );
}

#[test]
fn comments_are_skipped() {
    assert_eq!(
        scan("x // rest of line\ny"),
        vec![name("x"), Token::Newline, name("y"), Token::Eof]
    );
    assert_eq!(
        scan("a /* inline */ c"),
        vec![name("a"), name("c"), Token::Eof]
    );
}

#[test]
fn long_text_uses_syntax_delimiters() {
    assert_eq!(
        scan("<<hello\nworld>>"),
        vec![
            Token::LongText {
                value: "hello\nworld".to_owned(),
                opening: "<<".to_owned(),
                closing: ">>".to_owned(),
            },
            Token::Eof,
        ]
    );
}

#[test]
fn indentation_nests_and_unwinds() {
    let source = indoc! {"
        a
          b
        c
    "};
    assert_eq!(
        scan(source),
        vec![
            name("a"),
            Token::Indent,
            name("b"),
            Token::Unindent,
            Token::Newline,
            name("c"),
            Token::Eof,
        ]
    );
}

#[test]
fn deeper_unindents_pop_one_level_each() {
    let source = "a\n  b\n    c\nd";
    assert_eq!(
        scan(source),
        vec![
            name("a"),
            Token::Indent,
            name("b"),
            Token::Indent,
            name("c"),
            Token::Unindent,
            Token::Unindent,
            Token::Newline,
            name("d"),
            Token::Eof,
        ]
    );
}

#[test]
fn newlines_inside_brackets_are_whitespace() {
    assert_eq!(
        scan("(a,\n   b)"),
        vec![
            Token::ParOpen('('),
            name("a"),
            symbol(","),
            name("b"),
            Token::ParClose(')'),
            Token::Eof,
        ]
    );
}

#[test]
fn mixed_indentation_is_an_error() {
    let tokens = scan("a\n\tb\n  c");
    assert!(tokens.iter().any(|t| matches!(t, Token::Error(_))));
}

#[test]
fn blank_lines_do_not_separate_twice() {
    assert_eq!(
        scan("a\n\n\nb"),
        vec![name("a"), Token::Newline, name("b"), Token::Eof]
    );
}

#[test]
fn crlf_and_bom_are_normalized() {
    assert_eq!(
        scan("\u{FEFF}a\r\nb"),
        vec![name("a"), Token::Newline, name("b"), Token::Eof]
    );
}
