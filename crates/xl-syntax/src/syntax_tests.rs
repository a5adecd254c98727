use indoc::indoc;

use crate::syntax::Syntax;

#[test]
fn standard_table_has_the_expected_priorities() {
    let syntax = Syntax::standard();
    assert_eq!(syntax.infix_priority("+"), Some(490));
    assert_eq!(syntax.infix_priority("*"), Some(510));
    assert_eq!(syntax.infix_priority("\n"), Some(10));
    assert_eq!(syntax.infix_priority("->"), Some(21));
    assert_eq!(syntax.infix_priority("when"), Some(30));
    // A one-line definition carries a multi-statement body.
    assert_eq!(syntax.infix_priority(";"), Some(40));
    assert_eq!(syntax.infix_priority(":"), Some(590));
    assert_eq!(syntax.prefix_priority("-"), Some(810));
    assert_eq!(syntax.prefix_priority("data"), Some(30));
    assert_eq!(syntax.postfix_priority("!"), Some(930));
    assert_eq!(syntax.infix_priority("nosuch"), None);

    assert_eq!(syntax.statement_priority, 100);
    assert_eq!(syntax.default_priority, 0);
    assert_eq!(syntax.function_priority, 200);
}

#[test]
fn standard_table_has_the_expected_delimiters() {
    let syntax = Syntax::standard();
    assert_eq!(syntax.block_closing("("), Some(")"));
    assert_eq!(syntax.block_closing("["), Some("]"));
    assert_eq!(syntax.block_closing("{"), Some("}"));
    assert_eq!(syntax.block_closing(xl_core::INDENT), Some(xl_core::UNINDENT));
    assert_eq!(
        syntax.comment_at("// rest"),
        Some(("//".to_owned(), "\n".to_owned()))
    );
    assert_eq!(
        syntax.comment_at("/* rest"),
        Some(("/*".to_owned(), "*/".to_owned()))
    );
    assert_eq!(syntax.comment_at("/ rest"), None);
    assert_eq!(
        syntax.text_delimiter_at("<<doc>>"),
        Some(("<<".to_owned(), ">>".to_owned()))
    );
}

#[test]
fn loading_merges_declarations() {
    let mut syntax = Syntax::standard();
    syntax
        .load_source(indoc! {"
            INFIX
                    400     '×' '÷'
            PREFIX
                    820     '¬'
        "})
        .expect("declarations load");
    assert_eq!(syntax.infix_priority("×"), Some(400));
    assert_eq!(syntax.infix_priority("÷"), Some(400));
    assert_eq!(syntax.prefix_priority("¬"), Some(820));
    // Earlier declarations survive.
    assert_eq!(syntax.infix_priority("+"), Some(490));
}

#[test]
fn name_comment_openers_respect_token_boundaries() {
    let mut syntax = Syntax::new();
    syntax.comment_delimiter("REM", "\n");
    assert!(syntax.comment_at("REM hello").is_some());
    assert!(syntax.comment_at("REMAINDER").is_none());
}

#[test]
fn longest_comment_opener_wins() {
    let mut syntax = Syntax::new();
    syntax.comment_delimiter("/", "\n");
    syntax.comment_delimiter("/*", "*/");
    assert_eq!(
        syntax.comment_at("/* x"),
        Some(("/*".to_owned(), "*/".to_owned()))
    );
    assert_eq!(syntax.comment_at("/ x"), Some(("/".to_owned(), "\n".to_owned())));
}

#[test]
fn unreadable_syntax_file_is_an_error() {
    let mut syntax = Syntax::new();
    let error = syntax
        .read_file(std::path::Path::new("does/not/exist.syntax"))
        .unwrap_err();
    assert!(error.to_string().contains("does/not/exist.syntax"));
}
