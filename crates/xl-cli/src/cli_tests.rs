use std::path::PathBuf;

use crate::cli::{Params, build_cli};

fn parse(args: &[&str]) -> Params {
    let matches = build_cli()
        .try_get_matches_from(args)
        .expect("arguments parse");
    Params::from_matches(&matches)
}

#[test]
fn positional_files_in_order() {
    let params = parse(&["xl", "first.xl", "second.xl"]);
    assert_eq!(
        params.files,
        vec![PathBuf::from("first.xl"), PathBuf::from("second.xl")]
    );
    assert!(!params.parse_only);
    assert!(params.diff.is_none());
}

#[test]
fn parse_only_flag() {
    let params = parse(&["xl", "--parse-only", "demo.xl"]);
    assert!(params.parse_only);
}

#[test]
fn diff_takes_exactly_two_files() {
    let params = parse(&["xl", "--diff", "a.xl", "b.xl"]);
    assert_eq!(
        params.diff,
        Some((PathBuf::from("a.xl"), PathBuf::from("b.xl")))
    );

    assert!(build_cli()
        .try_get_matches_from(["xl", "--diff", "only.xl"])
        .is_err());
}

#[test]
fn overrides_and_traces() {
    let params = parse(&[
        "xl",
        "--builtins",
        "mine.xl",
        "--syntax",
        "mine.syntax",
        "-t",
        "eval",
        "-t",
        "memory",
        "demo.xl",
    ]);
    assert_eq!(params.builtins, Some(PathBuf::from("mine.xl")));
    assert_eq!(params.syntax, Some(PathBuf::from("mine.syntax")));
    assert_eq!(params.traces, vec!["eval".to_owned(), "memory".to_owned()]);
}

#[test]
fn serialization_flags() {
    let params = parse(&["xl", "--write-serialized", "out.xlb", "demo.xl"]);
    assert_eq!(params.write_serialized, Some(PathBuf::from("out.xlb")));

    let params = parse(&["xl", "--read-serialized", "out.xlb"]);
    assert!(params.read_serialized);
}

#[test]
fn unknown_flags_are_rejected() {
    assert!(build_cli()
        .try_get_matches_from(["xl", "--no-such-flag"])
        .is_err());
}
