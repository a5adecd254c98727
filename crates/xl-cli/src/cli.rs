//! Command-line definition and parsed parameters.

use std::path::PathBuf;

use clap::{Arg, ArgAction, ArgMatches, Command, value_parser};

pub fn build_cli() -> Command {
    Command::new("xl")
        .about("Evaluator for the XL tree-rewriting language")
        .arg(
            Arg::new("files")
                .value_name("FILE")
                .num_args(0..)
                .value_parser(value_parser!(PathBuf))
                .help("Source files, loaded and evaluated in order"),
        )
        .arg(
            Arg::new("parse_only")
                .long("parse-only")
                .action(ArgAction::SetTrue)
                .help("Parse and print, no evaluation"),
        )
        .arg(
            Arg::new("diff")
                .long("diff")
                .num_args(2)
                .value_names(["FILE1", "FILE2"])
                .value_parser(value_parser!(PathBuf))
                .help("Exit with status 0 if the two files parse to equal trees"),
        )
        .arg(
            Arg::new("builtins")
                .long("builtins")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Override the default builtins file"),
        )
        .arg(
            Arg::new("syntax")
                .long("syntax")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Override the default syntax file"),
        )
        .arg(
            Arg::new("style")
                .long("style")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Override the default style sheet"),
        )
        .arg(
            Arg::new("ast")
                .long("ast")
                .action(ArgAction::SetTrue)
                .help("Print the parsed tree as JSON, no evaluation"),
        )
        .arg(
            Arg::new("write_serialized")
                .long("write-serialized")
                .value_name("PATH")
                .value_parser(value_parser!(PathBuf))
                .help("Write the serialized form of the loaded trees"),
        )
        .arg(
            Arg::new("read_serialized")
                .long("read-serialized")
                .action(ArgAction::SetTrue)
                .help("Treat input files as serialized trees"),
        )
        .arg(
            Arg::new("trace")
                .short('t')
                .value_name("TRACE")
                .action(ArgAction::Append)
                .help("Enable a trace (e.g. -t eval)"),
        )
        .arg(
            Arg::new("depth")
                .long("depth")
                .value_name("LIMIT")
                .value_parser(value_parser!(u32))
                .help("Recursion depth limit"),
        )
}

/// Everything the driver needs, decoded from the matches.
#[derive(Debug, Clone)]
pub struct Params {
    pub files: Vec<PathBuf>,
    pub parse_only: bool,
    pub diff: Option<(PathBuf, PathBuf)>,
    pub builtins: Option<PathBuf>,
    pub syntax: Option<PathBuf>,
    pub style: Option<PathBuf>,
    pub ast: bool,
    pub write_serialized: Option<PathBuf>,
    pub read_serialized: bool,
    pub traces: Vec<String>,
    pub depth: Option<u32>,
}

impl Params {
    pub fn from_matches(matches: &ArgMatches) -> Self {
        let diff = matches.get_many::<PathBuf>("diff").map(|mut paths| {
            let first = paths.next().expect("clap enforces two values").clone();
            let second = paths.next().expect("clap enforces two values").clone();
            (first, second)
        });
        Self {
            files: matches
                .get_many::<PathBuf>("files")
                .map(|files| files.cloned().collect())
                .unwrap_or_default(),
            parse_only: matches.get_flag("parse_only"),
            diff,
            builtins: matches.get_one::<PathBuf>("builtins").cloned(),
            syntax: matches.get_one::<PathBuf>("syntax").cloned(),
            style: matches.get_one::<PathBuf>("style").cloned(),
            ast: matches.get_flag("ast"),
            write_serialized: matches.get_one::<PathBuf>("write_serialized").cloned(),
            read_serialized: matches.get_flag("read_serialized"),
            traces: matches
                .get_many::<String>("trace")
                .map(|traces| traces.cloned().collect())
                .unwrap_or_default(),
            depth: matches.get_one::<u32>("depth").copied(),
        }
    }
}
