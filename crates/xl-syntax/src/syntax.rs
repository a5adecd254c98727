//! The syntax table: operator priorities and delimiters.
//!
//! Nothing about XL's operators is hardwired. Infix, prefix and postfix
//! priorities, comment and text delimiters, block delimiters and child
//! syntaxes all come from a syntax file (`xl.syntax` by default), itself
//! written in XL and read with the scanner. The scanner and parser consult
//! the table at every token; the renderer walks it in reverse.
//!
//! Priorities are integers; higher binds tighter. Odd priorities parse
//! right-associative. Three distinguished values: `default_priority` for
//! unknown tokens, `statement_priority` separating statements from
//! expressions, and `function_priority` for prefix application.

use indexmap::{IndexMap, IndexSet};

use crate::Error;
use crate::scanner::{Scanner, Token, normalize};

/// A nested grammar active between one delimiter pair.
#[derive(Debug, Clone)]
pub struct ChildSyntax {
    pub closing: String,
    pub syntax: Syntax,
}

/// Mutable description of the syntax, typically read from `xl.syntax`.
#[derive(Debug, Clone)]
pub struct Syntax {
    infix_priority: IndexMap<String, i32>,
    prefix_priority: IndexMap<String, i32>,
    postfix_priority: IndexMap<String, i32>,
    comment_delimiters: IndexMap<String, String>,
    text_delimiters: IndexMap<String, String>,
    block_delimiters: IndexMap<String, String>,
    subsyntax: IndexMap<String, ChildSyntax>,
    known_tokens: IndexSet<String>,
    pub default_priority: i32,
    pub statement_priority: i32,
    pub function_priority: i32,
}

impl Default for Syntax {
    fn default() -> Self {
        Self::new()
    }
}

impl Syntax {
    /// An empty table: no operators, no delimiters, default priorities.
    pub fn new() -> Self {
        Self {
            infix_priority: IndexMap::new(),
            prefix_priority: IndexMap::new(),
            postfix_priority: IndexMap::new(),
            comment_delimiters: IndexMap::new(),
            text_delimiters: IndexMap::new(),
            block_delimiters: IndexMap::new(),
            subsyntax: IndexMap::new(),
            known_tokens: IndexSet::new(),
            default_priority: 0,
            statement_priority: 100,
            function_priority: 200,
        }
    }

    /// The standard table, as shipped in the default `xl.syntax`.
    pub fn standard() -> Self {
        let mut syntax = Self::new();
        syntax
            .load_source(include_str!("../xl.syntax"))
            .expect("the built-in syntax file is well-formed");
        syntax
    }

    // ------------------------------------------------------------------
    // Priorities
    // ------------------------------------------------------------------

    /// Declared infix priority, or `None` when the name is not an infix.
    pub fn infix_priority(&self, name: &str) -> Option<i32> {
        self.infix_priority.get(name).copied()
    }

    pub fn prefix_priority(&self, name: &str) -> Option<i32> {
        self.prefix_priority.get(name).copied()
    }

    pub fn postfix_priority(&self, name: &str) -> Option<i32> {
        self.postfix_priority.get(name).copied()
    }

    pub fn set_infix_priority(&mut self, name: impl Into<String>, priority: i32) {
        let name = name.into();
        self.known_tokens.insert(name.clone());
        self.infix_priority.insert(name, priority);
    }

    pub fn set_prefix_priority(&mut self, name: impl Into<String>, priority: i32) {
        let name = name.into();
        self.known_tokens.insert(name.clone());
        self.prefix_priority.insert(name, priority);
    }

    pub fn set_postfix_priority(&mut self, name: impl Into<String>, priority: i32) {
        let name = name.into();
        self.known_tokens.insert(name.clone());
        self.postfix_priority.insert(name, priority);
    }

    /// Whether this exact spelling was declared anywhere in the table.
    pub fn known_token(&self, name: &str) -> bool {
        self.known_tokens.contains(name)
    }

    // ------------------------------------------------------------------
    // Delimiters
    // ------------------------------------------------------------------

    pub fn comment_delimiter(&mut self, opening: impl Into<String>, closing: impl Into<String>) {
        let opening = opening.into();
        let closing = closing.into();
        self.known_tokens.insert(opening.clone());
        if closing != "\n" {
            self.known_tokens.insert(closing.clone());
        }
        self.comment_delimiters.insert(opening, closing);
    }

    pub fn text_delimiter(&mut self, opening: impl Into<String>, closing: impl Into<String>) {
        let opening = opening.into();
        let closing = closing.into();
        self.known_tokens.insert(opening.clone());
        self.known_tokens.insert(closing.clone());
        self.text_delimiters.insert(opening, closing);
    }

    pub fn block_delimiter(&mut self, opening: impl Into<String>, closing: impl Into<String>) {
        let opening = opening.into();
        let closing = closing.into();
        self.known_tokens.insert(opening.clone());
        self.known_tokens.insert(closing.clone());
        self.block_delimiters.insert(opening, closing);
    }

    /// Closing delimiter for a block opening, `None` if not a block opener.
    pub fn block_closing(&self, opening: &str) -> Option<&str> {
        self.block_delimiters.get(opening).map(String::as_str)
    }

    /// The comment starting at the head of `rest`, longest opener first.
    /// Openers ending in a letter or digit require a token boundary.
    pub fn comment_at(&self, rest: &str) -> Option<(String, String)> {
        Self::delimiter_at(&self.comment_delimiters, rest)
    }

    /// The long-text delimiter starting at the head of `rest`.
    pub fn text_delimiter_at(&self, rest: &str) -> Option<(String, String)> {
        Self::delimiter_at(&self.text_delimiters, rest)
    }

    fn delimiter_at(
        table: &IndexMap<String, String>,
        rest: &str,
    ) -> Option<(String, String)> {
        let mut best: Option<(&String, &String)> = None;
        for (opening, closing) in table {
            if !rest.starts_with(opening.as_str()) {
                continue;
            }
            if opening.ends_with(|c: char| c.is_alphanumeric())
                && rest[opening.len()..]
                    .chars()
                    .next()
                    .is_some_and(|c| c.is_alphanumeric())
            {
                continue;
            }
            if best.is_none_or(|(b, _)| opening.len() > b.len()) {
                best = Some((opening, closing));
            }
        }
        best.map(|(o, c)| (o.clone(), c.clone()))
    }

    /// The child syntax activated by `opening`, if any.
    pub fn child_syntax(&self, opening: &str) -> Option<&ChildSyntax> {
        self.subsyntax.get(opening)
    }

    // ------------------------------------------------------------------
    // Loading
    // ------------------------------------------------------------------

    /// Read a syntax file from disk and merge its declarations.
    pub fn read_file(&mut self, path: &std::path::Path) -> Result<(), Error> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::SyntaxFile {
            path: path.display().to_string(),
            message: source.to_string(),
        })?;
        self.load_source(&source).map_err(|e| match e {
            Error::SyntaxFile { message, .. } => Error::SyntaxFile {
                path: path.display().to_string(),
                message,
            },
            other => other,
        })
    }

    /// Merge declarations from syntax-file source text.
    ///
    /// Sections are introduced by the upper-case names `INFIX`, `PREFIX`,
    /// `POSTFIX`, `COMMENT`, `TEXT`, `BLOCK` and `SYNTAX`; `STATEMENT`,
    /// `DEFAULT` and `FUNCTION` each take one priority number. Inside a
    /// priority section an integer sets the current priority and every
    /// following operator receives it. Inside a delimiter section tokens
    /// pair up as opening then closing.
    pub fn load_source(&mut self, source: &str) -> Result<(), Error> {
        let mut scanner = Scanner::new(normalize(source), 0);
        let mut section = Section::Unknown;
        let mut priority = self.default_priority;
        // Delimiter pairs accumulate one half at a time.
        let mut opening: Option<String> = None;
        // A SYNTAX entry is (file, opening); closed by its closing token.
        let mut child: Option<(String, Option<String>)> = None;

        loop {
            let token = scanner.next_token(self);
            let entry = match token {
                Token::Eof => break,
                Token::Newline | Token::Indent | Token::Unindent => continue,
                Token::Integer(value) => {
                    match section {
                        Section::Statement => self.statement_priority = value as i32,
                        Section::Default => self.default_priority = value as i32,
                        Section::Function => self.function_priority = value as i32,
                        _ => priority = value as i32,
                    }
                    continue;
                }
                Token::Name(ref text) => match Section::named(text) {
                    Some(next) => {
                        section = next;
                        opening = None;
                        child = None;
                        continue;
                    }
                    None => match text.as_str() {
                        "NEWLINE" => "\n".to_owned(),
                        "INDENT" => xl_core::INDENT.to_owned(),
                        "UNINDENT" => xl_core::UNINDENT.to_owned(),
                        _ => text.clone(),
                    },
                },
                Token::Symbol(text) => text,
                Token::Quote(text) | Token::Text(text) => text,
                Token::ParOpen(c) | Token::ParClose(c) => c.to_string(),
                Token::Error(message) => {
                    return Err(Error::SyntaxFile {
                        path: String::new(),
                        message,
                    });
                }
                _ => continue,
            };

            match section {
                Section::Infix => self.set_infix_priority(entry, priority),
                Section::Prefix => self.set_prefix_priority(entry, priority),
                Section::Postfix => self.set_postfix_priority(entry, priority),
                Section::Comment => match opening.take() {
                    None => opening = Some(entry),
                    Some(open) => self.comment_delimiter(open, entry),
                },
                Section::Text => match opening.take() {
                    None => opening = Some(entry),
                    Some(open) => self.text_delimiter(open, entry),
                },
                Section::Block => match opening.take() {
                    None => opening = Some(entry),
                    Some(open) => self.block_delimiter(open, entry),
                },
                Section::Syntax => match child.take() {
                    None => child = Some((entry, None)),
                    Some((file, None)) => child = Some((file, Some(entry))),
                    Some((file, Some(open))) => {
                        let mut table = Syntax::new();
                        table.read_file(std::path::Path::new(&file))?;
                        self.known_tokens.insert(open.clone());
                        self.known_tokens.insert(entry.clone());
                        self.subsyntax.insert(
                            open,
                            ChildSyntax {
                                closing: entry,
                                syntax: table,
                            },
                        );
                    }
                },
                Section::Statement | Section::Default | Section::Function | Section::Unknown => {}
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Unknown,
    Infix,
    Prefix,
    Postfix,
    Comment,
    Text,
    Block,
    Syntax,
    Statement,
    Default,
    Function,
}

impl Section {
    fn named(text: &str) -> Option<Self> {
        Some(match text {
            "INFIX" => Section::Infix,
            "PREFIX" => Section::Prefix,
            "POSTFIX" => Section::Postfix,
            "COMMENT" => Section::Comment,
            "TEXT" => Section::Text,
            "BLOCK" => Section::Block,
            "SYNTAX" => Section::Syntax,
            "STATEMENT" => Section::Statement,
            "DEFAULT" => Section::Default,
            "FUNCTION" => Section::Function,
            _ => return None,
        })
    }
}
