//! Tree-to-text rendering, the dual of the parser.
//!
//! The renderer walks a tree using the syntax table's priorities, so that
//! feeding its output back through the parser reproduces the tree up to
//! whitespace. Indent blocks emit real indentation; parentheses appear only
//! where a synthesized tree would otherwise re-parse differently (trees the
//! parser produced already carry their blocks).
//!
//! A style sheet overrides the separator text of individual operators and
//! the indentation unit.

use indexmap::IndexMap;

use xl_core::{Arena, INDENT, NodeId, Node};

use crate::Error;
use crate::scanner::{Scanner, Token, normalize};
use crate::syntax::Syntax;

/// Separator overrides, loaded from `xl.stylesheet`.
#[derive(Debug, Clone)]
pub struct StyleSheet {
    separators: IndexMap<String, String>,
    indent_unit: String,
}

impl Default for StyleSheet {
    fn default() -> Self {
        Self::standard()
    }
}

impl StyleSheet {
    /// No overrides: every operator renders as ` op `.
    pub fn new() -> Self {
        Self {
            separators: IndexMap::new(),
            indent_unit: "    ".to_owned(),
        }
    }

    /// The styles shipped in the default `xl.stylesheet`.
    pub fn standard() -> Self {
        let mut styles = Self::new();
        styles
            .load_source(include_str!("../xl.stylesheet"))
            .expect("the built-in style sheet is well-formed");
        styles
    }

    pub fn read_file(&mut self, path: &std::path::Path) -> Result<(), Error> {
        let source = std::fs::read_to_string(path).map_err(|source| Error::StyleFile {
            path: path.display().to_string(),
            message: source.to_string(),
        })?;
        self.load_source(&source)
    }

    /// Rules are `key -> "text"`: the key is an operator spelling (quoted)
    /// or the word `indent`, the text replaces the default separator.
    pub fn load_source(&mut self, source: &str) -> Result<(), Error> {
        // The style sheet is scanned with the standard syntax so that its
        // own comments and arrows lex as usual.
        let syntax = Syntax::standard();
        let mut scanner = Scanner::new(normalize(source), 0);
        let mut key: Option<String> = None;
        let mut seen_arrow = false;
        loop {
            let token = scanner.next_token(&syntax);
            match token {
                Token::Eof => break,
                Token::Newline | Token::Indent | Token::Unindent => {
                    key = None;
                    seen_arrow = false;
                }
                Token::Symbol(ref s) if s == "->" => seen_arrow = true,
                Token::Text(text) | Token::Quote(text) | Token::LongText { value: text, .. } => {
                    match (&key, seen_arrow) {
                        (Some(k), true) => {
                            if k == "indent" {
                                self.indent_unit = text;
                            } else {
                                self.separators.insert(k.clone(), text);
                            }
                            key = None;
                            seen_arrow = false;
                        }
                        (None, false) => key = Some(text),
                        _ => {
                            return Err(Error::StyleFile {
                                path: String::new(),
                                message: "malformed style rule".to_owned(),
                            });
                        }
                    }
                }
                Token::Name(name) | Token::Symbol(name) => {
                    if key.is_none() && !seen_arrow {
                        key = Some(name);
                    }
                }
                Token::Error(message) => {
                    return Err(Error::StyleFile {
                        path: String::new(),
                        message,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn separator(&self, op: &str) -> Option<&str> {
        self.separators.get(op).map(String::as_str)
    }
}

/// Renders one tree to text.
pub struct Renderer<'a> {
    syntax: &'a Syntax,
    styles: StyleSheet,
    out: String,
    indent: usize,
}

impl<'a> Renderer<'a> {
    pub fn new(syntax: &'a Syntax) -> Self {
        Self {
            syntax,
            styles: StyleSheet::standard(),
            out: String::new(),
            indent: 0,
        }
    }

    pub fn with_styles(syntax: &'a Syntax, styles: StyleSheet) -> Self {
        Self {
            syntax,
            styles,
            out: String::new(),
            indent: 0,
        }
    }

    pub fn render(mut self, arena: &Arena, root: NodeId) -> String {
        self.node(arena, root);
        self.out
    }

    fn node(&mut self, arena: &Arena, id: NodeId) {
        match arena.node(id) {
            Node::Integer(value) => self.out.push_str(&value.to_string()),
            Node::Real(value) => self.real(*value),
            Node::Text {
                value,
                opening,
                closing,
            } => {
                self.out.push_str(opening);
                // Doubling the closing delimiter escapes it.
                self.out
                    .push_str(&value.replace(closing.as_str(), &closing.repeat(2)));
                self.out.push_str(closing);
            }
            Node::Name(value) => self.out.push_str(value),
            Node::Block {
                child,
                opening,
                closing,
            } => {
                if opening == INDENT {
                    self.indent += 1;
                    self.newline();
                    self.node(arena, *child);
                    self.indent -= 1;
                    self.newline();
                } else {
                    self.out.push_str(opening);
                    self.node(arena, *child);
                    self.out.push_str(closing);
                }
            }
            Node::Prefix { left, right } => {
                // A declared prefix operator binds its operand at its own
                // priority; plain application binds at function priority.
                let priority = match arena.node(*left) {
                    Node::Name(name) => self
                        .syntax
                        .prefix_priority(name)
                        .unwrap_or(self.syntax.function_priority),
                    _ => self.syntax.function_priority,
                };
                self.child(arena, *left, self.syntax.function_priority, false);
                // Calls render glued to their parenthesized arguments, and a
                // prefix use of an infix symbol stays glued to its operand so
                // it reads back as a prefix (`write -3`).
                let glue = matches!(arena.node(*right), Node::Block { opening, .. } if opening != INDENT)
                    || matches!(arena.node(*left), Node::Name(name)
                        if self.syntax.prefix_priority(name).is_some()
                            && self.syntax.infix_priority(name).is_some());
                if !glue {
                    self.space();
                }
                self.child(arena, *right, priority, true);
            }
            Node::Postfix { left, right } => {
                let priority = match arena.node(*right) {
                    Node::Name(name) => self
                        .syntax
                        .postfix_priority(name)
                        .unwrap_or(self.syntax.function_priority),
                    _ => self.syntax.function_priority,
                };
                self.child(arena, *left, priority, false);
                self.node(arena, *right);
            }
            Node::Infix { name, left, right } => {
                let priority = self
                    .syntax
                    .infix_priority(name)
                    .unwrap_or(self.syntax.default_priority);
                self.child(arena, *left, priority, false);
                if name == "\n" {
                    self.newline();
                } else if let Some(separator) = self.styles.separator(name).map(str::to_owned) {
                    self.out.push_str(&separator);
                } else {
                    self.space();
                    self.out.push_str(name);
                    self.space();
                }
                self.child(arena, *right, priority, name != "\n");
            }
        }
    }

    /// Render a child, inserting protective parentheses when a synthesized
    /// infix would re-parse under its parent's priority.
    fn child(&mut self, arena: &Arena, id: NodeId, parent_priority: i32, is_right: bool) {
        let needs_parens = match arena.node(id) {
            Node::Infix { name, .. } => {
                let child_priority = self
                    .syntax
                    .infix_priority(name)
                    .unwrap_or(self.syntax.default_priority);
                child_priority < parent_priority
                    || (child_priority == parent_priority
                        && is_right
                        && child_priority % 2 == 0)
            }
            _ => false,
        };
        if needs_parens {
            self.out.push('(');
            self.node(arena, id);
            self.out.push(')');
        } else {
            self.node(arena, id);
        }
    }

    fn real(&mut self, value: f64) {
        let text = value.to_string();
        self.out.push_str(&text);
        if !text.contains(['.', 'e', 'E', 'i', 'N']) {
            self.out.push_str(".0");
        }
    }

    /// A space, unless the output already ends with one (or is empty).
    fn space(&mut self) {
        if !self.out.is_empty() && !self.out.ends_with([' ', '\n']) {
            self.out.push(' ');
        }
    }

    /// Line break plus current indentation; collapses with a preceding one.
    fn newline(&mut self) {
        while self.out.ends_with(' ') {
            self.out.pop();
        }
        if !self.out.is_empty() && !self.out.ends_with('\n') {
            self.out.push('\n');
        }
        for _ in 0..self.indent {
            self.out.push_str(&self.styles.indent_unit);
        }
    }
}
