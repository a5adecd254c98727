//! Operator-precedence parser.
//!
//! The parser keeps a result tree and a left priority. An infix token with
//! priority at least the left priority consumes the result as its left
//! operand and parses its right operand at its own priority (odd priorities
//! right-associate). Adjacent operands become prefix applications at
//! function priority, so `write X+1` applies `write` to the whole sum and
//! `A B C` nests to the right. Newline and `;` are ordinary low-priority
//! infix operators; indentation arrives from the scanner as `Indent` /
//! `Unindent` and produces blocks with the synthetic delimiter pair.
//!
//! An infix symbol with space before it but none after it, that is also a
//! declared prefix, parses as a prefix instead: `write -3` applies `write`
//! to `-3` where `write - 3` subtracts.
//!
//! Error recovery is linear: diagnostics accumulate in the sink, the
//! offending token is skipped or demoted to an ordinary name, and parsing
//! continues. The parser never aborts.

use std::collections::VecDeque;

use xl_core::{Arena, INDENT, NodeId, Node, Position, Positions, UNINDENT};

use crate::diagnostics::Diagnostics;
use crate::renderer::Renderer;
use crate::scanner::{Scanner, Token, normalize};
use crate::syntax::Syntax;

/// Everything the parser produced: the tree (if any token yielded one) and
/// the accumulated diagnostics.
#[derive(Debug)]
pub struct ParseResult {
    pub root: Option<NodeId>,
    pub diagnostics: Diagnostics,
}

/// Parse one source file into the arena, registering it in `positions`.
pub fn parse_source(
    name: &str,
    source: &str,
    arena: &mut Arena,
    syntax: &mut Syntax,
    positions: &mut Positions,
) -> ParseResult {
    let normalized = normalize(source);
    let base = positions.open_file(name, normalized.clone());
    Parser::new(normalized, base, arena, syntax).parse()
}

#[derive(Debug, Clone)]
struct Scanned {
    token: Token,
    pos: Position,
    spaced: bool,
}

const MAX_DEPTH: u32 = 400;

pub struct Parser<'a> {
    scanner: Scanner,
    arena: &'a mut Arena,
    syntax: &'a mut Syntax,
    diagnostics: Diagnostics,
    lookahead: VecDeque<Scanned>,
    /// Child-syntax tables active inside delimited regions.
    child_tables: Vec<Syntax>,
    /// Closing spellings of open child-syntax regions.
    closing_symbols: Vec<String>,
    depth: u32,
    depth_reported: bool,
}

impl<'a> Parser<'a> {
    /// `source` must already be normalized; `base` is its offset base from
    /// [`Positions::open_file`].
    pub fn new(
        source: String,
        base: Position,
        arena: &'a mut Arena,
        syntax: &'a mut Syntax,
    ) -> Self {
        Self {
            scanner: Scanner::new(source, base),
            arena,
            syntax,
            diagnostics: Diagnostics::new(),
            lookahead: VecDeque::new(),
            child_tables: Vec::new(),
            closing_symbols: Vec::new(),
            depth: 0,
            depth_reported: false,
        }
    }

    pub fn parse(mut self) -> ParseResult {
        let mut root = self.parse_expression(i32::MIN);
        loop {
            let Scanned { token, pos, .. } = self.peek(0).clone();
            match token {
                Token::Eof => break,
                Token::ParClose(c) => {
                    self.advance();
                    self.diagnostics
                        .error(format!("unmatched '{c}'"), pos)
                        .emit();
                }
                Token::Unindent | Token::Newline => {
                    self.advance();
                }
                _ => {
                    // Stray content after recovery; keep parsing and chain
                    // it as a further statement.
                    match self.parse_expression(i32::MIN) {
                        Some(more) => {
                            root = Some(match root {
                                Some(prev) => self.infix("\n", prev, more, pos),
                                None => more,
                            });
                        }
                        None => {
                            self.advance();
                        }
                    }
                }
            }
        }
        ParseResult {
            root,
            diagnostics: self.diagnostics,
        }
    }

    // ------------------------------------------------------------------
    // Token access
    // ------------------------------------------------------------------

    fn fetch(&mut self, n: usize) {
        while self.lookahead.len() <= n {
            if matches!(
                self.lookahead.back(),
                Some(Scanned {
                    token: Token::Eof,
                    ..
                })
            ) {
                let eof = self.lookahead.back().expect("just matched").clone();
                self.lookahead.push_back(eof);
                continue;
            }
            let table = self.child_tables.last().unwrap_or(&*self.syntax);
            let token = self.scanner.next_token(table);
            self.lookahead.push_back(Scanned {
                token,
                pos: self.scanner.position(),
                spaced: self.scanner.had_space_before(),
            });
        }
    }

    fn peek(&mut self, n: usize) -> &Scanned {
        self.fetch(n);
        &self.lookahead[n]
    }

    fn advance(&mut self) -> Scanned {
        self.fetch(0);
        self.lookahead.pop_front().expect("fetched above")
    }

    // ------------------------------------------------------------------
    // Tree construction
    // ------------------------------------------------------------------

    fn leaf(&mut self, node: Node, pos: Position) -> NodeId {
        self.arena.alloc(node, pos)
    }

    fn infix(&mut self, name: &str, left: NodeId, right: NodeId, pos: Position) -> NodeId {
        self.arena.alloc(
            Node::Infix {
                name: name.to_owned(),
                left,
                right,
            },
            pos,
        )
    }

    fn empty(&mut self, pos: Position) -> NodeId {
        self.leaf(Node::Name(String::new()), pos)
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    /// Right operand priority: odd priorities are right-associative.
    fn right_priority(priority: i32) -> i32 {
        if priority % 2 != 0 {
            priority
        } else {
            priority + 1
        }
    }

    fn parse_expression(&mut self, left_priority: i32) -> Option<NodeId> {
        if self.depth >= MAX_DEPTH {
            if !self.depth_reported {
                self.depth_reported = true;
                let pos = self.peek(0).pos;
                self.diagnostics
                    .error("expression nests too deeply", pos)
                    .emit();
            }
            return None;
        }
        self.depth += 1;
        let result = self.parse_expression_inner(left_priority);
        self.depth -= 1;
        result
    }

    fn parse_expression_inner(&mut self, left_priority: i32) -> Option<NodeId> {
        let mut result: Option<NodeId> = None;

        loop {
            let Scanned { token, pos, spaced } = self.peek(0).clone();

            match &token {
                Token::Eof | Token::Unindent | Token::ParClose(_) => break,
                Token::Error(message) => {
                    let message = message.clone();
                    self.advance();
                    self.diagnostics.error(message, pos).emit();
                    continue;
                }
                Token::Newline => {
                    if result.is_none() {
                        self.advance();
                        continue;
                    }
                    let priority = self
                        .syntax
                        .infix_priority("\n")
                        .unwrap_or(self.syntax.default_priority);
                    if priority < left_priority {
                        break;
                    }
                    self.advance();
                    let left = result.expect("checked above");
                    match self.parse_expression(Self::right_priority(priority)) {
                        Some(right) => result = Some(self.infix("\n", left, right, pos)),
                        None => result = Some(left),
                    }
                    continue;
                }
                _ => {}
            }

            // Closing token of an active child-syntax region.
            if let Some(spelling) = token.spelling()
                && self.closing_symbols.last().is_some_and(|c| c == spelling)
            {
                break;
            }

            // Infix operator with a left operand.
            if let (Some(op), Some(left)) = (token.spelling(), result) {
                if let Some(priority) = self.syntax.infix_priority(op) {
                    // Glued prefix exception: `write -3`.
                    let glued_prefix = if self.syntax.prefix_priority(op).is_some() && spaced {
                        let next = self.peek(1).clone();
                        !next.spaced && self.starts_operand(&next.token)
                    } else {
                        false
                    };
                    if !glued_prefix {
                        if priority < left_priority {
                            break;
                        }
                        let op = op.to_owned();
                        self.advance();
                        match self.parse_expression(Self::right_priority(priority)) {
                            Some(right) => {
                                result = Some(self.infix(&op, left, right, pos));
                            }
                            None if op == ";" => {}
                            None => {
                                self.diagnostics
                                    .error(format!("missing right operand for '{op}'"), pos)
                                    .emit();
                            }
                        }
                        continue;
                    }
                }

                if let Some(priority) = self.syntax.postfix_priority(op) {
                    if priority < left_priority {
                        break;
                    }
                    let op = op.to_owned();
                    self.advance();
                    let name = self.leaf(Node::Name(op), pos);
                    result = Some(self.arena.alloc(Node::Postfix { left, right: name }, pos));
                    continue;
                }
            }

            // Operand: first operand becomes the result, later ones are
            // prefix applications at function priority.
            if !self.starts_operand(&token) {
                break;
            }
            match result {
                None => {
                    result = self.parse_operand();
                }
                Some(left) => {
                    let Some(argument) = self.parse_expression(self.syntax.function_priority)
                    else {
                        break;
                    };
                    result = Some(self.arena.alloc(
                        Node::Prefix {
                            left,
                            right: argument,
                        },
                        pos,
                    ));
                }
            }
        }

        result
    }

    fn starts_operand(&self, token: &Token) -> bool {
        matches!(
            token,
            Token::Integer(_)
                | Token::Real(_)
                | Token::Text(_)
                | Token::Quote(_)
                | Token::LongText { .. }
                | Token::Name(_)
                | Token::Symbol(_)
                | Token::ParOpen(_)
                | Token::Indent
        )
    }

    /// One primary: a literal, a name, a block, or a prefix operator and its
    /// operand. Always consumes at least one token.
    fn parse_operand(&mut self) -> Option<NodeId> {
        let Scanned { token, pos, .. } = self.advance();
        match token {
            Token::Integer(value) => Some(self.leaf(Node::Integer(value), pos)),
            Token::Real(value) => Some(self.leaf(Node::Real(value), pos)),
            Token::Text(value) => Some(self.leaf(
                Node::Text {
                    value,
                    opening: "\"".to_owned(),
                    closing: "\"".to_owned(),
                },
                pos,
            )),
            Token::Quote(value) => Some(self.leaf(
                Node::Text {
                    value,
                    opening: "'".to_owned(),
                    closing: "'".to_owned(),
                },
                pos,
            )),
            Token::LongText {
                value,
                opening,
                closing,
            } => Some(self.leaf(
                Node::Text {
                    value,
                    opening,
                    closing,
                },
                pos,
            )),
            Token::ParOpen(open) => Some(self.parse_paren_block(open, pos)),
            Token::Indent => Some(self.parse_indent_block(pos)),
            Token::Name(name) | Token::Symbol(name) => self.parse_named(name, pos),
            // Unreachable through starts_operand, but parse_operand must
            // stay total: skip and give up on this operand.
            _ => None,
        }
    }

    fn parse_named(&mut self, name: String, pos: Position) -> Option<NodeId> {
        // A delimiter with its own child syntax opens a nested region.
        if let Some(child) = self.syntax.child_syntax(&name) {
            let closing = child.closing.clone();
            let table = child.syntax.clone();
            return Some(self.parse_child_region(name, closing, table, pos));
        }

        // Declared prefix: bind the operand at the operator's priority.
        if let Some(priority) = self.syntax.prefix_priority(&name) {
            let head = self.leaf(Node::Name(name), pos);
            return Some(match self.parse_expression(priority) {
                Some(operand) => self.arena.alloc(
                    Node::Prefix {
                        left: head,
                        right: operand,
                    },
                    pos,
                ),
                None => head,
            });
        }

        if self.syntax.infix_priority(&name).is_none()
            && !self.syntax.known_token(&name)
            && name.chars().next().is_some_and(|c| !c.is_alphabetic())
        {
            self.diagnostics
                .error(format!("unknown operator '{name}'"), pos)
                .emit();
        }

        let node = self.leaf(Node::Name(name), pos);
        Some(self.maybe_syntax_directive(node, pos))
    }

    /// `syntax` followed by a block modifies the table for subsequent
    /// tokens: the block is rendered back to text and fed to the loader.
    fn maybe_syntax_directive(&mut self, head: NodeId, pos: Position) -> NodeId {
        let is_directive = matches!(self.arena.node(head), Node::Name(n) if n == "syntax")
            && matches!(self.peek(0).token, Token::ParOpen('{') | Token::Indent);
        if !is_directive {
            return head;
        }
        let block = match self.advance() {
            Scanned {
                token: Token::ParOpen(open),
                pos,
                ..
            } => self.parse_paren_block(open, pos),
            Scanned { pos, .. } => self.parse_indent_block(pos),
        };
        let child = match self.arena.node(block) {
            Node::Block { child, .. } => *child,
            _ => block,
        };
        let text = Renderer::new(self.syntax).render(self.arena, child);
        if let Err(error) = self.syntax.load_source(&text) {
            self.diagnostics
                .error(format!("bad syntax declaration: {error}"), pos)
                .emit();
        }
        self.arena.alloc(
            Node::Prefix {
                left: head,
                right: block,
            },
            pos,
        )
    }

    fn parse_paren_block(&mut self, open: char, pos: Position) -> NodeId {
        let expected = self
            .syntax
            .block_closing(&open.to_string())
            .map(|c| c.to_owned());
        let child = self.parse_expression(i32::MIN);
        let child = child.unwrap_or_else(|| self.empty(pos));
        let closing = loop {
            let Scanned {
                token, pos: at, ..
            } = self.peek(0).clone();
            match token {
                Token::ParClose(close) => {
                    self.advance();
                    let close = close.to_string();
                    if let Some(expected) = &expected
                        && *expected != close
                    {
                        self.diagnostics
                            .error(
                                format!("mismatched delimiter: '{open}' closed by '{close}'"),
                                at,
                            )
                            .emit();
                    }
                    break expected.unwrap_or(close);
                }
                Token::Eof => {
                    self.diagnostics
                        .error(format!("missing closing delimiter for '{open}'"), pos)
                        .emit();
                    break expected.unwrap_or_else(|| open.to_string());
                }
                _ => {
                    // Content the inner expression could not consume.
                    let at = self.peek(0).pos;
                    self.diagnostics
                        .error("unexpected token in block", at)
                        .emit();
                    self.advance();
                }
            }
        };
        self.arena.alloc(
            Node::Block {
                child,
                opening: open.to_string(),
                closing,
            },
            pos,
        )
    }

    fn parse_indent_block(&mut self, pos: Position) -> NodeId {
        let child = self.parse_expression(i32::MIN);
        let child = child.unwrap_or_else(|| self.empty(pos));
        match self.peek(0).token {
            Token::Unindent => {
                self.advance();
            }
            _ => {
                let at = self.peek(0).pos;
                self.diagnostics
                    .error("indented block does not close", at)
                    .emit();
            }
        }
        self.arena.alloc(
            Node::Block {
                child,
                opening: INDENT.to_owned(),
                closing: UNINDENT.to_owned(),
            },
            pos,
        )
    }

    fn parse_child_region(
        &mut self,
        opening: String,
        closing: String,
        table: Syntax,
        pos: Position,
    ) -> NodeId {
        self.child_tables.push(table);
        self.closing_symbols.push(closing.clone());
        let child = self.parse_expression(i32::MIN);
        let child = child.unwrap_or_else(|| self.empty(pos));
        self.closing_symbols.pop();
        self.child_tables.pop();
        match self.peek(0).token.spelling() {
            Some(spelling) if spelling == closing => {
                self.advance();
            }
            _ => {
                let at = self.peek(0).pos;
                self.diagnostics
                    .error(format!("missing closing '{closing}'"), at)
                    .emit();
            }
        }
        self.arena.alloc(
            Node::Block {
                child,
                opening,
                closing,
            },
            pos,
        )
    }
}
