//! Scanner for XL source text.
//!
//! Five families of tokens: numbers (integer and real, any base via `#`),
//! names (Unicode-alphabetic start, single `_` joins words), text (single or
//! double quotes, or long text with delimiters from the syntax table),
//! symbols (maximal punctuation runs; the six bracket characters stand
//! alone), and layout (newline, indent, unindent).
//!
//! Indentation is significant and surfaces as `Indent`/`Unindent` tokens,
//! one `Unindent` per level closed. Inside brackets, newlines and indent
//! transitions are plain whitespace. Comments and long-text delimiters are
//! not hardwired: the scanner consults the syntax table at every token.
//!
//! The scanner never fails: lexical problems become [`Token::Error`] with a
//! message, and scanning resumes at the next plausible boundary.

use std::collections::VecDeque;

use xl_core::Position;

use crate::syntax::Syntax;

/// One scanned token. Values are already decoded: quotes unescaped, numbers
/// parsed, names and symbols carrying their exact source text.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Integer(i64),
    Real(f64),
    /// Double-quoted text.
    Text(String),
    /// Single-quoted text, the character-like flavor.
    Quote(String),
    /// Text with delimiters declared in the syntax table.
    LongText {
        value: String,
        opening: String,
        closing: String,
    },
    Name(String),
    Symbol(String),
    Newline,
    ParOpen(char),
    ParClose(char),
    Indent,
    Unindent,
    Eof,
    Error(String),
}

impl Token {
    /// Source spelling for names and symbols, used by the syntax loader.
    pub fn spelling(&self) -> Option<&str> {
        match self {
            Token::Name(text) | Token::Symbol(text) => Some(text),
            _ => None,
        }
    }
}

/// Strip a UTF-8 BOM and normalize CRLF / CR line endings to LF.
pub fn normalize(source: &str) -> String {
    let source = source.strip_prefix('\u{FEFF}').unwrap_or(source);
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\r' {
            if chars.peek() == Some(&'\n') {
                chars.next();
            }
            out.push('\n');
        } else {
            out.push(c);
        }
    }
    out
}

fn is_name_start(c: char) -> bool {
    c.is_alphabetic()
}

fn is_name_continue(c: char) -> bool {
    c.is_alphanumeric()
}

fn is_symbol_char(c: char) -> bool {
    !c.is_alphanumeric()
        && !c.is_whitespace()
        && !matches!(c, '"' | '\'' | '(' | ')' | '[' | ']' | '{' | '}')
}

/// Tokenizer over one normalized source text.
pub struct Scanner {
    source: String,
    pos: usize,
    base: Position,
    indents: Vec<u32>,
    indent_char: Option<char>,
    paren_depth: u32,
    pending: VecDeque<(Token, Position)>,
    token_pos: Position,
    spaced_before: bool,
    at_file_start: bool,
}

impl Scanner {
    /// Create a scanner over normalized source; `base` is the global offset
    /// this file's positions start at (see [`xl_core::Positions::open_file`]).
    pub fn new(source: String, base: Position) -> Self {
        Self {
            source,
            pos: 0,
            base,
            indents: vec![0],
            indent_char: None,
            paren_depth: 0,
            pending: VecDeque::new(),
            token_pos: base,
            spaced_before: false,
            at_file_start: true,
        }
    }

    /// The normalized source under scan.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Current byte offset into the source.
    pub fn offset(&self) -> usize {
        self.pos
    }

    /// Global position of the most recently returned token.
    pub fn position(&self) -> Position {
        self.token_pos
    }

    /// Whether whitespace preceded the most recently returned token.
    pub fn had_space_before(&self) -> bool {
        self.spaced_before
    }

    fn rest(&self) -> &str {
        &self.source[self.pos..]
    }

    fn peek_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn mark_token(&mut self) {
        self.token_pos = self.base + self.pos as Position;
    }

    /// Scan the next token, consulting `syntax` for comments, long text and
    /// known symbols.
    pub fn next_token(&mut self, syntax: &Syntax) -> Token {
        if let Some((token, pos)) = self.pending.pop_front() {
            self.token_pos = pos;
            return token;
        }

        self.spaced_before = false;
        if self.at_file_start {
            // The first line goes through the same indentation bookkeeping
            // as any other, except that staying at column zero is not a
            // statement separator.
            self.at_file_start = false;
            self.mark_token();
            match self.line_break(syntax) {
                Token::Newline => {}
                token => return token,
            }
        }

        loop {
            while matches!(self.peek_char(), Some(' ' | '\t')) {
                self.bump();
                self.spaced_before = true;
            }

            self.mark_token();
            let Some(c) = self.peek_char() else {
                return self.finish_input();
            };

            match c {
                '\n' => {
                    self.bump();
                    self.spaced_before = true;
                    if self.paren_depth > 0 {
                        continue;
                    }
                    self.mark_token();
                    return self.line_break(syntax);
                }
                '0'..='9' => return self.number(),
                '"' | '\'' => return self.quoted(c),
                '(' | '[' | '{' => {
                    self.bump();
                    self.paren_depth += 1;
                    return Token::ParOpen(c);
                }
                ')' | ']' | '}' => {
                    self.bump();
                    self.paren_depth = self.paren_depth.saturating_sub(1);
                    return Token::ParClose(c);
                }
                c if is_name_start(c) => {
                    if self.skip_comment(syntax) {
                        continue;
                    }
                    return self.name();
                }
                c if is_symbol_char(c) => {
                    if self.skip_comment(syntax) {
                        continue;
                    }
                    if let Some(token) = self.long_text(syntax) {
                        return token;
                    }
                    return self.symbol();
                }
                c => {
                    self.bump();
                    return Token::Error(format!("invalid character '{c}'"));
                }
            }
        }
    }

    fn finish_input(&mut self) -> Token {
        while self.indents.len() > 1 {
            self.indents.pop();
            self.pending.push_back((Token::Unindent, self.token_pos));
        }
        self.pending.push_back((Token::Eof, self.token_pos));
        let (token, pos) = self.pending.pop_front().expect("queued above");
        self.token_pos = pos;
        token
    }

    /// Handle a line break outside brackets: skip blank and comment-only
    /// lines, then compare the new indentation column against the stack.
    fn line_break(&mut self, syntax: &Syntax) -> Token {
        loop {
            let mut col = 0u32;
            let mut seen_space = false;
            let mut seen_tab = false;
            while let Some(c @ (' ' | '\t')) = self.peek_char() {
                if c == ' ' {
                    seen_space = true;
                } else {
                    seen_tab = true;
                }
                col += 1;
                self.bump();
            }

            // Comment-only lines do not contribute indentation.
            while self.skip_comment(syntax) {}

            match self.peek_char() {
                Some('\n') => {
                    self.bump();
                    continue;
                }
                None => return self.finish_input(),
                _ => {}
            }

            self.mark_token();
            if seen_space && seen_tab {
                return Token::Error("indentation mixes tabs and spaces".to_owned());
            }
            if col > 0 {
                let used = if seen_tab { '\t' } else { ' ' };
                match self.indent_char {
                    None => self.indent_char = Some(used),
                    Some(first) if first != used => {
                        return Token::Error(
                            "indentation mixes tabs and spaces".to_owned(),
                        );
                    }
                    _ => {}
                }
            }

            let top = *self.indents.last().expect("indent stack never empty");
            if col > top {
                self.indents.push(col);
                return Token::Indent;
            }
            if col == top {
                return Token::Newline;
            }
            while *self.indents.last().expect("indent stack never empty") > col {
                self.indents.pop();
                self.pending.push_back((Token::Unindent, self.token_pos));
            }
            if *self.indents.last().expect("indent stack never empty") < col {
                // Dedent to a column never opened; adopt it rather than fail.
                self.indents.push(col);
            }
            self.pending.push_back((Token::Newline, self.token_pos));
            let (token, pos) = self.pending.pop_front().expect("queued above");
            self.token_pos = pos;
            return token;
        }
    }

    /// If the input starts a comment per the syntax table, skip it and
    /// return true. A `"\n"` end marker skips to (not through) end of line.
    fn skip_comment(&mut self, syntax: &Syntax) -> bool {
        let Some((opening, closing)) = syntax.comment_at(self.rest()) else {
            return false;
        };
        self.pos += opening.len();
        if closing == "\n" {
            while !matches!(self.peek_char(), Some('\n') | None) {
                self.bump();
            }
        } else {
            match self.rest().find(&closing) {
                Some(at) => self.pos += at + closing.len(),
                None => self.pos = self.source.len(),
            }
        }
        true
    }

    /// Long text with delimiters from the syntax table; doubling the closing
    /// delimiter escapes it.
    fn long_text(&mut self, syntax: &Syntax) -> Option<Token> {
        let (opening, closing) = syntax.text_delimiter_at(self.rest())?;
        self.pos += opening.len();
        let mut value = String::new();
        loop {
            if self.rest().is_empty() {
                return Some(Token::Error(format!(
                    "end of input in the middle of '{opening}' text"
                )));
            }
            if self.rest().starts_with(&closing) {
                self.pos += closing.len();
                if self.rest().starts_with(&closing) {
                    self.pos += closing.len();
                    value.push_str(&closing);
                    continue;
                }
                return Some(Token::LongText {
                    value,
                    opening,
                    closing,
                });
            }
            value.push(self.bump().expect("rest is non-empty"));
        }
    }

    fn quoted(&mut self, quote: char) -> Token {
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek_char() {
                None | Some('\n') => {
                    return Token::Error("end of line in the middle of a text".to_owned());
                }
                Some(c) if c == quote => {
                    self.bump();
                    if self.peek_char() == Some(quote) {
                        self.bump();
                        value.push(quote);
                        continue;
                    }
                    let text = value;
                    return if quote == '\'' {
                        Token::Quote(text)
                    } else {
                        Token::Text(text)
                    };
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
    }

    fn name(&mut self) -> Token {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if is_name_continue(c) {
                self.bump();
            } else if c == '_' {
                // A single underscore joins words; two in a row end the name.
                let mut lookahead = self.rest().chars();
                lookahead.next();
                match lookahead.next() {
                    Some(next) if is_name_continue(next) => {
                        self.bump();
                        self.bump();
                    }
                    _ => break,
                }
            } else {
                break;
            }
        }
        Token::Name(self.source[start..self.pos].to_owned())
    }

    /// Maximal punctuation run: `--` is one token, `---X` is `---` then `X`.
    fn symbol(&mut self) -> Token {
        let start = self.pos;
        while matches!(self.peek_char(), Some(c) if is_symbol_char(c)) {
            self.bump();
        }
        Token::Symbol(self.source[start..self.pos].to_owned())
    }

    fn number(&mut self) -> Token {
        let mut base = 10u32;
        let Some(mut integral) = self.digits(base) else {
            return Token::Error("integer literal overflows".to_owned());
        };

        // Base prefix: 16#FF, 2#1010
        if self.peek_char() == Some('#')
            && self
                .rest()
                .chars()
                .nth(1)
                .is_some_and(|c| c.is_ascii_alphanumeric())
        {
            match u32::try_from(integral) {
                Ok(b @ 2..=36) => base = b,
                _ => return Token::Error(format!("invalid numeric base {integral}")),
            }
            self.bump();
            if self
                .peek_char()
                .and_then(|c| c.to_digit(base))
                .is_none()
            {
                return Token::Error(format!("missing digits after base {base}"));
            }
            match self.digits(base) {
                Some(value) => integral = value,
                None => return Token::Error("integer literal overflows".to_owned()),
            }
        }

        // Fraction
        let mut fraction = 0.0f64;
        let mut is_real = false;
        if self.peek_char() == Some('.')
            && self
                .rest()
                .chars()
                .nth(1)
                .is_some_and(|c| c.to_digit(base).is_some())
        {
            self.bump();
            is_real = true;
            let mut scale = 1.0f64;
            while let Some(c) = self.peek_char() {
                if let Some(digit) = c.to_digit(base) {
                    self.bump();
                    scale /= base as f64;
                    fraction += digit as f64 * scale;
                } else if c == '_'
                    && self
                        .rest()
                        .chars()
                        .nth(1)
                        .is_some_and(|c| c.to_digit(base).is_some())
                {
                    self.bump();
                } else {
                    break;
                }
            }
        }

        // Exponent: a power of the base, optionally after a second '#'
        // (needed when E is a digit of the base, as in 16#FF#E2).
        let mut exponent = 0i32;
        let mut has_exponent = false;
        let mut probe = self.rest().chars();
        let mut exp_prefix = 0;
        if let Some('#') = probe.clone().next() {
            probe.next();
            exp_prefix = 1;
        }
        if matches!(probe.next(), Some('E' | 'e')) {
            let mut negative = false;
            let mut digits = probe.clone();
            let mut exp_len = exp_prefix + 1;
            if matches!(digits.clone().next(), Some('-' | '+')) {
                negative = digits.next() == Some('-');
                exp_len += 1;
            }
            if digits.clone().next().is_some_and(|c| c.is_ascii_digit()) {
                has_exponent = true;
                self.pos += exp_len;
                let mut value = 0i32;
                while let Some(c) = self.peek_char() {
                    if let Some(digit) = c.to_digit(10) {
                        self.bump();
                        value = value.saturating_mul(10).saturating_add(digit as i32);
                    } else {
                        break;
                    }
                }
                exponent = if negative { -value } else { value };
            }
        }

        if is_real || exponent < 0 {
            let mut value = integral as f64 + fraction;
            if has_exponent {
                value *= (base as f64).powi(exponent);
            }
            return Token::Real(value);
        }

        let mut value = match i64::try_from(integral) {
            Ok(value) => value,
            Err(_) => return Token::Error("integer literal overflows".to_owned()),
        };
        for _ in 0..exponent {
            match value.checked_mul(base as i64) {
                Some(next) => value = next,
                None => return Token::Error("integer literal overflows".to_owned()),
            }
        }
        Token::Integer(value)
    }

    /// Scan digits of `base` with single `_` grouping; `None` on overflow.
    fn digits(&mut self, base: u32) -> Option<u64> {
        let mut value = 0u64;
        while let Some(c) = self.peek_char() {
            if let Some(digit) = c.to_digit(base) {
                self.bump();
                value = value
                    .checked_mul(base as u64)?
                    .checked_add(digit as u64)?;
            } else if c == '_'
                && self
                    .rest()
                    .chars()
                    .nth(1)
                    .is_some_and(|c| c.to_digit(base).is_some())
            {
                self.bump();
            } else {
                break;
            }
        }
        Some(value)
    }
}
