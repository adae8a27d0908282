//! Indentation-aware host tokenizer.
//!
//! Produces the host's token stream one token at a time: names, numbers,
//! strings, operators, comments, logical and non-logical newlines, and the
//! synthetic `Indent`/`Dedent`/`EndMarker` tokens. Besides the ordinary
//! stream it offers two raw capture modes that hand back untokenized source
//! text, which is how quoted foreign code gets through without the host
//! grammar ever seeing it:
//!
//! - [`Lexer::take_indented_block`] captures the indented region following
//!   a block header line;
//! - [`Lexer::take_until`] captures everything up to a fixed closing
//!   sequence.

use smallvec::{smallvec, SmallVec};

use crate::{Cursor, LexError, Position, SourceBuffer, Token, TokenKind};

/// Tab stops used when measuring indentation.
const TAB_WIDTH: u32 = 8;

/// Operators, longest first within each length class.
const OPS_3: [&str; 5] = ["**=", "//=", ">>=", "<<=", "..."];
const OPS_2: [&str; 19] = [
    "**", "//", "<<", ">>", "<=", ">=", "==", "!=", "->", ":=", "+=", "-=", "*=", "/=", "%=",
    "&=", "|=", "^=", "@=",
];
const OPS_1: &[u8] = b"()[]{}:,;.+-*/%&|^~<>=@!";

/// Untokenized source text captured by a raw mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RawText<'a> {
    pub text: &'a str,
    pub start: Position,
    pub end: Position,
}

/// Host tokenizer over a [`SourceBuffer`].
pub struct Lexer<'a> {
    cursor: Cursor<'a>,
    /// 1-based number of the line that begins at `line_start`.
    line: u32,
    line_start: u32,
    indents: SmallVec<[u32; 8]>,
    /// Bracket nesting depth; newlines inside brackets are not logical.
    depth: u32,
    at_line_start: bool,
    line_has_content: bool,
    pending_dedents: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(buf: &'a SourceBuffer) -> Self {
        Self {
            cursor: buf.cursor(),
            line: 1,
            line_start: 0,
            indents: smallvec![0],
            depth: 0,
            at_line_start: true,
            line_has_content: false,
            pending_dedents: 0,
        }
    }

    /// Produce the next token.
    ///
    /// After the `EndMarker` every further call returns another `EndMarker`.
    pub fn next_token(&mut self) -> Result<Token<'a>, LexError> {
        loop {
            if self.pending_dedents > 0 {
                self.pending_dedents -= 1;
                let here = self.here();
                return Ok(self.make(TokenKind::Dedent, here));
            }
            if self.at_line_start {
                self.at_line_start = false;
                if self.depth == 0 {
                    if let Some(token) = self.indentation()? {
                        return Ok(token);
                    }
                }
            }

            self.cursor.eat_whitespace();
            let start = self.here();
            let token = match self.cursor.current() {
                0 if self.cursor.is_eof() => return Ok(self.end_of_input()),
                b'#' => {
                    // Comments never make a line logical.
                    self.cursor.eat_until_newline_or_eof();
                    return Ok(self.make(TokenKind::Comment, start));
                }
                b'\\' if self.at_line_break(self.cursor.pos() + 1) => {
                    // Explicit line joining: the next line continues this one.
                    self.cursor.advance();
                    self.eat_line_break();
                    self.newline_seen();
                    continue;
                }
                b'\r' if self.cursor.peek() != b'\n' => {
                    // Lone carriage return is horizontal whitespace.
                    self.cursor.advance();
                    continue;
                }
                b'\n' | b'\r' => return Ok(self.line_break(start)),
                b'$' => {
                    self.cursor.advance();
                    self.make(TokenKind::Marker, start)
                }
                b'0'..=b'9' => {
                    self.number();
                    self.make(TokenKind::Number, start)
                }
                b'.' if self.cursor.peek().is_ascii_digit() => {
                    self.number();
                    self.make(TokenKind::Number, start)
                }
                b'"' | b'\'' => {
                    self.string(start)?;
                    self.make(TokenKind::String, start)
                }
                c if is_ident_start(c) => self.name_or_string(start)?,
                _ => self.operator(start)?,
            };
            self.line_has_content = true;
            return Ok(token);
        }
    }

    /// Capture the indented region that follows a block header.
    ///
    /// Must be called right after the header's `Newline` token. Returns the
    /// raw physical lines of the region, or `None` (consuming nothing) when
    /// the next non-blank line is not indented deeper than the header.
    ///
    /// Blank lines and comment lines indented shallower than the region do
    /// not end it; when they trail the region they are left for the ordinary
    /// token stream. The tokenizer resumes at the first line after the
    /// region with the header's indentation level still on top of the stack,
    /// so the region never produces `Indent`/`Dedent` tokens.
    pub fn take_indented_block(&mut self) -> Option<RawText<'a>> {
        debug_assert!(self.at_line_start, "raw block must start at a line start");
        let outer = self.indents.last().copied().unwrap_or(0);
        let block_start = self.cursor.pos();
        let source_len = self.cursor.source_len();

        let mut body_indent = None;
        let mut end = block_start;
        let mut offset = block_start;
        while offset < source_len {
            let line_end = self.cursor.line_end_from(offset);
            let (width, first) = self.measure_indent(offset);
            let blank = matches!(first, b'\n' | b'\r' | 0);
            let comment = first == b'#';
            let tentative = blank
                || (comment && (width <= outer || body_indent.is_some_and(|bi| width < bi)));
            if !tentative {
                if width <= outer {
                    break;
                }
                if body_indent.is_none() {
                    body_indent = Some(width);
                }
                end = line_end;
            }
            offset = line_end;
        }
        if body_indent.is_none() {
            return None;
        }

        let start = self.here();
        let text = self.cursor.slice(block_start, end);
        self.cursor.set_pos(end);
        self.bump_lines(block_start, end);
        self.at_line_start = true;
        self.line_has_content = false;
        Some(RawText {
            text,
            start,
            end: self.here(),
        })
    }

    /// Capture raw text up to the next occurrence of `close`.
    ///
    /// On success the cursor moves past `close`; brackets inside `close`
    /// count toward the nesting depth as if they had been tokenized. Returns
    /// `None` (consuming nothing) if `close` never occurs.
    pub fn take_until(&mut self, close: &str) -> Option<RawText<'a>> {
        let from = self.cursor.pos();
        let at = self.cursor.find(close.as_bytes())?;
        let close_len = u32::try_from(close.len()).ok()?;

        let start = self.here();
        let text = self.cursor.slice(from, at);
        self.bump_lines(from, at);
        let end = self.position_at(at);
        self.cursor.set_pos(at + close_len);
        self.bump_lines(at, at + close_len);

        for byte in close.bytes() {
            match byte {
                b'(' | b'[' | b'{' => self.depth += 1,
                b')' | b']' | b'}' => self.depth = self.depth.saturating_sub(1),
                _ => {}
            }
        }
        self.line_has_content = true;
        Some(RawText { text, start, end })
    }

    /// Current source position.
    pub fn here(&self) -> Position {
        self.position_at(self.cursor.pos())
    }

    // ─── Line structure ─────────────────────────────────────────────

    /// Handle indentation at the start of a logical line.
    fn indentation(&mut self) -> Result<Option<Token<'a>>, LexError> {
        let line_begin = self.here();
        let (width, first) = self.measure_indent(self.cursor.pos());
        if matches!(first, b'#' | b'\n' | b'\r' | 0) {
            // Blank and comment-only lines never change indentation.
            return Ok(None);
        }
        self.cursor.eat_whitespace();

        let top = self.indents.last().copied().unwrap_or(0);
        if width > top {
            self.indents.push(width);
            return Ok(Some(self.make(TokenKind::Indent, line_begin)));
        }
        if width < top {
            let mut popped = 0;
            while self.indents.last().is_some_and(|&level| level > width) {
                self.indents.pop();
                popped += 1;
            }
            let here = self.here();
            if self.indents.last().copied().unwrap_or(0) != width {
                return Err(LexError::InconsistentDedent { pos: here });
            }
            self.pending_dedents = popped - 1;
            return Ok(Some(self.make(TokenKind::Dedent, here)));
        }
        Ok(None)
    }

    /// Measure the indentation width of the line starting at `offset`.
    ///
    /// Returns the width and the first byte after the indentation.
    fn measure_indent(&self, offset: u32) -> (u32, u8) {
        let mut width = 0;
        let mut at = offset;
        loop {
            match self.cursor.byte_at(at) {
                b' ' => width += 1,
                b'\t' => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                0x0C => width = 0,
                other => return (width, other),
            }
            at += 1;
        }
    }

    fn line_break(&mut self, start: Position) -> Token<'a> {
        self.eat_line_break();
        let kind = if self.depth == 0 && self.line_has_content {
            self.line_has_content = false;
            TokenKind::Newline
        } else {
            TokenKind::Nl
        };
        let token = self.make(kind, start);
        self.newline_seen();
        self.at_line_start = true;
        token
    }

    fn end_of_input(&mut self) -> Token<'a> {
        let here = self.here();
        if self.line_has_content {
            self.line_has_content = false;
            return self.make(TokenKind::Newline, here);
        }
        if self.indents.len() > 1 {
            self.indents.pop();
            return self.make(TokenKind::Dedent, here);
        }
        self.make(TokenKind::EndMarker, here)
    }

    fn at_line_break(&self, offset: u32) -> bool {
        match self.cursor.byte_at(offset) {
            b'\n' => true,
            b'\r' => self.cursor.byte_at(offset + 1) == b'\n',
            _ => false,
        }
    }

    fn eat_line_break(&mut self) {
        if self.cursor.current() == b'\r' {
            self.cursor.advance();
        }
        if self.cursor.current() == b'\n' {
            self.cursor.advance();
        }
    }

    /// Record that the cursor just moved past a line break.
    fn newline_seen(&mut self) {
        self.line += 1;
        self.line_start = self.cursor.pos();
    }

    /// Account for every line break in `start..end`.
    #[allow(
        clippy::cast_possible_truncation,
        reason = "offsets are bounded by source_len which fits in u32"
    )]
    fn bump_lines(&mut self, start: u32, end: u32) {
        let text = self.cursor.slice(start, end);
        for i in memchr::memchr_iter(b'\n', text.as_bytes()) {
            self.line += 1;
            self.line_start = start + i as u32 + 1;
        }
    }

    #[allow(
        clippy::cast_possible_truncation,
        reason = "a line never holds more than u32::MAX characters"
    )]
    fn position_at(&self, offset: u32) -> Position {
        let column = self.cursor.slice(self.line_start, offset).chars().count() as u32;
        Position {
            offset,
            line: self.line,
            column,
        }
    }

    fn make(&self, kind: TokenKind, start: Position) -> Token<'a> {
        let line_start = self.cursor.line_start_of(start.offset);
        let line_end = self.cursor.line_end_from(start.offset);
        Token {
            kind,
            text: self.cursor.slice_from(start.offset),
            start,
            end: self.here(),
            line: self.cursor.slice(line_start, line_end),
        }
    }

    // ─── Tokens ─────────────────────────────────────────────────────

    fn name_or_string(&mut self, start: Position) -> Result<Token<'a>, LexError> {
        self.cursor.eat_while(is_ident_continue);
        let text = self.cursor.slice_from(start.offset);
        if matches!(self.cursor.current(), b'"' | b'\'') && is_string_prefix(text) {
            self.string(start)?;
            return Ok(self.make(TokenKind::String, start));
        }
        Ok(self.make(TokenKind::Name, start))
    }

    fn number(&mut self) {
        let start = self.cursor.pos();
        loop {
            let c = self.cursor.current();
            if matches!(c, b'e' | b'E') && matches!(self.cursor.peek(), b'+' | b'-') {
                let hex = self.cursor.slice_from(start).starts_with("0x")
                    || self.cursor.slice_from(start).starts_with("0X");
                if !hex {
                    self.cursor.advance_n(2);
                    continue;
                }
            }
            if c.is_ascii_alphanumeric() || c == b'_' || c == b'.' {
                self.cursor.advance();
            } else {
                break;
            }
        }
    }

    /// Scan a string literal whose opening quote is at the cursor.
    fn string(&mut self, start: Position) -> Result<(), LexError> {
        let quote = self.cursor.current();
        let triple = self.cursor.peek() == quote && self.cursor.peek2() == quote;
        self.cursor.advance_n(if triple { 3 } else { 1 });
        let body_start = self.cursor.pos();

        loop {
            match self.cursor.current() {
                0 if self.cursor.is_eof() => {
                    return Err(LexError::UnterminatedString { pos: start });
                }
                b'\\' => {
                    self.cursor.advance();
                    if self.at_line_break(self.cursor.pos()) {
                        self.eat_line_break();
                    } else if !self.cursor.is_eof() {
                        self.cursor.advance_char();
                    }
                }
                c if c == quote => {
                    if !triple {
                        self.cursor.advance();
                        break;
                    }
                    if self.cursor.peek() == quote && self.cursor.peek2() == quote {
                        self.cursor.advance_n(3);
                        break;
                    }
                    self.cursor.advance();
                }
                b'\n' | b'\r' if !triple => {
                    return Err(LexError::UnterminatedString { pos: start });
                }
                _ => self.cursor.advance_char(),
            }
        }
        self.bump_lines(body_start, self.cursor.pos());
        Ok(())
    }

    fn operator(&mut self, start: Position) -> Result<Token<'a>, LexError> {
        let rest = self.cursor.slice(start.offset, start.offset + 3);
        let len = if OPS_3.iter().any(|op| rest.starts_with(op)) {
            3
        } else if OPS_2.iter().any(|op| rest.starts_with(op)) {
            2
        } else if OPS_1.contains(&self.cursor.current()) {
            1
        } else {
            let width = Cursor::utf8_char_width(self.cursor.current());
            let ch = self
                .cursor
                .slice(start.offset, start.offset + width)
                .chars()
                .next()
                .unwrap_or(char::REPLACEMENT_CHARACTER);
            return Err(LexError::UnexpectedChar { pos: start, ch });
        };

        match self.cursor.current() {
            b'(' | b'[' | b'{' => self.depth += 1,
            b')' | b']' | b'}' => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        self.cursor.advance_n(len);
        Ok(self.make(TokenKind::Op, start))
    }
}

/// Tokenize a whole buffer, up to and including the `EndMarker`.
pub fn tokenize(buf: &SourceBuffer) -> Result<Vec<Token<'_>>, LexError> {
    let mut lexer = Lexer::new(buf);
    let mut tokens = Vec::new();
    loop {
        let token = lexer.next_token()?;
        let done = token.kind == TokenKind::EndMarker;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

#[inline]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b >= 0x80
}

#[inline]
fn is_ident_continue(b: u8) -> bool {
    is_ident_start(b) || b.is_ascii_digit()
}

fn is_string_prefix(text: &str) -> bool {
    matches!(
        text.to_ascii_lowercase().as_str(),
        "r" | "u" | "b" | "f" | "br" | "rb" | "fr" | "rf"
    )
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
mod tests;
