//! Token types produced by the host tokenizer.

use std::fmt;

/// Category of a host token.
///
/// The categories follow the host language's own tokenizer so a rewritten
/// file lexes the same way the host will lex it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Identifier or keyword.
    Name,
    /// Numeric literal.
    Number,
    /// String literal, including any prefix and the quotes.
    String,
    /// Operator or delimiter.
    Op,
    /// The quote marker `$`. Not valid host syntax on its own.
    Marker,
    /// `#` comment up to (not including) the end of the line.
    Comment,
    /// End of a logical line.
    Newline,
    /// Newline that does not end a logical line (blank line, inside brackets).
    Nl,
    /// Indentation increased.
    Indent,
    /// Indentation decreased by one level.
    Dedent,
    /// End of input.
    EndMarker,
}

impl TokenKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Name => "NAME",
            Self::Number => "NUMBER",
            Self::String => "STRING",
            Self::Op => "OP",
            Self::Marker => "MARKER",
            Self::Comment => "COMMENT",
            Self::Newline => "NEWLINE",
            Self::Nl => "NL",
            Self::Indent => "INDENT",
            Self::Dedent => "DEDENT",
            Self::EndMarker => "ENDMARKER",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A location in the source.
///
/// `line` is 1-based. `column` counts characters (not bytes) from the start
/// of the physical line, 0-based, which is what foreign compilers report
/// against once a `#line` directive points them at the host file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Position {
    /// Byte offset into the source.
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column + 1)
    }
}

/// A host token borrowing from its [`SourceBuffer`](crate::SourceBuffer).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Token<'a> {
    pub kind: TokenKind,
    /// Exact source text of the token.
    pub text: &'a str,
    pub start: Position,
    pub end: Position,
    /// Raw text of the physical line the token starts on, newline included.
    pub line: &'a str,
}

impl Token<'_> {
    /// Check category and text together.
    #[inline]
    pub fn is(&self, kind: TokenKind, text: &str) -> bool {
        self.kind == kind && self.text == text
    }

    #[inline]
    pub fn is_op(&self, text: &str) -> bool {
        self.is(TokenKind::Op, text)
    }

    /// Length of the token in bytes.
    #[inline]
    pub fn len(&self) -> u32 {
        self.end.offset - self.start.offset
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
