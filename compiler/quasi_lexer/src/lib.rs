//! Host-language tokenizer for the quasiquote rewriter.
//!
//! The tokenizer follows the host's own lexical rules closely enough that a
//! rewritten module tokenizes the way the host will tokenize it, and adds
//! what the host tokenizer cannot do:
//!
//! - the `$` quote marker is a token of its own ([`TokenKind::Marker`]);
//! - [`Lexer::take_indented_block`] and [`Lexer::take_until`] capture
//!   foreign code as raw text, so quoted bodies never need to be valid host
//!   tokens.
//!
//! Scanning runs over a sentinel-terminated [`SourceBuffer`] through a
//! [`Cursor`], so end of input is detected without bounds checks.

mod cursor;
mod error;
mod lexer;
mod literal;
mod source_buffer;
mod token;

pub use cursor::Cursor;
pub use error::LexError;
pub use lexer::{tokenize, Lexer, RawText};
pub use literal::{quote_literal, unquote_literal};
pub use source_buffer::SourceBuffer;
pub use token::{Position, Token, TokenKind};
