//! Host string literal encoding and decoding.
//!
//! [`quote_literal`] renders arbitrary text as a double-quoted host literal
//! that stays on one physical line; [`unquote_literal`] cooks the text of a
//! `String` token back into its value.

use std::fmt::Write as _;

use crate::LexError;

/// Render `text` as a double-quoted single-line host string literal.
pub fn quote_literal(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_ascii_control() => {
                let _ = write!(out, "\\x{:02x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Cook the source text of a host string literal into its value.
///
/// Accepts any prefix combination the tokenizer accepts and both single and
/// triple quotes. Unknown escapes are kept verbatim, as the host does.
pub fn unquote_literal(token: &str) -> Result<String, LexError> {
    let quote_at = token
        .find(['"', '\''])
        .ok_or_else(|| invalid(format!("{token:?} has no opening quote")))?;
    let (prefix, quoted) = token.split_at(quote_at);
    let raw = prefix.to_ascii_lowercase().contains('r');

    let delim = if quoted.starts_with("\"\"\"") || quoted.starts_with("'''") {
        &quoted[..3]
    } else {
        &quoted[..1]
    };
    let body = quoted
        .strip_prefix(delim)
        .and_then(|rest| rest.strip_suffix(delim))
        .filter(|_| quoted.len() >= 2 * delim.len())
        .ok_or_else(|| invalid(format!("{token:?} is not closed by {delim}")))?;

    if raw {
        return Ok(body.to_owned());
    }
    cook(body)
}

fn cook(body: &str) -> Result<String, LexError> {
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        let Some(esc) = chars.next() else {
            return Err(invalid("trailing backslash".to_owned()));
        };
        match esc {
            '\n' => {}
            '\r' => {
                chars.next_if_eq(&'\n');
            }
            '\\' => out.push('\\'),
            '\'' => out.push('\''),
            '"' => out.push('"'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'n' => out.push('\n'),
            'r' => out.push('\r'),
            't' => out.push('\t'),
            'v' => out.push('\x0b'),
            '0'..='7' => {
                let mut value = esc.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.peek().and_then(|c| c.to_digit(8)) {
                        Some(d) => {
                            value = value * 8 + d;
                            chars.next();
                        }
                        None => break,
                    }
                }
                out.push(char_from(value)?);
            }
            'x' => out.push(hex_escape(&mut chars, 2)?),
            'u' => out.push(hex_escape(&mut chars, 4)?),
            'U' => out.push(hex_escape(&mut chars, 8)?),
            other => {
                out.push('\\');
                out.push(other);
            }
        }
    }
    Ok(out)
}

fn hex_escape(chars: &mut impl Iterator<Item = char>, digits: usize) -> Result<char, LexError> {
    let mut value = 0u32;
    for _ in 0..digits {
        let digit = chars
            .next()
            .and_then(|c| c.to_digit(16))
            .ok_or_else(|| invalid(format!("truncated \\x escape, expected {digits} hex digits")))?;
        value = value * 16 + digit;
    }
    char_from(value)
}

fn char_from(value: u32) -> Result<char, LexError> {
    char::from_u32(value).ok_or_else(|| invalid(format!("escape value {value:#x} is not a character")))
}

fn invalid(message: String) -> LexError {
    LexError::InvalidLiteral { message }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
mod tests;
