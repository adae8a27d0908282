//! Per-file opt-in through an encoding declaration.
//!
//! A module opts into rewriting with an encoding declaration naming
//! [`PRAGMA_ENCODING`] on its first or second line, in any of the forms the
//! host accepts:
//!
//! ```text
//! # coding: quasiquotes
//! # -*- coding: quasiquotes -*-
//! # vim: set fileencoding=quasiquotes :
//! ```
//!
//! The second line is only consulted when the first is blank or a comment.

/// Encoding name that enables rewriting.
pub const PRAGMA_ENCODING: &str = "quasiquotes";

/// Whether `source` opts into quasiquote rewriting.
pub fn is_enabled(source: &str) -> bool {
    let source = source.strip_prefix('\u{feff}').unwrap_or(source);
    for line in source.lines().take(2) {
        if let Some(encoding) = declared_encoding(line) {
            return encoding.eq_ignore_ascii_case(PRAGMA_ENCODING);
        }
        let trimmed = line.trim_start_matches([' ', '\t', '\x0c']);
        if !(trimmed.is_empty() || trimmed.starts_with('#')) {
            return false;
        }
    }
    false
}

/// The encoding named by a declaration comment on `line`, if any.
fn declared_encoding(line: &str) -> Option<&str> {
    let mut rest = line
        .trim_start_matches([' ', '\t', '\x0c'])
        .strip_prefix('#')?;
    while let Some(at) = rest.find("coding") {
        rest = &rest[at + "coding".len()..];
        let Some(value) = rest.strip_prefix([':', '=']) else {
            continue;
        };
        let value = value.trim_start_matches([' ', '\t']);
        let end = value
            .find(|c: char| !(c.is_alphanumeric() || matches!(c, '-' | '_' | '.')))
            .unwrap_or(value.len());
        if end > 0 {
            return Some(&value[..end]);
        }
    }
    None
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
