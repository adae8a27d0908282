use quasi_lexer::{LexError, Position};

/// Errors that make a module impossible to rewrite.
///
/// Both variants are fatal for the module being rewritten; no partial output
/// is produced.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RewriteError {
    /// A quote marker not followed by a well-formed site. Positioned at the
    /// site's opening token (`with` or `[`).
    #[error("{pos}: invalid quote site: {message}")]
    Syntax {
        pos: Position,
        message: String,
        /// Physical line the site starts on.
        line: String,
    },

    #[error(transparent)]
    Lex(#[from] LexError),
}

impl RewriteError {
    pub(crate) fn syntax(pos: Position, line: &str, message: impl Into<String>) -> Self {
        Self::Syntax {
            pos,
            message: message.into(),
            line: line.trim_end_matches(['\n', '\r']).to_owned(),
        }
    }

    /// Source position of the error, when it has one.
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::Syntax { pos, .. } => Some(*pos),
            Self::Lex(err) => err.position(),
        }
    }
}
