use crate::Position;

/// Errors raised while tokenizing host source or cooking a literal.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LexError {
    #[error("{pos}: unterminated string literal")]
    UnterminatedString { pos: Position },

    #[error("{pos}: unindent does not match any outer indentation level")]
    InconsistentDedent { pos: Position },

    #[error("{pos}: unexpected character {ch:?}")]
    UnexpectedChar { pos: Position, ch: char },

    #[error("invalid string literal: {message}")]
    InvalidLiteral { message: String },
}

impl LexError {
    /// Source position of the error, when it has one.
    pub fn position(&self) -> Option<Position> {
        match self {
            Self::UnterminatedString { pos }
            | Self::InconsistentDedent { pos }
            | Self::UnexpectedChar { pos, .. } => Some(*pos),
            Self::InvalidLiteral { .. } => None,
        }
    }
}
