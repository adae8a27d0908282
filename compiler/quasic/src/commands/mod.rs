//! Command handlers for the `quasi` CLI.
//!
//! Handlers return their output as text, or a [`CommandError`] that
//! `main.rs` prints before exiting with status 1.

use std::io;
use std::path::{Path, PathBuf};

use quasi_rewrite::RewriteError;

mod cleanup;
mod lex;
mod rewrite;
mod sites;

pub use cleanup::cleanup_artifacts;
pub use lex::lex_source;
pub use rewrite::{rewrite_files, rewrite_source, RewriteOptions, Rewritten};
pub use sites::list_sites;

#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    #[error("{}", read_message(path, source))]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Rendered with the offending line and a caret under the column.
    #[error("{}", render_rewrite_error(path, error))]
    Rewrite { path: PathBuf, error: RewriteError },

    #[error("{}:{error}", path.display())]
    Lex {
        path: PathBuf,
        error: quasi_lexer::LexError,
    },

    #[error(transparent)]
    Cleanup(#[from] quasi_native::CacheError),
}

pub fn read_source(path: &Path) -> Result<String, CommandError> {
    std::fs::read_to_string(path).map_err(|source| CommandError::Read {
        path: path.to_owned(),
        source,
    })
}

fn read_message(path: &Path, err: &io::Error) -> String {
    let path = path.display();
    match err.kind() {
        io::ErrorKind::NotFound => format!("cannot find file '{path}'"),
        io::ErrorKind::PermissionDenied => format!("permission denied reading '{path}'"),
        io::ErrorKind::InvalidData => format!("'{path}' contains invalid UTF-8 data"),
        _ => format!("error reading '{path}': {err}"),
    }
}

/// `path:line:col: message`, then the site's line with a caret under the
/// column when the error carries one.
pub(crate) fn render_rewrite_error(path: &Path, err: &RewriteError) -> String {
    let mut out = format!("{}:{err}", path.display());
    if let RewriteError::Syntax { pos, line, .. } = err {
        let indent: String = line
            .chars()
            .take(pos.column as usize)
            .map(|c| if c == '\t' { '\t' } else { ' ' })
            .collect();
        out.push_str(&format!("\n    {line}\n    {indent}^"));
    }
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
