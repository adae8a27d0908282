//! `quasi lex`: dump the host token stream of a module.

use std::fmt::Write;
use std::path::Path;

use quasi_lexer::{tokenize, SourceBuffer};

use super::CommandError;

pub fn lex_source(path: &Path, source: &str) -> Result<String, CommandError> {
    let buf = SourceBuffer::new(source);
    let tokens = tokenize(&buf).map_err(|error| CommandError::Lex {
        path: path.to_owned(),
        error,
    })?;

    let mut out = String::new();
    let _ = writeln!(out, "Tokens for '{}' ({} tokens):", path.display(), tokens.len());
    for tok in &tokens {
        let pos = tok.start.to_string();
        let _ = writeln!(out, "  {:<9} {pos:<7} {:?}", tok.kind.name(), tok.text);
    }
    Ok(out)
}
