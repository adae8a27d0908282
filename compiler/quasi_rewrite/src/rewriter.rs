//! Site recognition and in-place source rewriting.

use std::borrow::Cow;

use quasi_lexer::{Lexer, SourceBuffer, Token, TokenKind};

use crate::{is_enabled, QuoteKind, QuoteSite, RewriteError, EXPR_CLOSE};

/// Result of rewriting one module.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transformed {
    pub source: String,
    /// Sites that were replaced, in source order.
    pub sites: Vec<QuoteSite>,
}

/// Find every quote site in `source`, in source order.
///
/// Does not look at the opt-in pragma.
pub fn find_sites(source: &str) -> Result<Vec<QuoteSite>, RewriteError> {
    let buf = SourceBuffer::new(source);
    let bom = buf.bom_len() as usize;
    let mut lexer = Lexer::new(&buf);
    let mut sites = Vec::new();
    let mut prev: Option<Token<'_>> = None;

    loop {
        let token = lexer.next_token()?;
        match token.kind {
            TokenKind::EndMarker => break,
            TokenKind::Marker => {
                let opener = prev.filter(|t| t.is(TokenKind::Name, "with") || t.is_op("["));
                if let Some(open) = opener {
                    let mut site = if open.kind == TokenKind::Name {
                        block_site(&mut lexer, &open, &token)?
                    } else {
                        expr_site(&mut lexer, &open, &token)?
                    };
                    site.span = site.span.start + bom..site.span.end + bom;
                    sites.push(site);
                    prev = None;
                    continue;
                }
            }
            _ => {}
        }
        prev = Some(token);
    }
    Ok(sites)
}

/// Rewrite every quote site in `source`.
///
/// Does not look at the opt-in pragma; see [`transform_source`].
pub fn transform(source: &str) -> Result<Transformed, RewriteError> {
    let sites = find_sites(source)?;
    let mut out = String::with_capacity(source.len() + sites.len() * 48);
    let mut copied = 0;
    for site in &sites {
        out.push_str(&source[copied..site.span.start]);
        site.write_call(&mut out);
        copied = site.span.end;
    }
    out.push_str(&source[copied..]);

    tracing::debug!(sites = sites.len(), "rewrote quote sites");
    Ok(Transformed { source: out, sites })
}

/// Rewrite `source` if it opts in through the pragma.
///
/// Borrows the input when nothing changes.
pub fn transform_source(source: &str) -> Result<Cow<'_, str>, RewriteError> {
    if !is_enabled(source) {
        return Ok(Cow::Borrowed(source));
    }
    let transformed = transform(source)?;
    if transformed.sites.is_empty() {
        return Ok(Cow::Borrowed(source));
    }
    Ok(Cow::Owned(transformed.source))
}

/// Recognize `with $q:` + indented region. `open` is the `with` token.
fn block_site<'a>(
    lexer: &mut Lexer<'a>,
    open: &Token<'a>,
    marker: &Token<'a>,
) -> Result<QuoteSite, RewriteError> {
    let fail = |message: &str| RewriteError::syntax(open.start, open.line, message);

    let name = quoter_name(lexer, marker)?
        .ok_or_else(|| fail("expected a quoter name directly after `$`"))?;
    if !lexer.next_token()?.is_op(":") {
        return Err(fail("expected `:` after the quoter name"));
    }
    let mut eol = lexer.next_token()?;
    if eol.kind == TokenKind::Comment {
        eol = lexer.next_token()?;
    }
    if eol.kind != TokenKind::Newline {
        return Err(fail("expected the end of the line after `:`"));
    }
    let block = lexer
        .take_indented_block()
        .ok_or_else(|| fail("expected an indented block"))?;

    Ok(QuoteSite {
        kind: QuoteKind::Block,
        quoter: name.text.to_owned(),
        body: block.text.to_owned(),
        col_offset: open.start.column,
        line: open.start.line,
        body_line: block.start.line,
        source_line: physical_line(open),
        span: open.start.offset as usize..block.end.offset as usize,
        newlines: block.end.line - open.start.line,
    })
}

/// Recognize `[$q|...|]`. `open` is the `[` token.
fn expr_site<'a>(
    lexer: &mut Lexer<'a>,
    open: &Token<'a>,
    marker: &Token<'a>,
) -> Result<QuoteSite, RewriteError> {
    let fail = |message: &str| RewriteError::syntax(open.start, open.line, message);

    let name = quoter_name(lexer, marker)?
        .ok_or_else(|| fail("expected a quoter name directly after `$`"))?;
    // The opening `|` is matched raw so a body starting with `=` or `|` is
    // not glued onto it as an operator. It must touch the name: quoters find
    // the body's column as `[`, `$`, the name and `|`.
    lexer
        .take_until("|")
        .filter(|gap| gap.text.is_empty())
        .ok_or_else(|| fail("expected `|` directly after the quoter name"))?;
    let body = lexer
        .take_until(EXPR_CLOSE)
        .ok_or_else(|| fail("unterminated quote expression, missing `|]`"))?;
    let end = lexer.here();

    Ok(QuoteSite {
        kind: QuoteKind::Expr,
        quoter: name.text.to_owned(),
        body: body.text.to_owned(),
        col_offset: open.start.column,
        line: open.start.line,
        body_line: body.start.line,
        source_line: physical_line(open),
        span: open.start.offset as usize..end.offset as usize,
        newlines: end.line - open.start.line,
    })
}

/// The quoter name token, if it directly follows the marker.
fn quoter_name<'a>(
    lexer: &mut Lexer<'a>,
    marker: &Token<'a>,
) -> Result<Option<Token<'a>>, RewriteError> {
    let name = lexer.next_token()?;
    Ok((name.kind == TokenKind::Name && name.start.offset == marker.end.offset).then_some(name))
}

fn physical_line(token: &Token<'_>) -> String {
    token.line.trim_end_matches(['\n', '\r']).to_owned()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
