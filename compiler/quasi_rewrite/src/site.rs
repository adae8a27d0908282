//! Quote sites and the calls they are rewritten into.

use std::fmt;
use std::ops::Range;

use quasi_lexer::quote_literal;

/// Closing sequence of the expression form.
///
/// Fixed, so a body cannot itself contain `|]`: the first occurrence ends
/// the site.
pub const EXPR_CLOSE: &str = "|]";

/// Name of the helper the rewritten call passes as its context argument.
const CONTEXT_CALL: &str = "current_execution_context()";

/// Which surface form a site was written in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum QuoteKind {
    /// `with $q:` followed by an indented region.
    Block,
    /// `[$q|...|]` inside an expression.
    Expr,
}

impl QuoteKind {
    /// Quoter capability a site of this kind invokes.
    pub fn method(self) -> &'static str {
        match self {
            Self::Block => "quote_block",
            Self::Expr => "quote_expr",
        }
    }
}

impl fmt::Display for QuoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Block => "block",
            Self::Expr => "expr",
        })
    }
}

/// One recognized quote site.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QuoteSite {
    pub kind: QuoteKind,
    /// Name the quoter is looked up by at run time.
    pub quoter: String,
    /// Body text exactly as written, indentation included.
    pub body: String,
    /// Character column of the opening `with` or `[`.
    pub col_offset: u32,
    /// 1-based line of the opening token.
    pub line: u32,
    /// 1-based line the body text starts on.
    pub body_line: u32,
    /// Physical line the site starts on, without its line break.
    pub source_line: String,
    /// Byte range of the source text the site replaces.
    pub span: Range<usize>,
    /// Line breaks inside `span`.
    pub newlines: u32,
}

impl QuoteSite {
    /// Append the replacement call for this site to `out`.
    ///
    /// Block sites become a statement followed by the span's line breaks;
    /// expression sites keep the line breaks inside the call's parentheses.
    pub fn write_call(&self, out: &mut String) {
        let literal = quote_literal(&self.body);
        let breaks = "\n".repeat(self.newlines as usize);
        let method = self.kind.method();
        let (quoter, col) = (&self.quoter, self.col_offset);
        match self.kind {
            QuoteKind::Block => {
                out.push_str(&format!("{quoter}.{method}({literal}, {CONTEXT_CALL}, {col})"));
                out.push_str(&breaks);
            }
            QuoteKind::Expr => {
                out.push_str(&format!("{quoter}.{method}({literal}, {CONTEXT_CALL}, {col}"));
                out.push_str(&breaks);
                out.push(')');
            }
        }
    }

    /// The replacement call as a string.
    pub fn call(&self) -> String {
        let mut out = String::new();
        self.write_call(&mut out);
        out
    }
}
