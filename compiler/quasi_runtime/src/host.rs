//! The host-language quoter.
//!
//! Evaluates quoted host code against the calling scope: the expression
//! form evaluates one expression, the block form runs simple statements
//! (`name = expr`, `name op= expr`, bare expressions, `pass`), one per
//! logical line or separated by `;`. Assigned names are committed back into
//! the calling frame.
//!
//! ```text
//! a = 2
//! b = [$py|a + 2|]      # 4
//! with $py:
//!     c = b * 10
//! ```
//!
//! Integers are 64-bit; results outside that range raise an overflow error
//! instead of promoting.

mod eval;
mod parser;

use crate::{Capabilities, ExecutionContext, QuoteError, Quoter, Value};

/// Name the host quoter is conventionally bound to.
pub const HOST_QUOTER_NAME: &str = "py";

#[derive(Clone, Copy, Debug, Default)]
pub struct HostQuoter;

impl Quoter for HostQuoter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::QUOTE_BLOCK | Capabilities::QUOTE_EXPR
    }

    fn quote_block(
        &self,
        body: &str,
        ctx: &mut ExecutionContext<'_>,
        _col_offset: u32,
    ) -> Result<(), QuoteError> {
        let stmts = parser::parse_statements(body)?;
        eval::exec(&stmts, ctx)
    }

    fn quote_expr(
        &self,
        body: &str,
        ctx: &mut ExecutionContext<'_>,
        _col_offset: u32,
    ) -> Result<Value, QuoteError> {
        let expr = parser::parse_expression(body)?;
        eval::eval(&expr, ctx)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
