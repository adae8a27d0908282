//! Late-bound dispatch of rewritten quote sites.
//!
//! A rewritten site calls into here with the quoter's *name*; the name is
//! resolved in the calling frame on every call, so rebinding it between two
//! executions of the same site switches handlers.

use std::sync::Arc;

use crate::{Capabilities, ExecutionContext, Frame, QuoteError, Quoter, Value};

/// Run a `with $name:` site.
pub fn quote_block(
    frame: &mut Frame,
    name: &str,
    body: &str,
    col_offset: u32,
) -> Result<(), QuoteError> {
    let quoter = resolve(frame, name, Capabilities::QUOTE_BLOCK)?;
    let mut ctx = ExecutionContext::new(frame).with_quoter(name);
    quoter.quote_block(body, &mut ctx, col_offset)?;
    ctx.commit();
    Ok(())
}

/// Run a `[$name|...|]` site and return its value.
pub fn quote_expr(
    frame: &mut Frame,
    name: &str,
    body: &str,
    col_offset: u32,
) -> Result<Value, QuoteError> {
    let quoter = resolve(frame, name, Capabilities::QUOTE_EXPR)?;
    let mut ctx = ExecutionContext::new(frame).with_quoter(name);
    let value = quoter.quote_expr(body, &mut ctx, col_offset)?;
    ctx.commit();
    Ok(value)
}

fn resolve(
    frame: &Frame,
    name: &str,
    needed: Capabilities,
) -> Result<Arc<dyn Quoter>, QuoteError> {
    let value = frame.get(name).ok_or_else(|| QuoteError::Name {
        name: name.to_owned(),
    })?;
    let Some(quoter) = value.as_quoter() else {
        return Err(QuoteError::not_supported(needed, value.type_name()));
    };
    if !quoter.capabilities().contains(needed) {
        return Err(QuoteError::not_supported(needed, "quoter"));
    }
    tracing::trace!(
        quoter = name,
        capability = needed.method(),
        line = frame.line(),
        "dispatching quote site"
    );
    Ok(Arc::clone(quoter))
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
