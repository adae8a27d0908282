//! The quoter capability contract.

use bitflags::bitflags;

use crate::{ExecutionContext, QuoteError, Value};

bitflags! {
    /// Surface forms a quoter can handle.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// `with $q:` blocks, dispatched to [`Quoter::quote_block`].
        const QUOTE_BLOCK = 1;
        /// `[$q|...|]` expressions, dispatched to [`Quoter::quote_expr`].
        const QUOTE_EXPR = 1 << 1;
    }
}

impl Capabilities {
    /// Method name of a single capability, as reported in errors.
    pub fn method(self) -> &'static str {
        if self == Self::QUOTE_BLOCK {
            "quote_block"
        } else if self == Self::QUOTE_EXPR {
            "quote_expr"
        } else {
            "quote_block/quote_expr"
        }
    }
}

/// A handler for quoted foreign code.
///
/// A quoter is an ordinary host value bound to a name; quote sites name it
/// and dispatch looks it up again on every call. Implementors override the
/// methods for the capabilities they advertise; the defaults fail with
/// [`QuoteError::NotSupported`].
///
/// `body` is the site's text exactly as written and `col_offset` the
/// character column of the site's opening token. Bindings staged on `ctx`
/// are committed into the calling frame once the call succeeds.
pub trait Quoter: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    fn quote_block(
        &self,
        body: &str,
        ctx: &mut ExecutionContext<'_>,
        col_offset: u32,
    ) -> Result<(), QuoteError> {
        let _ = (body, ctx, col_offset);
        Err(QuoteError::not_supported(Capabilities::QUOTE_BLOCK, "quoter"))
    }

    fn quote_expr(
        &self,
        body: &str,
        ctx: &mut ExecutionContext<'_>,
        col_offset: u32,
    ) -> Result<Value, QuoteError> {
        let _ = (body, ctx, col_offset);
        Err(QuoteError::not_supported(Capabilities::QUOTE_EXPR, "quoter"))
    }
}
