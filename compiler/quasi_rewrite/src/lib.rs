//! Quasiquote rewriter.
//!
//! Recognizes the two quote forms in host source:
//!
//! ```text
//! with $c:                 x = [$c|a + b|]
//!     int x = 1;
//! ```
//!
//! and replaces each one in place with an ordinary call on the named quoter:
//!
//! ```text
//! c.quote_block("    int x = 1;\n", current_execution_context(), 0)
//!
//! x = c.quote_expr("a + b", current_execution_context(), 4)
//! ```
//!
//! The body is frozen into a string literal, while the quoter stays a bare
//! name, so it is looked up again every time the call runs. Text before a
//! site never moves and the replacement carries as many line breaks as the
//! span it replaces, so every line and every column outside the sites is
//! exactly where it was.
//!
//! Rewriting is opt-in per file through an encoding declaration naming
//! `quasiquotes` (see [`is_enabled`]).

mod error;
mod pragma;
mod rewriter;
mod site;

pub use error::RewriteError;
pub use pragma::{is_enabled, PRAGMA_ENCODING};
pub use rewriter::{find_sites, transform, transform_source, Transformed};
pub use site::{QuoteKind, QuoteSite, EXPR_CLOSE};
