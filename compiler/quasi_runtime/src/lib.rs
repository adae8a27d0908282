//! Run-time side of quasiquotes.
//!
//! A rewritten module calls [`dispatch::quote_block`] or
//! [`dispatch::quote_expr`] with the quoter's name, the frozen body text and
//! the site's column. Dispatch resolves the name in the calling [`Frame`]
//! at that moment, checks the resolved object's [`Capabilities`], and hands
//! the body to the [`Quoter`] together with an [`ExecutionContext`] over
//! the frame. Bindings the quoter stages are committed back into the frame
//! when the call succeeds.
//!
//! Two quoters ship with the runtime: [`HostQuoter`], which evaluates host
//! code, and [`FromFile`], which quotes the contents of a file through
//! another quoter. The native C quoter lives in `quasi_native`.

mod context;
pub mod dispatch;
mod error;
mod frame;
mod from_file;
mod host;
mod quoter;
mod value;

pub use context::ExecutionContext;
pub use error::QuoteError;
pub use frame::{Frame, Globals};
pub use from_file::FromFile;
pub use host::{HostQuoter, HOST_QUOTER_NAME};
pub use quoter::{Capabilities, Quoter};
pub use value::{Number, Object, Value};
