use std::io;
use std::path::PathBuf;

use crate::Capabilities;

/// Errors raised while dispatching or running a quote site.
///
/// None of these are retried; the caller sees them at the site.
#[derive(Debug, thiserror::Error)]
pub enum QuoteError {
    /// The resolved object cannot handle this surface form.
    #[error("{type_name} object does not support {capability}")]
    NotSupported {
        capability: &'static str,
        type_name: &'static str,
    },

    #[error("name '{name}' is not defined")]
    Name { name: String },

    /// The host quoter could not evaluate its body.
    #[error("{message}")]
    Eval { message: String },

    /// The body is not in the shape the quoter accepts.
    #[error("invalid quote body: {message}")]
    Body { message: String },

    /// Native code signalled an error by returning `NULL`.
    #[error("native quote failed: {message}")]
    Native { message: String },

    /// The foreign toolchain rejected the body.
    #[error("compilation failed:\n{diagnostics}")]
    Compilation { diagnostics: String },

    /// A compiled artifact could not be loaded.
    #[error("cannot load {}: {message}", path.display())]
    Load { path: PathBuf, message: String },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl QuoteError {
    pub fn not_supported(capability: Capabilities, type_name: &'static str) -> Self {
        Self::NotSupported {
            capability: capability.method(),
            type_name,
        }
    }

    pub(crate) fn eval(message: impl Into<String>) -> Self {
        Self::Eval {
            message: message.into(),
        }
    }
}
