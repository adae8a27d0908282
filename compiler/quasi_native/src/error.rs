use std::io;
use std::path::PathBuf;

use quasi_runtime::QuoteError;

/// Failure to turn generated source into an artifact.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("no C compiler found; set QUASI_CC or CC")]
    CompilerNotFound,

    /// The compiler ran and rejected the source.
    #[error("{compiler} failed:\n{diagnostics}")]
    Compilation {
        compiler: String,
        diagnostics: String,
    },

    #[error("cannot run {compiler}: {source}")]
    Spawn {
        compiler: String,
        #[source]
        source: io::Error,
    },

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failure to map an artifact into the process.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("{} does not exist", path.display())]
    Missing { path: PathBuf },

    /// The dynamic linker refused the file.
    #[error("cannot open {}: {message}", path.display())]
    Open { path: PathBuf, message: String },

    #[error("{} has no entry symbol: {message}", path.display())]
    Symbol { path: PathBuf, message: String },

    #[error("{} was built for ABI version {found}, expected {expected}", path.display())]
    AbiMismatch {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

impl LoadError {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Missing { path }
            | Self::Open { path, .. }
            | Self::Symbol { path, .. }
            | Self::AbiMismatch { path, .. } => path,
        }
    }
}

/// Failure of a [`BuildCache`](crate::BuildCache) operation.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Load(#[from] LoadError),

    #[error("{}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl From<BuildError> for QuoteError {
    fn from(err: BuildError) -> Self {
        match err {
            BuildError::Compilation { diagnostics, .. } => Self::Compilation { diagnostics },
            BuildError::Io { path, source } => Self::Io { path, source },
            other @ (BuildError::CompilerNotFound | BuildError::Spawn { .. }) => {
                Self::Compilation {
                    diagnostics: other.to_string(),
                }
            }
        }
    }
}

impl From<LoadError> for QuoteError {
    fn from(err: LoadError) -> Self {
        Self::Load {
            path: err.path().clone(),
            message: err.to_string(),
        }
    }
}

impl From<CacheError> for QuoteError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Build(err) => err.into(),
            CacheError::Load(err) => err.into(),
            CacheError::Io { path, source } => Self::Io { path, source },
        }
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
mod tests;
