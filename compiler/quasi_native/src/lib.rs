//! Native C quoter.
//!
//! [`NativeQuoter`] turns a quoted C body into a small translation unit
//! ([`codegen`]), compiles it into a shared object with the host's C
//! compiler ([`Toolchain`]), maps it into the process ([`load_quote`]) and
//! calls it with the host bindings the body mentions. Compiled quotes are
//! shared through a [`BuildCache`] keyed by [`Fingerprint`], and persist on
//! disk next to their module so later processes can skip the compiler.
//! [`cleanup()`] removes artifacts whose quote no longer exists.
//!
//! Generated code reaches host objects only through the function table
//! described in [`abi`].

pub mod abi;
mod cache;
mod cleanup;
pub mod codegen;
mod error;
pub mod fingerprint;
mod loader;
mod quoter;
mod toolchain;

pub use cache::{BuildCache, CacheStats};
pub use cleanup::cleanup;
pub use codegen::CompilationUnit;
pub use error::{BuildError, CacheError, LoadError};
pub use fingerprint::Fingerprint;
pub use loader::{load_quote, LoadedQuote};
pub use quoter::{NativeConfig, NativeQuoter};
pub use toolchain::Toolchain;
