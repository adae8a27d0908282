//! Mapping compiled artifacts into the process.

#![allow(
    unsafe_code,
    reason = "loading a shared object and calling its entry point is inherently unsafe"
)]

use std::ffi::CStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::ptr;

use libloading::Library;
use quasi_rewrite::QuoteKind;
use quasi_runtime::{ExecutionContext, Object, QuoteError, Value};

use crate::abi::{self, QqCallFn, QqEntry, ABI_VERSION, ENTRY_SYMBOL, KIND_BLOCK, KIND_EXPR};
use crate::LoadError;

/// A compiled quote, ready to run. Keeps its library mapped.
pub struct LoadedQuote {
    path: PathBuf,
    kind: QuoteKind,
    names: Vec<String>,
    call: QqCallFn,
    // Last, so the library outlives everything pointing into it.
    _library: Library,
}

/// Open `path` and resolve its entry table.
pub fn load_quote(path: &Path) -> Result<LoadedQuote, LoadError> {
    if !path.is_file() {
        return Err(LoadError::Missing {
            path: path.to_owned(),
        });
    }
    // SAFETY: artifacts are produced by this crate's code generator; their
    // only initializers are the C runtime's own.
    let library = unsafe { Library::new(path) }.map_err(|err| LoadError::Open {
        path: path.to_owned(),
        message: err.to_string(),
    })?;
    let symbol_error = |message: String| LoadError::Symbol {
        path: path.to_owned(),
        message,
    };

    // SAFETY: the entry symbol is a data symbol; reading it as a pointer
    // yields the symbol's address.
    let entry = unsafe { library.get::<*const QqEntry>(ENTRY_SYMBOL.as_bytes()) }
        .map(|symbol| *symbol)
        .map_err(|err| symbol_error(err.to_string()))?;
    if entry.is_null() {
        return Err(symbol_error(format!("{ENTRY_SYMBOL} is NULL")));
    }
    // SAFETY: the version is the first field in every layout, so it can be
    // read before the rest of the table is trusted.
    let entry: &QqEntry = unsafe { &*entry };
    if entry.abi_version != ABI_VERSION {
        return Err(LoadError::AbiMismatch {
            path: path.to_owned(),
            found: entry.abi_version,
            expected: ABI_VERSION,
        });
    }
    let kind = match entry.kind {
        KIND_BLOCK => QuoteKind::Block,
        KIND_EXPR => QuoteKind::Expr,
        other => return Err(symbol_error(format!("unknown quote kind {other}"))),
    };
    let names = (0..entry.name_count)
        .map(|i| {
            // SAFETY: `names` holds `name_count` NUL-terminated strings that
            // live in the library's read-only data.
            let name = unsafe { CStr::from_ptr(*entry.names.add(i)) };
            name.to_string_lossy().into_owned()
        })
        .collect::<Vec<_>>();

    tracing::debug!(path = %path.display(), ?names, "loaded quote");
    Ok(LoadedQuote {
        path: path.to_owned(),
        kind,
        names,
        call: entry.call,
        _library: library,
    })
}

impl LoadedQuote {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> QuoteKind {
        self.kind
    }

    /// Host names bound to the body's slots, in slot order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Run the body against `ctx`.
    ///
    /// A name the artifact declares but `ctx` does not bind reaches the body
    /// as `NULL`; artifacts are shared between every site with the same
    /// body, and a name that was a host binding at build time may be a C
    /// local elsewhere. Slots the body reassigned are staged on `ctx`; the
    /// host takes over their references. Returns the body's value, `None`
    /// for blocks.
    pub fn run(&self, ctx: &mut ExecutionContext<'_>) -> Result<Value, QuoteError> {
        let bindings: Vec<Option<Value>> = self.names.iter().map(|name| ctx.get(name)).collect();
        let mut slots: Vec<*const Object> = bindings
            .iter()
            .map(|binding| binding.as_ref().map_or(ptr::null(), Value::as_ptr))
            .collect();

        abi::clear_error();
        // SAFETY: `call` comes from an entry whose ABI version matched, and
        // every non-NULL slot is a live handle kept alive by `bindings`.
        let result = unsafe { (self.call)(abi::api(), slots.as_mut_ptr()) };

        let mut changed = Vec::new();
        for ((name, before), &after) in self.names.iter().zip(&bindings).zip(&slots) {
            let before = before.as_ref().map_or(ptr::null(), Value::as_ptr);
            if !after.is_null() && after != before {
                // SAFETY: a reassigned slot holds a reference the body hands
                // over to the host.
                changed.push((name, unsafe { Value::from_raw(after) }));
            }
        }

        if result.is_null() {
            let message = abi::take_error()
                .unwrap_or_else(|| "native code returned NULL without raising".to_owned());
            return Err(QuoteError::Native { message });
        }
        // SAFETY: a non-NULL result is an owned handle.
        let value = unsafe { Value::from_raw(result) };
        for (name, new) in changed {
            ctx.set(name.clone(), new);
        }
        Ok(value)
    }
}

impl fmt::Debug for LoadedQuote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedQuote")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .field("names", &self.names)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
mod tests;
