//! The view of a frame a quoter runs against.

use std::path::Path;

use indexmap::IndexMap;

use crate::{Frame, Value};

/// Mutable, ordered view of the names visible at a quote site.
///
/// Reads see fast locals, the locals mapping and globals, with locals
/// shadowing globals and dunder names hidden. Writes are staged and only
/// reach the frame through [`ExecutionContext::commit`]; uncommitted writes
/// are dropped with the context.
pub struct ExecutionContext<'f> {
    frame: &'f mut Frame,
    pending: IndexMap<String, Value>,
    quoter: Option<String>,
}

impl<'f> ExecutionContext<'f> {
    pub fn new(frame: &'f mut Frame) -> Self {
        frame.fast_to_locals();
        Self {
            frame,
            pending: IndexMap::new(),
            quoter: None,
        }
    }

    /// Record the name the site used for its quoter.
    #[must_use]
    pub fn with_quoter(mut self, name: impl Into<String>) -> Self {
        self.quoter = Some(name.into());
        self
    }

    /// Name the site used for its quoter, when dispatched from a site.
    pub fn quoter_name(&self) -> Option<&str> {
        self.quoter.as_deref()
    }

    /// Every visible binding, globals first, in definition order.
    pub fn bindings(&self) -> IndexMap<String, Value> {
        let mut all: IndexMap<String, Value> = self
            .frame
            .globals()
            .read()
            .iter()
            .filter(|(name, _)| !is_dunder(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        for (name, value) in self.frame.locals().iter().chain(&self.pending) {
            if !is_dunder(name) {
                all.insert(name.clone(), value.clone());
            }
        }
        all
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.pending.get(name) {
            return Some(value.clone());
        }
        if is_dunder(name) {
            return None;
        }
        self.frame.get(name)
    }

    /// Stage a binding for the next [`commit`](Self::commit).
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.pending.insert(name.into(), value);
    }

    /// Names staged and not yet committed, in staging order.
    pub fn pending(&self) -> impl Iterator<Item = &str> {
        self.pending.keys().map(String::as_str)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Write staged bindings into the frame's locals mapping, then sync the
    /// fast slots from it.
    pub fn commit(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        tracing::trace!(names = self.pending.len(), "committing quote bindings");
        for (name, value) in self.pending.drain(..) {
            self.frame.store_local(&name, value);
        }
        self.frame.locals_to_fast();
    }

    pub fn frame(&self) -> &Frame {
        &*self.frame
    }

    pub fn module_name(&self) -> &str {
        self.frame.module_name()
    }

    pub fn filename(&self) -> &Path {
        self.frame.filename()
    }

    /// Line of the quote site being executed.
    pub fn line(&self) -> u32 {
        self.frame.line()
    }
}

fn is_dunder(name: &str) -> bool {
    name.len() > 4 && name.starts_with("__") && name.ends_with("__")
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
mod tests;
