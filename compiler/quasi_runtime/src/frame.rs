//! Execution frames.
//!
//! A [`Frame`] models the scope a quote site runs in. Function frames keep
//! their parameters and assigned names in fast slots indexed by position,
//! mirrored on demand into an ordered locals mapping; module frames use the
//! module's globals as their locals. Globals are shared between a module
//! frame and every function frame created from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::Value;

/// A module's global namespace, shared by all of its frames.
pub type Globals = Arc<RwLock<IndexMap<String, Value>>>;

pub struct Frame {
    module: String,
    filename: PathBuf,
    line: u32,
    varnames: Vec<String>,
    fast: Vec<Option<Value>>,
    locals: IndexMap<String, Value>,
    globals: Globals,
    module_level: bool,
}

impl Frame {
    /// Frame executing the body of `module`, loaded from `filename`.
    pub fn module(module: impl Into<String>, filename: impl Into<PathBuf>) -> Self {
        Self {
            module: module.into(),
            filename: filename.into(),
            line: 1,
            varnames: Vec::new(),
            fast: Vec::new(),
            locals: IndexMap::new(),
            globals: Arc::new(RwLock::new(IndexMap::new())),
            module_level: true,
        }
    }

    /// Frame executing a function defined in `parent`'s module, with one
    /// fast slot per entry of `varnames`, all initially unbound.
    pub fn function(parent: &Frame, varnames: &[&str]) -> Self {
        Self {
            module: parent.module.clone(),
            filename: parent.filename.clone(),
            line: parent.line,
            varnames: varnames.iter().map(|&name| name.to_owned()).collect(),
            fast: vec![None; varnames.len()],
            locals: IndexMap::new(),
            globals: Arc::clone(&parent.globals),
            module_level: false,
        }
    }

    #[must_use]
    pub fn with_line(mut self, line: u32) -> Self {
        self.line = line;
        self
    }

    pub fn set_line(&mut self, line: u32) {
        self.line = line;
    }

    /// Line currently executing.
    pub fn line(&self) -> u32 {
        self.line
    }

    pub fn module_name(&self) -> &str {
        &self.module
    }

    pub fn filename(&self) -> &Path {
        &self.filename
    }

    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    pub fn is_module_level(&self) -> bool {
        self.module_level
    }

    /// Resolve `name` the way the host does: fast slots, then the locals
    /// mapping, then globals.
    pub fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.slot(name).and_then(|i| self.fast[i].clone()) {
            return Some(value);
        }
        if let Some(value) = self.locals.get(name) {
            return Some(value.clone());
        }
        self.globals.read().get(name).cloned()
    }

    /// Bind `name` the way a host assignment in this frame would.
    pub fn set(&mut self, name: &str, value: Value) {
        match self.slot(name) {
            Some(i) => self.fast[i] = Some(value),
            None => self.store_local(name, value),
        }
    }

    pub fn set_global(&self, name: &str, value: Value) {
        self.globals.write().insert(name.to_owned(), value);
    }

    /// The locals mapping. Only current after [`Frame::fast_to_locals`].
    pub fn locals(&self) -> &IndexMap<String, Value> {
        &self.locals
    }

    /// Write into the locals mapping without touching fast slots.
    pub fn store_local(&mut self, name: &str, value: Value) {
        if self.module_level {
            self.set_global(name, value);
        } else {
            self.locals.insert(name.to_owned(), value);
        }
    }

    /// Mirror fast slots into the locals mapping; unbound slots are removed.
    pub fn fast_to_locals(&mut self) {
        for (name, slot) in self.varnames.iter().zip(&self.fast) {
            match slot {
                Some(value) => {
                    self.locals.insert(name.clone(), value.clone());
                }
                None => {
                    self.locals.shift_remove(name);
                }
            }
        }
    }

    /// Copy locals-mapping entries back into the matching fast slots.
    pub fn locals_to_fast(&mut self) {
        for (name, slot) in self.varnames.iter().zip(&mut self.fast) {
            if let Some(value) = self.locals.get(name) {
                *slot = Some(value.clone());
            }
        }
    }

    fn slot(&self, name: &str) -> Option<usize> {
        self.varnames.iter().position(|v| v == name)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
