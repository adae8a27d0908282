//! Quoting code kept in a separate file.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::{Capabilities, ExecutionContext, QuoteError, Quoter, Value};

/// Wraps another quoter so a site names a file instead of holding code.
///
/// The expression form's body is the file name; the block form's body must
/// be a single line naming the file. Relative names are resolved against
/// the directory of the quoting module. The file's contents are handed to
/// the wrapped quoter verbatim in place of the body, with the site's column.
pub struct FromFile {
    inner: Arc<dyn Quoter>,
}

impl FromFile {
    pub fn new(inner: impl Quoter + 'static) -> Self {
        Self::wrap(Arc::new(inner))
    }

    pub fn wrap(inner: Arc<dyn Quoter>) -> Self {
        Self { inner }
    }

    fn read(name: &str, ctx: &ExecutionContext<'_>) -> Result<String, QuoteError> {
        let path = resolve(name.trim(), ctx.filename());
        tracing::debug!(path = %path.display(), "reading quoted file");
        std::fs::read_to_string(&path).map_err(|source| QuoteError::Io { path, source })
    }
}

fn resolve(name: &str, module_file: &Path) -> PathBuf {
    let path = Path::new(name);
    if path.is_absolute() {
        return path.to_owned();
    }
    match module_file.parent() {
        Some(dir) => dir.join(path),
        None => path.to_owned(),
    }
}

impl Quoter for FromFile {
    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn quote_block(
        &self,
        body: &str,
        ctx: &mut ExecutionContext<'_>,
        col_offset: u32,
    ) -> Result<(), QuoteError> {
        let mut lines = body.lines().filter(|line| !line.trim().is_empty());
        let (Some(name), None) = (lines.next(), lines.next()) else {
            return Err(QuoteError::Body {
                message: "a file-quoted block holds exactly one file name".to_owned(),
            });
        };
        let contents = Self::read(name, ctx)?;
        self.inner.quote_block(&contents, ctx, col_offset)
    }

    fn quote_expr(
        &self,
        body: &str,
        ctx: &mut ExecutionContext<'_>,
        col_offset: u32,
    ) -> Result<Value, QuoteError> {
        let contents = Self::read(body, ctx)?;
        self.inner.quote_expr(&contents, ctx, col_offset)
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
mod tests;
