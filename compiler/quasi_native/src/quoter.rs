//! The native C quoter.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use quasi_rewrite::QuoteKind;
use quasi_runtime::{Capabilities, ExecutionContext, QuoteError, Quoter, Value};

use crate::codegen::{self, CompilationUnit, Origin};
use crate::fingerprint::{interface_tag, ArtifactName};
use crate::loader::load_quote;
use crate::{BuildCache, BuildError, Fingerprint, LoadError, LoadedQuote, Toolchain};

/// Construction-time options of a [`NativeQuoter`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeConfig {
    /// Appended to every compiler invocation. Part of the build identity.
    pub extra_compile_args: Vec<String>,
    /// Keep the generated `.c` beside the artifact.
    pub keep_generated_source: bool,
    /// Keep the artifact on disk after loading it, so later processes can
    /// reuse it.
    pub keep_compiled_artifact: bool,
}

impl Default for NativeConfig {
    fn default() -> Self {
        Self {
            extra_compile_args: Vec::new(),
            keep_generated_source: false,
            keep_compiled_artifact: true,
        }
    }
}

impl NativeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_compile_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_compile_args = args.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_generated_source(mut self, keep: bool) -> Self {
        self.keep_generated_source = keep;
        self
    }

    #[must_use]
    pub fn with_compiled_artifact(mut self, keep: bool) -> Self {
        self.keep_compiled_artifact = keep;
        self
    }
}

/// Compiles quoted C into a shared object, loads it and runs it against
/// the calling scope.
///
/// Bodies see host bindings they mention as `qq_object *` handles and work
/// on them only through the `qq` function table; see [`crate::abi`] for the
/// ownership rules. Builds are shared through the [`BuildCache`].
pub struct NativeQuoter {
    config: NativeConfig,
    cache: Arc<BuildCache>,
    toolchain: Option<Toolchain>,
}

impl NativeQuoter {
    pub fn new(cache: Arc<BuildCache>) -> Self {
        Self::with_config(NativeConfig::default(), cache)
    }

    pub fn with_config(config: NativeConfig, cache: Arc<BuildCache>) -> Self {
        Self {
            config,
            cache,
            toolchain: None,
        }
    }

    /// Use `toolchain` instead of detecting one at build time.
    #[must_use]
    pub fn with_toolchain(mut self, toolchain: Toolchain) -> Self {
        self.toolchain = Some(toolchain);
        self
    }

    pub fn config(&self) -> &NativeConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<BuildCache> {
        &self.cache
    }

    /// Everything needed to build `body` as quoted at the site `ctx` is
    /// executing.
    pub fn compilation_unit(
        &self,
        kind: QuoteKind,
        body: &str,
        ctx: &ExecutionContext<'_>,
        col_offset: u32,
    ) -> CompilationUnit {
        let module = module_stem(ctx);
        let tag = interface_tag(&self.config.extra_compile_args);
        let name = ArtifactName::new(kind, &module, body, &tag);
        let dir = artifact_dir(ctx.filename());

        let bindings = ctx.bindings();
        let names = codegen::referenced_names(body, |name| bindings.contains_key(name));
        // A block's body is every line after its `with`, leading blank and
        // comment lines included.
        let (line, column) = match kind {
            QuoteKind::Block => (ctx.line() + 1, 0),
            QuoteKind::Expr => (ctx.line(), body_column(ctx, col_offset)),
        };
        let origin = Origin {
            file: ctx.filename(),
            line,
        };
        let generated_source = codegen::generate(kind, body, &names, &origin, column);

        CompilationUnit {
            kind,
            source_path: dir.join(name.source_file()),
            artifact_path: dir.join(name.artifact_file()),
            module,
            body_hash: name.body_hash,
            interface_tag: tag,
            generated_source,
            compile_flags: self.config.extra_compile_args.clone(),
        }
    }

    fn quote(
        &self,
        kind: QuoteKind,
        body: &str,
        ctx: &mut ExecutionContext<'_>,
        col_offset: u32,
    ) -> Result<Value, QuoteError> {
        let module = module_stem(ctx);
        let tag = interface_tag(&self.config.extra_compile_args);
        let fp = Fingerprint::compute(kind, &module, body, &tag, &self.config.extra_compile_args);
        let name = ArtifactName::new(kind, &module, body, &tag);
        let artifact = artifact_dir(ctx.filename()).join(name.artifact_file());

        let quote = {
            let ctx = &*ctx;
            self.cache.get_or_build(
                fp,
                &artifact,
                |output| self.build(&self.compilation_unit(kind, body, ctx, col_offset), output),
                |path| self.load(path),
            )?
        };
        quote.run(ctx)
    }

    fn build(&self, unit: &CompilationUnit, output: &Path) -> Result<(), BuildError> {
        let toolchain = match &self.toolchain {
            Some(toolchain) => toolchain.clone(),
            None => Toolchain::detect()?,
        };
        tracing::debug!(
            module = %unit.module,
            body = %unit.body_hash,
            compiler = toolchain.program(),
            "building native quote"
        );
        if self.config.keep_generated_source {
            fs::write(&unit.source_path, &unit.generated_source).map_err(|source| BuildError::Io {
                path: unit.source_path.clone(),
                source,
            })?;
            return toolchain.compile(&unit.source_path, output, &unit.compile_flags);
        }

        let dir = artifact_dir(&unit.source_path);
        let io_error = |source| BuildError::Io {
            path: dir.clone(),
            source,
        };
        let mut source = tempfile::Builder::new()
            .prefix(".qq-src-")
            .suffix(".c")
            .tempfile_in(&dir)
            .map_err(io_error)?;
        source
            .write_all(unit.generated_source.as_bytes())
            .and_then(|()| source.flush())
            .map_err(io_error)?;
        toolchain.compile(source.path(), output, &unit.compile_flags)
    }

    fn load(&self, path: &Path) -> Result<LoadedQuote, LoadError> {
        let quote = load_quote(path)?;
        if !self.config.keep_compiled_artifact {
            if let Err(err) = fs::remove_file(path) {
                tracing::warn!(path = %path.display(), %err, "cannot remove artifact");
            }
        }
        Ok(quote)
    }
}

impl Quoter for NativeQuoter {
    fn capabilities(&self) -> Capabilities {
        Capabilities::QUOTE_BLOCK | Capabilities::QUOTE_EXPR
    }

    fn quote_block(
        &self,
        body: &str,
        ctx: &mut ExecutionContext<'_>,
        col_offset: u32,
    ) -> Result<(), QuoteError> {
        self.quote(QuoteKind::Block, body, ctx, col_offset).map(drop)
    }

    fn quote_expr(
        &self,
        body: &str,
        ctx: &mut ExecutionContext<'_>,
        col_offset: u32,
    ) -> Result<Value, QuoteError> {
        self.quote(QuoteKind::Expr, body, ctx, col_offset)
    }
}

/// Module name used in artifact names: the stem of the module's file, so
/// [`cleanup`](crate::cleanup()) can find the module again.
fn module_stem(ctx: &ExecutionContext<'_>) -> String {
    ctx.filename()
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| ctx.module_name().to_owned())
}

/// Column an expression body starts at, just past `[$name|`. Without a
/// dispatching site the layout is unknown and the site column is used.
fn body_column(ctx: &ExecutionContext<'_>, col_offset: u32) -> u32 {
    match ctx.quoter_name() {
        Some(name) => {
            let width = u32::try_from(name.chars().count()).unwrap_or(u32::MAX);
            col_offset.saturating_add(3).saturating_add(width)
        }
        None => col_offset,
    }
}

/// Directory holding the artifacts of the module at `file`.
fn artifact_dir(file: &Path) -> PathBuf {
    match file.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_owned(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
mod tests;
