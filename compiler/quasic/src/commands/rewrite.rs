//! `quasi rewrite`: print or write the transformed form of modules.

use std::borrow::Cow;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;

use super::{read_source, CommandError};

#[derive(Clone, Debug, Default)]
pub struct RewriteOptions {
    /// Output file for a single input, output directory for several.
    pub output: Option<PathBuf>,
    /// Rewrite modules that do not carry the encoding pragma.
    pub force: bool,
}

/// One rewritten module.
#[derive(Clone, Debug)]
pub struct Rewritten {
    pub path: PathBuf,
    pub source: String,
    /// Where the source was written, if anywhere.
    pub written: Option<PathBuf>,
}

/// Transformed text of `source`, or `source` itself when the module does
/// not opt in and `force` is off.
pub fn rewrite_source<'a>(
    path: &Path,
    source: &'a str,
    force: bool,
) -> Result<Cow<'a, str>, CommandError> {
    let result = if force {
        quasi_rewrite::transform(source).map(|t| Cow::Owned(t.source))
    } else {
        quasi_rewrite::transform_source(source)
    };
    result.map_err(|error| CommandError::Rewrite {
        path: path.to_owned(),
        error,
    })
}

/// Rewrite every file in `paths` in parallel. Results come back in input
/// order.
pub fn rewrite_files(
    paths: &[PathBuf],
    options: &RewriteOptions,
) -> Vec<Result<Rewritten, CommandError>> {
    if let Some(dir) = options.output.as_deref().filter(|_| paths.len() > 1) {
        if let Err(source) = fs::create_dir_all(dir) {
            return vec![Err(CommandError::Write {
                path: dir.to_owned(),
                source,
            })];
        }
    }
    paths
        .par_iter()
        .map(|path| rewrite_file(path, paths.len(), options))
        .collect()
}

fn rewrite_file(
    path: &Path,
    inputs: usize,
    options: &RewriteOptions,
) -> Result<Rewritten, CommandError> {
    let source = read_source(path)?;
    let rewritten = rewrite_source(path, &source, options.force)?.into_owned();
    tracing::debug!(path = %path.display(), changed = rewritten != source, "rewrote module");

    let written = match &options.output {
        None => None,
        Some(out) if inputs == 1 => Some(out.clone()),
        Some(dir) => Some(dir.join(path.file_name().unwrap_or(path.as_os_str()))),
    };
    if let Some(out) = &written {
        fs::write(out, &rewritten).map_err(|source| CommandError::Write {
            path: out.clone(),
            source,
        })?;
    }
    Ok(Rewritten {
        path: path.to_owned(),
        source: rewritten,
        written,
    })
}
