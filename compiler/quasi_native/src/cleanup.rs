//! Removal of stale artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use quasi_rewrite::{find_sites, is_enabled, QuoteKind};
use rustc_hash::{FxHashMap, FxHashSet};

use crate::fingerprint::{body_hash, ArtifactName};
use crate::CacheError;

/// Extension of host modules next to their artifacts.
const MODULE_EXTENSION: &str = "py";

/// Quote sites still present in one module, as `(kind, body hash)`.
type LiveSites = FxHashSet<(QuoteKind, String)>;

/// Delete artifacts and kept sources under `path` that no module can use
/// any more: their module is gone, no longer opts into rewriting, or no
/// longer holds a site of that kind with that body (or naming a file with
/// that contents). Returns what was removed.
pub fn cleanup(path: impl AsRef<Path>, recurse: bool) -> Result<Vec<PathBuf>, CacheError> {
    let mut modules: FxHashMap<PathBuf, LiveSites> = FxHashMap::default();
    let mut removed = Vec::new();
    sweep(path.as_ref(), recurse, &mut modules, &mut removed)?;
    removed.sort();
    Ok(removed)
}

fn sweep(
    dir: &Path,
    recurse: bool,
    modules: &mut FxHashMap<PathBuf, LiveSites>,
    removed: &mut Vec<PathBuf>,
) -> Result<(), CacheError> {
    let io_error = |source| CacheError::Io {
        path: dir.to_owned(),
        source,
    };
    for entry in fs::read_dir(dir).map_err(io_error)? {
        let entry = entry.map_err(io_error)?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(io_error)?;
        if file_type.is_dir() {
            if recurse {
                sweep(&path, recurse, modules, removed)?;
            }
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()).and_then(ArtifactName::parse)
        else {
            continue;
        };
        let module = dir.join(format!("{}.{MODULE_EXTENSION}", name.module));
        let live = modules.entry(module).or_insert_with_key(|module| live_sites(module));
        if live.contains(&(name.kind, name.body_hash.clone())) {
            continue;
        }
        fs::remove_file(&path).map_err(|source| CacheError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::info!(path = %path.display(), "removed stale artifact");
        removed.push(path);
    }
    Ok(())
}

/// Sites of a module, or none when it is missing, unreadable, not opted in
/// or no longer rewritable.
fn live_sites(module: &Path) -> LiveSites {
    let Ok(source) = fs::read_to_string(module) else {
        return LiveSites::default();
    };
    if !is_enabled(&source) {
        return LiveSites::default();
    }
    match find_sites(&source) {
        Ok(sites) => {
            let mut live = LiveSites::default();
            for site in sites {
                if let Some(contents) = quoted_file(&site.body, module) {
                    live.insert((site.kind, body_hash(&contents)));
                }
                live.insert((site.kind, body_hash(&site.body)));
            }
            live
        }
        Err(err) => {
            tracing::debug!(module = %module.display(), %err, "module no longer rewrites");
            LiveSites::default()
        }
    }
}

/// Contents of the file a one-line body names, resolved the way a
/// file-quoting site resolves it. Artifacts built through such a site are
/// named after these contents rather than the body.
fn quoted_file(body: &str, module: &Path) -> Option<String> {
    let mut lines = body.lines().map(str::trim).filter(|line| !line.is_empty());
    let (Some(name), None) = (lines.next(), lines.next()) else {
        return None;
    };
    let path = Path::new(name);
    let path = if path.is_absolute() {
        path.to_owned()
    } else {
        module.parent()?.join(path)
    };
    fs::read_to_string(path).ok()
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
