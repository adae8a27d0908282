//! `quasi cleanup`: remove native artifacts no module uses any more.

use std::path::{Path, PathBuf};

use super::CommandError;

pub fn cleanup_artifacts(path: &Path, recurse: bool) -> Result<Vec<PathBuf>, CommandError> {
    Ok(quasi_native::cleanup(path, recurse)?)
}
