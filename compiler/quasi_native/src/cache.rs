//! Build cache for compiled quotes.
//!
//! Each [`Fingerprint`] is built at most once per cache. Lookups go through
//! three levels:
//!
//! 1. the in-memory map of loaded artifacts;
//! 2. the canonical artifact on disk, left by an earlier process;
//! 3. a fresh build, compiled into a temporary file beside the canonical
//!    path and renamed into place.
//!
//! Misses take a lock private to their fingerprint, so concurrent first
//! callers of one quote wait for a single build while different quotes
//! build in parallel. The lock is dropped from the cache once the artifact
//! is in memory. A fresh artifact that fails to load is deleted again and
//! nothing is kept in memory.

use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use crate::{BuildError, CacheError, Fingerprint, LoadError, LoadedQuote};

/// Counters describing how lookups were served.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Artifacts compiled by this cache.
    pub builds: usize,
    /// Lookups served by loading an artifact already on disk.
    pub disk_hits: usize,
    /// Lookups served from memory.
    pub memory_hits: usize,
}

/// Process-local cache of loaded artifacts, keyed by fingerprint.
///
/// `T` is what loading produces; quoters use [`LoadedQuote`].
pub struct BuildCache<T = LoadedQuote> {
    loaded: DashMap<Fingerprint, Arc<T>>,
    locks: DashMap<Fingerprint, Arc<Mutex<()>>>,
    builds: AtomicUsize,
    disk_hits: AtomicUsize,
    memory_hits: AtomicUsize,
}

impl<T> Default for BuildCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> BuildCache<T> {
    pub fn new() -> Self {
        Self {
            loaded: DashMap::new(),
            locks: DashMap::new(),
            builds: AtomicUsize::new(0),
            disk_hits: AtomicUsize::new(0),
            memory_hits: AtomicUsize::new(0),
        }
    }

    /// Loaded artifact for `fp`, building it into `artifact` if needed.
    ///
    /// `build` writes an artifact to the path it is given; `load` maps an
    /// artifact. An artifact on disk that fails to load is rebuilt.
    pub fn get_or_build<B, L>(
        &self,
        fp: Fingerprint,
        artifact: &Path,
        build: B,
        load: L,
    ) -> Result<Arc<T>, CacheError>
    where
        B: FnOnce(&Path) -> Result<(), BuildError>,
        L: Fn(&Path) -> Result<T, LoadError>,
    {
        if let Some(hit) = self.lookup(&fp) {
            return Ok(hit);
        }

        let lock = Arc::clone(self.locks.entry(fp).or_default().value());
        let _guard = lock.lock();
        // Another caller may have finished while we waited.
        if let Some(hit) = self.lookup(&fp) {
            return Ok(hit);
        }

        let value = match self.load_existing(artifact, &load) {
            Some(value) => value,
            None => self.build_and_load(artifact, build, &load)?,
        };
        let value = Arc::new(value);
        self.loaded.insert(fp, Arc::clone(&value));
        // Later callers hit `loaded` before asking for a lock.
        self.locks.remove(&fp);
        Ok(value)
    }

    /// Whether `fp` is loaded in memory.
    pub fn contains(&self, fp: &Fingerprint) -> bool {
        self.loaded.contains_key(fp)
    }

    pub fn len(&self) -> usize {
        self.loaded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            builds: self.builds.load(Ordering::Relaxed),
            disk_hits: self.disk_hits.load(Ordering::Relaxed),
            memory_hits: self.memory_hits.load(Ordering::Relaxed),
        }
    }

    /// Drop every loaded artifact and reset the counters. Artifacts on disk
    /// are left alone.
    pub fn clear(&self) {
        self.loaded.clear();
        self.locks.clear();
        self.builds.store(0, Ordering::Relaxed);
        self.disk_hits.store(0, Ordering::Relaxed);
        self.memory_hits.store(0, Ordering::Relaxed);
    }

    fn lookup(&self, fp: &Fingerprint) -> Option<Arc<T>> {
        let hit = self.loaded.get(fp).map(|entry| Arc::clone(entry.value()))?;
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(fingerprint = ?fp, "memory hit");
        Some(hit)
    }

    fn load_existing<L>(&self, artifact: &Path, load: &L) -> Option<T>
    where
        L: Fn(&Path) -> Result<T, LoadError>,
    {
        if !artifact.is_file() {
            return None;
        }
        match load(artifact) {
            Ok(value) => {
                self.disk_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(artifact = %artifact.display(), "loaded cached artifact");
                Some(value)
            }
            Err(err) => {
                tracing::warn!(%err, "cached artifact unusable, rebuilding");
                None
            }
        }
    }

    fn build_and_load<B, L>(&self, artifact: &Path, build: B, load: &L) -> Result<T, CacheError>
    where
        B: FnOnce(&Path) -> Result<(), BuildError>,
        L: Fn(&Path) -> Result<T, LoadError>,
    {
        let dir = match artifact.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|source| CacheError::Io {
            path: dir.to_owned(),
            source,
        })?;
        let temp = tempfile::Builder::new()
            .prefix(".qq-build-")
            .tempfile_in(dir)
            .map_err(|source| CacheError::Io {
                path: dir.to_owned(),
                source,
            })?;

        build(temp.path())?;
        temp.persist(artifact).map_err(|err| CacheError::Io {
            path: artifact.to_owned(),
            source: err.error,
        })?;
        self.builds.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(artifact = %artifact.display(), "built artifact");

        load(artifact).map_err(|err| {
            if let Err(source) = fs::remove_file(artifact) {
                tracing::warn!(
                    artifact = %artifact.display(),
                    %source,
                    "cannot remove unloadable artifact"
                );
            }
            CacheError::from(err)
        })
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    reason = "test assertions use unwrap/expect for clarity"
)]
