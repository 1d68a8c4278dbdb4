//! In-memory static file cache with filesystem-driven invalidation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};

/// Concurrent map from canonical file path to its contents.
///
/// Cloning is cheap and shares the underlying map.
#[derive(Clone, Default)]
pub struct FileCache {
    inner: Arc<DashMap<PathBuf, Bytes>>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &Path) -> Option<Bytes> {
        self.inner.get(path).map(|r| r.value().clone())
    }

    pub fn insert(&self, path: PathBuf, content: Bytes) {
        self.inner.insert(path, content);
    }

    /// Drops `path`, or everything cached beneath it when it names a
    /// directory. Returns the number of entries removed.
    pub fn invalidate(&self, path: &Path) -> usize {
        if self.inner.remove(path).is_some() {
            return 1;
        }

        let before = self.inner.len();
        self.inner.retain(|cached, _| !cached.starts_with(path));
        before.saturating_sub(self.inner.len())
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

/// Watches a directory tree and evicts cache entries for touched paths.
pub struct CacheInvalidator {
    root: PathBuf,
    cache: FileCache,
}

impl CacheInvalidator {
    pub fn new(root: &Path, cache: FileCache) -> Self {
        Self {
            root: root.to_path_buf(),
            cache,
        }
    }

    /// Starts watching. Notifications stop when the returned watcher is
    /// dropped.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let cache = self.cache.clone();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    // Any kind of event: change, create, remove or rename.
                    for path in &event.paths {
                        let removed = cache.invalidate(path);
                        if removed > 0 {
                            tracing::debug!(path = ?path, removed, "Invalidated cached file");
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            }
        })?;

        watcher.watch(&self.root, RecursiveMode::Recursive)?;

        tracing::info!(path = ?self.root, "Static file watcher started");
        Ok(watcher)
    }
}
