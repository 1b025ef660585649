use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;

type CacheKey = (PathBuf, String);

/// Counters exposed for diagnostics and tests
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    /// Directory walks actually performed (cache misses)
    pub walks: u64,
    pub entries: usize,
}

#[derive(Debug, Default)]
struct CacheInner {
    results: HashMap<CacheKey, Option<PathBuf>>,
    insertion_order: VecDeque<CacheKey>,
    hits: u64,
    walks: u64,
}

/// Bounded cache of prefix searches, keyed by `(root, prefix)`
///
/// Both hits and misses are cached. When full, the oldest-inserted entry is evicted. The
/// walk itself runs outside the lock, so two threads racing on the same key may both walk;
/// the first result inserted wins.
///
/// Entries are derived data: a poisoned lock is recovered rather than propagated.
#[derive(Debug)]
pub struct AssetSearchCache {
    capacity: usize,
    inner: Mutex<CacheInner>,
}

impl AssetSearchCache {
    pub fn new(capacity: usize) -> Self {
        Self { capacity, inner: Mutex::new(CacheInner::default()) }
    }

    fn lock(&self) -> MutexGuard<'_, CacheInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached result for `(root, prefix)`, running `search` on a miss
    pub fn get_or_search<F>(&self, root: &Path, prefix: &str, search: F) -> Option<PathBuf>
    where
        F: FnOnce() -> Option<PathBuf>,
    {
        let key = (root.to_path_buf(), prefix.to_string());

        {
            let mut inner = self.lock();
            if let Some(cached) = inner.results.get(&key).cloned() {
                inner.hits += 1;
                return cached;
            }
        }

        let found = search();

        let mut inner = self.lock();
        inner.walks += 1;
        if self.capacity == 0 {
            return found;
        }
        if let Some(existing) = inner.results.get(&key) {
            return existing.clone();
        }

        while inner.results.len() >= self.capacity {
            let Some(oldest) = inner.insertion_order.pop_front() else {
                break;
            };
            inner.results.remove(&oldest);
        }
        inner.insertion_order.push_back(key.clone());
        inner.results.insert(key, found.clone());

        found
    }

    /// Drops every entry under `root`, e.g. after the set is re-ingested
    pub fn invalidate_root(&self, root: &Path) {
        let mut inner = self.lock();
        inner.results.retain(|(r, _), _| !r.starts_with(root));
        inner.insertion_order.retain(|(r, _)| !r.starts_with(root));
    }

    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.results.clear();
        inner.insertion_order.clear();
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.lock();
        CacheStats { hits: inner.hits, walks: inner.walks, entries: inner.results.len() }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for AssetSearchCache {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_CACHE_CAPACITY)
    }
}
