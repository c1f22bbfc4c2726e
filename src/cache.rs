//! Bounded in-memory store for downloaded image bytes.

use bytes::Bytes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::models::ImageVariant;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub photo_id: String,
    pub variant: ImageVariant,
}

impl CacheKey {
    pub fn new(photo_id: impl Into<String>, variant: ImageVariant) -> Self {
        Self {
            photo_id: photo_id.into(),
            variant,
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.photo_id, self.variant)
    }
}

/// Least-recently-used image cache with a fixed entry capacity.
///
/// Every lookup and insertion takes the lock exactly once, so eviction is
/// atomic per insertion. Two callers missing on the same key may both fetch and
/// both insert; the second insert simply replaces an identical value.
pub struct ImageCache {
    entries: Mutex<LruCache<CacheKey, Bytes>>,
}

impl ImageCache {
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Bytes>> {
        // The cache holds no invariants a panicking holder could break.
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &CacheKey) -> Option<Bytes> {
        self.lock().get(key).cloned()
    }

    pub fn insert(&self, key: CacheKey, data: Bytes) {
        let mut entries = self.lock();
        if let Some((evicted, _)) = entries.push(key.clone(), data) {
            if evicted != key {
                debug!("Evicted {} from image cache", evicted);
            }
        }
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.lock().contains(key)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.lock().cap().get()
    }
}
