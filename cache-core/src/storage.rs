//! The `Storage` seam (out of scope per §1, but the trait and the
//! compare-and-set contract it must honor live here since the executor is
//! written directly against them).

use std::sync::Arc;

use async_trait::async_trait;

use crate::entry::CacheEntry;
use crate::error::Result;
use crate::key::StorageKey;

/// Entry get/put/update/remove, with an atomic compare-and-set update. Any
/// method may fail with an I/O-flavored [`crate::error::CacheError`]; the
/// executor treats a read failure as a miss and a write failure as a
/// logged no-op (§5, §7).
#[async_trait]
pub trait Storage: Send + Sync {
    /// Looks up the entry stored at `key`, if any.
    async fn get(&self, key: &StorageKey) -> Result<Option<Arc<CacheEntry>>>;

    /// Stores `entry` at `key`, unconditionally overwriting whatever was
    /// there.
    async fn put(&self, key: StorageKey, entry: CacheEntry) -> Result<Arc<CacheEntry>>;

    /// Compare-and-set: replaces the entry at `key` with `new` only if the
    /// entry currently stored is the exact same one the caller read as
    /// `old` (identity, not value, comparison — a fresh `get` after another
    /// writer's `put`/`update` always yields a distinct `Arc`). Returns
    /// `Ok(Some(new_entry))` on success, `Ok(None)` if the compare failed
    /// (the caller should re-read and retry), bounded by
    /// `CacheConfig::cas_retry_limit`.
    async fn update(
        &self,
        key: &StorageKey,
        old: &Arc<CacheEntry>,
        new: CacheEntry,
    ) -> Result<Option<Arc<CacheEntry>>>;

    /// Removes whatever is stored at `key`, if anything.
    async fn remove(&self, key: &StorageKey) -> Result<()>;
}

/// A bounded map from storage key to consecutive-failure count, used to
/// stop `AsynchronousRevalidator` from hammering an origin that keeps
/// failing (§3 `FailureCounter`, §4.11, §7).
pub struct FailureCache {
    capacity: usize,
    inner: std::sync::Mutex<FailureCacheInner>,
}

struct FailureCacheInner {
    counts: std::collections::HashMap<StorageKey, u32>,
    order: std::collections::VecDeque<StorageKey>,
}

impl FailureCache {
    pub fn new(capacity: usize) -> Self {
        FailureCache {
            capacity,
            inner: std::sync::Mutex::new(FailureCacheInner {
                counts: std::collections::HashMap::new(),
                order: std::collections::VecDeque::new(),
            }),
        }
    }

    /// Increments the failure count for `key`, evicting the oldest tracked
    /// key (in insertion order) if the map is already at capacity. Returns
    /// the new count.
    pub fn record_failure(&self, key: &StorageKey) -> u32 {
        let mut inner = self.inner.lock().unwrap();
        if !inner.counts.contains_key(key) {
            if inner.counts.len() >= self.capacity {
                if let Some(oldest) = inner.order.pop_front() {
                    inner.counts.remove(&oldest);
                }
            }
            inner.order.push_back(key.clone());
        }
        let count = inner.counts.entry(key.clone()).or_insert(0);
        *count += 1;
        *count
    }

    /// Resets the count for `key` back to zero (a successful revalidation).
    pub fn record_success(&self, key: &StorageKey) {
        let mut inner = self.inner.lock().unwrap();
        inner.counts.remove(key);
        inner.order.retain(|k| k != key);
    }

    /// Current failure count for `key`, zero if untracked.
    pub fn failure_count(&self, key: &StorageKey) -> u32 {
        let inner = self.inner.lock().unwrap();
        inner.counts.get(key).copied().unwrap_or(0)
    }

    /// Whether `key` has hit `threshold` and should have async
    /// revalidation suppressed.
    pub fn is_suppressed(&self, key: &StorageKey, threshold: u32) -> bool {
        self.failure_count(key) >= threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> StorageKey {
        StorageKey::build("http", "example.com", &s.parse().unwrap())
    }

    #[test]
    fn evicts_oldest_on_overflow() {
        let cache = FailureCache::new(2);
        cache.record_failure(&key("/a"));
        cache.record_failure(&key("/b"));
        cache.record_failure(&key("/c"));
        assert_eq!(cache.failure_count(&key("/a")), 0);
        assert_eq!(cache.failure_count(&key("/b")), 1);
        assert_eq!(cache.failure_count(&key("/c")), 1);
    }

    #[test]
    fn success_resets_and_unsuppresses() {
        let cache = FailureCache::new(10);
        for _ in 0..5 {
            cache.record_failure(&key("/a"));
        }
        assert!(cache.is_suppressed(&key("/a"), 5));
        cache.record_success(&key("/a"));
        assert!(!cache.is_suppressed(&key("/a"), 5));
    }
}
