//! Background stale-while-revalidate worker pool (§4.11).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use log::warn;
use tokio::sync::Semaphore;

use crate::config::CacheConfig;
use crate::key::StorageKey;
use crate::storage::{FailureCache, Storage};

/// Tracks which storage keys currently have a revalidation in flight, so
/// duplicate triggers for the same key are dropped rather than queued.
struct PendingSet {
    inner: Mutex<HashSet<StorageKey>>,
}

impl PendingSet {
    fn new() -> Self {
        PendingSet { inner: Mutex::new(HashSet::new()) }
    }

    /// Attempts to claim `key`; returns `true` if this caller now owns the
    /// in-flight slot, `false` if someone else already does.
    fn try_claim(&self, key: &StorageKey) -> bool {
        self.inner.lock().unwrap().insert(key.clone())
    }

    fn release(&self, key: &StorageKey) {
        self.inner.lock().unwrap().remove(key);
    }
}

/// Owns the bounded worker pool driving background revalidation. Held by
/// `CachingExecutor`, never as a process-wide singleton, per the design
/// note against a mutable-singleton revalidation queue.
pub struct AsynchronousRevalidator {
    semaphore: Arc<Semaphore>,
    pending: Arc<PendingSet>,
    failures: Arc<FailureCache>,
    threshold: u32,
}

impl AsynchronousRevalidator {
    pub fn new(config: &CacheConfig) -> Self {
        AsynchronousRevalidator {
            semaphore: Arc::new(Semaphore::new(config.revalidation_workers.max(1))),
            pending: Arc::new(PendingSet::new()),
            failures: Arc::new(FailureCache::new(1024)),
            threshold: config.failure_threshold,
        }
    }

    /// Schedules a background revalidation of `key` if no other worker is
    /// already handling it and the key hasn't tripped the failure
    /// threshold. The closure `revalidate` performs the actual
    /// conditional-GET-and-merge (the executor's `REVALIDATE` path),
    /// reported as `Ok(())` on success.
    pub fn schedule<F, Fut>(&self, key: StorageKey, revalidate: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = crate::error::Result<()>> + Send + 'static,
    {
        if self.failures.is_suppressed(&key, self.threshold) {
            return;
        }
        if !self.pending.try_claim(&key) {
            return;
        }

        let semaphore = self.semaphore.clone();
        let pending = self.pending.clone();
        let failures = self.failures.clone();
        let task_key = key.clone();

        tokio::spawn(async move {
            let _permit = semaphore.acquire_owned().await;
            match revalidate().await {
                Ok(()) => failures.record_success(&task_key),
                Err(err) => {
                    let count = failures.record_failure(&task_key);
                    warn!("async revalidation failed for {task_key}: {err} (failure #{count})");
                }
            }
            pending.release(&task_key);
        });
    }
}
