//! Body resource handles.
//!
//! The decision engine never needs to interpret a body, only to know its
//! length and to hand out more references to it. `ResourceFactory` is the
//! "out of scope" seam named in the design: a real embedder would back it
//! with a file, an mmap, or a disk cache entry. The `Arc`-backed handle here
//! gives §5's reference-counting guarantee ("released only when its
//! reference count reaches zero, regardless of whether storage evicted the
//! entry") for free.

use std::sync::Arc;

use crate::error::{CacheError, Result};

/// A reference-counted, already-materialized body. Cloning is cheap (an
/// `Arc` bump); the underlying bytes are shared, never copied, between the
/// copy storage holds and the copies handed out in generated responses.
#[derive(Debug, Clone)]
pub struct ResourceHandle(Arc<Vec<u8>>);

impl ResourceHandle {
    /// Number of bytes in the resource.
    pub fn len(&self) -> u64 {
        self.0.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the resource's bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Creates and copies [`ResourceHandle`]s, enforcing a size ceiling on
/// creation.
pub trait ResourceFactory: Send + Sync {
    /// Wraps `bytes` as a resource, rejecting it with
    /// [`CacheError::BodyTooLarge`] if it exceeds `max_bytes`.
    fn create(&self, bytes: Vec<u8>, max_bytes: u64) -> Result<ResourceHandle>;

    /// Returns another reference to the same underlying resource.
    fn copy(&self, resource: &ResourceHandle) -> ResourceHandle {
        resource.clone()
    }
}

/// The straightforward in-process factory: resources are just `Arc<Vec<u8>>`
/// in memory. Suitable for any embedder that doesn't need disk-backed
/// bodies; [`cache-memory`](https://docs.rs/cache-memory)'s `Storage`
/// implementation pairs naturally with it.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryResourceFactory;

impl ResourceFactory for InMemoryResourceFactory {
    fn create(&self, bytes: Vec<u8>, max_bytes: u64) -> Result<ResourceHandle> {
        let size = bytes.len() as u64;
        if size > max_bytes {
            return Err(CacheError::BodyTooLarge { size, max: max_bytes });
        }
        Ok(ResourceHandle(Arc::new(bytes)))
    }
}
