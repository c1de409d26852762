//! RFC 7234 HTTP/1.1 caching decision engine.
//!
//! This crate implements the protocol-level decision logic — freshness and
//! age arithmetic, request/response cacheability policy, stored-entry
//! suitability, conditional-request synthesis, response generation, 304
//! merging, unsafe-method invalidation, and the orchestrating executor —
//! independent of any concrete transport or storage backend. Those are
//! abstracted behind the [`backend::Backend`] and [`storage::Storage`]
//! traits; [`cache-memory`](https://docs.rs/cache-memory) and
//! [`cache-reqwest`](https://docs.rs/cache-reqwest) provide reference
//! implementations of each.

pub mod backend;
pub mod cache_control;
pub mod clock;
pub mod compliance;
pub mod conditional;
pub mod config;
pub mod date;
pub mod entry;
pub mod error;
pub mod executor;
pub mod generator;
pub mod headers;
pub mod invalidator;
pub mod key;
pub mod request_policy;
pub mod resource;
pub mod response_policy;
pub mod revalidator;
pub mod storage;
pub mod suitability;
pub mod updater;
pub mod validity;

#[cfg(feature = "test-util")]
pub mod test_util;

pub use backend::{Backend, CacheStatus, CallContext, CancellationToken, RawRequest, RawResponse, Route};
pub use clock::{Clock, SystemClock};
pub use config::{CacheConfig, CacheMode};
pub use entry::{CacheEntry, EntryKind};
pub use error::{CacheError, Result};
pub use executor::CachingExecutor;
pub use headers::HeaderList;
pub use key::StorageKey;
pub use resource::{InMemoryResourceFactory, ResourceFactory, ResourceHandle};
pub use storage::{FailureCache, Storage};
