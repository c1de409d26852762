//! The transport seam (§1 "out of scope", §6): whatever actually moves
//! bytes to an origin. `cache-reqwest` provides a real implementation;
//! tests use a fake.

use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use http::{HeaderMap, Method, StatusCode, Uri, Version};
use tokio::sync::Notify;

use crate::error::Result;
use crate::headers::HeaderList;

/// The destination a request is routed to — separated from the request
/// itself so an embedder's routing layer can rewrite it without touching
/// headers/method/body.
#[derive(Debug, Clone)]
pub struct Route {
    pub scheme: String,
    pub host: String,
    pub uri: Uri,
}

/// A raw request as handed to the backend: no cache-specific typing, just
/// enough to send over the wire. `version` is normalized to `HTTP/1.1` by
/// `CachingExecutor::execute` before anything else sees it (`ProtocolCompliance::normalize_version`);
/// callers constructing one directly may leave it at the default.
#[derive(Debug, Clone)]
pub struct RawRequest {
    pub method: Method,
    pub headers: HeaderList,
    pub body: Option<Vec<u8>>,
    pub version: Version,
}

/// A raw response as returned by the backend.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub headers: HeaderList,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub fn header_map(&self) -> HeaderMap {
        HeaderMap::from(&self.headers)
    }
}

/// Per-call context: the call-site's view of "now" plus whatever
/// status annotations the executor writes as it decides (§6 cache-response
/// status values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    CacheHit,
    CacheMiss,
    Validated,
    CacheModuleResponse,
    Failure,
}

/// A cooperative cancellation signal; cloning shares the same underlying
/// notification.
#[derive(Clone, Default)]
pub struct CancellationToken(Arc<Notify>);

impl CancellationToken {
    pub fn new() -> Self {
        CancellationToken(Arc::new(Notify::new()))
    }

    pub fn cancel(&self) {
        self.0.notify_waiters();
    }

    pub async fn cancelled(&self) {
        self.0.notified().await;
    }
}

/// Whatever actually talks to the origin (or further upstream cache/proxy
/// chain). Implementors must honor `cancellation` promptly; a cancelled
/// call should not leave partially-applied storage mutations (§5).
#[async_trait]
pub trait Backend: Send + Sync {
    async fn execute(
        &self,
        route: &Route,
        request: &RawRequest,
        cancellation: &CancellationToken,
    ) -> Result<RawResponse>;
}

/// Call-context accumulator: the executor records timings and the final
/// cache-status verdict here for observability, mirroring the annotations
/// the teacher codebase writes onto its own response extensions.
#[derive(Debug, Clone)]
pub struct CallContext {
    pub request_time: Option<SystemTime>,
    pub response_time: Option<SystemTime>,
    pub status: Option<CacheStatus>,
}

impl Default for CallContext {
    fn default() -> Self {
        CallContext { request_time: None, response_time: None, status: None }
    }
}

impl CallContext {
    pub fn new() -> Self {
        Self::default()
    }
}
