//! Cache-wide configuration (§6, §10).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use http::{Method, Request, Response};
use serde::{Deserialize, Serialize};

/// A user-supplied predicate deciding whether a request of the given method
/// should ever be looked up in cache at all, beyond the built-in GET/HEAD
/// admissibility rule. Boxed as `Arc<dyn Fn>` so `CacheConfig` stays `Clone`
/// without cloning closures' captured state, mirroring how the teacher wires
/// its per-request override hooks.
pub type CacheModeFn =
    Arc<dyn Fn(&Request<()>) -> CacheMode + Send + Sync>;

/// A user-supplied predicate overriding whether a particular origin response
/// should be cached, run in addition to the built-in `ResponsePolicy`.
pub type ResponseCacheModeFn =
    Arc<dyn Fn(&Request<()>, &Response<()>) -> CacheMode + Send + Sync>;

/// A user-supplied callback invoked whenever the response cache mode would
/// otherwise force a fresh lookup-miss, letting an embedder veto or rewrite
/// the outgoing storage key (e.g. to add a tenant prefix).
pub type CacheKeyFn = Arc<dyn Fn(&Request<()>) -> String + Send + Sync>;

/// Request handling mode, richer than a plain on/off switch so embedders can
/// express the same vocabulary browsers expose via `fetch()`'s `cache` option
/// (§4.10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CacheMode {
    /// Normal RFC 7234 behavior: serve fresh from cache, revalidate stale.
    Default,
    /// Never consult cache, never store the response (bypasses entirely).
    NoStore,
    /// Always go to the origin, but still store the result.
    Reload,
    /// Always revalidate a cached entry before using it, even if fresh.
    NoCache,
    /// Use a cached entry at any staleness without contacting the origin,
    /// and fail if nothing is stored.
    ForceCache,
    /// Like `ForceCache`, but a miss yields 504 rather than falling back to
    /// the origin (§4.10 `only-if-cached`).
    OnlyIfCached,
    /// Bypasses `RequestPolicy`/`ResponsePolicy` admissibility checks
    /// entirely; used by embedders pre-validating their own requests.
    IgnoreRules,
}

impl Default for CacheMode {
    fn default() -> Self {
        CacheMode::Default
    }
}

/// All tunables governing the decision engine's behavior. `Clone + Debug +
/// Default`, and `Serialize`/`Deserialize` for the plain-data fields so a
/// deployment can load the numeric/boolean knobs from a config file while
/// still wiring the function-valued hooks up in code.
#[derive(Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether this cache sits in front of multiple clients (a "shared"
    /// cache per RFC 7234) or serves a single user agent (private). Shared
    /// caches must not store responses to requests carrying `Authorization`
    /// unless explicitly re-authorized, and must honor `s-maxage`/`private`.
    pub shared_cache: bool,
    /// Multiplier applied to `(Date - Last-Modified)` to derive a heuristic
    /// freshness lifetime when the origin sent no explicit expiration
    /// (§4.2). RFC 7234 §4.2.2 suggests 10%.
    pub heuristic_coefficient: f64,
    /// Upper bound on a heuristic freshness lifetime, regardless of what
    /// the coefficient computes.
    pub heuristic_max_ttl: Duration,
    /// Floor applied to `Cache-Control: immutable` responses' freshness
    /// lifetime: an immutable response is treated as fresh for at least
    /// this long even if its `max-age`/`Expires` would imply less.
    pub immutable_min_ttl: Duration,
    /// Hard ceiling on freshness lifetime regardless of what the origin or
    /// heuristic computation would otherwise grant. `None` means unbounded.
    pub max_ttl: Option<Duration>,
    /// Largest response body this cache will store, in bytes.
    pub max_object_size: u64,
    /// Whether `303 See Other` responses may be cached. Off by default:
    /// RFC 7231 doesn't forbid it, but it's surprising enough that most
    /// HTTP caches leave it opt-in.
    pub allow_303_caching: bool,
    /// Whether generated responses carry `x-cache`/`x-cache-lookup`
    /// annotation headers (§4.6).
    pub cache_status_headers: bool,
    /// Consecutive async-revalidation failures for a given key before
    /// `AsynchronousRevalidator` stops retrying it in the background
    /// (it remains servable stale-with-warning via the synchronous path).
    pub failure_threshold: u32,
    /// Bound on `Storage::update` compare-and-set retries before the
    /// executor gives up and treats the write as failed.
    pub cas_retry_limit: u32,
    /// Bounded worker-pool size for `AsynchronousRevalidator`.
    pub revalidation_workers: usize,
    #[serde(skip, default)]
    pub cache_mode: Option<CacheModeFn>,
    #[serde(skip, default)]
    pub response_cache_mode: Option<ResponseCacheModeFn>,
    #[serde(skip, default)]
    pub cache_key: Option<CacheKeyFn>,
}

impl fmt::Debug for CacheConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheConfig")
            .field("shared_cache", &self.shared_cache)
            .field("heuristic_coefficient", &self.heuristic_coefficient)
            .field("heuristic_max_ttl", &self.heuristic_max_ttl)
            .field("immutable_min_ttl", &self.immutable_min_ttl)
            .field("max_ttl", &self.max_ttl)
            .field("max_object_size", &self.max_object_size)
            .field("allow_303_caching", &self.allow_303_caching)
            .field("cache_status_headers", &self.cache_status_headers)
            .field("failure_threshold", &self.failure_threshold)
            .field("cas_retry_limit", &self.cas_retry_limit)
            .field("revalidation_workers", &self.revalidation_workers)
            .field("cache_mode", &self.cache_mode.as_ref().map(|_| "Fn"))
            .field("response_cache_mode", &self.response_cache_mode.as_ref().map(|_| "Fn"))
            .field("cache_key", &self.cache_key.as_ref().map(|_| "Fn"))
            .finish()
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            shared_cache: true,
            heuristic_coefficient: 0.1,
            heuristic_max_ttl: Duration::from_secs(24 * 3600),
            immutable_min_ttl: Duration::from_secs(3600),
            max_ttl: None,
            max_object_size: 5 * 1024 * 1024,
            allow_303_caching: false,
            cache_status_headers: true,
            failure_threshold: 5,
            cas_retry_limit: 3,
            revalidation_workers: 4,
            cache_mode: None,
            response_cache_mode: None,
            cache_key: None,
        }
    }
}

impl CacheConfig {
    /// Resolves the effective `CacheMode` for `request`, falling back to
    /// `Default` if no override hook is installed.
    pub fn resolve_cache_mode(&self, request: &Request<()>) -> CacheMode {
        self.cache_mode.as_ref().map(|f| f(request)).unwrap_or(CacheMode::Default)
    }

    pub fn resolve_response_cache_mode(
        &self,
        request: &Request<()>,
        response: &Response<()>,
    ) -> CacheMode {
        self.response_cache_mode
            .as_ref()
            .map(|f| f(request, response))
            .unwrap_or(CacheMode::Default)
    }
}

/// Whether `method` is a "safe" method per RFC 7231 §4.2.1, meaning it never
/// triggers invalidation.
pub fn is_safe_method(method: &Method) -> bool {
    matches!(method, &Method::GET | &Method::HEAD | &Method::OPTIONS | &Method::TRACE)
}
