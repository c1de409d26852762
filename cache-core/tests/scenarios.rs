//! End-to-end scenarios against a fake backend and the in-memory storage
//! crate, exercising `CachingExecutor` the way `http-cache-tests` exercises
//! the teacher codebase's own executor.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use cache_core::{
    CacheConfig, CacheError, CachingExecutor, CancellationToken, Clock, HeaderList, InMemoryResourceFactory,
    RawRequest, RawResponse, Result, Route,
};
use cache_memory::MemoryStorage;
use http::{HeaderValue, Method, StatusCode, Version};

struct FixedClock(Mutex<SystemTime>);

impl FixedClock {
    fn new(now: SystemTime) -> Self {
        FixedClock(Mutex::new(now))
    }
    fn set(&self, now: SystemTime) {
        *self.0.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        *self.0.lock().unwrap()
    }
}

/// A scripted backend: returns queued responses in order, recording every
/// request it was handed for the test to inspect.
struct ScriptedBackend {
    responses: Mutex<Vec<RawResponse>>,
    calls: AtomicUsize,
    received: Mutex<Vec<RawRequest>>,
}

impl ScriptedBackend {
    fn new(responses: Vec<RawResponse>) -> Self {
        ScriptedBackend { responses: Mutex::new(responses), calls: AtomicUsize::new(0), received: Mutex::new(Vec::new()) }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> RawRequest {
        self.received.lock().unwrap().last().unwrap().clone()
    }
}

#[async_trait]
impl cache_core::Backend for ScriptedBackend {
    async fn execute(&self, _route: &Route, request: &RawRequest, _cancellation: &CancellationToken) -> Result<RawResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.received.lock().unwrap().push(request.clone());
        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(CacheError::Backend("script exhausted".into()));
        }
        Ok(responses.remove(0))
    }
}

fn route() -> Route {
    Route { scheme: "http".into(), host: "foo.example.com".into(), uri: "/r".parse().unwrap() }
}

fn get_request() -> RawRequest {
    RawRequest { method: Method::GET, headers: HeaderList::new(), body: None, version: Version::HTTP_11 }
}

fn headers_with(pairs: &[(&str, &str)]) -> HeaderList {
    let mut h = HeaderList::new();
    for (name, value) in pairs {
        h.append(name.parse().unwrap(), HeaderValue::from_str(value).unwrap());
    }
    h
}

fn t(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

fn executor(
    backend: ScriptedBackend,
    clock: Arc<FixedClock>,
) -> CachingExecutor<MemoryStorage, InMemoryResourceFactory, ScriptedBackend> {
    CachingExecutor::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(InMemoryResourceFactory),
        Arc::new(backend),
        clock,
        CacheConfig::default(),
    )
}

#[tokio::test]
async fn cold_get_stored_then_hot_get_served_from_cache() {
    let origin = RawResponse {
        status: StatusCode::OK,
        headers: headers_with(&[
            ("date", &cache_core::date::format_http_date(t(0))),
            ("cache-control", "max-age=3600"),
        ]),
        body: vec![0u8; 128],
    };
    let backend = ScriptedBackend::new(vec![origin.clone()]);
    let clock = Arc::new(FixedClock::new(t(0)));
    let cache = executor(backend, clock.clone());

    let (resp1, _) = cache.execute(route(), get_request(), CancellationToken::new()).await.unwrap();
    assert_eq!(resp1.status, StatusCode::OK);
    assert_eq!(resp1.body.len(), 128);

    clock.set(t(1));
    let (resp2, _) = cache.execute(route(), get_request(), CancellationToken::new()).await.unwrap();
    assert_eq!(resp2.status, StatusCode::OK);
    assert_eq!(resp2.body, origin.body);
    assert_eq!(resp2.headers.get(&"age".parse().unwrap()).unwrap(), "1");
}

#[tokio::test]
async fn revalidation_with_304_updates_date_and_serves_stored_body() {
    let first = RawResponse {
        status: StatusCode::OK,
        headers: headers_with(&[
            ("date", &cache_core::date::format_http_date(t(0))),
            ("cache-control", "max-age=5"),
            ("etag", "\"v1\""),
        ]),
        body: b"hello".to_vec(),
    };
    let not_modified = RawResponse {
        status: StatusCode::NOT_MODIFIED,
        headers: headers_with(&[
            ("date", &cache_core::date::format_http_date(t(10))),
            ("etag", "\"v1\""),
        ]),
        body: Vec::new(),
    };
    let backend = Arc::new(ScriptedBackend::new(vec![first, not_modified]));
    let clock = Arc::new(FixedClock::new(t(0)));
    let cache = CachingExecutor::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(InMemoryResourceFactory),
        backend.clone(),
        clock.clone(),
        CacheConfig::default(),
    );

    cache.execute(route(), get_request(), CancellationToken::new()).await.unwrap();

    clock.set(t(10));
    let (resp, _) = cache.execute(route(), get_request(), CancellationToken::new()).await.unwrap();
    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.body, b"hello".to_vec());

    let sent = backend.last_request();
    assert_eq!(sent.headers.get(&"if-none-match".parse().unwrap()).unwrap(), "\"v1\"");
}

#[tokio::test]
async fn stale_304_triggers_unconditional_retry() {
    let first = RawResponse {
        status: StatusCode::OK,
        headers: headers_with(&[
            ("date", &cache_core::date::format_http_date(t(10))),
            ("cache-control", "max-age=5"),
            ("etag", "\"v1\""),
        ]),
        body: b"hello".to_vec(),
    };
    let stale_304 = RawResponse {
        status: StatusCode::NOT_MODIFIED,
        headers: headers_with(&[("date", &cache_core::date::format_http_date(t(5)))]),
        body: Vec::new(),
    };
    let fresh = RawResponse {
        status: StatusCode::OK,
        headers: headers_with(&[
            ("date", &cache_core::date::format_http_date(t(70))),
            ("cache-control", "max-age=5"),
            ("etag", "\"v2\""),
        ]),
        body: b"world".to_vec(),
    };
    let backend = Arc::new(ScriptedBackend::new(vec![first, stale_304, fresh]));
    let clock = Arc::new(FixedClock::new(t(10)));
    let cache = CachingExecutor::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(InMemoryResourceFactory),
        backend.clone(),
        clock.clone(),
        CacheConfig::default(),
    );

    cache.execute(route(), get_request(), CancellationToken::new()).await.unwrap();

    clock.set(t(70));
    let (resp, _) = cache.execute(route(), get_request(), CancellationToken::new()).await.unwrap();
    assert_eq!(backend.call_count(), 3);
    assert_eq!(resp.body, b"world".to_vec());
}

#[tokio::test]
async fn only_if_cached_miss_returns_504_without_calling_backend() {
    let backend = Arc::new(ScriptedBackend::new(vec![]));
    let clock = Arc::new(FixedClock::new(t(0)));
    let cache = CachingExecutor::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(InMemoryResourceFactory),
        backend.clone(),
        clock,
        CacheConfig::default(),
    );

    let request = RawRequest {
        method: Method::GET,
        headers: headers_with(&[("cache-control", "only-if-cached")]),
        body: None,
        version: Version::HTTP_11,
    };
    let (resp, _) = cache.execute(route(), request, CancellationToken::new()).await.unwrap();
    assert_eq!(resp.status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn invalidation_on_put_clears_the_cached_get() {
    let backend = Arc::new(ScriptedBackend::new(vec![]));
    let clock = Arc::new(FixedClock::new(t(0)));
    let storage = Arc::new(MemoryStorage::new());
    let cache = CachingExecutor::new(
        storage.clone(),
        Arc::new(InMemoryResourceFactory),
        backend.clone(),
        clock.clone(),
        CacheConfig::default(),
    );

    *backend.responses.lock().unwrap() = vec![RawResponse {
        status: StatusCode::OK,
        headers: headers_with(&[
            ("date", &cache_core::date::format_http_date(t(0))),
            ("cache-control", "max-age=3600"),
            ("etag", "\"old\""),
        ]),
        body: b"hello".to_vec(),
    }];
    cache.execute(route(), get_request(), CancellationToken::new()).await.unwrap();
    assert_eq!(storage.len(), 1);

    *backend.responses.lock().unwrap() = vec![RawResponse {
        status: StatusCode::OK,
        headers: headers_with(&[
            ("date", &cache_core::date::format_http_date(t(1))),
            ("content-location", "http://foo.example.com/r"),
            ("etag", "\"new\""),
        ]),
        body: Vec::new(),
    }];
    let put_request = RawRequest {
        method: Method::PUT,
        headers: HeaderList::new(),
        body: Some(b"x".to_vec()),
        version: Version::HTTP_11,
    };
    cache.execute(route(), put_request, CancellationToken::new()).await.unwrap();

    assert!(storage.is_empty());
}

#[tokio::test]
async fn head_response_mismatch_invalidates_cached_get() {
    let get_response = RawResponse {
        status: StatusCode::OK,
        headers: headers_with(&[
            ("date", &cache_core::date::format_http_date(t(0))),
            ("cache-control", "max-age=3600"),
            ("etag", "\"v1\""),
        ]),
        body: b"hello".to_vec(),
    };
    let head_response = RawResponse {
        status: StatusCode::OK,
        headers: headers_with(&[
            ("date", &cache_core::date::format_http_date(t(1))),
            ("etag", "\"v2\""),
        ]),
        body: Vec::new(),
    };
    let backend = Arc::new(ScriptedBackend::new(vec![get_response, head_response]));
    let clock = Arc::new(FixedClock::new(t(0)));
    let storage = Arc::new(MemoryStorage::new());
    let cache = CachingExecutor::new(
        storage.clone(),
        Arc::new(InMemoryResourceFactory),
        backend.clone(),
        clock.clone(),
        CacheConfig::default(),
    );

    cache.execute(route(), get_request(), CancellationToken::new()).await.unwrap();
    assert_eq!(storage.len(), 1);

    clock.set(t(1));
    let head_request = RawRequest {
        method: Method::HEAD,
        headers: headers_with(&[("cache-control", "no-cache")]),
        body: None,
        version: Version::HTTP_11,
    };
    cache.execute(route(), head_request, CancellationToken::new()).await.unwrap();

    assert!(storage.is_empty());
}

#[tokio::test]
async fn negotiated_miss_sends_conditional_request_with_variant_etags() {
    let gzip_response = RawResponse {
        status: StatusCode::OK,
        headers: headers_with(&[
            ("date", &cache_core::date::format_http_date(t(0))),
            ("cache-control", "max-age=3600"),
            ("etag", "\"gzip-v1\""),
            ("vary", "accept-encoding"),
        ]),
        body: b"gzipped".to_vec(),
    };
    let br_response = RawResponse {
        status: StatusCode::OK,
        headers: headers_with(&[
            ("date", &cache_core::date::format_http_date(t(0))),
            ("cache-control", "max-age=3600"),
            ("etag", "\"br-v1\""),
            ("vary", "accept-encoding"),
        ]),
        body: b"brotli".to_vec(),
    };
    let backend = Arc::new(ScriptedBackend::new(vec![gzip_response, br_response]));
    let clock = Arc::new(FixedClock::new(t(0)));
    let cache = CachingExecutor::new(
        Arc::new(MemoryStorage::new()),
        Arc::new(InMemoryResourceFactory),
        backend.clone(),
        clock.clone(),
        CacheConfig::default(),
    );

    let gzip_request = RawRequest {
        method: Method::GET,
        headers: headers_with(&[("accept-encoding", "gzip")]),
        body: None,
        version: Version::HTTP_11,
    };
    cache.execute(route(), gzip_request, CancellationToken::new()).await.unwrap();

    let br_request = RawRequest {
        method: Method::GET,
        headers: headers_with(&[("accept-encoding", "br")]),
        body: None,
        version: Version::HTTP_11,
    };
    let (resp, _) = cache.execute(route(), br_request, CancellationToken::new()).await.unwrap();
    assert_eq!(resp.body, b"brotli".to_vec());

    let sent = backend.last_request();
    assert_eq!(sent.headers.get(&"if-none-match".parse().unwrap()).unwrap(), "\"gzip-v1\"");
}
