//! Building a response message from a stored entry (§4.6).

use std::time::SystemTime;

use http::{HeaderValue, Request, StatusCode};

use crate::cache_control::CacheControl;
use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::headers::HeaderList;
use crate::validity::{Age, ValidityPolicy};

/// Header names permitted on a locally synthesized 304, per RFC 7232 §4.1.
const HEADERS_LEGAL_ON_304: &[&str] =
    &["date", "etag", "content-location", "expires", "cache-control", "vary"];

/// Cache-lookup annotation written whenever `cache_status_headers` is on,
/// independent of whether the entry was actually usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    Hit,
    Miss,
}

impl LookupStatus {
    fn as_str(self) -> &'static str {
        match self {
            LookupStatus::Hit => "HIT",
            LookupStatus::Miss => "MISS",
        }
    }
}

/// A materialized response: status, headers, and whether a body should be
/// attached (the caller supplies the entry's body bytes themselves; this
/// type only decides whether to).
#[derive(Debug, Clone)]
pub struct GeneratedResponse {
    pub status: StatusCode,
    pub headers: HeaderList,
    pub include_body: bool,
}

pub struct ResponseGenerator<'a> {
    config: &'a CacheConfig,
}

impl<'a> ResponseGenerator<'a> {
    pub fn new(config: &'a CacheConfig) -> Self {
        ResponseGenerator { config }
    }

    /// Builds the response for `entry` as seen by `request` at `now`. If
    /// `request` carries validators the entry satisfies, synthesizes a 304
    /// instead of replaying the stored status.
    pub fn generate<B>(
        &self,
        request: &Request<B>,
        request_headers: &HeaderList,
        entry: &CacheEntry,
        now: SystemTime,
        lookup: LookupStatus,
    ) -> GeneratedResponse {
        let validity = ValidityPolicy::new(self.config);
        let age = validity.age(entry, now);
        let satisfied = crate::suitability::conditions_satisfied_by(entry, request_headers);

        let mut headers = if satisfied {
            self.headers_for_304(entry)
        } else {
            entry.headers.clone()
        };

        self.annotate_age_and_warnings(&mut headers, entry, &age);

        if self.config.cache_status_headers {
            self.annotate_cache_status(&mut headers, lookup);
        }

        let status = if satisfied { StatusCode::NOT_MODIFIED } else { entry.status };
        let include_body = !satisfied && request.method() != http::Method::HEAD;

        GeneratedResponse { status, headers, include_body }
    }

    fn headers_for_304(&self, entry: &CacheEntry) -> HeaderList {
        let mut filtered = HeaderList::new();
        for (name, value) in entry.headers.iter() {
            if HEADERS_LEGAL_ON_304.iter().any(|legal| name.as_str() == *legal) {
                filtered.append(name.clone(), value.clone());
            }
        }
        filtered
    }

    fn annotate_age_and_warnings(&self, headers: &mut HeaderList, entry: &CacheEntry, age: &Age) {
        if let Ok(value) = HeaderValue::from_str(&age.current_age.as_secs().to_string()) {
            headers.replace("age".parse().unwrap(), value);
        }

        if age.is_stale() {
            headers.append("warning".parse().unwrap(), HeaderValue::from_static("110 - \"Response is stale\""));
        }
        if age.heuristic && age.current_age.as_secs() > 24 * 3600 {
            headers.append(
                "warning".parse().unwrap(),
                HeaderValue::from_static("113 - \"Heuristic expiration\""),
            );
        }
        let cc = CacheControl::parse(&entry.headers);
        let _ = cc;
    }

    fn annotate_cache_status(&self, headers: &mut HeaderList, lookup: LookupStatus) {
        headers.replace(
            "x-cache-lookup".parse().unwrap(),
            HeaderValue::from_static(lookup.as_str()),
        );
        headers.replace(
            "x-cache".parse().unwrap(),
            HeaderValue::from_static(lookup.as_str()),
        );
    }

    /// Annotates a freshly forwarded (non-cache) response with `x-cache:
    /// MISS` / `x-cache-lookup: MISS`, when enabled.
    pub fn annotate_miss(&self, headers: &mut HeaderList) {
        if self.config.cache_status_headers {
            self.annotate_cache_status(headers, LookupStatus::Miss);
        }
    }

    /// Annotates a response that required a backend validation round-trip
    /// and came back non-304 (VALIDATED but not a hit).
    pub fn annotate_validated(&self, headers: &mut HeaderList) {
        if self.config.cache_status_headers {
            headers.replace("x-cache-lookup".parse().unwrap(), HeaderValue::from_static("HIT"));
            headers.replace("x-cache".parse().unwrap(), HeaderValue::from_static("MISS"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{InMemoryResourceFactory, ResourceFactory};
    use std::time::Duration;

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn entry() -> CacheEntry {
        let mut h = HeaderList::new();
        h.append("date".parse().unwrap(), HeaderValue::from_static("Thu, 01 Jan 1970 00:00:00 GMT"));
        h.append("cache-control".parse().unwrap(), HeaderValue::from_static("max-age=3600"));
        h.append("etag".parse().unwrap(), HeaderValue::from_static("\"v1\""));
        h.append("content-type".parse().unwrap(), HeaderValue::from_static("text/plain"));
        let body = InMemoryResourceFactory.create(b"hi".to_vec(), 100).unwrap();
        CacheEntry::new_leaf(http::Method::GET, HeaderList::new(), t(0), t(0), StatusCode::OK, None, h, body)
    }

    #[test]
    fn plain_hit_carries_age_and_200() {
        let config = CacheConfig::default();
        let generator = ResponseGenerator::new(&config);
        let req = Request::builder().method("GET").uri("/r").body(()).unwrap();
        let generated =
            generator.generate(&req, &HeaderList::new(), &entry(), t(1), LookupStatus::Hit);
        assert_eq!(generated.status, StatusCode::OK);
        assert!(generated.include_body);
        assert_eq!(generated.headers.get(&"age".parse().unwrap()).unwrap(), "1");
    }

    #[test]
    fn satisfied_conditional_yields_304_with_no_body_and_legal_headers_only() {
        let config = CacheConfig::default();
        let generator = ResponseGenerator::new(&config);
        let req = Request::builder().method("GET").uri("/r").body(()).unwrap();
        let mut req_headers = HeaderList::new();
        req_headers.append("if-none-match".parse().unwrap(), HeaderValue::from_static("\"v1\""));
        let generated = generator.generate(&req, &req_headers, &entry(), t(1), LookupStatus::Hit);
        assert_eq!(generated.status, StatusCode::NOT_MODIFIED);
        assert!(!generated.include_body);
        assert!(!generated.headers.contains(&"content-type".parse().unwrap()));
        assert!(generated.headers.contains(&"etag".parse().unwrap()));
    }

    #[test]
    fn head_request_never_includes_body() {
        let config = CacheConfig::default();
        let generator = ResponseGenerator::new(&config);
        let req = Request::builder().method("HEAD").uri("/r").body(()).unwrap();
        let generated = generator.generate(&req, &HeaderList::new(), &entry(), t(1), LookupStatus::Hit);
        assert!(!generated.include_body);
    }
}
