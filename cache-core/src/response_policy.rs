//! Response cacheability (§4.3): is an origin response allowed to be stored
//! at all?

use http::{Method, Request, StatusCode};

use crate::cache_control::CacheControl;
use crate::config::CacheConfig;
use crate::headers::HeaderList;
use crate::key::parse_vary;
use crate::validity::HEURISTIC_STATUS_CODES;

/// Status codes §4.3 item 1 admits unconditionally, without requiring
/// explicit freshness information.
const EXPLICITLY_CACHEABLE_STATUS_CODES: &[u16] = HEURISTIC_STATUS_CODES;

pub struct ResponsePolicy<'a> {
    config: &'a CacheConfig,
}

impl<'a> ResponsePolicy<'a> {
    pub fn new(config: &'a CacheConfig) -> Self {
        ResponsePolicy { config }
    }

    /// Whether `response` (to `request`) may be stored.
    pub fn cacheable<B>(
        &self,
        request: &Request<B>,
        request_headers: &HeaderList,
        status: StatusCode,
        response_headers: &HeaderList,
        body_len: u64,
    ) -> bool {
        let cc = CacheControl::parse(response_headers);

        if !self.status_is_cacheable(status, &cc, response_headers) {
            return false;
        }
        if cc.no_store() {
            return false;
        }
        if self.config.shared_cache && cc.private() {
            return false;
        }
        if request_headers.contains(&"authorization".parse().unwrap())
            && self.config.shared_cache
            && !(cc.public() || cc.s_maxage().is_some() || cc.must_revalidate())
        {
            return false;
        }
        if !self.method_is_cacheable(request.method(), &cc, response_headers) {
            return false;
        }
        if body_len > self.config.max_object_size {
            return false;
        }
        if let Some(vary) = response_headers
            .get(&"vary".parse().unwrap())
            .and_then(|v| v.to_str().ok())
        {
            if parse_vary(vary).iter().any(|f| f.trim() == "*") {
                return false;
            }
        }
        true
    }

    fn status_is_cacheable(
        &self,
        status: StatusCode,
        cc: &CacheControl,
        headers: &HeaderList,
    ) -> bool {
        if status == StatusCode::SEE_OTHER && !self.config.allow_303_caching {
            return false;
        }
        if EXPLICITLY_CACHEABLE_STATUS_CODES.contains(&status.as_u16()) {
            return true;
        }
        let has_explicit_freshness = headers.contains(&"expires".parse().unwrap())
            || cc.max_age().is_some()
            || cc.s_maxage().is_some()
            || cc.public()
            || cc.must_revalidate()
            || cc.proxy_revalidate();
        has_explicit_freshness
    }

    fn method_is_cacheable(&self, method: &Method, cc: &CacheControl, headers: &HeaderList) -> bool {
        match *method {
            Method::GET | Method::HEAD => true,
            Method::OPTIONS | Method::POST => {
                cc.max_age().is_some() || cc.s_maxage().is_some() || headers_have_expires(headers)
            }
            _ => false,
        }
    }
}

fn headers_have_expires(headers: &HeaderList) -> bool {
    headers.contains(&"expires".parse().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderList {
        let mut h = HeaderList::new();
        for (name, value) in pairs {
            h.append(name.parse().unwrap(), HeaderValue::from_str(value).unwrap());
        }
        h
    }

    fn get_request() -> Request<()> {
        Request::builder().method("GET").uri("/r").body(()).unwrap()
    }

    #[test]
    fn plain_200_is_cacheable_without_explicit_freshness() {
        let config = CacheConfig::default();
        let policy = ResponsePolicy::new(&config);
        assert!(policy.cacheable(
            &get_request(),
            &HeaderList::new(),
            StatusCode::OK,
            &HeaderList::new(),
            10,
        ));
    }

    #[test]
    fn no_store_response_is_never_cacheable() {
        let config = CacheConfig::default();
        let policy = ResponsePolicy::new(&config);
        assert!(!policy.cacheable(
            &get_request(),
            &HeaderList::new(),
            StatusCode::OK,
            &headers(&[("cache-control", "no-store")]),
            10,
        ));
    }

    #[test]
    fn private_response_is_uncacheable_in_a_shared_cache() {
        let config = CacheConfig { shared_cache: true, ..CacheConfig::default() };
        let policy = ResponsePolicy::new(&config);
        assert!(!policy.cacheable(
            &get_request(),
            &HeaderList::new(),
            StatusCode::OK,
            &headers(&[("cache-control", "private")]),
            10,
        ));
    }

    #[test]
    fn authorization_request_needs_explicit_shared_opt_in() {
        let config = CacheConfig { shared_cache: true, ..CacheConfig::default() };
        let policy = ResponsePolicy::new(&config);
        let req_headers = headers(&[("authorization", "Bearer x")]);
        assert!(!policy.cacheable(
            &get_request(),
            &req_headers,
            StatusCode::OK,
            &HeaderList::new(),
            10,
        ));
        assert!(policy.cacheable(
            &get_request(),
            &req_headers,
            StatusCode::OK,
            &headers(&[("cache-control", "public")]),
            10,
        ));
    }

    #[test]
    fn post_without_freshness_is_uncacheable() {
        let config = CacheConfig::default();
        let policy = ResponsePolicy::new(&config);
        let req = Request::builder().method("POST").uri("/r").body(()).unwrap();
        assert!(!policy.cacheable(&req, &HeaderList::new(), StatusCode::OK, &HeaderList::new(), 10));
    }

    #[test]
    fn post_with_explicit_expires_is_cacheable() {
        let config = CacheConfig::default();
        let policy = ResponsePolicy::new(&config);
        let req = Request::builder().method("POST").uri("/r").body(()).unwrap();
        assert!(policy.cacheable(
            &req,
            &HeaderList::new(),
            StatusCode::OK,
            &headers(&[("expires", "Thu, 01 Jan 1970 01:00:00 GMT")]),
            10,
        ));
    }

    #[test]
    fn oversized_body_is_uncacheable() {
        let config = CacheConfig { max_object_size: 5, ..CacheConfig::default() };
        let policy = ResponsePolicy::new(&config);
        assert!(!policy.cacheable(&get_request(), &HeaderList::new(), StatusCode::OK, &HeaderList::new(), 10));
    }

    #[test]
    fn vary_star_is_uncacheable() {
        let config = CacheConfig::default();
        let policy = ResponsePolicy::new(&config);
        assert!(!policy.cacheable(
            &get_request(),
            &HeaderList::new(),
            StatusCode::OK,
            &headers(&[("vary", "*")]),
            10,
        ));
    }

    #[test]
    fn see_other_requires_opt_in() {
        let config = CacheConfig::default();
        let policy = ResponsePolicy::new(&config);
        assert!(!policy.cacheable(
            &get_request(),
            &HeaderList::new(),
            StatusCode::SEE_OTHER,
            &headers(&[("cache-control", "max-age=60")]),
            10,
        ));
        let allowing = CacheConfig { allow_303_caching: true, ..CacheConfig::default() };
        let policy = ResponsePolicy::new(&allowing);
        assert!(policy.cacheable(
            &get_request(),
            &HeaderList::new(),
            StatusCode::SEE_OTHER,
            &headers(&[("cache-control", "max-age=60")]),
            10,
        ));
    }
}
