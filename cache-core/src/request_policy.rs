//! Request admissibility (§4.2): is this request even allowed to be looked
//! up against the cache, independent of what's stored?

use http::{Method, Request};

use crate::cache_control::{has_pragma_no_cache, CacheControl};
use crate::headers::HeaderList;

/// Stateless check; takes a [`http::Request`] body type parameter so callers
/// don't have to materialize a body just to ask admissibility.
pub struct RequestPolicy;

impl RequestPolicy {
    /// Whether `request` may ever be served from (or checked against) the
    /// cache. A `false` result means: skip straight to the backend.
    pub fn admissible<B>(request: &Request<B>, headers: &HeaderList) -> bool {
        if !matches!(*request.method(), Method::GET | Method::HEAD) {
            return false;
        }
        if has_pragma_no_cache(headers) {
            return false;
        }
        let cc = CacheControl::parse(headers);
        if cc.no_store() {
            return false;
        }
        true
    }
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

    #[test]
    fn post_is_never_admissible() {
        let req = Request::builder().method("POST").uri("/r").body(()).unwrap();
        assert!(!RequestPolicy::admissible(&req, &HeaderList::new()));
    }

    #[test]
    fn pragma_no_cache_blocks_admission() {
        let req = Request::builder().method("GET").uri("/r").body(()).unwrap();
        assert!(!RequestPolicy::admissible(&req, &headers(&[("pragma", "no-cache")])));
    }

    #[test]
    fn cache_control_no_store_blocks_admission() {
        let req = Request::builder().method("GET").uri("/r").body(()).unwrap();
        assert!(!RequestPolicy::admissible(&req, &headers(&[("cache-control", "no-store")])));
    }

    #[test]
    fn no_cache_is_admissible_it_only_forces_revalidation() {
        let req = Request::builder().method("GET").uri("/r").body(()).unwrap();
        assert!(RequestPolicy::admissible(&req, &headers(&[("cache-control", "no-cache")])));
    }

    #[test]
    fn plain_get_is_admissible() {
        let req = Request::builder().method("GET").uri("/r").body(()).unwrap();
        assert!(RequestPolicy::admissible(&req, &HeaderList::new()));
    }
}
