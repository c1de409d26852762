//! Storage-key and variant-key derivation.

use http::{HeaderName, Method, Uri};
use serde::{Deserialize, Serialize};

use crate::headers::HeaderList;

/// Canonical identifier for a stored entry: scheme + authority (default ports
/// stripped) + absolute path and query. The authority comes from the call
/// context rather than being parsed off the request line, so a single
/// connection shared by several virtual hosts still produces distinct keys
/// per logical host.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorageKey(String);

impl StorageKey {
    /// Builds the canonical key for `uri` as seen on `host` (`host` is the
    /// authority the call context says we're serving, e.g. from the
    /// connection's SNI/`Host`, not necessarily `uri`'s own authority).
    pub fn build(scheme: &str, host: &str, uri: &Uri) -> Self {
        let path_and_query = uri.path_and_query().map(|pq| pq.as_str()).unwrap_or("/");
        let normalized_host = strip_default_port(scheme, host);
        StorageKey(format!("{}://{}{}", scheme.to_ascii_lowercase(), normalized_host, path_and_query))
    }

    /// Builds a storage key for an absolute URL string (used for
    /// `Content-Location`/`Location` based invalidation), returning `None`
    /// if it doesn't parse as an absolute URL.
    pub fn from_absolute(url: &str) -> Option<Self> {
        let parsed = url::Url::parse(url).ok()?;
        if parsed.host_str().is_none() {
            return None;
        }
        let host = match parsed.port() {
            Some(p) => format!("{}:{}", parsed.host_str().unwrap(), p),
            None => parsed.host_str().unwrap().to_owned(),
        };
        let mut path = parsed.path().to_owned();
        if let Some(q) = parsed.query() {
            path.push('?');
            path.push_str(q);
        }
        Some(StorageKey(format!(
            "{}://{}{}",
            parsed.scheme().to_ascii_lowercase(),
            strip_default_port(parsed.scheme(), &host),
            path
        )))
    }

    /// Host portion of this key (used to check "same host" before honoring
    /// `Content-Location`/`Location` invalidation).
    pub fn host(&self) -> &str {
        self.0.split("://").nth(1).and_then(|rest| rest.split('/').next()).unwrap_or("")
    }

    /// A variant key scoped under this parent's storage key, so two distinct
    /// resources never collide on the same variant key.
    pub fn variant(&self, variant_key: &str) -> Self {
        StorageKey(format!("{}\u{0}vary\u{0}{}", self.0, variant_key))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

fn strip_default_port(scheme: &str, host: &str) -> String {
    let default_port = match scheme.to_ascii_lowercase().as_str() {
        "http" => Some(80),
        "https" => Some(443),
        _ => None,
    };
    if let Some(default_port) = default_port {
        if let Some((h, p)) = host.rsplit_once(':') {
            if p.parse::<u16>() == Ok(default_port) {
                return h.to_ascii_lowercase();
            }
        }
    }
    host.to_ascii_lowercase()
}

/// Derives the variant key for `request`, given the field-names listed in a
/// stored response's `Vary` header. Field names are compared
/// case-insensitively and processed in sorted order so the same set of
/// headers always yields the same key regardless of the order `Vary` listed
/// them in. `Vary: *` has no finite variant key; callers must check for `*`
/// separately and treat the response as uncacheable.
pub fn variant_key(vary_field_names: &[String], request_headers: &HeaderList) -> String {
    let mut names: Vec<String> = vary_field_names.iter().map(|s| s.to_ascii_lowercase()).collect();
    names.sort();
    names.dedup();
    let mut parts = Vec::with_capacity(names.len());
    for name in names {
        let header: Option<HeaderName> = name.parse().ok();
        let joined = header
            .map(|h| {
                request_headers
                    .get_all(&h)
                    .filter_map(|v| v.to_str().ok())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        parts.push(format!("{}={}", name, joined));
    }
    parts.join("&")
}

/// Whether a `Vary` header value is exactly `*`, which RFC 7234 says makes a
/// response effectively uncacheable (infinite variant space).
pub fn vary_is_star(vary_field_names: &[String]) -> bool {
    vary_field_names.iter().any(|v| v.trim() == "*")
}

/// Splits a `Vary` header value into individual field-names.
pub fn parse_vary(value: &str) -> Vec<String> {
    value.split(',').map(|s| s.trim().to_owned()).filter(|s| !s.is_empty()).collect()
}

/// Whether `method` is one the request-admissibility policy ever allows to
/// be served from cache (`GET`/`HEAD` only — see `RequestPolicy`).
pub fn is_cacheable_method(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    #[test]
    fn strips_default_ports_only() {
        let uri: Uri = "/r".parse().unwrap();
        assert_eq!(
            StorageKey::build("http", "example.com:80", &uri).as_str(),
            "http://example.com/r"
        );
        assert_eq!(
            StorageKey::build("https", "example.com:80", &uri).as_str(),
            "https://example.com:80/r"
        );
    }

    #[test]
    fn variant_key_is_order_independent() {
        let mut h = HeaderList::new();
        h.append("accept-encoding".parse().unwrap(), HeaderValue::from_static("gzip"));
        h.append("accept-language".parse().unwrap(), HeaderValue::from_static("en"));
        let a = variant_key(
            &["Accept-Encoding".into(), "Accept-Language".into()],
            &h,
        );
        let b = variant_key(
            &["accept-language".into(), "ACCEPT-ENCODING".into()],
            &h,
        );
        assert_eq!(a, b);
    }

    #[test]
    fn star_vary_detected() {
        assert!(vary_is_star(&parse_vary("*")));
        assert!(!vary_is_star(&parse_vary("accept-encoding")));
    }

    #[test]
    fn same_request_reproduces_same_variant_key() {
        let mut h = HeaderList::new();
        h.append("accept-encoding".parse().unwrap(), HeaderValue::from_static("gzip, deflate"));
        let k1 = variant_key(&["Accept-Encoding".into()], &h);
        let k2 = variant_key(&["Accept-Encoding".into()], &h);
        assert_eq!(k1, k2);
    }
}
