//! An ordered, multi-value header container.
//!
//! `http::HeaderMap` groups repeated header names together rather than
//! preserving a single total insertion order across distinct names, which is
//! good enough for transport but not for what §3 of the design asks for: a
//! stored entry's end-to-end headers are "an ordered sequence (multi-headers
//! preserved in order)". `HeaderList` is the same shape the upstream
//! `HttpHeaders` multimap took, re-expressed as a plain `Vec` so ordering is
//! exact rather than incidental.

use http::{HeaderName, HeaderValue};

/// Header field names that are scoped to a single transport hop and must
/// never be stored or forwarded by a cache (RFC 7230 §6.1, plus the classic
/// `Keep-Alive` extension).
pub const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailers",
    "transfer-encoding",
    "upgrade",
];

/// An ordered sequence of `(name, value)` pairs. Multiple entries with the
/// same name are kept in the order they were appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderList(Vec<(HeaderName, HeaderValue)>);

impl HeaderList {
    /// An empty header list.
    pub fn new() -> Self {
        HeaderList(Vec::new())
    }

    /// Number of `(name, value)` pairs, counting repeats.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no headers at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Appends a value, preserving any existing values for the same name.
    pub fn append(&mut self, name: HeaderName, value: HeaderValue) {
        self.0.push((name, value));
    }

    /// Removes every existing value for `name`, then appends `value` at the
    /// end. This is the "replace" operation `EntryUpdater` needs: "removing
    /// all prior instances of that name, then inserting in order".
    pub fn replace(&mut self, name: HeaderName, value: HeaderValue) {
        self.remove_all(&name);
        self.append(name, value);
    }

    /// Returns the first value for `name`, case-insensitively (header names
    /// already compare case-insensitively via `HeaderName`).
    pub fn get(&self, name: &HeaderName) -> Option<&HeaderValue> {
        self.0.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    /// Returns every value for `name`, in insertion order.
    pub fn get_all<'a>(&'a self, name: &'a HeaderName) -> impl Iterator<Item = &'a HeaderValue> {
        self.0.iter().filter(move |(n, _)| n == name).map(|(_, v)| v)
    }

    /// Whether at least one value exists for `name`.
    pub fn contains(&self, name: &HeaderName) -> bool {
        self.0.iter().any(|(n, _)| n == name)
    }

    /// Removes and returns every value for `name`.
    pub fn remove_all(&mut self, name: &HeaderName) -> Vec<HeaderValue> {
        let mut removed = Vec::new();
        self.0.retain(|(n, v)| {
            if n == name {
                removed.push(v.clone());
                false
            } else {
                true
            }
        });
        removed
    }

    /// Iterates every `(name, value)` pair in order, including repeats.
    pub fn iter(&self) -> impl Iterator<Item = &(HeaderName, HeaderValue)> {
        self.0.iter()
    }

    /// Names mentioned in a `Connection` header: these are hop-by-hop for
    /// *this* message even though their own name isn't in [`HOP_BY_HOP`].
    fn connection_scoped_names(&self) -> Vec<HeaderName> {
        let connection = HeaderName::from_static("connection");
        self.get_all(&connection)
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(','))
            .filter_map(|tok| tok.trim().parse::<HeaderName>().ok())
            .collect()
    }

    /// Strips every hop-by-hop header (the fixed list plus whatever a
    /// `Connection` header names) in place. Used before a response is ever
    /// allowed to become a stored `CacheEntry`, and before a generated
    /// response leaves the cache.
    pub fn strip_hop_by_hop(&mut self) {
        for extra in self.connection_scoped_names() {
            self.remove_all(&extra);
        }
        for name in HOP_BY_HOP {
            if let Ok(name) = name.parse::<HeaderName>() {
                self.remove_all(&name);
            }
        }
    }

    /// Removes every `Warning` header field with a 1xx warn-code, retaining
    /// 2xx ones, per RFC 7234 §4.3.4 (applied whenever a stored response is
    /// selected for update).
    pub fn strip_1xx_warnings(&mut self) {
        let warning = HeaderName::from_static("warning");
        let keep: Vec<HeaderValue> = self
            .get_all(&warning)
            .filter(|v| {
                v.to_str().ok().and_then(|s| warn_code(s)).map(|c| c >= 200).unwrap_or(true)
            })
            .cloned()
            .collect();
        self.remove_all(&warning);
        for v in keep {
            self.append(warning.clone(), v);
        }
    }
}

/// Extracts the leading 3-digit warn-code from a `Warning` header value.
pub fn warn_code(value: &str) -> Option<u16> {
    value.get(0..3)?.parse().ok()
}

impl<'a> IntoIterator for &'a HeaderList {
    type Item = &'a (HeaderName, HeaderValue);
    type IntoIter = std::slice::Iter<'a, (HeaderName, HeaderValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<&http::HeaderMap> for HeaderList {
    fn from(map: &http::HeaderMap) -> Self {
        let mut list = HeaderList::new();
        for (name, value) in map.iter() {
            list.append(name.clone(), value.clone());
        }
        list
    }
}

impl From<&HeaderList> for http::HeaderMap {
    fn from(list: &HeaderList) -> Self {
        let mut map = http::HeaderMap::new();
        for (name, value) in list.iter() {
            map.append(name.clone(), value.clone());
        }
        map
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hn(s: &str) -> HeaderName {
        s.parse().unwrap()
    }
    fn hv(s: &str) -> HeaderValue {
        s.parse().unwrap()
    }

    #[test]
    fn preserves_order_across_distinct_names_and_repeats() {
        let mut h = HeaderList::new();
        h.append(hn("set-cookie"), hv("a=1"));
        h.append(hn("content-type"), hv("text/plain"));
        h.append(hn("set-cookie"), hv("b=2"));
        let names: Vec<_> = h.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["set-cookie", "content-type", "set-cookie"]);
        assert_eq!(h.get_all(&hn("set-cookie")).count(), 2);
    }

    #[test]
    fn replace_removes_all_then_inserts_at_end() {
        let mut h = HeaderList::new();
        h.append(hn("etag"), hv("\"a\""));
        h.append(hn("content-type"), hv("text/plain"));
        h.append(hn("etag"), hv("\"b\""));
        h.replace(hn("etag"), hv("\"c\""));
        let names: Vec<_> = h.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["content-type", "etag"]);
        assert_eq!(h.get(&hn("etag")).unwrap(), &hv("\"c\""));
    }

    #[test]
    fn strips_hop_by_hop_and_connection_named_headers() {
        let mut h = HeaderList::new();
        h.append(hn("connection"), hv("x-custom"));
        h.append(hn("x-custom"), hv("secret"));
        h.append(hn("transfer-encoding"), hv("chunked"));
        h.append(hn("content-type"), hv("text/plain"));
        h.strip_hop_by_hop();
        assert!(!h.contains(&hn("connection")));
        assert!(!h.contains(&hn("x-custom")));
        assert!(!h.contains(&hn("transfer-encoding")));
        assert!(h.contains(&hn("content-type")));
    }

    #[test]
    fn strips_1xx_warnings_but_keeps_2xx() {
        let mut h = HeaderList::new();
        h.append(hn("warning"), hv("110 cache \"stale\""));
        h.append(hn("warning"), hv("214 cache \"transformed\""));
        h.strip_1xx_warnings();
        let remaining: Vec<_> =
            h.get_all(&hn("warning")).map(|v| v.to_str().unwrap().to_owned()).collect();
        assert_eq!(remaining, ["214 cache \"transformed\""]);
    }
}
