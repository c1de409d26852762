//! `Cache-Control` directive parsing.
//!
//! Grounded on the parsing approach `http-cache-semantics` uses: directives
//! are a flat case-sensitive-key map of `name -> Option<value>`, built by
//! splitting on commas across every `Cache-Control` header instance (there
//! can legally be more than one). A directive repeated with conflicting
//! values makes the whole header untrustworthy, so we conservatively fold
//! that into an implied `must-revalidate`.

use std::collections::HashMap;

use crate::headers::HeaderList;

/// Parsed `Cache-Control` directives: lower-cased directive name to an
/// optional quoted-or-bare value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheControl(HashMap<String, Option<String>>);

impl CacheControl {
    /// Parses every `Cache-Control` header instance present in `headers`.
    pub fn parse(headers: &HeaderList) -> Self {
        let cache_control = "cache-control".parse().unwrap();
        let mut map: HashMap<String, Option<String>> = HashMap::new();
        let mut conflicting = false;

        for raw in headers.get_all(&cache_control).filter_map(|v| v.to_str().ok()) {
            for part in raw.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let mut kv = part.splitn(2, '=');
                let key = kv.next().unwrap().trim().to_ascii_lowercase();
                if key.is_empty() {
                    continue;
                }
                let value = kv.next().map(|v| v.trim().trim_matches('"').to_owned());
                match map.get(&key) {
                    Some(existing) if existing != &value => conflicting = true,
                    _ => {
                        map.insert(key, value);
                    }
                }
            }
        }
        if conflicting {
            map.insert("must-revalidate".to_owned(), None);
        }
        CacheControl(map)
    }

    /// Whether a bare or valued directive is present at all.
    pub fn has(&self, directive: &str) -> bool {
        self.0.contains_key(directive)
    }

    /// The parsed integer value of a `directive=N` pair, if present and
    /// well-formed. A malformed value is treated as absent.
    pub fn seconds(&self, directive: &str) -> Option<u64> {
        self.0.get(directive)?.as_deref()?.parse().ok()
    }

    pub fn no_store(&self) -> bool {
        self.has("no-store")
    }
    pub fn no_cache(&self) -> bool {
        self.has("no-cache")
    }
    pub fn must_revalidate(&self) -> bool {
        self.has("must-revalidate")
    }
    pub fn proxy_revalidate(&self) -> bool {
        self.has("proxy-revalidate")
    }
    pub fn public(&self) -> bool {
        self.has("public")
    }
    pub fn private(&self) -> bool {
        self.has("private")
    }
    pub fn immutable(&self) -> bool {
        self.has("immutable")
    }
    pub fn no_transform(&self) -> bool {
        self.has("no-transform")
    }
    pub fn only_if_cached(&self) -> bool {
        self.has("only-if-cached")
    }
    pub fn max_age(&self) -> Option<u64> {
        self.seconds("max-age")
    }
    pub fn s_maxage(&self) -> Option<u64> {
        self.seconds("s-maxage")
    }
    pub fn min_fresh(&self) -> Option<u64> {
        self.seconds("min-fresh")
    }
    /// `max-stale` with no value means "any staleness", represented as `Some(u64::MAX)`.
    pub fn max_stale(&self) -> Option<u64> {
        match self.0.get("max-stale") {
            Some(Some(v)) => v.parse().ok(),
            Some(None) => Some(u64::MAX),
            None => None,
        }
    }
    pub fn stale_while_revalidate(&self) -> Option<u64> {
        self.seconds("stale-while-revalidate")
    }
    pub fn stale_if_error(&self) -> Option<u64> {
        self.seconds("stale-if-error")
    }
}

/// Whether `Pragma: no-cache` is present (an HTTP/1.0 relic that `RequestPolicy`
/// and `SuitabilityChecker` still have to honor on requests).
pub fn has_pragma_no_cache(headers: &HeaderList) -> bool {
    let pragma = "pragma".parse().unwrap();
    headers.get_all(&pragma).filter_map(|v| v.to_str().ok()).any(|v| {
        v.split(',').any(|tok| tok.trim().eq_ignore_ascii_case("no-cache"))
    })
}
