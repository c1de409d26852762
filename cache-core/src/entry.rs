//! The stored-entry data model (§3).

use std::collections::BTreeMap;
use std::time::SystemTime;

use http::{HeaderName, Method, StatusCode};

use crate::headers::HeaderList;
use crate::key::StorageKey;
use crate::resource::ResourceHandle;

/// What a [`CacheEntry`] holds: either a leaf with a real body, or a variant
/// parent mapping `Vary`-derived keys to sibling storage keys. Modeled as a
/// tagged sum rather than an "optional variant map" flag so the two shapes
/// are exhaustively distinguished at compile time instead of by convention.
#[derive(Debug, Clone)]
pub enum EntryKind {
    /// A normal stored response, immediately usable to satisfy a request.
    Leaf { body: ResourceHandle },
    /// A negotiation point: `variants` maps a variant key (derived per
    /// §3 from the field-names in this entry's own `Vary` header) to the
    /// storage key of a sibling leaf entry. A variant parent's own `body`,
    /// if present, is never served directly — it requires negotiation.
    VariantParent { variants: BTreeMap<String, StorageKey> },
}

/// One stored origin response (§3). `request_time`/`response_time` are the
/// wall-clock instants the *original* exchange with the origin spanned;
/// `headers` holds only end-to-end headers (hop-by-hop fields are stripped
/// before an entry is ever constructed, see [`HeaderList::strip_hop_by_hop`]).
/// `request_method`/`request_headers` are the request side of that same
/// exchange, kept so a `http_cache_semantics::CachePolicy` can be rebuilt
/// for this entry exactly as it would have been built at fetch time
/// (`ValidityPolicy::policy_for`).
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub request_method: Method,
    pub request_headers: HeaderList,
    pub request_time: SystemTime,
    pub response_time: SystemTime,
    pub status: StatusCode,
    pub reason: Option<String>,
    pub headers: HeaderList,
    pub kind: EntryKind,
    /// Monotonically increasing stamp bumped on every successful write,
    /// used by `Storage::update`'s compare-and-set to detect that the
    /// caller's view is still current without comparing entire entries.
    pub generation: u64,
}

impl CacheEntry {
    /// A new leaf entry for a freshly fetched response.
    pub fn new_leaf(
        request_method: Method,
        request_headers: HeaderList,
        request_time: SystemTime,
        response_time: SystemTime,
        status: StatusCode,
        reason: Option<String>,
        mut headers: HeaderList,
        body: ResourceHandle,
    ) -> Self {
        headers.strip_hop_by_hop();
        CacheEntry {
            request_method,
            request_headers,
            request_time,
            response_time,
            status,
            reason,
            headers,
            kind: EntryKind::Leaf { body },
            generation: 0,
        }
    }

    /// A variant-parent placeholder entry, created the first time a
    /// `Vary`-ful response is stored for a given primary key.
    pub fn new_variant_parent(
        request_method: Method,
        request_headers: HeaderList,
        request_time: SystemTime,
        response_time: SystemTime,
        status: StatusCode,
        reason: Option<String>,
        mut headers: HeaderList,
    ) -> Self {
        headers.strip_hop_by_hop();
        CacheEntry {
            request_method,
            request_headers,
            request_time,
            response_time,
            status,
            reason,
            headers,
            kind: EntryKind::VariantParent { variants: BTreeMap::new() },
            generation: 0,
        }
    }

    pub fn is_variant_parent(&self) -> bool {
        matches!(self.kind, EntryKind::VariantParent { .. })
    }

    pub fn body(&self) -> Option<&ResourceHandle> {
        match &self.kind {
            EntryKind::Leaf { body } => Some(body),
            EntryKind::VariantParent { .. } => None,
        }
    }

    pub fn etag(&self) -> Option<&str> {
        header_str(&self.headers, "etag")
    }

    pub fn last_modified(&self) -> Option<&str> {
        header_str(&self.headers, "last-modified")
    }

    /// Revalidatable iff it carries a strong or weak validator (§4.1).
    pub fn is_revalidatable(&self) -> bool {
        self.etag().is_some() || self.last_modified().is_some()
    }

    pub fn date(&self) -> Option<SystemTime> {
        header_str(&self.headers, "date").and_then(crate::date::parse_http_date)
    }

    pub fn vary_field_names(&self) -> Vec<String> {
        header_str(&self.headers, "vary").map(crate::key::parse_vary).unwrap_or_default()
    }

    /// Inserts or replaces a variant edge on a variant-parent entry,
    /// bumping the generation stamp.
    pub fn with_variant(mut self, variant_key: String, storage_key: StorageKey) -> Self {
        if let EntryKind::VariantParent { variants } = &mut self.kind {
            variants.insert(variant_key, storage_key);
        }
        self.generation += 1;
        self
    }

    pub fn variant_storage_key(&self, variant_key: &str) -> Option<&StorageKey> {
        match &self.kind {
            EntryKind::VariantParent { variants } => variants.get(variant_key),
            EntryKind::Leaf { .. } => None,
        }
    }

    pub fn variant_storage_keys(&self) -> Vec<StorageKey> {
        match &self.kind {
            EntryKind::VariantParent { variants } => variants.values().cloned().collect(),
            EntryKind::Leaf { .. } => Vec::new(),
        }
    }
}

fn header_str<'a>(headers: &'a HeaderList, name: &str) -> Option<&'a str> {
    let name: HeaderName = name.parse().ok()?;
    headers.get(&name).and_then(|v| v.to_str().ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::InMemoryResourceFactory;
    use crate::resource::ResourceFactory;
    use http::HeaderValue;
    use std::time::Duration;

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    #[test]
    fn hop_by_hop_headers_never_survive_construction() {
        let mut headers = HeaderList::new();
        headers.append("connection".parse().unwrap(), HeaderValue::from_static("keep-alive"));
        headers.append("content-type".parse().unwrap(), HeaderValue::from_static("text/plain"));
        let body = InMemoryResourceFactory.create(b"hi".to_vec(), 100).unwrap();
        let entry = CacheEntry::new_leaf(
            http::Method::GET,
            HeaderList::new(),
            t(0),
            t(0),
            StatusCode::OK,
            None,
            headers,
            body,
        );
        assert!(!entry.headers.contains(&"connection".parse().unwrap()));
        assert!(entry.headers.contains(&"content-type".parse().unwrap()));
    }

    #[test]
    fn variant_parent_round_trips_an_inserted_variant() {
        let entry = CacheEntry::new_variant_parent(
            http::Method::GET,
            HeaderList::new(),
            t(0),
            t(0),
            StatusCode::OK,
            None,
            HeaderList::new(),
        );
        let key = StorageKey::build("http", "example.com", &"/r".parse().unwrap());
        let entry = entry.with_variant("accept-encoding=gzip".into(), key.clone());
        assert_eq!(entry.variant_storage_key("accept-encoding=gzip"), Some(&key));
        assert_eq!(entry.generation, 1);
    }
}
