//! Flushing cache entries on unsafe methods (§4.8).

use http::{HeaderName, Method, StatusCode};

use crate::entry::CacheEntry;
use crate::headers::HeaderList;
use crate::key::StorageKey;
use crate::storage::Storage;

/// Methods whose successful response triggers invalidation of the affected
/// resource(s), beyond the safe `GET`/`HEAD`/`OPTIONS`/`TRACE` quartet.
const UNSAFE_METHODS: &[&str] = &["POST", "PUT", "DELETE", "PATCH"];

pub struct Invalidator;

impl Invalidator {
    /// Flushes every storage key affected by `method` against `primary_key`,
    /// given the origin's response headers. Only runs for 2xx/3xx responses
    /// to one of [`UNSAFE_METHODS`]; a no-op otherwise.
    pub async fn flush(
        storage: &dyn Storage,
        method: &Method,
        primary_key: &StorageKey,
        status: StatusCode,
        response_headers: &HeaderList,
    ) -> crate::error::Result<()> {
        if !UNSAFE_METHODS.contains(&method.as_str()) {
            return Ok(());
        }
        if !(status.is_success() || status.is_redirection()) {
            return Ok(());
        }

        let mut candidates = vec![primary_key.clone()];
        if let Some(key) = location_derived_key("content-location", primary_key, response_headers)
        {
            candidates.push(key);
        }
        if let Some(key) = location_derived_key("location", primary_key, response_headers) {
            candidates.push(key);
        }

        for key in candidates {
            if let Some(entry) = storage.get(&key).await? {
                if !is_older_than_response(&entry, response_headers) {
                    continue;
                }
                for variant_key in entry.variant_storage_keys() {
                    storage.remove(&variant_key).await?;
                }
                storage.remove(&key).await?;
            }
        }
        Ok(())
    }
}

fn location_derived_key(
    header: &str,
    primary_key: &StorageKey,
    response_headers: &HeaderList,
) -> Option<StorageKey> {
    let name: HeaderName = header.parse().ok()?;
    let value = response_headers.get(&name)?.to_str().ok()?;
    let key = StorageKey::from_absolute(value)?;
    if key.host() == primary_key.host() {
        Some(key)
    } else {
        None
    }
}

/// An entry is only flushed if it is demonstrably older than the triggering
/// response: `Date` strictly earlier and `ETag`s differ. Missing or
/// malformed dates on either side mean "don't flush" (conservative, per
/// §4.8).
fn is_older_than_response(entry: &CacheEntry, response_headers: &HeaderList) -> bool {
    let response_date = response_headers
        .get(&"date".parse().unwrap())
        .and_then(|v| v.to_str().ok())
        .and_then(crate::date::parse_http_date);
    let (Some(entry_date), Some(response_date)) = (entry.date(), response_date) else {
        return false;
    };
    if entry_date >= response_date {
        return false;
    }
    let response_etag = response_headers.get(&"etag".parse().unwrap()).and_then(|v| v.to_str().ok());
    match (entry.etag(), response_etag) {
        (Some(a), Some(b)) => a != b,
        _ => false,
    }
}
