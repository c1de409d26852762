//! Synthesizing validator-bearing sub-requests for revalidation (§4.5).

use http::{HeaderValue, Request};

use crate::entry::CacheEntry;
use crate::headers::HeaderList;
use crate::storage::Storage;

/// Builds conditional (and, for the stale-304 recovery path, unconditional)
/// revalidation requests from a stored entry.
pub struct ConditionalRequestBuilder;

impl ConditionalRequestBuilder {
    /// Adds whichever of `If-None-Match`/`If-Modified-Since` the entry
    /// supports onto `request`, returning the enriched headers to forward.
    /// For a variant-parent entry, `If-None-Match` lists every variant's
    /// ETag, comma-joined in a stable order.
    pub fn build<B>(
        &self,
        request: &Request<B>,
        entry: &CacheEntry,
        variant_etags: &[String],
    ) -> HeaderList {
        let mut headers = HeaderList::new();
        for (name, value) in request.headers() {
            headers.append(name.clone(), value.clone());
        }

        if !variant_etags.is_empty() {
            let joined = variant_etags.join(", ");
            if let Ok(value) = HeaderValue::from_str(&joined) {
                headers.replace("if-none-match".parse().unwrap(), value);
            }
        } else if let Some(etag) = entry.etag() {
            if let Ok(value) = HeaderValue::from_str(etag) {
                headers.replace("if-none-match".parse().unwrap(), value);
            }
        }

        if variant_etags.is_empty() {
            if let Some(last_modified) = entry.last_modified() {
                if let Ok(value) = HeaderValue::from_str(last_modified) {
                    headers.replace("if-modified-since".parse().unwrap(), value);
                }
            }
        }

        headers
    }

    /// Strips any conditional validators from `request`'s headers, used for
    /// the "retry with an unconditional GET" recovery path (§4.7, §4.10
    /// stale-304 rejection, §8 scenario 3).
    pub fn unconditional<B>(&self, request: &Request<B>) -> HeaderList {
        let mut headers = HeaderList::new();
        for (name, value) in request.headers() {
            headers.append(name.clone(), value.clone());
        }
        for name in [
            "if-none-match",
            "if-modified-since",
            "if-match",
            "if-unmodified-since",
            "if-range",
        ] {
            headers.remove_all(&name.parse().unwrap());
        }
        headers
    }
}

/// Collects every variant ETag reachable from a variant-parent entry, in a
/// stable (storage-key-sorted) order, for the comma-joined `If-None-Match`
/// this builder produces on a negotiated miss.
pub async fn collect_variant_etags(
    storage: &dyn Storage,
    entry: &CacheEntry,
) -> crate::error::Result<Vec<String>> {
    let mut etags = Vec::new();
    for key in entry.variant_storage_keys() {
        if let Some(variant) = storage.get(&key).await? {
            if let Some(etag) = variant.etag() {
                etags.push(etag.to_owned());
            }
        }
    }
    etags.sort();
    Ok(etags)
}
