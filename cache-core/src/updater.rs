//! Merging a 304 validation response into a stored entry (§4.7).

use std::time::SystemTime;

use http::{HeaderName, StatusCode};

use crate::entry::CacheEntry;
use crate::headers::HeaderList;

pub struct EntryUpdater;

impl EntryUpdater {
    /// Merges `revalidation_headers` (a 304's headers) into `entry`,
    /// replacing any header name the 304 mentions and leaving everything
    /// else untouched. The body and status line are kept as-is; only
    /// end-to-end metadata changes. Hop-by-hop headers and 1xx warnings
    /// never survive into the merged entry.
    pub fn merge(
        entry: &CacheEntry,
        revalidation_headers: &HeaderList,
        request_time: SystemTime,
        response_time: SystemTime,
    ) -> CacheEntry {
        let mut headers = entry.headers.clone();
        let mut seen = std::collections::HashSet::new();
        for (name, _) in revalidation_headers.iter() {
            if seen.insert(name.clone()) {
                let values: Vec<_> = revalidation_headers.get_all(name).cloned().collect();
                headers.remove_all(name);
                for value in values {
                    headers.append(name.clone(), value);
                }
            }
        }
        headers.strip_hop_by_hop();
        headers.strip_1xx_warnings();

        CacheEntry {
            request_method: entry.request_method.clone(),
            request_headers: entry.request_headers.clone(),
            request_time,
            response_time,
            status: entry.status,
            reason: entry.reason.clone(),
            headers,
            kind: entry.kind.clone(),
            generation: entry.generation + 1,
        }
    }

    /// Reconciles a `HEAD` response against a cached `GET` entry for the
    /// same resource: if `Content-Length` or `ETag` on the `HEAD` disagree
    /// with what's stored, the entry is considered stale and
    /// `CachingExecutor::store_response` discards it rather than merging.
    /// Called for every `HEAD` response that reaches storage, which is why
    /// it's isolated here rather than inlined into the executor.
    pub fn reconcile_head(entry: &CacheEntry, head_headers: &HeaderList) -> bool {
        let content_length: HeaderName = "content-length".parse().unwrap();
        let etag: HeaderName = "etag".parse().unwrap();

        if let (Some(stored), Some(head)) =
            (entry.headers.get(&content_length), head_headers.get(&content_length))
        {
            if stored != head {
                return true;
            }
        }
        if let (Some(stored), Some(head)) = (entry.headers.get(&etag), head_headers.get(&etag)) {
            if stored != head {
                return true;
            }
        }
        false
    }

    /// Whether a candidate 304's `Date` predates the stored entry's `Date`
    /// — the signal that the executor must retry unconditionally rather
    /// than apply this merge (§4.7, §8 scenario 3).
    pub fn is_stale_304(entry: &CacheEntry, revalidation_headers: &HeaderList) -> bool {
        let date: HeaderName = "date".parse().unwrap();
        let candidate_date = revalidation_headers
            .get(&date)
            .and_then(|v| v.to_str().ok())
            .and_then(crate::date::parse_http_date);
        match (entry.date(), candidate_date) {
            (Some(stored), Some(candidate)) => candidate < stored,
            _ => false,
        }
    }
}

/// A 304's status, for callers that only have a raw status code handy.
pub fn is_not_modified(status: StatusCode) -> bool {
    status == StatusCode::NOT_MODIFIED
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{InMemoryResourceFactory, ResourceFactory};
    use http::HeaderValue;
    use std::time::Duration;

    fn t(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn base_entry() -> CacheEntry {
        let mut h = HeaderList::new();
        h.append("date".parse().unwrap(), HeaderValue::from_static("Thu, 01 Jan 1970 00:00:10 GMT"));
        h.append("etag".parse().unwrap(), HeaderValue::from_static("\"v1\""));
        h.append("content-type".parse().unwrap(), HeaderValue::from_static("text/plain"));
        let body = InMemoryResourceFactory.create(b"hi".to_vec(), 100).unwrap();
        CacheEntry::new_leaf(http::Method::GET, HeaderList::new(), t(0), t(0), StatusCode::OK, None, h, body)
    }

    #[test]
    fn merge_replaces_named_headers_and_keeps_others() {
        let entry = base_entry();
        let mut fresh = HeaderList::new();
        fresh.append("date".parse().unwrap(), HeaderValue::from_static("Thu, 01 Jan 1970 00:01:00 GMT"));
        fresh.append("etag".parse().unwrap(), HeaderValue::from_static("\"v1\""));
        let merged = EntryUpdater::merge(&entry, &fresh, t(60), t(60));
        assert_eq!(merged.headers.get(&"date".parse().unwrap()).unwrap(), "Thu, 01 Jan 1970 00:01:00 GMT");
        assert_eq!(merged.headers.get(&"content-type".parse().unwrap()).unwrap(), "text/plain");
        assert_eq!(merged.generation, entry.generation + 1);
    }

    #[test]
    fn stale_304_with_older_date_is_flagged() {
        let entry = base_entry();
        let mut stale = HeaderList::new();
        stale.append("date".parse().unwrap(), HeaderValue::from_static("Thu, 01 Jan 1970 00:00:05 GMT"));
        assert!(EntryUpdater::is_stale_304(&entry, &stale));
    }

    #[test]
    fn fresh_304_with_newer_date_is_not_flagged() {
        let entry = base_entry();
        let mut fresh = HeaderList::new();
        fresh.append("date".parse().unwrap(), HeaderValue::from_static("Thu, 01 Jan 1970 00:01:00 GMT"));
        assert!(!EntryUpdater::is_stale_304(&entry, &fresh));
    }

    #[test]
    fn mismatched_etag_on_head_marks_reconciliation_needed() {
        let entry = base_entry();
        let mut head = HeaderList::new();
        head.append("etag".parse().unwrap(), HeaderValue::from_static("\"v2\""));
        assert!(EntryUpdater::reconcile_head(&entry, &head));
    }
}
