//! Whether a stored entry can satisfy a particular request right now
//! (§4.4).

use std::time::SystemTime;

use http::{HeaderValue, Request};
use http_cache_semantics::BeforeRequest;

use crate::cache_control::{has_pragma_no_cache, CacheControl};
use crate::config::CacheConfig;
use crate::entry::CacheEntry;
use crate::headers::HeaderList;
use crate::validity::{policy_for, query_parts, ValidityPolicy};

/// The four outcomes of a suitability check, first-match-wins per the
/// decision table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suitability {
    Suitable,
    SuitableStaleAllowed,
    MustRevalidate,
    Unusable,
}

pub struct SuitabilityChecker<'a> {
    config: &'a CacheConfig,
}

impl<'a> SuitabilityChecker<'a> {
    pub fn new(config: &'a CacheConfig) -> Self {
        SuitabilityChecker { config }
    }

    /// Delegates the core freshness/revalidation-gating decision to
    /// `http_cache_semantics::CachePolicy::before_request` (it already
    /// evaluates the request's own `no-cache`/`max-age`/`min-fresh`/
    /// `max-stale` directives against the entry's freshness, per §4.4),
    /// then layers the conditional-header check this engine still does
    /// itself on top (the crate has no notion of our 304-synthesis path).
    pub fn check<B>(
        &self,
        request: &Request<B>,
        request_headers: &HeaderList,
        entry: &CacheEntry,
        now: SystemTime,
    ) -> Suitability {
        let validity = ValidityPolicy::new(self.config);
        let revalidatable = validity.is_revalidatable(entry);

        if CacheControl::parse(request_headers).no_cache() || has_pragma_no_cache(request_headers) {
            return if revalidatable { Suitability::MustRevalidate } else { Suitability::Unusable };
        }

        let policy = policy_for(entry, self.config);
        let query = query_parts(request.method().clone(), request_headers);

        let base = match policy.before_request(&query, now) {
            BeforeRequest::Fresh(_) => {
                if validity.age(entry, now).is_stale() {
                    Suitability::SuitableStaleAllowed
                } else {
                    Suitability::Suitable
                }
            }
            BeforeRequest::Stale { .. } => {
                if revalidatable {
                    Suitability::MustRevalidate
                } else {
                    Suitability::Unusable
                }
            }
        };

        match base {
            Suitability::Suitable | Suitability::SuitableStaleAllowed
                if has_conditional_headers(request_headers)
                    && !conditions_satisfied_by(entry, request_headers) =>
            {
                Suitability::Unusable
            }
            other => other,
        }
    }
}

fn has_conditional_headers(headers: &HeaderList) -> bool {
    ["if-modified-since", "if-none-match", "if-match", "if-unmodified-since", "if-range"]
        .iter()
        .any(|name| headers.contains(&name.parse().unwrap()))
}

/// Evaluates request-supplied validators against the entry's own. Strong
/// comparison is used throughout except `If-None-Match`/`If-Modified-Since`
/// on a full-body `GET`, which may match weakly. Exposed for
/// `ResponseGenerator`, which needs the same verdict to decide whether to
/// synthesize a 304.
pub fn conditions_satisfied_by(entry: &CacheEntry, headers: &HeaderList) -> bool {
    if !has_conditional_headers(headers) {
        return false;
    }
    conditions_satisfied_inner(entry, headers)
}

fn conditions_satisfied_inner(entry: &CacheEntry, headers: &HeaderList) -> bool {
    if let Some(inm) = headers.get(&"if-none-match".parse().unwrap()) {
        if !etag_list_matches(inm, entry.etag(), true) {
            return false;
        }
    }
    if let Some(ims) = headers.get(&"if-modified-since".parse().unwrap()) {
        if let (Some(ims), Some(lm)) = (
            ims.to_str().ok().and_then(crate::date::parse_http_date),
            entry.last_modified().and_then(crate::date::parse_http_date),
        ) {
            if lm > ims {
                return false;
            }
        }
    }
    if let Some(im) = headers.get(&"if-match".parse().unwrap()) {
        if !etag_list_matches(im, entry.etag(), false) {
            return false;
        }
    }
    if let Some(ius) = headers.get(&"if-unmodified-since".parse().unwrap()) {
        if let (Some(ius), Some(lm)) = (
            ius.to_str().ok().and_then(crate::date::parse_http_date),
            entry.last_modified().and_then(crate::date::parse_http_date),
        ) {
            if lm > ius {
                return false;
            }
        }
    }
    if let Some(ir) = headers.get(&"if-range".parse().unwrap()) {
        if !if_range_satisfied(ir, entry) {
            return false;
        }
    }
    true
}

/// `If-Range` (RFC 7233 §3.2) is satisfied when its value names an entity
/// tag matching the entry's current (strong) `ETag`, or a date that is not
/// earlier than the entry's `Last-Modified`. A value this engine can't
/// parse as either is treated as unsatisfied, the conservative choice.
fn if_range_satisfied(value: &HeaderValue, entry: &CacheEntry) -> bool {
    let Ok(value) = value.to_str() else { return false };
    if value.starts_with('"') || value.starts_with("W/\"") {
        return entry.etag().map_or(false, |etag| !etag.starts_with("W/") && etag == value);
    }
    match (crate::date::parse_http_date(value), entry.last_modified().and_then(crate::date::parse_http_date)) {
        (Some(if_range_date), Some(lm)) => lm <= if_range_date,
        _ => false,
    }
}

fn etag_list_matches(header_value: &HeaderValue, entry_etag: Option<&str>, weak_ok: bool) -> bool {
    let value = match header_value.to_str() {
        Ok(v) => v,
        Err(_) => return false,
    };
    if value.trim() == "*" {
        return entry_etag.is_some();
    }
    let Some(entry_etag) = entry_etag else { return false };
    value.split(',').any(|candidate| {
        let candidate = candidate.trim();
        if weak_ok {
            strip_weak_prefix(candidate) == strip_weak_prefix(entry_etag)
        } else {
            !candidate.starts_with("W/") && !entry_etag.starts_with("W/") && candidate == entry_etag
        }
    })
}

fn strip_weak_prefix(tag: &str) -> &str {
    tag.strip_prefix("W/").unwrap_or(tag)
}
