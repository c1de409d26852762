//! Freshness, age, and revalidatability arithmetic (§4.1).

use std::time::{Duration, SystemTime};

use http::{HeaderMap, Request, Response};
use http_cache_semantics::{CacheOptions, CachePolicy};

use crate::cache_control::CacheControl;
use crate::config::CacheConfig;
use crate::date::non_negative_duration;
use crate::entry::CacheEntry;
use crate::headers::HeaderList;

/// Status codes §4.3/§9(b) admit to heuristic freshness, shared between
/// `ResponsePolicy` and `ValidityPolicy` so the two can't drift apart.
pub const HEURISTIC_STATUS_CODES: &[u16] =
    &[200, 203, 204, 206, 300, 301, 404, 405, 410, 414, 501];

/// The three age quantities and the freshness lifetime computed for one
/// entry at one instant, plus the staleness derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Age {
    pub apparent_age: Duration,
    pub corrected_initial_age: Duration,
    pub current_age: Duration,
    pub freshness_lifetime: Duration,
    pub staleness: Duration,
    /// Whether `freshness_lifetime` came from RFC 7234 §4.2.2's heuristic
    /// (no explicit expiration, derived from `Last-Modified`) rather than
    /// from an explicit `max-age`/`s-maxage`/`Expires`.
    pub heuristic: bool,
}

impl Age {
    pub fn is_stale(&self) -> bool {
        self.staleness > Duration::ZERO
    }
}

/// Computes freshness/age quantities and revalidation rules for stored
/// entries. Stateless beyond the `CacheConfig` it's handed; takes `now` as
/// an explicit parameter everywhere rather than reading a process clock.
pub struct ValidityPolicy<'a> {
    config: &'a CacheConfig,
}

impl<'a> ValidityPolicy<'a> {
    pub fn new(config: &'a CacheConfig) -> Self {
        ValidityPolicy { config }
    }

    /// Computes [`Age`] for `entry` as observed at `now`, delegating the
    /// RFC 7234 §4.2 age/freshness math to `http_cache_semantics::CachePolicy`
    /// (see [`policy_for`]) rather than re-deriving it by hand.
    pub fn age(&self, entry: &CacheEntry, now: SystemTime) -> Age {
        let cc = CacheControl::parse(&entry.headers);
        let policy = policy_for(entry, self.config);

        let date = entry.date().unwrap_or(entry.response_time);
        let apparent_age = non_negative_duration(entry.response_time, date);
        let header_age = header_age_secs(entry).unwrap_or(0);
        let corrected_initial_age = std::cmp::max(apparent_age, Duration::from_secs(header_age))
            + non_negative_duration(entry.response_time, entry.request_time);

        let current_age = policy.age(now);
        let heuristic = self.is_heuristic(entry, &cc);

        // `CachePolicy::max_age` isn't exposed publicly, so the base
        // freshness lifetime is recovered from the two methods that are:
        // time_to_live() + age(), evaluated at response_time rather than
        // `now` so the saturating-at-zero clamp `time_to_live` applies once
        // stale never kicks in. freshness_lifetime is time-invariant, so
        // this reconstruction holds regardless of how stale `entry` is now.
        let mut freshness_lifetime =
            policy.time_to_live(entry.response_time) + policy.age(entry.response_time);

        // The vendored crate lets an explicit max-age win over `immutable`
        // in the same Cache-Control; we want `immutable` to floor the
        // lifetime even over an explicit max-age, so that floor is applied
        // here on top of the crate's base value rather than inside it.
        if cc.immutable() {
            freshness_lifetime = std::cmp::max(freshness_lifetime, self.config.immutable_min_ttl);
        }
        if let Some(max_ttl) = self.config.max_ttl {
            freshness_lifetime = std::cmp::min(freshness_lifetime, max_ttl);
        }

        let staleness = current_age.checked_sub(freshness_lifetime).unwrap_or(Duration::ZERO);

        Age {
            apparent_age,
            corrected_initial_age,
            current_age,
            freshness_lifetime,
            staleness,
            heuristic,
        }
    }

    /// Whether `entry`'s freshness lifetime came from §4.2.2's heuristic
    /// (no explicit expiration, derived from `Last-Modified`) rather than an
    /// explicit `max-age`/`s-maxage`/`Expires`. The crate computes the same
    /// distinction internally but doesn't expose it, so it's re-derived from
    /// the same `Cache-Control`/`Expires` fields it would have consulted.
    fn is_heuristic(&self, entry: &CacheEntry, cc: &CacheControl) -> bool {
        if self.config.shared_cache && cc.s_maxage().is_some() {
            return false;
        }
        if cc.max_age().is_some() {
            return false;
        }
        if header_str(entry, "expires").and_then(crate::date::parse_http_date).is_some() {
            return false;
        }
        HEURISTIC_STATUS_CODES.contains(&entry.status.as_u16())
            && entry.last_modified().and_then(crate::date::parse_http_date).is_some()
    }

    pub fn is_revalidatable(&self, entry: &CacheEntry) -> bool {
        entry.is_revalidatable()
    }

    /// `Cache-Control: must-revalidate` always applies; `proxy-revalidate`
    /// applies only when this cache is configured shared.
    pub fn must_revalidate(&self, entry: &CacheEntry) -> bool {
        let cc = CacheControl::parse(&entry.headers);
        cc.must_revalidate() || (self.config.shared_cache && cc.proxy_revalidate())
    }

    /// Whether a stale entry may still be served while a background
    /// revalidation runs, per the response's `stale-while-revalidate=N`.
    pub fn stale_while_revalidate_allowed(&self, entry: &CacheEntry, age: &Age) -> bool {
        if self.must_revalidate(entry) {
            return false;
        }
        let cc = CacheControl::parse(&entry.headers);
        match cc.stale_while_revalidate() {
            Some(n) => age.staleness <= Duration::from_secs(n),
            None => false,
        }
    }

    /// Whether a stale entry may be served after a failed revalidation
    /// attempt, per the response's `stale-if-error=N`.
    pub fn stale_if_error_allowed(&self, entry: &CacheEntry, age: &Age) -> bool {
        let cc = CacheControl::parse(&entry.headers);
        match cc.stale_if_error() {
            Some(n) => age.staleness <= Duration::from_secs(n),
            None => false,
        }
    }
}

fn cache_options(config: &CacheConfig) -> CacheOptions {
    CacheOptions {
        shared: config.shared_cache,
        cache_heuristic: config.heuristic_coefficient as f32,
        immutable_min_time_to_live: config.immutable_min_ttl,
        ignore_cargo_cult: false,
    }
}

/// Rebuilds the `http_cache_semantics::CachePolicy` the original exchange
/// would have produced, from the request/response halves `entry` carries.
/// The request side is given a placeholder `/` URI since `CacheEntry` has no
/// notion of the request's own URI (identity is the caller's storage key,
/// not anything this policy needs to compare); callers that also query
/// [`CachePolicy::before_request`] must build their query request the same
/// way for `request_matches`'s URI comparison to stay meaningful.
pub(crate) fn policy_for(entry: &CacheEntry, config: &CacheConfig) -> CachePolicy {
    let (mut req_parts, _) = Request::builder()
        .method(entry.request_method.clone())
        .uri("/")
        .body(())
        .unwrap()
        .into_parts();
    req_parts.headers = HeaderMap::from(&entry.request_headers);

    let (mut res_parts, _) = Response::builder().status(entry.status).body(()).unwrap().into_parts();
    res_parts.headers = HeaderMap::from(&entry.headers);

    CachePolicy::new_options(&req_parts, &res_parts, entry.response_time, cache_options(config))
}

/// Builds the placeholder request `CachePolicy::before_request` is queried
/// with, matching [`policy_for`]'s URI convention exactly.
pub(crate) fn query_parts(method: http::Method, headers: &HeaderList) -> http::request::Parts {
    let (mut parts, _) = Request::builder().method(method).uri("/").body(()).unwrap().into_parts();
    parts.headers = HeaderMap::from(headers);
    parts
}

fn header_age_secs(entry: &CacheEntry) -> Option<u64> {
    header_str(entry, "age").and_then(|v| v.parse().ok())
}

fn header_str<'a>(entry: &'a CacheEntry, name: &str) -> Option<&'a str> {
    let name: http::HeaderName = name.parse().ok()?;
    entry.headers.get(&name).and_then(|v| v.to_str().ok())
}
