//! Pre-admission request normalization and post-origin response annotation
//! (§4.9).

use std::time::SystemTime;

use http::{HeaderValue, Version};

use crate::headers::HeaderList;

/// The pseudonym this cache identifies itself as in `Via` headers.
const VIA_PSEUDONYM: &str = "cache-core";

/// Why a request was rejected before ever reaching the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComplianceFailure {
    WeakValidatorOnUnsafeConditional,
    WeakValidatorOnSubrangeIfRange,
    MaxForwardsExhausted,
}

pub struct ProtocolCompliance;

impl ProtocolCompliance {
    /// Normalizes `version`: any `HTTP/1.x` collapses to `HTTP/1.1`;
    /// anything HTTP/2 or newer tunnels through unchanged.
    pub fn normalize_version(version: Version) -> Version {
        match version {
            Version::HTTP_09 | Version::HTTP_10 | Version::HTTP_11 => Version::HTTP_11,
            other => other,
        }
    }

    /// Checks the request for conditions that make it fatally
    /// non-compliant and must be answered locally with a 400, without ever
    /// reaching the backend.
    pub fn check_fatal(method: &http::Method, headers: &HeaderList) -> Option<ComplianceFailure> {
        let if_match_or_none_match_weak = ["if-match", "if-none-match"].iter().any(|name| {
            headers
                .get(&name.parse().unwrap())
                .and_then(|v| v.to_str().ok())
                .map(|v| v.trim_start().starts_with("W/"))
                .unwrap_or(false)
        });
        if *method != http::Method::GET && if_match_or_none_match_weak {
            return Some(ComplianceFailure::WeakValidatorOnUnsafeConditional);
        }

        if headers.contains(&"range".parse().unwrap()) {
            if let Some(if_range) = headers.get(&"if-range".parse().unwrap()) {
                if let Ok(value) = if_range.to_str() {
                    if value.trim_start().starts_with("W/") {
                        return Some(ComplianceFailure::WeakValidatorOnSubrangeIfRange);
                    }
                }
            }
        }

        None
    }

    /// Strips `Expect: 100-continue` from a request known to carry no body.
    pub fn strip_expect_continue_without_body(headers: &mut HeaderList, has_body: bool) {
        if !has_body {
            headers.remove_all(&"expect".parse().unwrap());
        }
    }

    /// Decrements `Max-Forwards` for `OPTIONS`/`TRACE`, returning `true` if
    /// it has reached zero and a local response must be synthesized
    /// instead of forwarding.
    pub fn decrement_max_forwards(method: &http::Method, headers: &mut HeaderList) -> bool {
        if !matches!(*method, http::Method::OPTIONS | http::Method::TRACE) {
            return false;
        }
        let name: http::HeaderName = "max-forwards".parse().unwrap();
        let Some(current) = headers.get(&name).and_then(|v| v.to_str().ok()).and_then(|v| v.parse::<u64>().ok())
        else {
            return false;
        };
        if current == 0 {
            return true;
        }
        if let Ok(value) = HeaderValue::from_str(&(current - 1).to_string()) {
            headers.replace(name, value);
        }
        current - 1 == 0
    }

    /// Post-origin annotation: appends this cache's `Via` entry, fills in
    /// `Date` if the origin omitted it, and ensures `Age` is present when
    /// the response came from cache.
    pub fn annotate(headers: &mut HeaderList, response_time: SystemTime, served_from_cache: bool) {
        let via_name: http::HeaderName = "via".parse().unwrap();
        let existing: Vec<_> = headers.get_all(&via_name).cloned().collect();
        headers.remove_all(&via_name);
        for v in existing {
            headers.append(via_name.clone(), v);
        }
        if let Ok(entry) = HeaderValue::from_str(&format!("1.1 {}", VIA_PSEUDONYM)) {
            headers.append(via_name, entry);
        }

        if !headers.contains(&"date".parse().unwrap()) {
            if let Ok(value) = HeaderValue::from_str(&crate::date::format_http_date(response_time)) {
                headers.append("date".parse().unwrap(), value);
            }
        }

        if served_from_cache && !headers.contains(&"age".parse().unwrap()) {
            headers.append("age".parse().unwrap(), HeaderValue::from_static("0"));
        }
    }

    /// `304` responses must never carry a body (RFC 7230 §3.3.3 item 1).
    /// Origins occasionally send one anyway; `CachingExecutor::revalidate`
    /// calls this right as a backend-returned 304 enters the system and
    /// clears the body when it reports `true`, before the response ever
    /// reaches `EntryUpdater::merge` or the caller.
    pub fn strip_304_body_flag(status: http::StatusCode) -> bool {
        status == http::StatusCode::NOT_MODIFIED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_1_0_upgrades_to_1_1() {
        assert_eq!(ProtocolCompliance::normalize_version(Version::HTTP_10), Version::HTTP_11);
    }

    #[test]
    fn http_2_tunnels_unchanged() {
        assert_eq!(ProtocolCompliance::normalize_version(Version::HTTP_2), Version::HTTP_2);
    }

    #[test]
    fn weak_if_match_on_put_is_fatally_non_compliant() {
        let mut headers = HeaderList::new();
        headers.append("if-match".parse().unwrap(), HeaderValue::from_static("W/\"v1\""));
        assert_eq!(
            ProtocolCompliance::check_fatal(&http::Method::PUT, &headers),
            Some(ComplianceFailure::WeakValidatorOnUnsafeConditional)
        );
    }

    #[test]
    fn weak_if_match_on_get_is_fine() {
        let mut headers = HeaderList::new();
        headers.append("if-match".parse().unwrap(), HeaderValue::from_static("W/\"v1\""));
        assert_eq!(ProtocolCompliance::check_fatal(&http::Method::GET, &headers), None);
    }

    #[test]
    fn max_forwards_reaching_zero_is_flagged() {
        let mut headers = HeaderList::new();
        headers.append("max-forwards".parse().unwrap(), HeaderValue::from_static("0"));
        assert!(ProtocolCompliance::decrement_max_forwards(&http::Method::TRACE, &mut headers));
    }

    #[test]
    fn max_forwards_decrements_otherwise() {
        let mut headers = HeaderList::new();
        headers.append("max-forwards".parse().unwrap(), HeaderValue::from_static("3"));
        assert!(!ProtocolCompliance::decrement_max_forwards(&http::Method::OPTIONS, &mut headers));
        assert_eq!(headers.get(&"max-forwards".parse().unwrap()).unwrap(), "2");
    }

    #[test]
    fn via_is_appended_and_date_filled_in() {
        let mut headers = HeaderList::new();
        ProtocolCompliance::annotate(&mut headers, SystemTime::UNIX_EPOCH, false);
        assert!(headers.get(&"via".parse().unwrap()).unwrap().to_str().unwrap().contains("cache-core"));
        assert!(headers.contains(&"date".parse().unwrap()));
    }
}
