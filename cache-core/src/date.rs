//! Parsing/formatting of HTTP-dates and the small duration arithmetic the
//! rest of the crate needs. Delegates the actual grammar to
//! [`httpdate`](https://docs.rs/httpdate), which already implements RFC 7231
//! section 7.1.1.1 (it accepts the obsolete `asctime`/RFC 850 forms too).

use std::time::{Duration, SystemTime};

/// Parses an HTTP-date header value. Returns `None` on anything malformed,
/// per the spec's "missing/malformed ⇒ treat as absent" rule used throughout
/// `ValidityPolicy`.
pub fn parse_http_date(value: &str) -> Option<SystemTime> {
    httpdate::parse_http_date(value.trim()).ok()
}

/// Formats an instant as an RFC 7231 IMF-fixdate, the preferred form for
/// generated `Date`/`Expires`/`Age`-adjacent headers.
pub fn format_http_date(time: SystemTime) -> String {
    httpdate::fmt_http_date(time)
}

/// `a − b` clamped to zero, since HTTP ages are never negative even when
/// clocks disagree or drift backward.
pub fn non_negative_duration(a: SystemTime, b: SystemTime) -> Duration {
    a.duration_since(b).unwrap_or(Duration::ZERO)
}
