//! Rate-limit wait estimation from fault text and response headers.
//!
//! Both sources are best-effort: anything absent or unparsable yields `None`
//! and the executor falls back to its generic backoff.

use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;

/// Header carrying the number of requests left in the current window.
pub const RATE_LIMIT_AVAILABLE: &str = "X-Ratelimit-Available";
/// Header carrying the time at which the window renews.
///
/// Sent as milliseconds since the epoch (`X-Ratelimit-Expiry: 1369168800000`),
/// the same unit as the quota-violation fault string.
pub const RATE_LIMIT_EXPIRY: &str = "X-Ratelimit-Expiry";

const QUOTA_VIOLATION_PREFIX: &str = "Quota Violation";

/// Extract the quota renewal time from a `"Quota Violation ... <unix-ms>"` fault string.
///
/// The trailing token is milliseconds since the epoch; the result is truncated
/// to whole seconds.
#[must_use]
pub fn quota_violation_expiry(message: &str) -> Option<DateTime<Utc>> {
    if !message.starts_with(QUOTA_VIOLATION_PREFIX) {
        return None;
    }
    let ms: i64 = message.split_whitespace().last()?.parse().ok()?;
    DateTime::from_timestamp(ms.div_euclid(1000), 0)
}

/// Extract the window renewal time when the rate-limit headers report zero requests left.
#[must_use]
pub fn header_expiry(headers: &HeaderMap) -> Option<DateTime<Utc>> {
    let available = header_i64(headers, RATE_LIMIT_AVAILABLE)?;
    let expiry = header_i64(headers, RATE_LIMIT_EXPIRY)?;
    if available == 0 && expiry > 0 {
        DateTime::from_timestamp_millis(expiry)
    } else {
        None
    }
}

/// Latest renewal time reported by either the fault string or the headers.
#[must_use]
pub fn estimate_wait_until(message: &str, headers: &HeaderMap) -> Option<DateTime<Utc>> {
    match (quota_violation_expiry(message), header_expiry(headers)) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    }
}

fn header_i64(headers: &HeaderMap, name: &str) -> Option<i64> {
    headers.get(name)?.to_str().ok()?.trim().parse().ok()
}
