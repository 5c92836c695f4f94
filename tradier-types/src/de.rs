//! Lenient deserializers for the shapes the API actually sends.
//!
//! Numbers arrive both as JSON numbers and as strings, floats may be `"NaN"`,
//! timestamps come in several textual layouts, and single-element lists are
//! sometimes collapsed to a bare object.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Parse a timestamp in any of the layouts the API uses.
///
/// Accepts RFC 3339, `YYYY-MM-DDTHH:MM:SS`, `YYYY-MM-DD`, `HH:MM` (anchored to
/// the Unix epoch date), and integer milliseconds since the epoch. Layouts
/// without an offset are interpreted as UTC.
#[must_use]
pub fn parse_flexible_time(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
        return Some(Utc.from_utc_datetime(&t));
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Some(Utc.from_utc_datetime(&d.and_time(NaiveTime::MIN)));
    }
    if let Ok(t) = NaiveTime::parse_from_str(s, "%H:%M") {
        return Some(Utc.from_utc_datetime(&NaiveDate::default().and_time(t)));
    }
    s.parse::<i64>().ok().and_then(from_millis)
}

/// Convert milliseconds since the Unix epoch into a UTC timestamp.
#[must_use]
pub fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(ms)
}

/// Deserialize an optional timestamp from any supported layout; `null` and `"null"` map to `None`.
///
/// # Errors
/// Returns an error if a non-null value cannot be parsed as a timestamp.
pub fn flexible_time<'de, D>(d: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(d)? {
        Value::Null => Ok(None),
        Value::String(s) if s.is_empty() || s == "null" => Ok(None),
        Value::String(s) => parse_flexible_time(&s)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("unrecognized time: {s}"))),
        Value::Number(n) => n
            .as_i64()
            .and_then(from_millis)
            .map(Some)
            .ok_or_else(|| D::Error::custom(format!("unrecognized time: {n}"))),
        other => Err(D::Error::custom(format!("unrecognized time: {other}"))),
    }
}

/// Deserialize a float that may be encoded as a string, including `"NaN"`.
///
/// # Errors
/// Returns an error if the value is neither a number nor a numeric string.
pub fn lenient_f64<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(d)? {
        Value::Null => Ok(f64::NAN),
        Value::Number(n) => n
            .as_f64()
            .ok_or_else(|| D::Error::custom(format!("not a float: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|e| D::Error::custom(format!("not a float: {s:?}: {e}"))),
        other => Err(D::Error::custom(format!("not a float: {other}"))),
    }
}

/// Deserialize an integer that may be encoded as a string.
///
/// # Errors
/// Returns an error if the value is neither an integer nor an integer string.
pub fn lenient_i64<'de, D>(d: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(d)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_i64()
            // Volumes occasionally arrive as whole floats ("1200.0").
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
            .ok_or_else(|| D::Error::custom(format!("not an integer: {n}"))),
        Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| D::Error::custom(format!("not an integer: {s:?}: {e}"))),
        other => Err(D::Error::custom(format!("not an integer: {other}"))),
    }
}

/// Deserialize a list that the server collapses to a single object when it has one element.
///
/// # Errors
/// Returns an error if the value is neither a list of `T` nor a single `T`.
pub fn one_or_many<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    match Value::deserialize(d)? {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items
            .into_iter()
            .map(|v| serde_json::from_value(v).map_err(D::Error::custom))
            .collect(),
        single => serde_json::from_value(single)
            .map(|v| vec![v])
            .map_err(D::Error::custom),
    }
}
