//! Typed market stream events.
//!
//! Each event is decoded from the full JSON line of a stream record once the
//! record's `type` tag is known. Numeric fields are frequently sent as strings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::de::{flexible_time, lenient_f64, lenient_i64};

/// Top-of-book quote update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct QuoteEvent {
    /// Instrument symbol.
    pub symbol: String,
    /// Best bid price.
    #[serde(deserialize_with = "lenient_f64")]
    pub bid: f64,
    /// Size at the best bid.
    #[serde(rename = "bidsz", deserialize_with = "lenient_i64")]
    pub bid_size: i64,
    /// Exchange code of the best bid.
    #[serde(rename = "bidexch")]
    pub bid_exchange: String,
    /// Time of the last bid update.
    #[serde(rename = "biddate", deserialize_with = "flexible_time")]
    pub bid_date: Option<DateTime<Utc>>,
    /// Best ask price.
    #[serde(deserialize_with = "lenient_f64")]
    pub ask: f64,
    /// Size at the best ask.
    #[serde(rename = "asksz", deserialize_with = "lenient_i64")]
    pub ask_size: i64,
    /// Exchange code of the best ask.
    #[serde(rename = "askexch")]
    pub ask_exchange: String,
    /// Time of the last ask update.
    #[serde(rename = "askdate", deserialize_with = "flexible_time")]
    pub ask_date: Option<DateTime<Utc>>,
}

/// Trade print.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TradeEvent {
    /// Instrument symbol.
    pub symbol: String,
    /// Exchange code.
    #[serde(rename = "exch")]
    pub exchange: String,
    /// Trade price.
    #[serde(deserialize_with = "lenient_f64")]
    pub price: f64,
    /// Last trade price.
    #[serde(deserialize_with = "lenient_f64")]
    pub last: f64,
    /// Trade size.
    #[serde(deserialize_with = "lenient_i64")]
    pub size: i64,
    /// Cumulative session volume.
    #[serde(rename = "cvol", deserialize_with = "lenient_i64")]
    pub cumulative_volume: i64,
    /// Event time.
    #[serde(deserialize_with = "flexible_time")]
    pub date: Option<DateTime<Utc>>,
}

/// Time-and-sales print with the prevailing quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TimeSaleEvent {
    /// Instrument symbol.
    pub symbol: String,
    /// Exchange code.
    #[serde(rename = "exch")]
    pub exchange: String,
    /// Best bid price.
    #[serde(deserialize_with = "lenient_f64")]
    pub bid: f64,
    /// Best ask price.
    #[serde(deserialize_with = "lenient_f64")]
    pub ask: f64,
    /// Last trade price.
    #[serde(deserialize_with = "lenient_f64")]
    pub last: f64,
    /// Trade size.
    #[serde(deserialize_with = "lenient_i64")]
    pub size: i64,
    /// Event time.
    #[serde(deserialize_with = "flexible_time")]
    pub date: Option<DateTime<Utc>>,
}

/// Session summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SummaryEvent {
    /// Instrument symbol.
    pub symbol: String,
    /// Opening price.
    #[serde(deserialize_with = "lenient_f64")]
    pub open: f64,
    /// High price.
    #[serde(deserialize_with = "lenient_f64")]
    pub high: f64,
    /// Low price.
    #[serde(deserialize_with = "lenient_f64")]
    pub low: f64,
    /// Previous session close.
    #[serde(rename = "prevClose", deserialize_with = "lenient_f64")]
    pub previous_close: f64,
}
