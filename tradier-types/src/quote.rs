use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::de::{flexible_time, one_or_many};

/// Delayed or real-time quote snapshot from `/v1/markets/quotes`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Quote {
    /// Instrument symbol.
    pub symbol: String,
    /// Human-readable description.
    pub description: String,
    /// Exchange code.
    #[serde(rename = "exch")]
    pub exchange: String,
    /// Security type, e.g. `stock` or `option`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Last trade price.
    pub last: Option<f64>,
    /// Change from the previous close.
    pub change: Option<f64>,
    /// Change from the previous close in percent.
    pub change_percentage: Option<f64>,
    /// Traded volume.
    pub volume: Option<i64>,
    /// Average daily volume.
    pub average_volume: Option<i64>,
    /// Size of the last trade.
    pub last_volume: Option<i64>,
    /// Time of the last trade.
    #[serde(deserialize_with = "flexible_time")]
    pub trade_date: Option<DateTime<Utc>>,
    /// Opening price.
    pub open: Option<f64>,
    /// High price.
    pub high: Option<f64>,
    /// Low price.
    pub low: Option<f64>,
    /// Closing price.
    pub close: Option<f64>,
    /// Previous session close.
    #[serde(rename = "prevclose")]
    pub previous_close: Option<f64>,
    /// Best bid price.
    pub bid: Option<f64>,
    /// Size at the best bid.
    #[serde(rename = "bidsize")]
    pub bid_size: Option<i64>,
    /// Best ask price.
    pub ask: Option<f64>,
    /// Size at the best ask.
    #[serde(rename = "asksize")]
    pub ask_size: Option<i64>,
    /// Underlying symbol of an option.
    pub underlying: Option<String>,
    /// Option strike price.
    pub strike: Option<f64>,
    /// `call` or `put`.
    pub option_type: Option<String>,
}

/// `{"quotes":{"quote":[...]}}` body of the quotes endpoint.
#[derive(Debug, Deserialize)]
pub struct QuotesEnvelope {
    /// Quote list; `None` when no symbol matched.
    #[serde(default)]
    pub quotes: Option<QuoteList>,
}

/// Inner quote list; a single quote arrives as a bare object.
#[derive(Debug, Deserialize, Default)]
pub struct QuoteList {
    /// Quotes in request order.
    #[serde(default, deserialize_with = "one_or_many")]
    pub quote: Vec<Quote>,
}

impl QuotesEnvelope {
    /// Flatten into the quote list.
    #[must_use]
    pub fn into_quotes(self) -> Vec<Quote> {
        self.quotes.map(|q| q.quote).unwrap_or_default()
    }
}

/// Current market session state from `/v1/markets/clock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MarketClock {
    /// Exchange date of the snapshot.
    #[serde(deserialize_with = "flexible_time")]
    pub date: Option<DateTime<Utc>>,
    /// One of `premarket`, `open`, `postmarket`, `closed`.
    pub state: String,
    /// Human-readable description.
    pub description: String,
    /// Time of the next state change (`HH:MM`, exchange local).
    pub next_change: Option<String>,
    /// State entered at `next_change`.
    pub next_state: Option<String>,
}

/// `{"clock":{...}}` body of the clock endpoint.
#[derive(Debug, Deserialize)]
pub struct ClockEnvelope {
    /// Market clock.
    pub clock: MarketClock,
}
