//! Shared data transfer objects, configuration primitives, and the unified
//! error type for the tradier-rs crates.
#![warn(missing_docs)]

mod config;
/// Lenient deserializers for numbers-as-strings, `NaN`, and flexible timestamps.
pub mod de;
mod error;
/// Typed market stream events.
pub mod events;
mod history;
mod market;
mod quote;

pub use config::{
    API_ENDPOINT, BackoffConfig, ClientConfig, DEFAULT_RETRY_LIMIT, SANDBOX_ENDPOINT,
    STREAM_ENDPOINT,
};
pub use error::{ApiError, ERR_BODY_TOO_LARGE, TradierError};
pub use events::{QuoteEvent, SummaryEvent, TimeSaleEvent, TradeEvent};
pub use history::{HistoryDays, HistoryEnvelope, SeriesData, SeriesEnvelope, TimeSale};
pub use market::{Filter, Interval, TimeRange};
pub use quote::{ClockEnvelope, MarketClock, Quote, QuoteList, QuotesEnvelope};
