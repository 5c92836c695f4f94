//! Async client for the Tradier brokerage API.
//!
//! Overview
//! - Every REST call goes through a [`RetryingExecutor`](tradier_core::RetryingExecutor):
//!   transport errors and opaque server faults are retried with exponential
//!   backoff, waits are stretched to the server's quota renewal when the rate
//!   limit is exhausted, and JSON error envelopes are returned immediately.
//! - [`Client::time_sales`] bisects ranges the server refuses as too large.
//! - [`Client::stream_market_events`] negotiates a streaming session and reads
//!   newline-delimited events on a background task; a
//!   [`StreamDemuxer`] routes them to typed handlers.
//!
//! Quotes and a streamed demux loop:
//! ```rust,ignore
//! use tradier::{Client, Filter, StreamDemuxer};
//!
//! let client = Client::builder().auth_token(token).sandbox().build()?;
//! let quotes = client.quotes(&["AAPL", "SPY"], false).await?;
//!
//! let stream = client.stream_market_events(&["AAPL"], &[Filter::Quote, Filter::Trade]).await?;
//! let stop = stream.stop_token();
//! let demux = StreamDemuxer::new()
//!     .on_quote(|q| println!("{} {} x {}", q.symbol, q.bid, q.ask))
//!     .on_error(|e| eprintln!("{e}"));
//! tokio::spawn(async move { stream.dispatch(demux).await });
//! // ... later
//! stop.cancel();
//! ```
#![warn(missing_docs)]

mod client;
mod history;
mod markets;
mod stream;
mod transport;

pub use client::{Client, ClientBuilder};
pub use stream::MarketEventStream;
pub use transport::ReqwestTransport;

pub use tradier_core::{
    Backoff, Clock, ConstantBackoff, DemuxStats, EventKind, EventStreamReader,
    ExponentialBackoff, HttpResponse, HttpTransport, MAX_RECORD_BYTES, RequestDescriptor,
    RetryingExecutor, StopBackoff, StreamDemuxer, StreamEnvelope, SystemClock,
};
pub use tradier_types::{
    ApiError, BackoffConfig, ClientConfig, Filter, Interval, MarketClock, Quote, QuoteEvent,
    SummaryEvent, TimeRange, TimeSale, TimeSaleEvent, TradeEvent, TradierError,
};

pub use tradier_core;
pub use tradier_types;
