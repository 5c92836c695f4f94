use tokio::sync::mpsc;
use tradier_types::{QuoteEvent, SummaryEvent, TimeSaleEvent, TradeEvent, TradierError};

use super::envelope::{EventKind, StreamEnvelope};

type Handler<T> = Option<Box<dyn FnMut(T) + Send>>;

/// Counters describing what a demuxer did with the envelopes it saw.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    /// Typed decodes attempted.
    pub decode_attempts: u64,
    /// Events delivered to a typed handler.
    pub dispatched: u64,
    /// Envelopes or payloads reported as errors.
    pub errors: u64,
    /// Envelopes skipped because of an unknown tag or a missing handler.
    pub ignored: u64,
}

/// Routes stream envelopes to per-type handlers.
///
/// A kind with no registered handler is skipped without decoding its payload.
/// Decode failures, including envelopes that could not be decoded at all, go
/// to the error handler when one is registered and are dropped otherwise.
///
/// ```ignore
/// let demux = StreamDemuxer::new()
///     .on_quote(|q| println!("{} bid {}", q.symbol, q.bid))
///     .on_error(|e| eprintln!("{e}"));
/// ```
#[derive(Default)]
pub struct StreamDemuxer {
    quote: Handler<QuoteEvent>,
    trade: Handler<TradeEvent>,
    time_sale: Handler<TimeSaleEvent>,
    summary: Handler<SummaryEvent>,
    error: Handler<TradierError>,
    stats: DemuxStats,
}

impl StreamDemuxer {
    /// Create a demuxer with no handlers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the quote handler.
    #[must_use]
    pub fn on_quote(mut self, f: impl FnMut(QuoteEvent) + Send + 'static) -> Self {
        self.quote = Some(Box::new(f));
        self
    }

    /// Register the trade handler.
    #[must_use]
    pub fn on_trade(mut self, f: impl FnMut(TradeEvent) + Send + 'static) -> Self {
        self.trade = Some(Box::new(f));
        self
    }

    /// Register the time-and-sales handler.
    #[must_use]
    pub fn on_time_sale(mut self, f: impl FnMut(TimeSaleEvent) + Send + 'static) -> Self {
        self.time_sale = Some(Box::new(f));
        self
    }

    /// Register the summary handler.
    #[must_use]
    pub fn on_summary(mut self, f: impl FnMut(SummaryEvent) + Send + 'static) -> Self {
        self.summary = Some(Box::new(f));
        self
    }

    /// Register the error handler.
    #[must_use]
    pub fn on_error(mut self, f: impl FnMut(TradierError) + Send + 'static) -> Self {
        self.error = Some(Box::new(f));
        self
    }

    /// Counters accumulated so far.
    #[must_use]
    pub const fn stats(&self) -> DemuxStats {
        self.stats
    }

    /// Route one envelope.
    pub fn handle(&mut self, mut envelope: StreamEnvelope) {
        let Self {
            quote,
            trade,
            time_sale,
            summary,
            error,
            stats,
        } = self;

        if let Some(err) = envelope.error.take() {
            report(stats, error, err);
            return;
        }
        match envelope.event_kind() {
            EventKind::Quote => route(stats, quote, error, || envelope.decode_quote()),
            EventKind::Trade => route(stats, trade, error, || envelope.decode_trade()),
            EventKind::TimeSale => route(stats, time_sale, error, || envelope.decode_time_sale()),
            EventKind::Summary => route(stats, summary, error, || envelope.decode_summary()),
            EventKind::Unknown(_tag) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(tag = %_tag, symbol = %envelope.symbol, "ignoring unknown event type");
                stats.ignored += 1;
            }
        }
    }

    /// Drain `events` until the channel closes, routing every envelope.
    pub async fn handle_channel(&mut self, mut events: mpsc::Receiver<StreamEnvelope>) {
        while let Some(envelope) = events.recv().await {
            self.handle(envelope);
        }
        #[cfg(feature = "tracing")]
        tracing::debug!(stats = ?self.stats, "market event channel closed");
    }
}

/// Decode and deliver one payload; the payload is never decoded without a handler.
fn route<T>(
    stats: &mut DemuxStats,
    handler: &mut Handler<T>,
    on_error: &mut Handler<TradierError>,
    decode: impl FnOnce() -> Result<T, TradierError>,
) {
    let Some(handler) = handler.as_mut() else {
        stats.ignored += 1;
        return;
    };
    stats.decode_attempts += 1;
    match decode() {
        Ok(event) => {
            stats.dispatched += 1;
            handler(event);
        }
        Err(err) => report(stats, on_error, err),
    }
}

fn report(stats: &mut DemuxStats, on_error: &mut Handler<TradierError>, err: TradierError) {
    stats.errors += 1;
    match on_error.as_mut() {
        Some(handler) => handler(err),
        None => {
            #[cfg(feature = "tracing")]
            tracing::debug!(error = %err, "dropping stream error with no handler");
        }
    }
}

impl std::fmt::Debug for StreamDemuxer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamDemuxer")
            .field("quote", &self.quote.is_some())
            .field("trade", &self.trade.is_some())
            .field("time_sale", &self.time_sale.is_some())
            .field("summary", &self.summary.is_some())
            .field("error", &self.error.is_some())
            .field("stats", &self.stats)
            .finish()
    }
}
