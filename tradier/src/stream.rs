use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tradier_core::{EventStreamReader, RequestDescriptor, StreamDemuxer, StreamEnvelope};
use tradier_types::{Filter, TradierError};

use crate::Client;

const SESSION_PATH: &str = "/v1/markets/events/session";
const EVENTS_PATH: &str = "/v1/markets/events";

#[derive(Debug, Deserialize)]
struct SessionEnvelope {
    #[serde(default)]
    stream: Option<Session>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct Session {
    #[serde(alias = "sessionId", alias = "session_id")]
    sessionid: String,
    url: String,
}

/// An open market event stream.
///
/// Envelopes arrive on an internal channel fed by a background reader task;
/// the channel closes when the server ends the stream or after [`stop`](Self::stop).
/// Dropping the stream stops the reader and releases the connection.
pub struct MarketEventStream {
    reader: EventStreamReader,
    events: mpsc::Receiver<StreamEnvelope>,
    shutdown: CancellationToken,
}

impl MarketEventStream {
    /// Next envelope, or `None` once the stream has ended.
    pub async fn recv(&mut self) -> Option<StreamEnvelope> {
        self.events.recv().await
    }

    /// Stop reading. Safe to call repeatedly; buffered envelopes may still be received.
    pub fn stop(&self) {
        self.reader.stop();
    }

    /// Token that stops this stream when cancelled, for use from other tasks.
    #[must_use]
    pub fn stop_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Split into the reader handle and the envelope channel.
    ///
    /// The reader keeps running only while its handle is alive.
    #[must_use]
    pub fn into_parts(self) -> (EventStreamReader, mpsc::Receiver<StreamEnvelope>) {
        (self.reader, self.events)
    }

    /// Route every envelope through `demuxer` until the stream ends.
    ///
    /// Returns the demuxer so its counters can be inspected.
    pub async fn dispatch(self, mut demuxer: StreamDemuxer) -> StreamDemuxer {
        let (reader, events) = self.into_parts();
        demuxer.handle_channel(events).await;
        reader.wait().await;
        demuxer
    }
}

impl std::fmt::Debug for MarketEventStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarketEventStream")
            .field("stopped", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Open a market event stream for `symbols`.
    ///
    /// Negotiates a streaming session (retried like any other call) and then
    /// opens the stream itself without retries, since a failed open usually
    /// means the session is unusable. An empty `filters` slice streams every
    /// event type.
    ///
    /// # Errors
    /// - `TradierError::InvalidArg` for an empty symbol list.
    /// - `TradierError::Stream` when the session response has no session id.
    /// - Any executor error from either request.
    pub async fn stream_market_events(
        &self,
        symbols: &[&str],
        filters: &[Filter],
    ) -> Result<MarketEventStream, TradierError> {
        if symbols.is_empty() {
            return Err(TradierError::invalid_arg("list of symbols is required"));
        }

        let session_url = self.api_url(SESSION_PATH)?;
        let session_req = self.request(RequestDescriptor::post(session_url.as_str()));
        let session = self
            .executor
            .execute_json::<SessionEnvelope>(&session_req)
            .await?
            .stream
            .unwrap_or_default();
        if session.sessionid.is_empty() {
            return Err(TradierError::Stream("session response has no session id".into()));
        }
        let stream_url = if session.url.is_empty() {
            format!("{}{EVENTS_PATH}", self.cfg.stream_endpoint)
        } else {
            session.url
        };

        let mut open = RequestDescriptor::post(stream_url)
            .form_param("linebreak", "true")
            .form_param("sessionid", session.sessionid)
            .form_param("symbols", symbols.join(","));
        if !filters.is_empty() {
            let joined: Vec<&str> = filters.iter().map(|f| f.as_str()).collect();
            open = open.form_param("filter", joined.join(","));
        }
        let open = open.form_param("advancedDetails", "true").max_retries(0);

        #[cfg(feature = "tracing")]
        tracing::info!(url = %open.url, symbols = symbols.len(), "opening market event stream");

        let body = self.executor.execute(&open).await?.into_body();
        let (tx, events) = mpsc::channel(self.cfg.stream_buffer);
        let shutdown = CancellationToken::new();
        let reader = EventStreamReader::spawn_with_token(body, tx, shutdown.clone());
        Ok(MarketEventStream {
            reader,
            events,
            shutdown,
        })
    }
}
