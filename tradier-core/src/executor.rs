//! Bounded-retry request execution.
//!
//! The executor is the single place that decides whether a failure is retried:
//! - transport errors are retried with the backoff policy's next delay;
//! - a non-200 response whose body is a JSON error object is terminal;
//! - any other non-200 body is an opaque fault, retried with the backoff delay
//!   or, when the server signals a quota renewal further out, until that
//!   renewal plus a one-second margin.
//!
//! A stop sentinel from the backoff policy ends the loop early, and the final
//! attempt never sleeps.

use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use tradier_types::{ApiError, TradierError};

use crate::backoff::Backoff;
use crate::clock::Clock;
use crate::rate_limit::estimate_wait_until;
use crate::transport::{HttpResponse, HttpTransport, RequestDescriptor};

/// Extra wait added on top of a server-reported quota renewal time.
pub const RATE_LIMIT_MARGIN: Duration = Duration::from_secs(1);

/// Issues requests through a transport, retrying transient failures.
///
/// The backoff policy is shared by every call made through one executor and is
/// only reset by [`reset_backoff`](Self::reset_backoff).
pub struct RetryingExecutor {
    transport: Arc<dyn HttpTransport>,
    backoff: Mutex<Box<dyn Backoff>>,
    clock: Arc<dyn Clock>,
}

impl RetryingExecutor {
    /// Create an executor owning `backoff`.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        backoff: Box<dyn Backoff>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            transport,
            backoff: Mutex::new(backoff),
            clock,
        }
    }

    /// Clock used for retry sleeps and rate-limit comparisons.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Restart the backoff sequence from its initial delay.
    pub fn reset_backoff(&self) {
        self.backoff
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .reset();
    }

    fn next_backoff(&self) -> Option<Duration> {
        self.backoff
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next_backoff()
    }

    /// Execute `request`, making at most `request.max_retries + 1` attempts.
    ///
    /// Returns the first 200 response. Otherwise returns the last recorded
    /// error; for an opaque server error that error carries the last
    /// response's status and body text.
    ///
    /// # Errors
    /// - `TradierError::Api` with `structured == true` as soon as the server
    ///   returns a JSON error object.
    /// - The last `Transport` or opaque `Api` error once retries are exhausted
    ///   or the backoff policy stops.
    pub async fn execute(&self, request: &RequestDescriptor) -> Result<HttpResponse, TradierError> {
        let max_retries = request.max_retries;
        let mut last_err = TradierError::transport("no attempt made");

        for attempt in 0..=max_retries {
            let wait = match self.transport.send(request).await {
                Ok(resp) if resp.status == StatusCode::OK => return Ok(resp),
                Err(err) => {
                    #[cfg(feature = "tracing")]
                    tracing::warn!(url = %request.url, attempt, error = %err, "request failed");
                    last_err = err;
                    self.next_backoff()
                }
                Ok(resp) => {
                    let status = resp.status.as_u16();
                    let headers = resp.headers.clone();
                    let body = match resp.bytes().await {
                        Ok(body) => body,
                        Err(err) => err.to_string().into_bytes(),
                    };
                    if let Some(api) = ApiError::parse(status, &body) {
                        #[cfg(feature = "tracing")]
                        tracing::warn!(url = %request.url, attempt, error = %api, "server rejected request");
                        return Err(TradierError::Api(api));
                    }
                    let api = ApiError::opaque(status, &body);
                    #[cfg(feature = "tracing")]
                    tracing::warn!(url = %request.url, attempt, error = %api, "unexpected response");
                    let wait = self.rate_limited_wait(&api, &headers);
                    last_err = TradierError::Api(api);
                    wait
                }
            };

            if attempt < max_retries {
                let Some(delay) = wait else {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(url = %request.url, attempt, "backoff exhausted, giving up");
                    break;
                };
                #[cfg(feature = "tracing")]
                tracing::info!(url = %request.url, attempt = attempt + 1, max_retries, ?delay, "retrying after backoff");
                self.clock.sleep(delay).await;
            }
        }
        Err(last_err)
    }

    /// Choose between the generic backoff and a server-reported quota renewal.
    fn rate_limited_wait(&self, api: &ApiError, headers: &HeaderMap) -> Option<Duration> {
        let generic = self.next_backoff()?;
        let Some(until) = estimate_wait_until(&api.fault_string, headers) else {
            return Some(generic);
        };
        match (until - self.clock.now()).to_std() {
            Ok(remaining) if remaining > generic => Some(remaining + RATE_LIMIT_MARGIN),
            _ => Some(generic),
        }
    }

    /// Execute `request` and decode a 200 body as JSON.
    ///
    /// # Errors
    /// Any error from [`execute`](Self::execute), or `TradierError::Decode`
    /// when the 200 body is malformed. Malformed bodies are not retried.
    pub async fn execute_json<T: DeserializeOwned>(
        &self,
        request: &RequestDescriptor,
    ) -> Result<T, TradierError> {
        let resp = self.execute(request).await?;
        resp.json().await.map_err(|e| {
            #[cfg(feature = "tracing")]
            tracing::warn!(url = %request.url, error = %e, "malformed response body");
            e
        })
    }
}
