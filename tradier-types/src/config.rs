//! Configuration types shared by the client and the request executor.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Production REST endpoint.
pub const API_ENDPOINT: &str = "https://api.tradier.com";
/// Paper-trading REST endpoint.
pub const SANDBOX_ENDPOINT: &str = "https://sandbox.tradier.com";
/// Streaming endpoint used when the session response omits a URL.
pub const STREAM_ENDPOINT: &str = "https://stream.tradier.com";

/// Default number of retries after the first attempt.
pub const DEFAULT_RETRY_LIMIT: u32 = 3;

/// Exponential backoff configuration for request retries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackoffConfig {
    /// Delay before the first retry, in milliseconds.
    pub initial_interval_ms: u64,
    /// Upper bound for any single delay, in milliseconds.
    pub max_interval_ms: u64,
    /// Growth factor applied after each delay (>= 1.0).
    pub multiplier: f64,
    /// Random jitter percentage [0, 100] added to each delay.
    pub jitter_percent: u8,
    /// Total time after which the policy gives up. `None` never gives up.
    pub max_elapsed_ms: Option<u64>,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self {
            initial_interval_ms: 500,
            max_interval_ms: 60_000,
            multiplier: 1.5,
            jitter_percent: 50,
            max_elapsed_ms: Some(15 * 60 * 1000),
        }
    }
}

/// Configuration for a [`Client`](https://docs.rs/tradier).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL for REST calls (no trailing slash).
    pub endpoint: String,
    /// Fallback base URL for the market event stream.
    pub stream_endpoint: String,
    /// Retries after the first attempt for idempotent calls.
    pub retry_limit: u32,
    /// Retry backoff policy parameters.
    pub backoff: BackoffConfig,
    /// Capacity of the channel between the stream reader and its consumer.
    pub stream_buffer: usize,
    /// Timeout applied by the HTTP client to each non-streaming request.
    pub request_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: API_ENDPOINT.to_string(),
            stream_endpoint: STREAM_ENDPOINT.to_string(),
            retry_limit: DEFAULT_RETRY_LIMIT,
            backoff: BackoffConfig::default(),
            stream_buffer: 256,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}
