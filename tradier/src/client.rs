use std::sync::Arc;
use std::time::Duration;

use tradier_core::{
    Backoff, Clock, ExponentialBackoff, HttpTransport, RequestDescriptor, RetryingExecutor,
    SystemClock,
};
use tradier_types::{BackoffConfig, ClientConfig, SANDBOX_ENDPOINT, TradierError};
use url::Url;

use crate::transport::ReqwestTransport;

/// Tradier API client.
///
/// Cheap to share behind an `Arc`; every call goes through one
/// [`RetryingExecutor`], so the backoff state is shared across calls.
pub struct Client {
    pub(crate) executor: Arc<RetryingExecutor>,
    pub(crate) cfg: ClientConfig,
}

impl Client {
    /// Start building a client.
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Production client with default configuration.
    ///
    /// # Errors
    /// See [`ClientBuilder::build`].
    pub fn new(token: impl Into<String>) -> Result<Self, TradierError> {
        Self::builder().auth_token(token).build()
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &ClientConfig {
        &self.cfg
    }

    /// Executor shared by every call of this client.
    #[must_use]
    pub fn executor(&self) -> &RetryingExecutor {
        &self.executor
    }

    /// Restart the retry backoff sequence.
    ///
    /// The backoff is shared by every call and is never reset implicitly. With
    /// the default exponential policy, once failures have spanned
    /// `max_elapsed_ms` (15 minutes by default) retries stay disabled until this
    /// is called, so long-lived clients should call it after a call succeeds
    /// following an outage.
    pub fn reset_backoff(&self) {
        self.executor.reset_backoff();
    }

    pub(crate) fn clock(&self) -> &Arc<dyn Clock> {
        self.executor.clock()
    }

    /// Absolute URL for an API path such as `/v1/markets/clock`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, TradierError> {
        Url::parse(&format!("{}{path}", self.cfg.endpoint)).map_err(|e| {
            TradierError::invalid_arg(format!("bad endpoint {}: {e}", self.cfg.endpoint))
        })
    }

    /// Retried request with the configured limit and timeout.
    pub(crate) fn request(&self, desc: RequestDescriptor) -> RequestDescriptor {
        desc.max_retries(self.cfg.retry_limit)
            .timeout(self.cfg.request_timeout)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("cfg", &self.cfg).finish_non_exhaustive()
    }
}

/// Builder for [`Client`].
///
/// A transport override replaces the reqwest transport entirely, in which case
/// no auth token is required.
pub struct ClientBuilder {
    token: Option<String>,
    cfg: ClientConfig,
    http: Option<reqwest::Client>,
    transport: Option<Arc<dyn HttpTransport>>,
    backoff: Option<Box<dyn Backoff>>,
    clock: Option<Arc<dyn Clock>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ClientBuilder {
    /// Builder with default configuration against the production endpoint.
    #[must_use]
    pub fn new() -> Self {
        Self {
            token: None,
            cfg: ClientConfig::default(),
            http: None,
            transport: None,
            backoff: None,
            clock: None,
        }
    }

    /// Bearer token used for every request.
    #[must_use]
    pub fn auth_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Replace the whole configuration.
    #[must_use]
    pub fn config(mut self, cfg: ClientConfig) -> Self {
        self.cfg = cfg;
        self
    }

    /// REST base URL; a trailing slash is ignored.
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        let endpoint: String = endpoint.into();
        self.cfg.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// Use the paper-trading endpoint.
    #[must_use]
    pub fn sandbox(self) -> Self {
        self.endpoint(SANDBOX_ENDPOINT)
    }

    /// Retries after the first attempt for retried calls.
    #[must_use]
    pub const fn retry_limit(mut self, n: u32) -> Self {
        self.cfg.retry_limit = n;
        self
    }

    /// Parameters of the default exponential backoff.
    #[must_use]
    pub const fn backoff_config(mut self, backoff: BackoffConfig) -> Self {
        self.cfg.backoff = backoff;
        self
    }

    /// Custom backoff policy; overrides [`backoff_config`](Self::backoff_config).
    #[must_use]
    pub fn backoff(mut self, backoff: impl Backoff + 'static) -> Self {
        self.backoff = Some(Box::new(backoff));
        self
    }

    /// Per-request timeout for non-streaming calls; `None` disables it.
    #[must_use]
    pub const fn request_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.cfg.request_timeout = timeout;
        self
    }

    /// Capacity of the market event channel.
    #[must_use]
    pub const fn stream_buffer(mut self, capacity: usize) -> Self {
        self.cfg.stream_buffer = capacity;
        self
    }

    /// Reuse an existing `reqwest::Client`.
    #[must_use]
    pub fn http_client(mut self, http: reqwest::Client) -> Self {
        self.http = Some(http);
        self
    }

    /// Replace the HTTP transport.
    #[must_use]
    pub fn transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Replace the clock used for retry sleeps and open-ended ranges.
    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Assemble the client.
    ///
    /// # Errors
    /// - `TradierError::InvalidArg` when no transport override is set and the
    ///   token is missing or malformed, or when the endpoint is not a URL or
    ///   the stream buffer is zero.
    /// - `TradierError::Transport` if the HTTP client cannot be built.
    pub fn build(self) -> Result<Client, TradierError> {
        let Self {
            token,
            cfg,
            http,
            transport,
            backoff,
            clock,
        } = self;

        Url::parse(&cfg.endpoint)
            .map_err(|e| TradierError::invalid_arg(format!("bad endpoint {}: {e}", cfg.endpoint)))?;
        if cfg.stream_buffer == 0 {
            return Err(TradierError::invalid_arg("stream buffer must be positive"));
        }

        let transport: Arc<dyn HttpTransport> = match transport {
            Some(t) => t,
            None => {
                let token = token
                    .filter(|t| !t.is_empty())
                    .ok_or_else(|| TradierError::invalid_arg("auth token is required"))?;
                let http = match http {
                    Some(http) => http,
                    None => reqwest::Client::builder()
                        .build()
                        .map_err(TradierError::transport)?,
                };
                Arc::new(ReqwestTransport::new(http, &token)?)
            }
        };
        let backoff = backoff.unwrap_or_else(|| Box::new(ExponentialBackoff::new(cfg.backoff)));
        let clock = clock.unwrap_or_else(|| Arc::new(SystemClock));

        #[cfg(feature = "tracing")]
        tracing::debug!(endpoint = %cfg.endpoint, retry_limit = cfg.retry_limit, "tradier client built");

        Ok(Client {
            executor: Arc::new(RetryingExecutor::new(transport, backoff, clock)),
            cfg,
        })
    }
}
