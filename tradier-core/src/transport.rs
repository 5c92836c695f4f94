use std::fmt;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use tokio::io::{AsyncRead, AsyncReadExt};
use tradier_types::TradierError;

/// Owned, readable response body.
pub type BodyReader = Pin<Box<dyn AsyncRead + Send>>;

/// Everything needed to (re)build one logical HTTP request.
///
/// The transport builds a fresh wire request from this on every attempt, since
/// a form body is consumed when it is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// HTTP method.
    pub method: Method,
    /// Absolute URL including any query string.
    pub url: String,
    /// Form fields sent as `application/x-www-form-urlencoded`.
    pub form: Option<Vec<(String, String)>>,
    /// Retries allowed after the first attempt.
    pub max_retries: u32,
    /// Per-attempt timeout; `None` leaves the body unbounded (streams).
    pub timeout: Option<Duration>,
}

impl RequestDescriptor {
    /// Build a descriptor with no body, no retries, and no timeout.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            form: None,
            max_retries: 0,
            timeout: None,
        }
    }

    /// Shorthand for a `GET` descriptor.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    /// Shorthand for a `POST` descriptor.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    /// Append one form field, creating the form if needed.
    #[must_use]
    pub fn form_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.form
            .get_or_insert_with(Vec::new)
            .push((key.into(), value.into()));
        self
    }

    /// Set the retry budget.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    /// Set the per-attempt timeout.
    #[must_use]
    pub const fn timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// First value of a form field, if present.
    #[must_use]
    pub fn form_value(&self, key: &str) -> Option<&str> {
        self.form
            .as_ref()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Status, headers, and a readable body of one HTTP exchange.
pub struct HttpResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    body: BodyReader,
}

impl HttpResponse {
    /// Assemble a response from parts.
    pub fn new(
        status: StatusCode,
        headers: HeaderMap,
        body: impl AsyncRead + Send + 'static,
    ) -> Self {
        Self {
            status,
            headers,
            body: Box::pin(body),
        }
    }

    /// Read the remaining body to completion and release the connection.
    ///
    /// # Errors
    /// Returns `TradierError::Transport` if reading the body fails.
    pub async fn bytes(mut self) -> Result<Vec<u8>, TradierError> {
        let mut buf = Vec::new();
        self.body
            .read_to_end(&mut buf)
            .await
            .map_err(TradierError::transport)?;
        Ok(buf)
    }

    /// Read the body and decode it as JSON.
    ///
    /// # Errors
    /// Returns `TradierError::Transport` if reading fails and
    /// `TradierError::Decode` if the body is not valid JSON for `T`.
    pub async fn json<T: DeserializeOwned>(self) -> Result<T, TradierError> {
        let body = self.bytes().await?;
        serde_json::from_slice(&body).map_err(TradierError::decode)
    }

    /// Take ownership of the body for incremental reading.
    #[must_use]
    pub fn into_body(self) -> BodyReader {
        self.body
    }
}

impl fmt::Debug for HttpResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

/// Performs a single HTTP exchange for a descriptor.
///
/// Implementations must not retry; retry policy belongs to
/// [`RetryingExecutor`](crate::executor::RetryingExecutor).
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Build a fresh request from `request` and send it.
    ///
    /// Any status code is a successful exchange; only connection-level
    /// failures are errors.
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TradierError>;
}
