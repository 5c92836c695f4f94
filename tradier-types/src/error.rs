use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Machine error code the API reports when a response would be too large to send.
pub const ERR_BODY_TOO_LARGE: &str = "protocol.http.TooBigBody";

/// Unified error type for the tradier-rs workspace.
///
/// The request executor is the only place that decides whether a failure is
/// retried; every other layer either propagates these values unchanged or, in
/// the case of the history bisector, reinterprets [`ERR_BODY_TOO_LARGE`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TradierError {
    /// Connection-level failure before a status line was received.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server answered with a non-200 status.
    #[error(transparent)]
    Api(ApiError),

    /// A successful response carried a body that was not the expected JSON.
    #[error("decode error: {0}")]
    Decode(String),

    /// A single streaming record could not be decoded into its typed event.
    #[error("error decoding {kind}: {message}: {payload}")]
    EventDecode {
        /// Event type tag of the record (e.g. "quote"), empty when unknown.
        kind: String,
        /// Raw, undecoded record as received from the wire.
        payload: String,
        /// Decoder error message.
        message: String,
    },

    /// Invalid input argument, rejected before any network attempt.
    #[error("invalid argument: {0}")]
    InvalidArg(String),

    /// Negotiating or opening a market event stream failed.
    #[error("stream error: {0}")]
    Stream(String),
}

impl TradierError {
    /// Helper: build a `Transport` error from any displayable cause.
    pub fn transport(cause: impl std::fmt::Display) -> Self {
        Self::Transport(cause.to_string())
    }

    /// Helper: build a `Decode` error from any displayable cause.
    pub fn decode(cause: impl std::fmt::Display) -> Self {
        Self::Decode(cause.to_string())
    }

    /// Helper: build an `InvalidArg` error.
    pub fn invalid_arg(msg: impl Into<String>) -> Self {
        Self::InvalidArg(msg.into())
    }

    /// Return the server error envelope, if this is an API error.
    #[must_use]
    pub const fn api(&self) -> Option<&ApiError> {
        match self {
            Self::Api(e) => Some(e),
            _ => None,
        }
    }

    /// Returns true if the server rejected the request because the response was too large.
    #[must_use]
    pub fn is_body_too_large(&self) -> bool {
        self.api().is_some_and(ApiError::is_body_too_large)
    }

    /// Returns true if the executor treats this failure as transient.
    ///
    /// Transport failures and opaque server errors are retried; structured server
    /// errors, decode failures, and argument errors are terminal.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api(e) => !e.structured,
            _ => false,
        }
    }
}

/// Error envelope returned by the API on a non-200 response.
///
/// Structured envelopes come from a JSON body such as
/// `{"fault":{"faultstring":"...","detail":{"errorcode":"..."}}}`. Bodies that are
/// not JSON are kept verbatim as the fault string of an opaque envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiError {
    /// HTTP status code of the failed response.
    pub status: u16,
    /// Human-readable fault text.
    pub fault_string: String,
    /// Machine-readable error code, when the server supplied one.
    pub error_code: Option<String>,
    /// Additional message field some endpoints populate.
    pub message: Option<String>,
    /// Whether the envelope was decoded from a JSON error object.
    pub structured: bool,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireError {
    #[serde(alias = "Fault")]
    fault: WireFault,
    #[serde(alias = "Message")]
    message: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireFault {
    #[serde(alias = "faultString", alias = "FaultString")]
    faultstring: String,
    #[serde(alias = "Detail")]
    detail: WireDetail,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct WireDetail {
    #[serde(alias = "errorCode", alias = "ErrorCode")]
    errorcode: Option<String>,
}

impl ApiError {
    /// Decode a structured error envelope from a response body.
    ///
    /// Returns `None` unless the body is a JSON object.
    #[must_use]
    pub fn parse(status: u16, body: &[u8]) -> Option<Self> {
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        if !value.is_object() {
            return None;
        }
        let wire: WireError = serde_json::from_value(value).ok()?;
        Some(Self {
            status,
            fault_string: wire.fault.faultstring,
            error_code: wire.fault.detail.errorcode.filter(|c| !c.is_empty()),
            message: wire.message.filter(|m| !m.is_empty()),
            structured: true,
        })
    }

    /// Wrap an undecodable body as an opaque fault string.
    #[must_use]
    pub fn opaque(status: u16, body: &[u8]) -> Self {
        Self {
            status,
            fault_string: String::from_utf8_lossy(body).into_owned(),
            error_code: None,
            message: None,
            structured: false,
        }
    }

    /// Returns true if the machine error code reports an oversized response body.
    #[must_use]
    pub fn is_body_too_large(&self) -> bool {
        self.error_code.as_deref() == Some(ERR_BODY_TOO_LARGE)
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.status, self.fault_string)?;
        if let Some(code) = &self.error_code {
            write!(f, " ({code})")?;
        }
        if let Some(msg) = &self.message {
            write!(f, " - {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for ApiError {}

impl From<serde_json::Error> for TradierError {
    fn from(e: serde_json::Error) -> Self {
        Self::Decode(e.to_string())
    }
}
