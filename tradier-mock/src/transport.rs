use std::collections::VecDeque;
use std::io::Cursor;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tokio::io::AsyncRead;
use tradier_core::{HttpResponse, HttpTransport, RequestDescriptor};
use tradier_types::TradierError;

type Body = Box<dyn AsyncRead + Send + Unpin>;
type Responder = Arc<dyn Fn(&RequestDescriptor) -> MockReply + Send + Sync>;

/// One scripted outcome of a transport `send`.
pub enum MockReply {
    /// Answer with a status, headers, and a body.
    Response {
        /// HTTP status code.
        status: u16,
        /// Response headers.
        headers: Vec<(String, String)>,
        /// Response body.
        body: Body,
    },
    /// Fail before any response, like a refused connection.
    TransportError(String),
}

impl MockReply {
    /// `200 OK` with a JSON body.
    #[must_use]
    pub fn ok_json(body: &serde_json::Value) -> Self {
        Self::status(200, body.to_string())
    }

    /// Arbitrary status with a text body.
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Response {
            status,
            headers: Vec::new(),
            body: Box::new(Cursor::new(body.into().into_bytes())),
        }
    }

    /// `200 OK` whose body is read incrementally from `reader`.
    pub fn streaming(reader: impl AsyncRead + Send + Unpin + 'static) -> Self {
        Self::Response {
            status: 200,
            headers: Vec::new(),
            body: Box::new(reader),
        }
    }

    /// Structured API error envelope with the given error code.
    #[must_use]
    pub fn api_error(status: u16, fault: &str, code: &str) -> Self {
        Self::status(
            status,
            serde_json::json!({
                "fault": { "faultstring": fault, "detail": { "errorcode": code } }
            })
            .to_string(),
        )
    }

    /// Connection-level failure.
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self::TransportError(message.into())
    }

    /// Add a response header; ignored on transport errors.
    #[must_use]
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let Self::Response { headers, .. } = &mut self {
            headers.push((name.to_string(), value.to_string()));
        }
        self
    }

    fn into_result(self) -> Result<HttpResponse, TradierError> {
        match self {
            Self::TransportError(msg) => Err(TradierError::Transport(msg)),
            Self::Response {
                status,
                headers,
                body,
            } => {
                let status = StatusCode::from_u16(status).map_err(TradierError::transport)?;
                let mut map = HeaderMap::new();
                for (name, value) in headers {
                    let name = HeaderName::from_bytes(name.as_bytes())
                        .map_err(TradierError::transport)?;
                    let value = HeaderValue::from_str(&value).map_err(TradierError::transport)?;
                    map.append(name, value);
                }
                Ok(HttpResponse::new(status, map, body))
            }
        }
    }
}

impl std::fmt::Debug for MockReply {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Response {
                status, headers, ..
            } => f
                .debug_struct("Response")
                .field("status", status)
                .field("headers", headers)
                .finish_non_exhaustive(),
            Self::TransportError(msg) => f.debug_tuple("TransportError").field(msg).finish(),
        }
    }
}

#[derive(Default)]
struct State {
    queue: VecDeque<MockReply>,
    requests: Vec<RequestDescriptor>,
}

/// [`HttpTransport`] that replays scripted replies and records every request.
///
/// Queued replies are consumed first, in order. Once the queue is empty the
/// responder (if any) answers; without one, `send` fails with a transport error.
#[derive(Clone, Default)]
pub struct ScriptedTransport {
    state: Arc<Mutex<State>>,
    responder: Option<Responder>,
}

impl ScriptedTransport {
    /// Transport with an empty script.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Transport that computes a reply for every request.
    pub fn with_responder(
        responder: impl Fn(&RequestDescriptor) -> MockReply + Send + Sync + 'static,
    ) -> Self {
        Self {
            state: Arc::default(),
            responder: Some(Arc::new(responder)),
        }
    }

    /// Queue one reply.
    #[must_use]
    pub fn reply(self, reply: MockReply) -> Self {
        self.push(reply);
        self
    }

    /// Queue one reply through a shared handle.
    pub fn push(&self, reply: MockReply) {
        self.lock().queue.push_back(reply);
    }

    /// Every request sent so far, oldest first.
    #[must_use]
    pub fn requests(&self) -> Vec<RequestDescriptor> {
        self.lock().requests.clone()
    }

    /// Number of `send` calls so far.
    #[must_use]
    pub fn attempts(&self) -> usize {
        self.lock().requests.len()
    }

    /// Replies still queued.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.lock().queue.len()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TradierError> {
        let queued = {
            let mut state = self.lock();
            state.requests.push(request.clone());
            state.queue.pop_front()
        };
        let reply = match (queued, &self.responder) {
            (Some(reply), _) => reply,
            (None, Some(responder)) => responder(request),
            (None, None) => {
                MockReply::transport_error(format!("no scripted reply for {}", request.url))
            }
        };
        reply.into_result()
    }
}
