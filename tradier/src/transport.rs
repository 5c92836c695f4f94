use std::io;

use async_trait::async_trait;
use futures_util::TryStreamExt;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderValue};
use reqwest::Method;
use tokio_util::io::StreamReader;
use tradier_core::{HttpResponse, HttpTransport, RequestDescriptor};
use tradier_types::TradierError;

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
///
/// Every request carries `Accept: application/json` and the bearer token.
/// Form fields are sent url-encoded on every method except `DELETE`.
#[derive(Clone)]
pub struct ReqwestTransport {
    http: reqwest::Client,
    auth: HeaderValue,
}

impl ReqwestTransport {
    /// Wrap `http`, authenticating with `token`.
    ///
    /// # Errors
    /// `TradierError::InvalidArg` if the token is not a valid header value.
    pub fn new(http: reqwest::Client, token: &str) -> Result<Self, TradierError> {
        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| TradierError::invalid_arg("auth token contains invalid characters"))?;
        auth.set_sensitive(true);
        Ok(Self { http, auth })
    }
}

impl std::fmt::Debug for ReqwestTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReqwestTransport").finish_non_exhaustive()
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: &RequestDescriptor) -> Result<HttpResponse, TradierError> {
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .header(ACCEPT, "application/json")
            .header(AUTHORIZATION, self.auth.clone());
        if let Some(form) = &request.form
            && request.method != Method::DELETE
        {
            builder = builder.form(form);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let resp = builder.send().await.map_err(TradierError::transport)?;
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = StreamReader::new(resp.bytes_stream().map_err(io::Error::other));
        Ok(HttpResponse::new(status, headers, body))
    }
}
