//! The HTTP seam.
//!
//! A [`Transport`] performs one GET for a [`MetricRequest`] and hands back the
//! raw response. [`HttpTransport`] is the default, backed by `reqwest`; tests
//! and callers with their own HTTP stack can plug in anything else.

use crate::request::MetricRequest;
use crate::{Error, Result};
use http::{HeaderMap, StatusCode};
use std::time::Duration;

/// Timeout applied to every request unless the client is configured otherwise.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// An HTTP response as received, before normalization.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The final URL, after redirects.
    pub url: String,
    /// The HTTP status code.
    pub status: StatusCode,
    /// The reason phrase, e.g. `OK`.
    ///
    /// [`HttpTransport`] reports the canonical phrase for the status code, not
    /// the phrase on the wire; codes without one get an empty string. Custom
    /// transports can set the received phrase with [`RawResponse::with_reason`].
    pub reason: String,
    /// The response headers.
    pub headers: HeaderMap,
    /// The raw response body.
    pub text: String,
    /// The body parsed as JSON, if it parses.
    pub json: Option<serde_json::Value>,
}

impl RawResponse {
    /// Creates a response, parsing `text` as JSON on a best-effort basis and
    /// taking the reason phrase from the status code.
    pub fn new(url: impl Into<String>, status: StatusCode, headers: HeaderMap, text: String) -> Self {
        let json = serde_json::from_str(&text).ok();
        Self {
            url: url.into(),
            status,
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            text,
            json,
        }
    }

    /// Replaces the reason phrase, e.g. with the one the server sent.
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// Performs HTTP GETs on behalf of the client.
///
/// Implementations must be safe to share between tasks: one client, and
/// therefore one transport, may serve many concurrent calls.
///
/// # Examples
///
/// ```
/// use conviva_metrics::request::MetricRequest;
/// use conviva_metrics::{RawResponse, Result, Transport};
/// use http::{HeaderMap, StatusCode};
/// use std::time::Duration;
///
/// struct Canned;
///
/// #[async_trait::async_trait]
/// impl Transport for Canned {
///     async fn get(&self, request: &MetricRequest, _timeout: Duration) -> Result<RawResponse> {
///         Ok(RawResponse::new(
///             request.url().as_str(),
///             StatusCode::OK,
///             HeaderMap::new(),
///             "{}".to_string(),
///         ))
///     }
/// }
/// ```
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Sends `request` and returns whatever the server answered, whatever its status.
    ///
    /// # Errors
    ///
    /// Returns an error only if no response was received.
    async fn get(&self, request: &MetricRequest, timeout: Duration) -> Result<RawResponse>;
}

/// [`Transport`] backed by a pooled `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http_client: reqwest::Client,
}

impl HttpTransport {
    /// Creates a transport with its own connection pool.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigurationError`] if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self> {
        let http_client = reqwest::Client::builder().build().map_err(|e| {
            Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
        })?;
        Ok(Self { http_client })
    }

    /// Wraps an existing `reqwest::Client`.
    pub fn with_client(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    async fn get(&self, request: &MetricRequest, timeout: Duration) -> Result<RawResponse> {
        let response = self
            .http_client
            .get(request.url().clone())
            .headers(request.headers().clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(from_reqwest)?;

        let url = response.url().to_string();
        let status = response.status();
        let headers = response.headers().clone();
        let text = response.text().await.map_err(from_reqwest)?;

        Ok(RawResponse::new(url, status, headers, text))
    }
}

fn from_reqwest(error: reqwest::Error) -> Error {
    if error.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(error)
    }
}
