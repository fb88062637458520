//! The uniform response envelope.
//!
//! Every call returns a [`MetricResponse`], whether the request succeeded, the
//! server answered with an error status, validation aborted the request, or
//! the transport failed. The last two produce [`MetricResponse::error`]:
//! status `0`, reason `ERROR`, everything else empty.

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::transport::RawResponse;
use http::HeaderMap;
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Reason phrase of the default error envelope.
pub const ERROR_REASON: &str = "ERROR";

/// The outcome of one metrics call.
///
/// # Examples
///
/// ```no_run
/// use conviva_metrics::{Client, MetricQuery};
///
/// # async fn example() -> Result<(), conviva_metrics::Error> {
/// let client = Client::new(Some("my-api-key"))?;
/// let response = client.get_metric_query(MetricQuery::metric("plays").days(1)).await;
///
/// if response.is_error() {
///     eprintln!("request was not sent or failed in transit");
/// } else {
///     println!("{} {} in {:?}", response.status_code, response.reason, response.latency);
///     println!("{}", response.json);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct MetricResponse {
    /// The URL the response came from; empty for the error envelope.
    pub url: String,

    /// The response headers.
    pub headers: HeaderMap,

    /// The HTTP status code, or `0` for the error envelope.
    pub status_code: u16,

    /// The reason phrase, or `ERROR` for the error envelope.
    pub reason: String,

    /// The raw response body.
    pub text: String,

    /// The body parsed as JSON, or an empty object when there is no body or it
    /// does not parse.
    pub json: serde_json::Value,

    /// Time spent in the transport. Zero for the error envelope.
    pub latency: Duration,
}

impl MetricResponse {
    /// The default error envelope.
    ///
    /// # Examples
    ///
    /// ```
    /// use conviva_metrics::MetricResponse;
    ///
    /// let response = MetricResponse::error();
    /// assert_eq!(response.status_code, 0);
    /// assert_eq!(response.reason, "ERROR");
    /// assert!(response.is_error());
    /// assert_eq!(response.json, serde_json::json!({}));
    /// ```
    pub fn error() -> Self {
        Self {
            url: String::new(),
            headers: HeaderMap::new(),
            status_code: 0,
            reason: ERROR_REASON.to_string(),
            text: String::new(),
            json: empty_object(),
            latency: Duration::ZERO,
        }
    }

    /// Copies a raw transport response into an envelope.
    ///
    /// A body that is present but not JSON yields an empty `json` object and a
    /// [`Diagnostic::UnparseableBody`].
    pub fn from_raw(raw: RawResponse, latency: Duration, sink: &dyn DiagnosticSink) -> Self {
        let status_code = raw.status.as_u16();
        let json = match raw.json {
            Some(json) => json,
            None => {
                if !raw.text.trim().is_empty() {
                    sink.emit(&Diagnostic::UnparseableBody {
                        status: status_code,
                    });
                }
                empty_object()
            }
        };

        Self {
            url: raw.url,
            headers: raw.headers,
            status_code,
            reason: raw.reason,
            text: raw.text,
            json,
            latency,
        }
    }

    /// Returns `true` for the default error envelope.
    pub fn is_error(&self) -> bool {
        self.status_code == 0
    }

    /// Returns `true` for a 2xx response.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status_code)
    }

    /// Returns a reference to a header value by name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// Deserializes the JSON body into `T`.
    ///
    /// # Errors
    ///
    /// Returns the serde error if the body does not have the shape of `T`.
    pub fn data<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.json)
    }
}

impl Default for MetricResponse {
    fn default() -> Self {
        Self::error()
    }
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}
