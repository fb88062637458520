//! Metrics client and its configuration.
//!
//! The [`Client`] type is the main entry point. Use [`ClientBuilder`] to
//! configure credentials, endpoints, the transport and the diagnostic sink.

use crate::{
    diagnostics::{Diagnostic, DiagnosticSink, TracingSink},
    query::{MetricQuery, QueryIntent},
    request::{
        self, BuildContext, EndEpochPolicy, Endpoints, MetricRequest, MOCK_URL, PRODUCTION_URL,
    },
    transport::{HttpTransport, Transport, DEFAULT_TIMEOUT},
    Error, MetricResponse, Result,
};
use http::HeaderValue;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

/// A client for the Conviva Metrics v3 API.
///
/// The client is cheap to clone and safe to share between tasks: it holds no
/// per-call state, only its configuration.
///
/// # Examples
///
/// ```no_run
/// use conviva_metrics::{Client, QueryIntent};
///
/// # async fn example() -> Result<(), conviva_metrics::Error> {
/// let client = Client::builder()
///     .api_key("my-api-key")
///     .build()?;
///
/// let response = client
///     .get_metric(QueryIntent {
///         metric: Some("plays".to_string()),
///         group_by: Some("device-os".to_string()),
///         days: Some(7),
///         ..Default::default()
///     })
///     .await;
///
/// println!("{} {}", response.status_code, response.reason);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    context: BuildContext,
    transport: Arc<dyn Transport>,
    diagnostic_sink: Arc<dyn DiagnosticSink>,
    timeout: Duration,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Creates a client for the public endpoints with default settings.
    ///
    /// Without an API key, production requests are sent unauthenticated and a
    /// [`Diagnostic::Unauthenticated`] is emitted for each of them.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value.
    pub fn new(api_key: Option<&str>) -> Result<Self> {
        let mut builder = ClientBuilder::new();
        if let Some(api_key) = api_key {
            builder = builder.api_key(api_key);
        }
        builder.build()
    }

    /// Validates an intent and builds its request without sending it.
    ///
    /// Non-fatal problems are reported to the configured diagnostic sink.
    ///
    /// # Errors
    ///
    /// Returns the error that would make [`get_metric`](Self::get_metric)
    /// return the default error envelope.
    pub fn build_request(&self, intent: QueryIntent) -> Result<MetricRequest> {
        let query = MetricQuery::from_intent(intent, self.inner.diagnostic_sink.as_ref())?;
        self.build_query_request(&query)
    }

    /// Validates a typed query and builds its request without sending it.
    ///
    /// # Errors
    ///
    /// See [`request::build`].
    pub fn build_query_request(&self, query: &MetricQuery) -> Result<MetricRequest> {
        request::build(
            query,
            &self.inner.context,
            self.inner.diagnostic_sink.as_ref(),
        )
    }

    /// Queries a metric.
    ///
    /// Always returns an envelope: validation aborts and transport failures
    /// yield [`MetricResponse::error`], any HTTP response is passed through.
    pub async fn get_metric(&self, intent: QueryIntent) -> MetricResponse {
        match self.build_request(intent) {
            Ok(request) => self.send(&request).await,
            Err(e) => self.abort(e),
        }
    }

    /// Queries a metric described by a typed query.
    pub async fn get_metric_query(&self, query: MetricQuery) -> MetricResponse {
        match self.build_query_request(&query) {
            Ok(request) => self.send(&request).await,
            Err(e) => self.abort(e),
        }
    }

    /// Sends an already-built request and normalizes the outcome.
    pub async fn send(&self, request: &MetricRequest) -> MetricResponse {
        let start_time = Instant::now();

        tracing::debug!(
            url = %request.url(),
            mock = request.is_mock(),
            "Executing metrics request"
        );

        match self.inner.transport.get(request, self.inner.timeout).await {
            Ok(raw) => {
                let latency = start_time.elapsed();
                tracing::info!(
                    status = raw.status.as_u16(),
                    latency_ms = latency.as_millis(),
                    "Received metrics response"
                );
                MetricResponse::from_raw(raw, latency, self.inner.diagnostic_sink.as_ref())
            }
            Err(e) => {
                self.inner
                    .diagnostic_sink
                    .emit(&Diagnostic::TransportFailure {
                        url: request.url().to_string(),
                        headers: request.redacted_headers(),
                        error: e.to_string(),
                    });
                MetricResponse::error()
            }
        }
    }

    fn abort(&self, error: Error) -> MetricResponse {
        self.inner.diagnostic_sink.emit(&Diagnostic::RequestAborted {
            reason: error.to_string(),
        });
        MetricResponse::error()
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use conviva_metrics::request::EndEpochPolicy;
/// use conviva_metrics::{ClientBuilder, MemorySink};
/// use std::sync::Arc;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), conviva_metrics::Error> {
/// let sink = Arc::new(MemorySink::new());
/// let client = ClientBuilder::new()
///     .api_key("my-api-key")
///     .production_url("https://api.conviva.com/insights/3.0")?
///     .timeout(Duration::from_secs(5))
///     .end_epoch_policy(EndEpochPolicy::UseSupplied)
///     .diagnostic_sink(sink.clone())
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    api_key: Option<String>,
    production_url: Option<Url>,
    mock_url: Option<Url>,
    timeout: Duration,
    transport: Option<Arc<dyn Transport>>,
    diagnostic_sink: Option<Arc<dyn DiagnosticSink>>,
    end_epoch_policy: EndEpochPolicy,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            api_key: None,
            production_url: None,
            mock_url: None,
            timeout: DEFAULT_TIMEOUT,
            transport: None,
            diagnostic_sink: None,
            end_epoch_policy: EndEpochPolicy::default(),
        }
    }

    /// Sets the API key sent as the `Authorization` header of production requests.
    ///
    /// An empty key is the same as no key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into()).filter(|key| !key.is_empty());
        self
    }

    /// Overrides the production base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn production_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.production_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Overrides the mock server base URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid.
    pub fn mock_url(mut self, url: impl AsRef<str>) -> Result<Self> {
        self.mock_url = Some(Url::parse(url.as_ref())?);
        Ok(self)
    }

    /// Sets both base URLs.
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.production_url = Some(endpoints.production);
        self.mock_url = Some(endpoints.mock);
        self
    }

    /// Sets the request timeout. Defaults to 20 seconds.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replaces the HTTP transport.
    ///
    /// By default requests go through an [`HttpTransport`].
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Sets where diagnostics go.
    ///
    /// By default they are logged through `tracing`.
    pub fn diagnostic_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostic_sink = Some(sink);
        self
    }

    /// Sets how the end-epoch parameters are filled in.
    pub fn end_epoch_policy(mut self, policy: EndEpochPolicy) -> Self {
        self.end_epoch_policy = policy;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is not a valid header value or the
    /// default transport cannot be created.
    pub fn build(self) -> Result<Client> {
        let authorization = self
            .api_key
            .map(|key| {
                let mut value = HeaderValue::try_from(key).map_err(|e| {
                    Error::ConfigurationError(format!("Invalid API key: {}", e))
                })?;
                value.set_sensitive(true);
                Ok::<_, Error>(value)
            })
            .transpose()?;

        let production = match self.production_url {
            Some(url) => url,
            None => Url::parse(PRODUCTION_URL)?,
        };
        let mock = match self.mock_url {
            Some(url) => url,
            None => Url::parse(MOCK_URL)?,
        };

        let transport = match self.transport {
            Some(transport) => transport,
            None => Arc::new(HttpTransport::new()?),
        };

        let diagnostic_sink = self
            .diagnostic_sink
            .unwrap_or_else(|| Arc::new(TracingSink));

        Ok(Client {
            inner: Arc::new(ClientInner {
                context: BuildContext {
                    endpoints: Endpoints { production, mock },
                    authorization,
                    end_epoch_policy: self.end_epoch_policy,
                },
                transport,
                diagnostic_sink,
                timeout: self.timeout,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
