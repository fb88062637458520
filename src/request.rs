//! Request descriptors and the validating builder that produces them.
//!
//! [`build`] turns a [`MetricQuery`] into a [`MetricRequest`]: the full URL,
//! the query parameters and the headers of one GET against the Metrics v3 API.
//! It aborts only when the single metric is unknown or a custom selection
//! lacks its date bounds; any other invalid piece of the query is dropped or
//! defaulted and reported to the [`DiagnosticSink`].

use crate::diagnostics::{Diagnostic, DiagnosticSink};
use crate::query::{MetricQuery, MetricSelection, ResultFilter, Window};
use crate::vocabulary::{self, DEFAULT_GRANULARITY};
use crate::{Error, Result};
use http::header::{ACCEPT, AUTHORIZATION};
use http::{HeaderMap, HeaderValue};
use std::collections::BTreeMap;
use url::Url;

/// Base URL of the production API.
pub const PRODUCTION_URL: &str = "https://api.conviva.com/insights/3.0";

/// Base URL of the hosted mock server.
pub const MOCK_URL: &str = "https://stoplight.io/mocks/conviva/metrics-api-v3/42579808";

const REAL_TIME_SEGMENT: &str = "/real-time-metrics";
const HISTORICAL_SEGMENT: &str = "/metrics";
const CUSTOM_SELECTION_SEGMENT: &str = "/custom-selection";
const GROUP_BY_SEGMENT: &str = "/group-by/";

/// The two servers a request can be routed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// The production API.
    pub production: Url,
    /// The mock server. Requests to it never carry an API key.
    pub mock: Url,
}

impl Endpoints {
    /// Parses both base URLs.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if either URL does not parse.
    pub fn new(production: impl AsRef<str>, mock: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            production: Url::parse(production.as_ref())?,
            mock: Url::parse(mock.as_ref())?,
        })
    }

    /// The public production API and the hosted mock server.
    pub fn conviva() -> Result<Self> {
        Self::new(PRODUCTION_URL, MOCK_URL)
    }
}

/// What to send as `end_epoch` / `end_epoch_ms`.
///
/// Existing consumers of this API have always sent the *start* epoch values in
/// the end-epoch parameters, whatever end epoch they supplied. That is almost
/// certainly a bug, but changing it changes the results those consumers get.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EndEpochPolicy {
    /// Send the start epoch values as the end epoch values.
    ///
    /// A supplied end epoch that differs is dropped with a
    /// [`Diagnostic::EndEpochOverridden`].
    #[default]
    MirrorStart,
    /// Send the end epoch values the caller supplied.
    UseSupplied,
}

/// Client-level settings the builder needs.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Production and mock base URLs.
    pub endpoints: Endpoints,
    /// Value of the `Authorization` header for production requests.
    pub authorization: Option<HeaderValue>,
    /// How end epochs are filled in.
    pub end_epoch_policy: EndEpochPolicy,
}

impl BuildContext {
    /// Creates a context without credentials, using the default end-epoch policy.
    pub fn new(endpoints: Endpoints) -> Self {
        Self {
            endpoints,
            authorization: None,
            end_epoch_policy: EndEpochPolicy::default(),
        }
    }
}

/// A fully-formed GET request against the Metrics v3 API.
///
/// Query parameters are held as a map, except `metric`, which a custom
/// selection repeats once per metric.
#[derive(Debug, Clone)]
pub struct MetricRequest {
    url: Url,
    path: String,
    metrics: Vec<String>,
    params: BTreeMap<String, String>,
    headers: HeaderMap,
    mock: bool,
}

impl MetricRequest {
    /// The complete URL, query string included.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The path appended to the base URL, e.g. `/metrics/plays/group-by/cdn`.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The repeated `metric` entries of a custom selection, in order.
    pub fn metrics(&self) -> &[String] {
        &self.metrics
    }

    /// Every query parameter other than the repeated `metric` entries.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }

    /// Returns the value of one query parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    /// All query pairs as sent: the `metric` entries first, then the rest by name.
    pub fn query_pairs(&self) -> Vec<(&str, &str)> {
        self.metrics
            .iter()
            .map(|metric| ("metric", metric.as_str()))
            .chain(self.params.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .collect()
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns `true` if the request goes to the mock server.
    pub fn is_mock(&self) -> bool {
        self.mock
    }

    /// Renders the headers for logs, hiding sensitive values.
    pub(crate) fn redacted_headers(&self) -> String {
        let rendered: Vec<String> = self
            .headers
            .iter()
            .map(|(name, value)| {
                if value.is_sensitive() {
                    format!("{}: <redacted>", name)
                } else {
                    format!("{}: {}", name, value.to_str().unwrap_or("<binary>"))
                }
            })
            .collect();
        format!("{{{}}}", rendered.join(", "))
    }
}

/// Validates `query` and builds the request for it.
///
/// # Errors
///
/// - [`Error::UnknownMetric`] if a single metric is not in the metric vocabulary.
/// - [`Error::MissingTimeBounds`] if a custom selection lacks a start or end date.
/// - [`Error::InvalidUrl`] if the resulting URL does not parse.
///
/// # Examples
///
/// ```
/// use conviva_metrics::request::{build, BuildContext, Endpoints};
/// use conviva_metrics::{MetricQuery, TracingSink};
///
/// # fn example() -> Result<(), conviva_metrics::Error> {
/// let context = BuildContext::new(Endpoints::conviva()?);
/// let query = MetricQuery::metric("bitrate").days(3);
///
/// let request = build(&query, &context, &TracingSink)?;
/// assert_eq!(request.path(), "/metrics/bitrate");
/// assert_eq!(request.param("days"), Some("3"));
/// # Ok(())
/// # }
/// ```
pub fn build(
    query: &MetricQuery,
    context: &BuildContext,
    sink: &dyn DiagnosticSink,
) -> Result<MetricRequest> {
    let base = if query.mock {
        &context.endpoints.mock
    } else {
        &context.endpoints.production
    };

    let mut path = String::from(if query.window.is_live() {
        REAL_TIME_SEGMENT
    } else {
        HISTORICAL_SEGMENT
    });
    let mut metrics = Vec::new();
    let mut params = BTreeMap::new();

    match &query.selection {
        MetricSelection::Single { metric, group_by } => {
            if !vocabulary::is_metric(metric) {
                return Err(Error::UnknownMetric(metric.clone()));
            }
            path.push('/');
            path.push_str(metric);

            if let Some(group_by) = group_by {
                if vocabulary::is_group_by_dimension(group_by) {
                    path.push_str(GROUP_BY_SEGMENT);
                    path.push_str(group_by);
                } else {
                    sink.emit(&Diagnostic::InvalidGroupBy {
                        group_by: group_by.clone(),
                    });
                }
            }

            match &query.window {
                Window::RealTime { minutes } => {
                    if let Some(minutes) = minutes {
                        params.insert("minutes".to_string(), minutes.to_string());
                    }
                }
                Window::Historical { days, granularity } => {
                    // A valid granularity is left to the API; only the fallback is sent.
                    if let Some(granularity) = granularity {
                        if !vocabulary::is_granularity(granularity) {
                            params.insert(
                                "granularity".to_string(),
                                DEFAULT_GRANULARITY.to_string(),
                            );
                            sink.emit(&Diagnostic::InvalidGranularity {
                                granularity: granularity.clone(),
                            });
                        }
                    }
                    // Zero counts as unset; negative counts are clamped.
                    if let Some(days) = days.filter(|d| *d != 0) {
                        params.insert("days".to_string(), days.max(1).to_string());
                    }
                }
            }
        }
        MetricSelection::Custom { metrics: selection } => {
            if selection.is_empty() {
                return Err(Error::NoMetricSelected);
            }
            path.push_str(CUSTOM_SELECTION_SEGMENT);
            for metric in selection {
                if vocabulary::is_metric(metric) {
                    metrics.push(metric.clone());
                } else {
                    sink.emit(&Diagnostic::SkippedMetric {
                        metric: metric.clone(),
                    });
                }
            }
            let present = |date: &Option<String>| date.as_deref().is_some_and(|d| !d.is_empty());
            if !present(&query.bounds.start_date) || !present(&query.bounds.end_date) {
                return Err(Error::MissingTimeBounds);
            }
        }
    }

    let bounds = &query.bounds;
    if let Some(start_date) = &bounds.start_date {
        if vocabulary::is_iso_timestamp(start_date) {
            params.insert("start_date".to_string(), start_date.clone());
        } else {
            sink.emit(&Diagnostic::InvalidStartDate {
                value: start_date.clone(),
            });
        }
    }
    if let Some(end_date) = &bounds.end_date {
        if vocabulary::is_iso_timestamp(end_date) {
            params.insert("end_date".to_string(), end_date.clone());
        } else {
            sink.emit(&Diagnostic::InvalidEndDate {
                value: end_date.clone(),
            });
        }
    }

    let (end_epoch, end_epoch_ms) = match context.end_epoch_policy {
        EndEpochPolicy::MirrorStart => {
            report_overridden("end_epoch", bounds.end_epoch, bounds.start_epoch, sink);
            report_overridden(
                "end_epoch_ms",
                bounds.end_epoch_ms,
                bounds.start_epoch_ms,
                sink,
            );
            (bounds.start_epoch, bounds.start_epoch_ms)
        }
        EndEpochPolicy::UseSupplied => (bounds.end_epoch, bounds.end_epoch_ms),
    };

    let mut aux: Vec<(String, Option<String>)> = vec![
        ("start_epoch".to_string(), bounds.start_epoch.map(|v| v.to_string())),
        (
            "start_epoch_ms".to_string(),
            bounds.start_epoch_ms.map(|v| v.to_string()),
        ),
        ("end_epoch".to_string(), end_epoch.map(|v| v.to_string())),
        ("end_epoch_ms".to_string(), end_epoch_ms.map(|v| v.to_string())),
        ("kpi_id".to_string(), query.kpi_id.clone()),
        (
            "no_nils".to_string(),
            query.no_nils.then(|| "true".to_string()),
        ),
    ];

    if let Some(tag) = &query.tag {
        match tag.split_once('=') {
            Some((name, value)) => aux.push((format!("tag_{}", name), Some(value.to_string()))),
            None => sink.emit(&Diagnostic::MalformedTag { tag: tag.clone() }),
        }
    }

    match &query.filter {
        Some(ResultFilter::Saved(id)) => aux.push(("filter_id".to_string(), Some(id.clone()))),
        Some(ResultFilter::Dimension(dimension)) => {
            match (dimension.param.as_deref().filter(|p| !p.is_empty()), &dimension.value) {
                (None, _) => sink.emit(&Diagnostic::MalformedDimension),
                (Some(param), _) if !vocabulary::is_filter_dimension(param) => {
                    sink.emit(&Diagnostic::InvalidDimension {
                        param: param.to_string(),
                    })
                }
                (Some(_), None) => sink.emit(&Diagnostic::MalformedDimension),
                (Some(param), Some(value)) => aux.push((param.to_string(), Some(value.clone()))),
            }
        }
        None => {}
    }

    params.extend(aux.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))));

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if !query.mock {
        match &context.authorization {
            Some(authorization) => {
                headers.insert(AUTHORIZATION, authorization.clone());
            }
            None => sink.emit(&Diagnostic::Unauthenticated),
        }
    }

    let mut url = Url::parse(&format!(
        "{}{}",
        base.as_str().trim_end_matches('/'),
        path
    ))?;
    if !metrics.is_empty() || !params.is_empty() {
        let mut pairs = url.query_pairs_mut();
        for metric in &metrics {
            pairs.append_pair("metric", metric);
        }
        for (name, value) in &params {
            pairs.append_pair(name, value);
        }
    }

    Ok(MetricRequest {
        url,
        path,
        metrics,
        params,
        headers,
        mock: query.mock,
    })
}

fn report_overridden(
    field: &'static str,
    supplied: Option<i64>,
    start: Option<i64>,
    sink: &dyn DiagnosticSink,
) {
    if let Some(supplied) = supplied {
        if Some(supplied) != start {
            sink.emit(&Diagnostic::EndEpochOverridden { field, supplied });
        }
    }
}
