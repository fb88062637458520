//! Query parameters for one metrics request.
//!
//! There are two ways to describe a query:
//!
//! - [`QueryIntent`] is the flat surface: every field optional, deserializable
//!   from JSON with the API's camelCase names. Convenient for configuration
//!   files and for callers that forward user input.
//! - [`MetricQuery`] is the typed form. The mutually exclusive choices
//!   (single metric or custom selection, real-time or historical window, saved
//!   filter or inline dimension filter) are enums, so a query that reaches the
//!   request builder is already structurally valid.
//!
//! Converting an intent into a query is where the structural checks happen:
//! no metric selection at all, or a custom selection without both dates, is an
//! error. Vocabulary checks happen later, in the request builder.

use crate::diagnostics::{Diagnostic, DiagnosticSink, TracingSink};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Flat, caller-facing description of a metrics query.
///
/// Empty strings are treated the same as absent fields.
///
/// # Examples
///
/// ```
/// use conviva_metrics::QueryIntent;
///
/// let intent: QueryIntent = serde_json::from_str(r#"{
///     "metric": "plays",
///     "groupBy": "device-os",
///     "days": 3,
///     "noNils": true,
///     "dimension": { "param": "geo_country_code", "value": "US" }
/// }"#).unwrap();
///
/// assert_eq!(intent.metric.as_deref(), Some("plays"));
/// assert_eq!(intent.days, Some(3));
/// assert!(intent.no_nils);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QueryIntent {
    /// Query the real-time endpoint instead of the historical one.
    pub live: bool,
    /// A single metric to query.
    pub metric: Option<String>,
    /// Several metrics to query in one call. Requires `start_date` and `end_date`.
    pub custom_selection: Option<Vec<String>>,
    /// Dimension to group results by (single metric only).
    pub group_by: Option<String>,
    /// Send the request to the mock server.
    pub mock: bool,
    /// Number of days back from the most recent clock hour (historical only).
    pub days: Option<i64>,
    /// Real-time window size in minutes (real-time only).
    pub minutes: Option<u32>,
    /// Time-bucket size as an ISO-8601 duration (historical only).
    pub granularity: Option<String>,
    /// Drop series whose data points are all zero.
    pub no_nils: bool,
    /// Start of the time range, `YYYY-MM-DDTHH:MM:SSZ`.
    pub start_date: Option<String>,
    /// Start of the time range in epoch seconds.
    pub start_epoch: Option<i64>,
    /// Start of the time range in epoch milliseconds.
    pub start_epoch_ms: Option<i64>,
    /// End of the time range, `YYYY-MM-DDTHH:MM:SSZ`.
    pub end_date: Option<String>,
    /// End of the time range in epoch seconds.
    pub end_epoch: Option<i64>,
    /// End of the time range in epoch milliseconds.
    pub end_epoch_ms: Option<i64>,
    /// Identifier of a saved filter. Takes precedence over `dimension`.
    pub filter_id: Option<String>,
    /// Identifier of a KPI threshold set.
    pub kpi_id: Option<String>,
    /// Custom tag filter, `tagName=tagValue`.
    pub tag: Option<String>,
    /// Inline dimension filter.
    pub dimension: Option<DimensionFilter>,
}

/// Filter on a single dimension value, e.g. `device_os = iOS`.
///
/// Both fields are optional so that incomplete filters coming from untyped
/// input can be represented; the request builder drops them with a
/// [`Diagnostic::MalformedDimension`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DimensionFilter {
    /// Filter dimension name, from the underscore-spelled vocabulary.
    pub param: Option<String>,
    /// Value to filter on.
    pub value: Option<String>,
}

impl DimensionFilter {
    /// Creates a complete filter.
    pub fn new(param: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            param: Some(param.into()),
            value: Some(value.into()),
        }
    }
}

/// Which metrics to query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetricSelection {
    /// One metric, optionally grouped by a dimension.
    Single {
        /// Metric name.
        metric: String,
        /// Group-by dimension, hyphen spelling.
        group_by: Option<String>,
    },
    /// Several metrics in one call.
    Custom {
        /// Metric names, in request order.
        metrics: Vec<String>,
    },
}

/// Real-time or historical window.
///
/// Only applied to single-metric queries; custom selections are bounded by
/// their absolute dates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Window {
    /// The `/real-time-metrics` endpoint.
    RealTime {
        /// Window size in minutes. The API applies its own default when absent.
        minutes: Option<u32>,
    },
    /// The `/metrics` endpoint.
    Historical {
        /// Days back from the most recent clock hour. Clamped to at least 1.
        days: Option<i64>,
        /// Bucket size as an ISO-8601 duration.
        granularity: Option<String>,
    },
}

impl Default for Window {
    fn default() -> Self {
        Window::Historical {
            days: None,
            granularity: None,
        }
    }
}

impl Window {
    /// Returns `true` for the real-time endpoint.
    pub fn is_live(&self) -> bool {
        matches!(self, Window::RealTime { .. })
    }
}

/// Absolute time bounds. Any combination of representations may be sent together.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TimeBounds {
    /// Start as an ISO-8601 timestamp.
    pub start_date: Option<String>,
    /// End as an ISO-8601 timestamp.
    pub end_date: Option<String>,
    /// Start in epoch seconds.
    pub start_epoch: Option<i64>,
    /// Start in epoch milliseconds.
    pub start_epoch_ms: Option<i64>,
    /// End in epoch seconds.
    pub end_epoch: Option<i64>,
    /// End in epoch milliseconds.
    pub end_epoch_ms: Option<i64>,
}

/// How results are filtered. A saved filter and an inline dimension filter
/// are mutually exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultFilter {
    /// A server-side saved filter, by identifier.
    Saved(String),
    /// An inline dimension filter.
    Dimension(DimensionFilter),
}

/// A structurally valid metrics query.
///
/// # Examples
///
/// ```
/// use conviva_metrics::MetricQuery;
///
/// let query = MetricQuery::metric("plays")
///     .group_by("device-os")
///     .days(7)
///     .granularity("P1D")
///     .no_nils(true);
///
/// let custom = MetricQuery::custom_selection(
///     ["plays", "bitrate"],
///     "2024-01-01T00:00:00Z",
///     "2024-01-02T00:00:00Z",
/// )
/// .filter_id("42");
/// # let _ = (query, custom);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricQuery {
    /// Which metrics to query.
    pub selection: MetricSelection,
    /// Real-time or historical window.
    pub window: Window,
    /// Send the request to the mock server.
    pub mock: bool,
    /// Drop series whose data points are all zero.
    pub no_nils: bool,
    /// Absolute time bounds.
    pub bounds: TimeBounds,
    /// Result filter.
    pub filter: Option<ResultFilter>,
    /// KPI threshold set identifier.
    pub kpi_id: Option<String>,
    /// Custom tag filter, `tagName=tagValue`.
    pub tag: Option<String>,
}

impl MetricQuery {
    fn with_selection(selection: MetricSelection) -> Self {
        Self {
            selection,
            window: Window::default(),
            mock: false,
            no_nils: false,
            bounds: TimeBounds::default(),
            filter: None,
            kpi_id: None,
            tag: None,
        }
    }

    /// Creates a historical query for a single metric.
    pub fn metric(metric: impl Into<String>) -> Self {
        Self::with_selection(MetricSelection::Single {
            metric: metric.into(),
            group_by: None,
        })
    }

    /// Creates a custom-selection query over several metrics between two dates.
    pub fn custom_selection<I, S>(
        metrics: I,
        start_date: impl Into<String>,
        end_date: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut query = Self::with_selection(MetricSelection::Custom {
            metrics: metrics.into_iter().map(Into::into).collect(),
        });
        query.bounds.start_date = Some(start_date.into());
        query.bounds.end_date = Some(end_date.into());
        query
    }

    /// Converts a flat intent, reporting non-fatal conflicts to `sink`.
    ///
    /// # Errors
    ///
    /// - [`Error::NoMetricSelected`] if neither a metric nor a non-empty
    ///   custom selection is supplied.
    /// - [`Error::MissingTimeBounds`] if a custom selection is supplied
    ///   without both a start date and an end date.
    pub fn from_intent(intent: QueryIntent, sink: &dyn DiagnosticSink) -> Result<Self> {
        let QueryIntent {
            live,
            metric,
            custom_selection,
            group_by,
            mock,
            days,
            minutes,
            granularity,
            no_nils,
            start_date,
            start_epoch,
            start_epoch_ms,
            end_date,
            end_epoch,
            end_epoch_ms,
            filter_id,
            kpi_id,
            tag,
            dimension,
        } = intent;

        let start_date = non_empty(start_date);
        let end_date = non_empty(end_date);
        let custom_selection = custom_selection.filter(|metrics| !metrics.is_empty());

        let selection = match (non_empty(metric), custom_selection) {
            (Some(metric), custom) => {
                if custom.is_some() {
                    sink.emit(&Diagnostic::CustomSelectionIgnored);
                }
                MetricSelection::Single {
                    metric,
                    group_by: non_empty(group_by),
                }
            }
            (None, Some(metrics)) => {
                if start_date.is_none() || end_date.is_none() {
                    return Err(Error::MissingTimeBounds);
                }
                MetricSelection::Custom { metrics }
            }
            (None, None) => return Err(Error::NoMetricSelected),
        };

        let window = if live {
            Window::RealTime { minutes }
        } else {
            Window::Historical {
                days,
                granularity: non_empty(granularity),
            }
        };

        let filter = match (non_empty(filter_id), dimension) {
            (Some(id), _) => Some(ResultFilter::Saved(id)),
            (None, Some(dimension)) => Some(ResultFilter::Dimension(dimension)),
            (None, None) => None,
        };

        Ok(Self {
            selection,
            window,
            mock,
            no_nils,
            bounds: TimeBounds {
                start_date,
                end_date,
                start_epoch,
                start_epoch_ms,
                end_epoch,
                end_epoch_ms,
            },
            filter,
            kpi_id: non_empty(kpi_id),
            tag: non_empty(tag),
        })
    }

    /// Groups a single-metric query by a dimension. Has no effect on a custom selection.
    pub fn group_by(mut self, dimension: impl Into<String>) -> Self {
        if let MetricSelection::Single { group_by, .. } = &mut self.selection {
            *group_by = Some(dimension.into());
        }
        self
    }

    /// Sets the window explicitly.
    pub fn window(mut self, window: Window) -> Self {
        self.window = window;
        self
    }

    /// Switches to the real-time endpoint with a window of `minutes`.
    pub fn minutes(self, minutes: u32) -> Self {
        self.window(Window::RealTime {
            minutes: Some(minutes),
        })
    }

    /// Sets the historical window size, switching to the historical endpoint if needed.
    pub fn days(mut self, value: i64) -> Self {
        match &mut self.window {
            Window::Historical { days, .. } => *days = Some(value),
            Window::RealTime { .. } => {
                self.window = Window::Historical {
                    days: Some(value),
                    granularity: None,
                }
            }
        }
        self
    }

    /// Sets the historical bucket size, switching to the historical endpoint if needed.
    pub fn granularity(mut self, value: impl Into<String>) -> Self {
        let value = value.into();
        match &mut self.window {
            Window::Historical { granularity, .. } => *granularity = Some(value),
            Window::RealTime { .. } => {
                self.window = Window::Historical {
                    days: None,
                    granularity: Some(value),
                }
            }
        }
        self
    }

    /// Routes the request to the mock server.
    pub fn mock(mut self, mock: bool) -> Self {
        self.mock = mock;
        self
    }

    /// Drops all-zero series from the response.
    pub fn no_nils(mut self, no_nils: bool) -> Self {
        self.no_nils = no_nils;
        self
    }

    /// Sets the start date.
    pub fn start_date(mut self, date: impl Into<String>) -> Self {
        self.bounds.start_date = Some(date.into());
        self
    }

    /// Sets the end date.
    pub fn end_date(mut self, date: impl Into<String>) -> Self {
        self.bounds.end_date = Some(date.into());
        self
    }

    /// Sets the start in epoch seconds.
    pub fn start_epoch(mut self, seconds: i64) -> Self {
        self.bounds.start_epoch = Some(seconds);
        self
    }

    /// Sets the start in epoch milliseconds.
    pub fn start_epoch_ms(mut self, millis: i64) -> Self {
        self.bounds.start_epoch_ms = Some(millis);
        self
    }

    /// Sets the end in epoch seconds.
    pub fn end_epoch(mut self, seconds: i64) -> Self {
        self.bounds.end_epoch = Some(seconds);
        self
    }

    /// Sets the end in epoch milliseconds.
    pub fn end_epoch_ms(mut self, millis: i64) -> Self {
        self.bounds.end_epoch_ms = Some(millis);
        self
    }

    /// Filters by a saved filter, replacing any dimension filter.
    pub fn filter_id(mut self, id: impl Into<String>) -> Self {
        self.filter = Some(ResultFilter::Saved(id.into()));
        self
    }

    /// Filters by a dimension value, unless a saved filter is already set.
    pub fn dimension(mut self, param: impl Into<String>, value: impl Into<String>) -> Self {
        if !matches!(self.filter, Some(ResultFilter::Saved(_))) {
            self.filter = Some(ResultFilter::Dimension(DimensionFilter::new(param, value)));
        }
        self
    }

    /// Sets the KPI threshold set.
    pub fn kpi_id(mut self, id: impl Into<String>) -> Self {
        self.kpi_id = Some(id.into());
        self
    }

    /// Sets a custom tag filter, `tagName=tagValue`.
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

impl TryFrom<QueryIntent> for MetricQuery {
    type Error = Error;

    /// Converts an intent, logging non-fatal conflicts through `tracing`.
    fn try_from(intent: QueryIntent) -> Result<Self> {
        Self::from_intent(intent, &TracingSink)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}
