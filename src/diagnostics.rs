//! Validation diagnostics and the sinks that receive them.
//!
//! Most malformed input does not stop a request: the offending parameter is
//! dropped or defaulted and a [`Diagnostic`] is emitted instead. Diagnostics go
//! to a [`DiagnosticSink`] configured on the client, which by default forwards
//! them to `tracing`.

use std::sync::Mutex;
use tracing::Level;

/// Something the caller should know about a request that was built anyway,
/// or the reason one was not.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Diagnostic {
    /// The group-by dimension is unknown; the request is sent ungrouped.
    #[error("'{group_by}' is not a Conviva-defined group-by dimension; results will not be grouped")]
    InvalidGroupBy {
        /// The rejected dimension.
        group_by: String,
    },

    /// The granularity is unknown; `PT1H` is sent instead.
    #[error("'{granularity}' is not a valid ISO-8601 granularity; using default 'PT1H'")]
    InvalidGranularity {
        /// The rejected granularity.
        granularity: String,
    },

    /// The start date is not an ISO-8601 timestamp and was dropped.
    #[error("start date '{value}' must be in ISO-8601 format 'YYYY-MM-DDTHH:MM:SSZ'")]
    InvalidStartDate {
        /// The rejected value.
        value: String,
    },

    /// The end date is not an ISO-8601 timestamp and was dropped.
    #[error("end date '{value}' must be in ISO-8601 format 'YYYY-MM-DDTHH:MM:SSZ'")]
    InvalidEndDate {
        /// The rejected value.
        value: String,
    },

    /// An entry of a custom selection is unknown and was skipped.
    #[error("'{metric}' is not a Conviva-defined metric; skipped from the custom selection")]
    SkippedMetric {
        /// The skipped metric name.
        metric: String,
    },

    /// Both a single metric and a custom selection were supplied.
    #[error("both a metric and a custom selection were supplied; the custom selection is ignored")]
    CustomSelectionIgnored,

    /// The custom tag is not of the form `name=value` and was dropped.
    #[error("tag '{tag}' must be of the form 'tagName=tagValue'")]
    MalformedTag {
        /// The rejected tag.
        tag: String,
    },

    /// The dimension filter names an unknown dimension and was dropped.
    #[error("'{param}' is not a Conviva-defined filter dimension")]
    InvalidDimension {
        /// The rejected dimension name.
        param: String,
    },

    /// The dimension filter lacks a `param` or a `value` and was dropped.
    #[error("dimension filter must carry both a 'param' and a 'value'")]
    MalformedDimension,

    /// A supplied end epoch was replaced by the start epoch.
    #[error("{field} {supplied} was replaced by the start epoch")]
    EndEpochOverridden {
        /// The overridden query parameter.
        field: &'static str,
        /// The value the caller supplied.
        supplied: i64,
    },

    /// No API key is configured for a production request.
    #[error("no API key set for a request to the production server; add an API key or use the mock server")]
    Unauthenticated,

    /// The response body was not valid JSON.
    #[error("response body (status {status}) is not valid JSON")]
    UnparseableBody {
        /// Status code of the response.
        status: u16,
    },

    /// The transport failed to produce a response.
    #[error("request to {url} failed: {error} (headers: {headers})")]
    TransportFailure {
        /// The attempted URL.
        url: String,
        /// The attempted headers, with sensitive values redacted.
        headers: String,
        /// The transport error.
        error: String,
    },

    /// The request was not sent.
    #[error("request aborted: {reason}")]
    RequestAborted {
        /// Why the request was aborted.
        reason: String,
    },
}

impl Diagnostic {
    /// Returns a stable, machine-readable name for this diagnostic.
    pub fn kind(&self) -> &'static str {
        match self {
            Diagnostic::InvalidGroupBy { .. } => "invalid_group_by",
            Diagnostic::InvalidGranularity { .. } => "invalid_granularity",
            Diagnostic::InvalidStartDate { .. } => "invalid_start_date",
            Diagnostic::InvalidEndDate { .. } => "invalid_end_date",
            Diagnostic::SkippedMetric { .. } => "skipped_metric",
            Diagnostic::CustomSelectionIgnored => "custom_selection_ignored",
            Diagnostic::MalformedTag { .. } => "malformed_tag",
            Diagnostic::InvalidDimension { .. } => "invalid_dimension",
            Diagnostic::MalformedDimension => "malformed_dimension",
            Diagnostic::EndEpochOverridden { .. } => "end_epoch_overridden",
            Diagnostic::Unauthenticated => "unauthenticated",
            Diagnostic::UnparseableBody { .. } => "unparseable_body",
            Diagnostic::TransportFailure { .. } => "transport_failure",
            Diagnostic::RequestAborted { .. } => "request_aborted",
        }
    }

    /// Returns the level this diagnostic is logged at.
    pub fn level(&self) -> Level {
        match self {
            Diagnostic::TransportFailure { .. } => Level::ERROR,
            _ => Level::WARN,
        }
    }
}

/// Receives the diagnostics emitted while building and sending requests.
///
/// Implementations must be cheap and must not fail; they are called inline.
///
/// # Examples
///
/// ```
/// use conviva_metrics::{Diagnostic, DiagnosticSink};
/// use std::sync::atomic::{AtomicUsize, Ordering};
///
/// struct CountWarnings(AtomicUsize);
///
/// impl DiagnosticSink for CountWarnings {
///     fn emit(&self, _diagnostic: &Diagnostic) {
///         self.0.fetch_add(1, Ordering::Relaxed);
///     }
/// }
/// ```
pub trait DiagnosticSink: Send + Sync {
    /// Handles one diagnostic.
    fn emit(&self, diagnostic: &Diagnostic);
}

/// Forwards diagnostics to `tracing`. This is the client's default sink.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, diagnostic: &Diagnostic) {
        if diagnostic.level() == Level::ERROR {
            tracing::error!(kind = diagnostic.kind(), "{}", diagnostic);
        } else {
            tracing::warn!(kind = diagnostic.kind(), "{}", diagnostic);
        }
    }
}

/// Keeps every diagnostic in memory.
///
/// Useful for surfacing warnings to an end user after a call, and in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl MemorySink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything emitted so far.
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    /// Returns the kinds of everything emitted so far, in order.
    pub fn kinds(&self) -> Vec<&'static str> {
        self.lock().iter().map(Diagnostic::kind).collect()
    }

    /// Removes and returns everything emitted so far.
    pub fn take(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut *self.lock())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        // A panic while holding the lock cannot leave the Vec half-written.
        self.diagnostics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl DiagnosticSink for MemorySink {
    fn emit(&self, diagnostic: &Diagnostic) {
        self.lock().push(diagnostic.clone());
    }
}
