//! Error types for building and sending metric queries.
//!
//! Most invalid input is not an error at all: it is reported as a
//! [`Diagnostic`](crate::Diagnostic) and the offending piece is dropped. The
//! variants here are the cases that stop a request from being sent, plus
//! configuration and transport failures.

/// The main error type of the crate.
///
/// [`Client::get_metric`](crate::Client::get_metric) never returns this type;
/// it folds every error into the default error envelope. It is surfaced by
/// [`Client::build_request`](crate::Client::build_request), by the
/// [`Transport`](crate::Transport) seam and by client construction.
///
/// # Examples
///
/// ```
/// use conviva_metrics::{Client, Error, QueryIntent};
///
/// # fn example() -> Result<(), Error> {
/// let client = Client::new(Some("my-api-key"))?;
///
/// match client.build_request(QueryIntent::default()) {
///     Err(Error::NoMetricSelected) => {}
///     other => panic!("unexpected: {:?}", other),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A network-level error occurred (connection failed, DNS lookup failed, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out")]
    Timeout,

    /// Invalid configuration was provided, such as an API key that is not a
    /// valid header value.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The single metric is not a Conviva-defined metric.
    #[error("'{0}' is not a Conviva-defined metric")]
    UnknownMetric(String),

    /// Neither a metric nor a custom selection was supplied.
    #[error("no metric selected; supply a single metric or a custom selection")]
    NoMetricSelected,

    /// A custom selection was supplied without both a start and an end date.
    #[error("a custom selection requires both a start date and an end date")]
    MissingTimeBounds,
}

impl Error {
    /// Returns `true` if this error is a validation failure that stops the
    /// request before anything is sent.
    ///
    /// # Examples
    ///
    /// ```
    /// use conviva_metrics::Error;
    ///
    /// assert!(Error::NoMetricSelected.is_abort());
    /// assert!(Error::UnknownMetric("nope".to_string()).is_abort());
    /// assert!(!Error::Timeout.is_abort());
    /// ```
    pub fn is_abort(&self) -> bool {
        match self {
            Error::UnknownMetric(_) => true,
            Error::NoMetricSelected => true,
            Error::MissingTimeBounds => true,
            Error::Network(_) => false,
            Error::Timeout => false,
            Error::ConfigurationError(_) => false,
            Error::InvalidUrl(_) => false,
        }
    }
}

/// A specialized `Result` type for this crate.
///
/// This is a convenience alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
