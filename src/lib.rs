//! # conviva-metrics - a validating client for the Conviva Metrics v3 API
//!
//! This crate builds correctly-shaped requests against the Metrics v3 API and
//! returns a uniform response envelope, whatever happens along the way. It
//! checks metric names, dimensions and granularities against the API's closed
//! vocabularies before anything is sent, and it never interprets the metrics
//! data itself.
//!
//! ## Quick Start
//!
//! ```no_run
//! use conviva_metrics::{Client, MetricQuery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), conviva_metrics::Error> {
//!     let client = Client::new(Some("my-api-key"))?;
//!
//!     // Plays per device OS over the last 7 days, one bucket per day
//!     let query = MetricQuery::metric("plays")
//!         .group_by("device-os")
//!         .days(7)
//!         .granularity("P1D");
//!
//!     let response = client.get_metric_query(query).await;
//!     println!("{} {}", response.status_code, response.reason);
//!     println!("{}", response.json);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Validation
//!
//! Only three things stop a request from being sent, and each of them makes
//! [`Client::get_metric`] return [`MetricResponse::error`] (status `0`, reason
//! `ERROR`):
//!
//! - an unknown single metric,
//! - a custom selection without both a start and an end date,
//! - no metric selection at all.
//!
//! Everything else that is invalid (an unknown group-by dimension, a bad
//! granularity, a malformed date, tag or dimension filter) is dropped or
//! defaulted, and reported as a [`Diagnostic`] to the client's
//! [`DiagnosticSink`]. By default diagnostics are logged with `tracing`.
//!
//! ```
//! use conviva_metrics::{Client, MemorySink, QueryIntent};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), conviva_metrics::Error> {
//! let sink = Arc::new(MemorySink::new());
//! let client = Client::builder()
//!     .api_key("my-api-key")
//!     .diagnostic_sink(sink.clone())
//!     .build()?;
//!
//! let request = client.build_request(QueryIntent {
//!     metric: Some("bitrate".to_string()),
//!     granularity: Some("BAD".to_string()),
//!     tag: Some("region=us-east".to_string()),
//!     ..Default::default()
//! })?;
//!
//! assert_eq!(request.path(), "/metrics/bitrate");
//! assert_eq!(request.param("granularity"), Some("PT1H"));
//! assert_eq!(request.param("tag_region"), Some("us-east"));
//! assert_eq!(sink.kinds(), vec!["invalid_granularity"]);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod client;
pub mod diagnostics;
mod error;
pub mod query;
pub mod request;
mod response;
pub mod transport;
pub mod vocabulary;

pub use client::{Client, ClientBuilder};
pub use diagnostics::{Diagnostic, DiagnosticSink, MemorySink, TracingSink};
pub use error::{Error, Result};
pub use query::{DimensionFilter, MetricQuery, MetricSelection, QueryIntent, ResultFilter, Window};
pub use request::MetricRequest;
pub use response::MetricResponse;
pub use transport::{HttpTransport, RawResponse, Transport};
