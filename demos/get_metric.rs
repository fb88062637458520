//! Queries the hosted mock server, which needs no API key.
//!
//! This example shows how to:
//! - Create a client, optionally with an API key from `CONVIVA_API_KEY`
//! - Query a single metric grouped by a dimension
//! - Query a custom selection of several metrics
//! - Inspect the response envelope
//!
//! Run with: `cargo run --example get_metric`

use conviva_metrics::{Client, Error, MetricQuery, QueryIntent};

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Diagnostics are logged through tracing by default
    tracing_subscriber::fmt()
        .with_env_filter("conviva_metrics=debug,get_metric=info")
        .init();

    let api_key = std::env::var("CONVIVA_API_KEY").ok();
    let client = Client::new(api_key.as_deref())?;

    println!("=== Single metric ===");
    let query = MetricQuery::metric("plays")
        .group_by("device-os")
        .days(3)
        .granularity("P1D")
        .mock(true);
    let response = client.get_metric_query(query).await;
    println!("URL: {}", response.url);
    println!("Status: {} {}", response.status_code, response.reason);
    println!("Latency: {:?}", response.latency);
    println!("Body: {}", response.json);
    println!();

    println!("=== Custom selection ===");
    let intent: QueryIntent = serde_json::from_str(
        r#"{
            "mock": true,
            "customSelection": ["plays", "bitrate", "not-a-metric"],
            "startDate": "2024-01-01T00:00:00Z",
            "endDate": "2024-01-02T00:00:00Z"
        }"#,
    )
    .map_err(|e| Error::ConfigurationError(format!("Invalid query: {}", e)))?;
    let response = client.get_metric(intent).await;
    println!("URL: {}", response.url);
    println!("Status: {} {}", response.status_code, response.reason);
    println!();

    println!("=== Aborted request ===");
    let response = client.get_metric(QueryIntent::default()).await;
    println!("Status: {} {}", response.status_code, response.reason);
    println!("Is error envelope: {}", response.is_error());

    Ok(())
}
