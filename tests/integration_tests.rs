//! Integration tests using wiremock to stand in for the Metrics v3 API.

use conviva_metrics::request::{EndEpochPolicy, MetricRequest};
use conviva_metrics::{
    Client, Diagnostic, DimensionFilter, Error, MemorySink, MetricQuery, QueryIntent, RawResponse,
    Transport,
};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

const API_KEY: &str = "test-key";

fn client_for(mock_server: &MockServer) -> (Client, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let client = Client::builder()
        .api_key(API_KEY)
        .production_url(format!("{}/insights/3.0", mock_server.uri()))
        .unwrap()
        .mock_url(format!("{}/mock", mock_server.uri()))
        .unwrap()
        .diagnostic_sink(sink.clone())
        .build()
        .unwrap();
    (client, sink)
}

fn metric(name: &str) -> QueryIntent {
    QueryIntent {
        metric: Some(name.to_string()),
        ..Default::default()
    }
}

async fn ok_for_everything(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .mount(mock_server)
        .await;
}

async fn received(mock_server: &MockServer) -> Vec<Request> {
    mock_server.received_requests().await.unwrap()
}

fn query_values(request: &Request, name: &str) -> Vec<String> {
    request
        .url
        .query_pairs()
        .filter(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
        .collect()
}

fn query_names(request: &Request) -> Vec<String> {
    request
        .url
        .query_pairs()
        .map(|(k, _)| k.into_owned())
        .collect()
}

#[tokio::test]
async fn test_historical_metric_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/insights/3.0/metrics/bitrate"))
        .and(query_param("days", "3"))
        .and(query_param("start_date", "2024-01-01T00:00:00Z"))
        .and(query_param("end_date", "2024-01-02T00:00:00Z"))
        .and(header("accept", "application/json"))
        .and(header("authorization", API_KEY))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"bitrate": {"timeseries": [1, 2, 3]}}))
                .insert_header("x-request-id", "abc"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, sink) = client_for(&mock_server);

    let response = client
        .get_metric(QueryIntent {
            live: false,
            days: Some(3),
            start_date: Some("2024-01-01T00:00:00Z".to_string()),
            end_date: Some("2024-01-02T00:00:00Z".to_string()),
            ..metric("bitrate")
        })
        .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.reason, "OK");
    assert!(response.is_success());
    assert_eq!(response.json, json!({"bitrate": {"timeseries": [1, 2, 3]}}));
    assert!(response.text.contains("timeseries"));
    assert!(response.url.contains("/insights/3.0/metrics/bitrate?"));
    assert_eq!(response.header("x-request-id"), Some("abc"));
    assert!(sink.diagnostics().is_empty());

    let requests = received(&mock_server).await;
    let mut names = query_names(&requests[0]);
    names.sort();
    assert_eq!(names, vec!["days", "end_date", "start_date"]);
}

#[tokio::test]
async fn test_real_time_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/insights/3.0/real-time-metrics/concurrent-plays/group-by/cdn"))
        .and(query_param("minutes", "5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _) = client_for(&mock_server);

    let response = client
        .get_metric(QueryIntent {
            live: true,
            minutes: Some(5),
            days: Some(3),
            group_by: Some("cdn".to_string()),
            ..metric("concurrent-plays")
        })
        .await;

    assert_eq!(response.status_code, 200);
    let requests = received(&mock_server).await;
    assert_eq!(query_names(&requests[0]), vec!["minutes"]);
}

#[tokio::test]
async fn test_no_metric_selected_returns_error_envelope() {
    let mock_server = MockServer::start().await;
    ok_for_everything(&mock_server).await;
    let (client, sink) = client_for(&mock_server);

    let response = client.get_metric(QueryIntent::default()).await;

    assert!(response.is_error());
    assert_eq!(response.status_code, 0);
    assert_eq!(response.reason, "ERROR");
    assert_eq!(response.url, "");
    assert_eq!(response.text, "");
    assert!(response.headers.is_empty());
    assert_eq!(response.json, json!({}));
    assert_eq!(sink.kinds(), vec!["request_aborted"]);
    assert!(received(&mock_server).await.is_empty());
}

#[tokio::test]
async fn test_unknown_metric_returns_error_envelope() {
    let mock_server = MockServer::start().await;
    ok_for_everything(&mock_server).await;
    let (client, sink) = client_for(&mock_server);

    for name in ["not-a-metric", "Plays", "plays "] {
        let response = client.get_metric(metric(name)).await;
        assert!(response.is_error(), "{}", name);
        assert_eq!(response.reason, "ERROR");
    }

    assert_eq!(sink.kinds(), vec!["request_aborted"; 3]);
    assert!(received(&mock_server).await.is_empty());
}

#[tokio::test]
async fn test_custom_selection_repeats_metric_params() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/insights/3.0/metrics/custom-selection"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"plays": {}, "bitrate": {}})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, sink) = client_for(&mock_server);

    let response = client
        .get_metric(QueryIntent {
            custom_selection: Some(vec![
                "plays".to_string(),
                "not-a-metric".to_string(),
                "bitrate".to_string(),
            ]),
            start_date: Some("2024-01-01T00:00:00Z".to_string()),
            end_date: Some("2024-01-02T00:00:00Z".to_string()),
            ..Default::default()
        })
        .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(
        sink.diagnostics(),
        vec![Diagnostic::SkippedMetric {
            metric: "not-a-metric".to_string()
        }]
    );

    let requests = received(&mock_server).await;
    assert_eq!(query_values(&requests[0], "metric"), vec!["plays", "bitrate"]);
    assert_eq!(
        query_values(&requests[0], "start_date"),
        vec!["2024-01-01T00:00:00Z"]
    );
}

#[tokio::test]
async fn test_custom_selection_without_bounds_is_not_sent() {
    let mock_server = MockServer::start().await;
    ok_for_everything(&mock_server).await;
    let (client, _) = client_for(&mock_server);

    for (start_date, end_date) in [
        (Some("2024-01-01T00:00:00Z"), None),
        (None, Some("2024-01-02T00:00:00Z")),
        (None, None),
    ] {
        let response = client
            .get_metric(QueryIntent {
                custom_selection: Some(vec!["plays".to_string()]),
                start_date: start_date.map(str::to_string),
                end_date: end_date.map(str::to_string),
                ..Default::default()
            })
            .await;
        assert!(response.is_error());
    }

    assert!(received(&mock_server).await.is_empty());
}

#[tokio::test]
async fn test_soft_failures_still_send_the_request() {
    let mock_server = MockServer::start().await;
    ok_for_everything(&mock_server).await;
    let (client, sink) = client_for(&mock_server);

    let response = client
        .get_metric(QueryIntent {
            group_by: Some("device_os".to_string()),
            granularity: Some("BAD".to_string()),
            start_date: Some("2024-01-01".to_string()),
            tag: Some("malformed".to_string()),
            dimension: Some(DimensionFilter::new("not_a_dimension", "x")),
            ..metric("plays")
        })
        .await;

    assert_eq!(response.status_code, 200);
    assert_eq!(
        sink.kinds(),
        vec![
            "invalid_group_by",
            "invalid_granularity",
            "invalid_start_date",
            "malformed_tag",
            "invalid_dimension",
        ]
    );

    let requests = received(&mock_server).await;
    assert_eq!(requests[0].url.path(), "/insights/3.0/metrics/plays");
    assert_eq!(query_names(&requests[0]), vec!["granularity"]);
    assert_eq!(query_values(&requests[0], "granularity"), vec!["PT1H"]);
}

#[tokio::test]
async fn test_optional_params() {
    let mock_server = MockServer::start().await;
    ok_for_everything(&mock_server).await;
    let (client, _) = client_for(&mock_server);

    client
        .get_metric(QueryIntent {
            no_nils: true,
            kpi_id: Some("2".to_string()),
            tag: Some("region=us-east".to_string()),
            dimension: Some(DimensionFilter::new("device_os", "iOS")),
            start_epoch: Some(1_704_067_200),
            ..metric("plays")
        })
        .await;

    client
        .get_metric(QueryIntent {
            no_nils: false,
            filter_id: Some("77".to_string()),
            dimension: Some(DimensionFilter::new("device_os", "iOS")),
            ..metric("plays")
        })
        .await;

    let requests = received(&mock_server).await;
    assert_eq!(requests.len(), 2);

    let first = &requests[0];
    assert_eq!(query_values(first, "no_nils"), vec!["true"]);
    assert_eq!(query_values(first, "kpi_id"), vec!["2"]);
    assert_eq!(query_values(first, "tag_region"), vec!["us-east"]);
    assert_eq!(query_values(first, "device_os"), vec!["iOS"]);
    assert_eq!(query_values(first, "start_epoch"), vec!["1704067200"]);
    assert_eq!(query_values(first, "end_epoch"), vec!["1704067200"]);

    let second = &requests[1];
    assert_eq!(query_values(second, "filter_id"), vec!["77"]);
    assert!(query_values(second, "device_os").is_empty());
    assert!(query_values(second, "no_nils").is_empty());
}

#[tokio::test]
async fn test_supplied_end_epoch_policy() {
    let mock_server = MockServer::start().await;
    ok_for_everything(&mock_server).await;

    let client = Client::builder()
        .api_key(API_KEY)
        .production_url(mock_server.uri())
        .unwrap()
        .end_epoch_policy(EndEpochPolicy::UseSupplied)
        .build()
        .unwrap();

    client
        .get_metric(QueryIntent {
            start_epoch_ms: Some(1_000),
            end_epoch_ms: Some(2_000),
            ..metric("plays")
        })
        .await;

    let requests = received(&mock_server).await;
    assert_eq!(query_values(&requests[0], "start_epoch_ms"), vec!["1000"]);
    assert_eq!(query_values(&requests[0], "end_epoch_ms"), vec!["2000"]);
}

#[tokio::test]
async fn test_mock_requests_skip_authorization() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/mock/metrics/plays"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, sink) = client_for(&mock_server);

    let response = client
        .get_metric(QueryIntent {
            mock: true,
            ..metric("plays")
        })
        .await;

    assert_eq!(response.status_code, 200);
    assert!(sink.diagnostics().is_empty());

    let requests = received(&mock_server).await;
    assert!(requests[0].headers.get("authorization").is_none());
    assert_eq!(requests[0].headers.get("accept").unwrap(), "application/json");
}

#[tokio::test]
async fn test_unauthenticated_production_request_is_sent() {
    let mock_server = MockServer::start().await;
    ok_for_everything(&mock_server).await;

    let sink = Arc::new(MemorySink::new());
    let client = Client::builder()
        .production_url(mock_server.uri())
        .unwrap()
        .diagnostic_sink(sink.clone())
        .build()
        .unwrap();

    let response = client.get_metric(metric("plays")).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(sink.kinds(), vec!["unauthenticated"]);
    let requests = received(&mock_server).await;
    assert!(requests[0].headers.get("authorization").is_none());
}

#[tokio::test]
async fn test_http_errors_pass_through() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Unauthorized"})))
        .mount(&mock_server)
        .await;

    let (client, _) = client_for(&mock_server);
    let response = client.get_metric(metric("plays")).await;

    assert_eq!(response.status_code, 401);
    assert_eq!(response.reason, "Unauthorized");
    assert!(!response.is_error());
    assert!(!response.is_success());
    assert_eq!(response.json, json!({"message": "Unauthorized"}));
}

#[tokio::test]
async fn test_unparseable_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&mock_server)
        .await;

    let (client, sink) = client_for(&mock_server);
    let response = client.get_metric(metric("plays")).await;

    assert_eq!(response.status_code, 200);
    assert_eq!(response.text, "<html>maintenance</html>");
    assert_eq!(response.json, json!({}));
    assert_eq!(sink.kinds(), vec!["unparseable_body"]);
}

#[tokio::test]
async fn test_timeout_returns_error_envelope() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({}))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&mock_server)
        .await;

    let sink = Arc::new(MemorySink::new());
    let client = Client::builder()
        .api_key(API_KEY)
        .production_url(mock_server.uri())
        .unwrap()
        .timeout(Duration::from_millis(50))
        .diagnostic_sink(sink.clone())
        .build()
        .unwrap();

    let response = client.get_metric(metric("plays")).await;

    assert!(response.is_error());
    assert_eq!(sink.kinds(), vec!["transport_failure"]);
}

struct FailingTransport;

#[async_trait::async_trait]
impl Transport for FailingTransport {
    async fn get(
        &self,
        _request: &MetricRequest,
        _timeout: Duration,
    ) -> conviva_metrics::Result<RawResponse> {
        Err(Error::ConfigurationError("no route to host".to_string()))
    }
}

#[tokio::test]
async fn test_transport_failure_is_logged_with_request_details() {
    let sink = Arc::new(MemorySink::new());
    let client = Client::builder()
        .api_key(API_KEY)
        .production_url("https://api.test/insights/3.0")
        .unwrap()
        .transport(Arc::new(FailingTransport))
        .diagnostic_sink(sink.clone())
        .build()
        .unwrap();

    let response = client.get_metric(metric("plays")).await;
    assert!(response.is_error());

    match sink.diagnostics().as_slice() {
        [Diagnostic::TransportFailure {
            url,
            headers,
            error,
        }] => {
            assert_eq!(url, "https://api.test/insights/3.0/metrics/plays");
            assert!(headers.contains("application/json"));
            assert!(!headers.contains(API_KEY));
            assert!(error.contains("no route to host"));
        }
        other => panic!("Expected one TransportFailure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_typed_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/insights/3.0/metrics/plays/group-by/device-os"))
        .and(query_param("days", "7"))
        .and(query_param("filter_id", "9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(1)
        .mount(&mock_server)
        .await;

    let (client, _) = client_for(&mock_server);

    let response = client
        .get_metric_query(
            MetricQuery::metric("plays")
                .group_by("device-os")
                .days(7)
                .filter_id("9"),
        )
        .await;

    assert_eq!(response.status_code, 200);
}

#[tokio::test]
async fn test_shared_client_across_tasks() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .expect(8)
        .mount(&mock_server)
        .await;

    let (client, _) = client_for(&mock_server);

    let handles: Vec<_> = (1..=8)
        .map(|days| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .get_metric(QueryIntent {
                        days: Some(days),
                        ..metric("plays")
                    })
                    .await
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.await.unwrap().status_code, 200);
    }

    let mut days: Vec<String> = received(&mock_server)
        .await
        .iter()
        .flat_map(|request| query_values(request, "days"))
        .collect();
    days.sort_by_key(|d| d.parse::<i64>().unwrap());
    assert_eq!(days, (1..=8).map(|d| d.to_string()).collect::<Vec<_>>());
}
