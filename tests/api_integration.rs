//! API Integration Tests for dbscrape
//!
//! Runs the full HTTP stack on an ephemeral port against a scripted data
//! source and scrapes it the way Prometheus would.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dbscrape::orchestrator::{GateFailurePolicy, Orchestrator, ScrapeOptions};
use dbscrape::probe::ProbeRegistry;
use dbscrape::server::{AppState, SCRAPE_TIMEOUT_HEADER, create_router};
use dbscrape::source::{MemorySource, Response, Row, Value};
use serde_json::Value as Json;
use tokio::net::TcpListener;

// =============================================================================
// Test Helpers
// =============================================================================

fn userstat(value: &str) -> Vec<Row> {
    vec![Row::from(vec![Value::from("userstat"), Value::from(value)])]
}

/// A MariaDB-like server with `userstat` enabled and a little data.
fn scripted_server() -> MemorySource {
    MemorySource::new("10.11.6-MariaDB")
        .with_rows("userstat", userstat("ON"))
        .with_rows("com_select", vec![Row::from(vec![Value::from(1500u64)])])
        .with_rows(
            "SUM(ROWS_READ)",
            vec![Row::from(vec![
                Value::from("app"),
                Value::from(100u64),
                Value::from(5u64),
                Value::from(10u64),
            ])],
        )
        .with_rows(
            "TABLE_NAME",
            vec![
                Row::from(vec![
                    Value::from("app"),
                    Value::from("users"),
                    Value::from(60u64),
                    Value::from(3u64),
                    Value::from(6u64),
                ]),
                Row::from(vec![
                    Value::from("app"),
                    Value::from("orders"),
                    Value::from(40u64),
                    Value::from(2u64),
                    Value::from(4u64),
                ]),
            ],
        )
}

/// Start test server and return base URL.
async fn start_test_server(
    source: MemorySource,
    registry: ProbeRegistry,
    options: ScrapeOptions,
) -> String {
    let orchestrator = Orchestrator::new(Arc::new(registry), Arc::new(source), options)
        .expect("Failed to build orchestrator");
    let state = AppState {
        orchestrator: Arc::new(orchestrator),
        scrape_timeout: Duration::from_secs(5),
        timeout_offset: Duration::from_millis(250),
    };
    let router = create_router(state, "/metrics");

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr = listener.local_addr().expect("Failed to get local addr");

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    // Give server time to start
    tokio::time::sleep(Duration::from_millis(50)).await;

    format!("http://{}", addr)
}

fn default_registry() -> ProbeRegistry {
    ProbeRegistry::with_defaults("mysql").expect("Failed to build registry")
}

async fn scrape(client: &reqwest::Client, base_url: &str) -> String {
    let resp = client
        .get(format!("{}/metrics", base_url))
        .send()
        .await
        .expect("Failed to scrape metrics");
    assert_eq!(resp.status(), 200);
    assert!(
        resp.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/plain")
    );
    resp.text().await.expect("Failed to read metrics body")
}

// =============================================================================
// Health Probe Tests
// =============================================================================

#[tokio::test]
async fn test_health_probes() {
    let base_url = start_test_server(
        scripted_server(),
        default_registry(),
        ScrapeOptions::default(),
    )
    .await;
    let client = reqwest::Client::new();

    // Test /healthz (liveness)
    let resp = client
        .get(format!("{}/healthz", base_url))
        .send()
        .await
        .expect("Failed to send healthz request");
    assert_eq!(resp.status(), 200);
    let body: Json = resp.json().await.expect("Failed to parse healthz response");
    assert_eq!(body["status"], "ok");

    // Test /readyz (readiness)
    let resp = client
        .get(format!("{}/readyz", base_url))
        .send()
        .await
        .expect("Failed to send readyz request");
    assert_eq!(resp.status(), 200);
    let body: Json = resp.json().await.expect("Failed to parse readyz response");
    assert_eq!(body["status"], "ok");
    assert_eq!(body["server_version"], "10.11");
}

#[tokio::test]
async fn test_readyz_when_server_down() {
    let source = MemorySource::new("8.0.35").with_version_error("connection refused");
    let base_url = start_test_server(source, default_registry(), ScrapeOptions::default()).await;

    let resp = reqwest::get(format!("{}/readyz", base_url))
        .await
        .expect("Failed to send readyz request");
    assert_eq!(resp.status(), 503);
    let body: Json = resp.json().await.expect("Failed to parse readyz response");
    assert_eq!(body["status"], "not_ready");
    assert!(body["error"].as_str().unwrap().contains("connection refused"));
}

// =============================================================================
// Exposition Tests
// =============================================================================

#[tokio::test]
async fn test_full_scrape() {
    let base_url = start_test_server(
        scripted_server(),
        default_registry(),
        ScrapeOptions::default(),
    )
    .await;
    let client = reqwest::Client::new();

    let body = scrape(&client, &base_url).await;

    assert!(body.contains("mysql_info_schema_global_status_request_rate 1500"));
    assert!(body.contains("mysql_info_schema_schema_statistics_rows_read_total{schema=\"app\"} 100"));
    assert!(body.contains(
        "mysql_info_schema_table_statistics_rows_read_total{schema=\"app\",table=\"users\"} 60"
    ));
    assert!(body.contains(
        "mysql_info_schema_table_statistics_rows_read_total{schema=\"app\",table=\"orders\"} 40"
    ));
    assert!(body.contains("# TYPE mysql_info_schema_table_statistics_rows_read_total counter"));

    // Disabled by default
    assert!(!body.contains("schema_data_length_bytes"));

    assert!(body.contains("mysql_up 1"));
    assert!(body.contains("mysql_exporter_scrape_ok 1"));
    for probe in [
        "globalStatusRequestRatesSum",
        "info_schema.schemastats",
        "info_schema.tablestats",
    ] {
        assert!(body.contains(&format!(
            "mysql_exporter_collector_success{{collector=\"{probe}\"}} 1"
        )));
        assert!(body.contains(&format!(
            "mysql_exporter_collector_duration_seconds{{collector=\"{probe}\"}}"
        )));
    }
}

#[tokio::test]
async fn test_scrapes_counted_across_requests() {
    let base_url = start_test_server(
        scripted_server(),
        default_registry(),
        ScrapeOptions::default(),
    )
    .await;
    let client = reqwest::Client::new();

    scrape(&client, &base_url).await;
    scrape(&client, &base_url).await;
    let body = scrape(&client, &base_url).await;

    assert!(body.contains("mysql_exporter_scrapes_total 3"));
}

#[tokio::test]
async fn test_failed_probe_does_not_hide_others() {
    let source = MemorySource::new("8.0.35")
        .with_rows("userstat", userstat("ON"))
        .with_error("com_select", "Table 'performance_schema.global_status' doesn't exist")
        .with_rows(
            "SUM(ROWS_READ)",
            vec![Row::from(vec![
                Value::from("app"),
                Value::from(1u64),
                Value::from(2u64),
                Value::from(3u64),
            ])],
        )
        .with_rows("TABLE_NAME", vec![]);
    let base_url = start_test_server(source, default_registry(), ScrapeOptions::default()).await;

    let body = scrape(&reqwest::Client::new(), &base_url).await;

    assert!(body.contains(
        "mysql_exporter_collector_success{collector=\"globalStatusRequestRatesSum\"} 0"
    ));
    assert!(body.contains(
        "mysql_exporter_collector_success{collector=\"info_schema.schemastats\"} 1"
    ));
    assert!(body.contains("mysql_info_schema_schema_statistics_rows_read_total{schema=\"app\"} 1"));
    assert!(body.contains("mysql_exporter_scrape_ok 0"));
    assert!(body.contains("mysql_up 1"));
}

#[tokio::test]
async fn test_userstat_off_skips_gated_probes() {
    let source = MemorySource::new("8.0.35")
        .with_rows("userstat", userstat("OFF"))
        .with_rows("com_select", vec![Row::from(vec![Value::from(7u64)])]);
    let base_url = start_test_server(
        source,
        default_registry(),
        ScrapeOptions::default().with_gate_failure(GateFailurePolicy::Fail),
    )
    .await;

    let body = scrape(&reqwest::Client::new(), &base_url).await;

    assert!(!body.contains("info_schema.schemastats"));
    assert!(!body.contains("info_schema.tablestats"));
    assert!(body.contains("mysql_exporter_scrape_ok 1"));
}

#[tokio::test]
async fn test_old_server_skips_request_rate() {
    let source = MemorySource::new("5.6.51").with_rows("userstat", vec![]);
    let base_url = start_test_server(source, default_registry(), ScrapeOptions::default()).await;

    let body = scrape(&reqwest::Client::new(), &base_url).await;

    assert!(!body.contains("globalStatusRequestRatesSum"));
    assert!(body.contains("mysql_up 1"));
}

#[tokio::test]
async fn test_server_down_reports_up_zero() {
    let source = MemorySource::new("8.0.35").with_version_error("connection refused");
    let base_url = start_test_server(source, default_registry(), ScrapeOptions::default()).await;

    let body = scrape(&reqwest::Client::new(), &base_url).await;

    assert!(body.contains("mysql_up 0"));
    assert!(body.contains("mysql_exporter_scrape_ok 0"));
    assert!(!body.contains("collector_success"));
}

#[tokio::test]
async fn test_scrape_timeout_header_bounds_pass() {
    let source = MemorySource::new("8.0.35")
        .with_rows("userstat", vec![])
        .with_response("com_select", Response::Hang);
    let base_url = start_test_server(
        source,
        default_registry(),
        ScrapeOptions::default().with_cancel_grace(Duration::from_millis(200)),
    )
    .await;
    let client = reqwest::Client::new();

    let started = Instant::now();
    let resp = client
        .get(format!("{}/metrics", base_url))
        .header(SCRAPE_TIMEOUT_HEADER, "0.5")
        .send()
        .await
        .expect("Failed to scrape metrics");
    let body = resp.text().await.expect("Failed to read metrics body");

    // 500ms header minus the 250ms offset, well below the 5s default.
    assert!(started.elapsed() < Duration::from_secs(2));
    assert!(body.contains(
        "mysql_exporter_collector_success{collector=\"globalStatusRequestRatesSum\"} 0"
    ));
    assert!(body.contains("mysql_exporter_scrape_ok 0"));
}

#[tokio::test]
async fn test_probe_toggles() {
    let mut registry = default_registry();
    registry
        .set_enabled("info_schema.schemasize", true)
        .expect("schemasize is registered");
    registry
        .set_enabled("globalStatusRequestRatesSum", false)
        .expect("request rate is registered");

    let source = MemorySource::new("8.0.35")
        .with_rows("userstat", vec![])
        .with_rows(
            "DATA_LENGTH",
            vec![Row::from(vec![
                Value::from("app"),
                Value::from(16384u64),
                Value::from(4096u64),
                Value::from(2i64),
            ])],
        );
    let base_url = start_test_server(source, registry, ScrapeOptions::default()).await;

    let body = scrape(&reqwest::Client::new(), &base_url).await;

    assert!(body.contains("mysql_info_schema_schema_data_length_bytes{schema=\"app\"} 16384"));
    assert!(body.contains("# TYPE mysql_info_schema_schema_tables gauge"));
    assert!(!body.contains("global_status_request_rate"));
}
