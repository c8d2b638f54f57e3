//! HTTP server module.
//!
//! Serves the exposition endpoint plus liveness and readiness probes. Every
//! request to the telemetry path triggers exactly one collection pass.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::get,
};
use serde::Serialize;
use tower_http::trace::{DefaultMakeSpan, TraceLayer};

use crate::exposition;
use crate::orchestrator::Orchestrator;

/// Header Prometheus uses to announce its scrape timeout.
pub const SCRAPE_TIMEOUT_HEADER: &str = "X-Prometheus-Scrape-Timeout-Seconds";

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Pass deadline when the request carries no timeout header.
    pub scrape_timeout: Duration,
    /// Subtracted from the header timeout to leave room for the response.
    pub timeout_offset: Duration,
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    server_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState, telemetry_path: &str) -> Router {
    let app_state = Arc::new(state);
    let index = index_page(telemetry_path);

    Router::new()
        .route("/", get(move || async move { Html(index) }))
        .route(telemetry_path, get(metrics_handler))
        .route("/healthz", get(healthz_handler))
        .route("/readyz", get(readyz_handler))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .with_state(app_state)
}

fn index_page(telemetry_path: &str) -> String {
    format!(
        "<html><head><title>dbscrape</title></head><body><h1>dbscrape</h1>\
         <p><a href=\"{telemetry_path}\">Metrics</a></p></body></html>"
    )
}

/// Pass deadline for a request.
///
/// Uses the scraper's timeout header minus `offset` when present and
/// positive. An offset at least as large as the header value is ignored.
pub fn scrape_timeout(headers: &HeaderMap, default: Duration, offset: Duration) -> Duration {
    let Some(raw) = headers.get(SCRAPE_TIMEOUT_HEADER) else {
        return default;
    };

    let seconds = raw
        .to_str()
        .ok()
        .and_then(|value| value.trim().parse::<f64>().ok())
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0);
    let Some(seconds) = seconds else {
        tracing::warn!(header = ?raw, "Invalid scrape timeout header, using default");
        return default;
    };

    let Ok(timeout) = Duration::try_from_secs_f64(seconds) else {
        tracing::warn!(seconds, "Scrape timeout header out of range, using default");
        return default;
    };
    match timeout.checked_sub(offset) {
        Some(adjusted) if !adjusted.is_zero() => adjusted,
        _ => {
            tracing::warn!(
                timeout_ms = timeout.as_millis() as u64,
                offset_ms = offset.as_millis() as u64,
                "Timeout offset exceeds scrape timeout, ignoring offset"
            );
            timeout
        }
    }
}

/// Run one pass and render it.
async fn metrics_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Response {
    let timeout = scrape_timeout(&headers, state.scrape_timeout, state.timeout_offset);
    let report = state.orchestrator.scrape(timeout).await;

    match exposition::render(&report) {
        Ok(rendered) => {
            if !rendered.duplicates.is_empty() {
                tracing::error!(
                    count = rendered.duplicates.len(),
                    series = ?rendered.duplicates,
                    "Pass emitted duplicate series"
                );
            }
            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, exposition::content_type())],
                rendered.body,
            )
                .into_response()
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (StatusCode::INTERNAL_SERVER_ERROR, "Failed to encode metrics").into_response()
        }
    }
}

/// Liveness probe.
async fn healthz_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        server_version: None,
        error: None,
    })
}

/// Readiness probe that checks the database answers a version read.
async fn readyz_handler(State(state): State<Arc<AppState>>) -> Response {
    match state.orchestrator.server_version(state.scrape_timeout).await {
        Ok(version) => Json(HealthResponse {
            status: "ok".to_string(),
            server_version: Some(version.to_string()),
            error: None,
        })
        .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(HealthResponse {
                    status: "not_ready".to_string(),
                    server_version: None,
                    error: Some(err.to_string()),
                }),
            )
                .into_response()
        }
    }
}
