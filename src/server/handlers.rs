//! HTTP request handlers
//!
//! Contains handlers for all HTTP endpoints.

use std::time::Instant;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, instrument, warn};

use super::{AppState, APP_VERSION_HEADER};
use crate::error::AppResult;
use crate::transformer::{render_body, CONTENT_TYPE};

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health status
    status: String,
    /// Application version
    version: String,
}

fn version_header(state: &AppState) -> (HeaderName, HeaderValue) {
    let value = HeaderValue::from_str(&state.app_version)
        .unwrap_or_else(|_| HeaderValue::from_static("invalid"));
    (HeaderName::from_static(APP_VERSION_HEADER), value)
}

/// Root endpoint - liveness check
pub async fn root(State(state): State<AppState>) -> Response {
    (
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/plain")),
            version_header(&state),
        ],
        "OK",
    )
        .into_response()
}

/// Health check endpoint
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: state.app_version.to_string(),
    })
}

/// Metrics endpoint - one bulk Jolokia read, rendered in Prometheus format
///
/// A failed bulk call becomes `502 Bad Gateway` through [`crate::error::AppError`].
/// Both outcomes carry `X-App-Version`.
#[instrument(skip(state), name = "metrics_handler")]
pub async fn metrics(State(state): State<AppState>) -> Response {
    let mut response = match scrape(&state).await {
        Ok(body) => (
            [(header::CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE))],
            body,
        )
            .into_response(),
        Err(e) => e.into_response(),
    };

    let (name, value) = version_header(&state);
    response.headers_mut().insert(name, value);
    response
}

async fn scrape(state: &AppState) -> AppResult<String> {
    let start = Instant::now();

    let lines = state.collector.collect().await.map_err(|e| {
        warn!(error = %e, "Jolokia bulk read failed");
        e
    })?;

    debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        lines = lines.len(),
        "Metrics collection complete"
    );

    Ok(render_body(&lines))
}
