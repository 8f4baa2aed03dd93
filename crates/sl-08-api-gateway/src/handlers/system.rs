//! Liveness and Prometheus scrape endpoints.

use crate::domain::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: &'static str,
}

/// `GET /health`
pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// `GET /metrics`
pub async fn metrics(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let delivered = i64::try_from(state.notifications.delivered()).unwrap_or(i64::MAX);
    portal_telemetry::NOTIFICATIONS_DELIVERED.set(delivered);

    let body = portal_telemetry::encode_metrics().map_err(|e| ApiError::internal(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        body,
    ))
}
