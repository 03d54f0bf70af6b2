use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    /// Seconds since the process started.
    pub uptime: u64,
    /// Current server time, epoch milliseconds.
    pub timestamp: i64,
    pub version: String,
}

/// Liveness check; also a convenient endpoint for verifying CORS wiring.
/// Route: GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime: state.started_at.elapsed().as_secs(),
        timestamp: chrono::Utc::now().timestamp_millis(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
