//! Health check endpoint
//!
//! Provides a simple health check for monitoring and load balancers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;

use crate::handlers::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// Service status
    pub status: &'static str,
    /// Upstream credential status: "configured" or "missing"
    pub credential: &'static str,
}

/// Health check handler
///
/// Always returns 200 OK. A missing credential is reported rather than
/// failing the probe, since the process itself is serving.
pub async fn handler(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let credential = if state.api_key().is_some() {
        "configured"
    } else {
        "missing"
    };

    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "OK",
            credential,
        }),
    )
}
