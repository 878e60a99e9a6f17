//! Liveness endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::state::SharedState;

#[derive(Serialize)]
pub struct LivenessResponse {
    pub status: &'static str,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_seconds: u64,
    pub version: String,
    pub classes: usize,
}

/// GET /api/test - Fixed liveness payload
pub async fn api_test() -> Json<LivenessResponse> {
    Json(LivenessResponse {
        status: "Backend working!",
    })
}

/// GET /health - Health check with uptime
pub async fn health_check(State(state): State<SharedState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_seconds: state.uptime_seconds(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        classes: state.service.labels().len(),
    })
}
