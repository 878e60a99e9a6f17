//! Crop Diagnosis Server
//!
//! HTTP API serving leaf-disease diagnoses and PDF reports from a model
//! loaded once at startup.

pub mod error;
pub mod routes;
pub mod state;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use crate::error::ApiError;
pub use crate::state::{AppState, ServerConfig, SharedState};

/// Build the application router
pub fn create_router(state: SharedState) -> Router {
    let body_limit = state.config.body_limit;

    Router::new()
        // Liveness
        .route("/api/test", get(routes::health::api_test))
        .route("/health", get(routes::health::health_check))

        // Diagnosis
        .route("/api/crop-diagnosis", post(routes::diagnosis::crop_diagnosis))

        // Reports
        .route("/api/generate-report", post(routes::report::generate_report))

        // Add state
        .with_state(state)

        // Add middleware
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
