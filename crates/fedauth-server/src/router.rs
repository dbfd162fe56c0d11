//! Router configuration.
//!
//! Combines the sign-in endpoints with health checks.

use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;
use tower_http::trace::TraceLayer;

use fedauth_protocol::endpoints::{federation_router, FederationState};

/// Creates the application router.
pub fn create_router(state: FederationState) -> Router {
    let federation = federation_router(state.orchestrator.app_root()).with_state(state);

    let health = Router::new()
        .route("/health", get(health_check))
        .route("/health/live", get(liveness_check));

    Router::new()
        .merge(federation)
        .merge(health)
        .layer(TraceLayer::new_for_http())
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn liveness_check() -> StatusCode {
    StatusCode::OK
}
