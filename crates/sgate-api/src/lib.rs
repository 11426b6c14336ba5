//! # sgate-api — Gateway Diagnostics Surface
//!
//! Axum application exposing the operational view of a running
//! [`SchemaGateway`](sgate_gate::SchemaGateway).
//!
//! ## Routes
//!
//! - `/health/liveness`, `/health/readiness` — Kubernetes probes. Readiness
//!   fails (`503`) only when the schema source is unavailable; a degraded
//!   source still serves, with calls falling back to `Unvalidated`.
//! - `/v1/schemas`, `/v1/schemas/{name}`, `/v1/diagnostics` — introspection.
//! - `/v1/validate/{name}`, `/v1/reload` — gate dry-run and reload.
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers: they delegate to the gateway.
//! - All errors map to structured HTTP responses via [`ApiError`].

pub mod error;
pub mod routes;
pub mod state;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use sgate_core::SourceHealth;
use tower_http::trace::TraceLayer;

pub use error::ApiError;
pub use state::AppState;

/// Request bodies above this size are refused before validation.
pub const MAX_PAYLOAD_BYTES: usize = 2 * 1024 * 1024;

/// Assemble the application router.
pub fn app(state: AppState) -> Router {
    let api = Router::new()
        .merge(routes::schemas::router())
        .merge(routes::validate::router())
        .layer(DefaultBodyLimit::max(MAX_PAYLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone());

    let probes = Router::new()
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .with_state(state);

    Router::new().merge(probes).merge(api)
}

async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. `200 {"status":"ready"}` while the source is healthy or
/// degraded, `503` with the reason when it is unavailable.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.gateway.health() {
        SourceHealth::Unavailable { reason } => {
            tracing::warn!("Readiness check failed: {reason}");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({ "status": "unavailable", "reason": reason })),
            )
        }
        health => (
            StatusCode::OK,
            Json(serde_json::json!({ "status": "ready", "source": health })),
        ),
    }
}
