//! # Schema Introspection Routes
//!
//! - `GET /v1/schemas` — registry diagnostics: loaded names, per-name load
//!   failures, population state.
//! - `GET /v1/schemas/{name}` — one loaded schema with its digest.
//! - `GET /v1/diagnostics` — the full gateway snapshot, including gate
//!   counters and connection status.

use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use sgate_gate::GatewayDiagnostics;
use sgate_schema::RegistryDiagnostics;

use crate::error::ApiError;
use crate::state::AppState;

/// One loaded schema.
#[derive(Debug, Serialize)]
pub struct SchemaView {
    pub name: String,
    pub digest: String,
    pub loaded_at: DateTime<Utc>,
    pub document: Value,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/schemas", get(list_schemas))
        .route("/v1/schemas/{name}", get(get_schema))
        .route("/v1/diagnostics", get(diagnostics))
}

async fn list_schemas(State(state): State<AppState>) -> Json<RegistryDiagnostics> {
    Json(state.gateway.registry().diagnostics())
}

async fn get_schema(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<SchemaView>, ApiError> {
    let schema = state
        .gateway
        .registry()
        .lookup(&name)
        .ok_or_else(|| ApiError::NotFound(format!("no schema loaded for '{name}'")))?;
    Ok(Json(SchemaView {
        name: schema.name().to_string(),
        digest: schema.digest().to_string(),
        loaded_at: schema.loaded_at(),
        document: schema.document().clone(),
    }))
}

async fn diagnostics(State(state): State<AppState>) -> Json<GatewayDiagnostics> {
    Json(state.gateway.diagnostics())
}
