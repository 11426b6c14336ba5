//! # Validation Routes
//!
//! - `POST /v1/validate/{name}` — the action gate's verdict on the request
//!   body, as the before-call hook would give it, but not counted in the gate
//!   diagnostics. `200` with the outcome when the call would proceed, `422`
//!   with the error detail when refused.
//! - `POST /v1/reload` — unattended reload of the schema source.

use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Serialize;
use serde_json::Value;
use sgate_core::ValidationOutcome;

use crate::error::ApiError;
use crate::state::AppState;

/// Gate verdict for a payload that may proceed.
#[derive(Debug, Serialize)]
pub struct ValidateResponse {
    pub name: String,
    #[serde(flatten)]
    pub outcome: ValidationOutcome,
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/validate/{name}", post(validate))
        .route("/v1/reload", post(reload))
}

async fn validate(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<ValidateResponse>, ApiError> {
    let outcome = state.gateway.dry_run_call(&name, &payload)?;
    Ok(Json(ValidateResponse { name, outcome }))
}

async fn reload(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    state.gateway.reload().await?;
    Ok(Json(serde_json::json!({
        "status": "reloaded",
        "loaded": state.gateway.registry().len(),
    })))
}
