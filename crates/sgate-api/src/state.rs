//! # Application State
//!
//! Shared state for the Axum application: the running gateway.

use std::sync::Arc;

use sgate_gate::SchemaGateway;

/// Shared application state passed to all route handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    pub gateway: Arc<SchemaGateway>,
}

impl AppState {
    pub fn new(gateway: Arc<SchemaGateway>) -> Self {
        Self { gateway }
    }
}
