//! # Application Error
//!
//! Maps gateway errors to structured HTTP responses. Every error body has
//! the shape `{"error": {"code", "message", "name"?, "errors"?}}`, the same
//! detail the host framework receives from a refused call.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use sgate_core::{ErrorDetail, GatewayError};
use sgate_gate::BootstrapError;
use thiserror::Error;

/// Application-level error type that maps to HTTP responses.
#[derive(Error, Debug)]
pub enum ApiError {
    /// Resource not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The gate refused the payload (rejected, or no schema under the
    /// reject policy).
    #[error("{0}")]
    Refused(GatewayError),

    /// The schema source is unavailable.
    #[error("{0}")]
    Unavailable(GatewayError),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Refused(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn detail(&self) -> ErrorDetail {
        match self {
            Self::Refused(e) | Self::Unavailable(e) => e.detail(),
            Self::NotFound(_) => plain("NOT_FOUND", self.to_string()),
            Self::Internal(_) => plain("INTERNAL", self.to_string()),
        }
    }
}

fn plain(code: &str, message: String) -> ErrorDetail {
    ErrorDetail {
        code: code.to_string(),
        message,
        name: None,
        errors: Vec::new(),
    }
}

impl From<GatewayError> for ApiError {
    fn from(e: GatewayError) -> Self {
        if e.blocks_call() {
            return Self::Refused(e);
        }
        match e {
            GatewayError::DirectoryNotFound { .. } | GatewayError::ConnectivityExhausted { .. } => {
                Self::Unavailable(e)
            }
            other => Self::Internal(other.to_string()),
        }
    }
}

impl From<BootstrapError> for ApiError {
    fn from(e: BootstrapError) -> Self {
        match e {
            BootstrapError::Source(inner) => inner.into(),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), "{self}");
        }
        let body = serde_json::json!({ "error": self.detail() });
        (status, axum::Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sgate_core::{Violation, Violations};

    #[test]
    fn rejection_maps_to_422_with_engine_errors() {
        let err = ApiError::from(GatewayError::PayloadRejected {
            name: "orderCreated".into(),
            violations: Violations::new(vec![Violation::root("\"total\" is a required property")]),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let detail = err.detail();
        assert_eq!(detail.code, "PAYLOAD_REJECTED");
        assert_eq!(detail.name.as_deref(), Some("orderCreated"));
        assert_eq!(detail.errors.len(), 1);
    }

    #[test]
    fn missing_schema_maps_to_422() {
        let err = ApiError::from(GatewayError::MissingSchema {
            name: "pingHealth".into(),
        });
        assert_eq!(err.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn source_failures_map_to_503() {
        let err = ApiError::from(GatewayError::ConnectivityExhausted {
            endpoint: "http://authority".into(),
            attempts: 3,
        });
        assert_eq!(err.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(err.detail().code, "CONNECTIVITY_EXHAUSTED");
    }

    #[test]
    fn not_found_has_plain_detail() {
        let detail = ApiError::NotFound("schema 'x'".into()).detail();
        assert_eq!(detail.code, "NOT_FOUND");
        assert!(detail.errors.is_empty());
    }
}
