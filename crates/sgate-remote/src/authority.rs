//! The remote schema authority seam.

use std::future::Future;

use serde_json::Value;

/// Errors from talking to a schema authority.
#[derive(Debug, thiserror::Error)]
pub enum AuthorityError {
    /// The authority could not be reached (connect failure, timeout).
    #[error("schema authority unreachable at {endpoint}: {reason}")]
    Unreachable { endpoint: String, reason: String },
    /// The authority answered with an unexpected status.
    #[error("schema authority {endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    /// The endpoint cannot be used as a base URL.
    #[error("invalid schema authority endpoint {endpoint}: {reason}")]
    InvalidEndpoint { endpoint: String, reason: String },
    /// The response body was not a JSON document.
    #[error("failed to decode response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

impl AuthorityError {
    /// Whether the failure is a connectivity problem rather than a protocol
    /// problem.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, Self::Unreachable { .. })
    }
}

/// A remote source of truth for schemas.
///
/// Implementations must be `Send + Sync` so they can be shared with the
/// supervisor task behind an `Arc`.
pub trait SchemaAuthority: Send + Sync + 'static {
    /// Human-readable endpoint, for logs and errors.
    fn endpoint(&self) -> String;

    /// Liveness probe.
    fn ping(&self) -> impl Future<Output = Result<(), AuthorityError>> + Send;

    /// Fetch the schema registered under `name`. `Ok(None)` means the
    /// authority has no schema for that name.
    fn fetch(&self, name: &str)
        -> impl Future<Output = Result<Option<Value>, AuthorityError>> + Send;
}
