//! # HTTP Schema Authority Client
//!
//! Binds the authority protocol to HTTP:
//!
//! - Liveness: `GET {endpoint}/health`, any 2xx is alive.
//! - Lookup: `GET {endpoint}/schemas/{name}`, `200` with the JSON schema
//!   document or `404` when the authority has no schema for the name.
//!
//! One request per call. Retry policy belongs to the
//! [`ConnectionSupervisor`](crate::ConnectionSupervisor).

use std::time::Duration;

use serde_json::Value;
use url::Url;

use crate::authority::{AuthorityError, SchemaAuthority};

/// Configuration for the HTTP authority client.
#[derive(Debug, Clone)]
pub struct RemoteFetcherConfig {
    /// Base URL of the schema authority.
    pub base_url: Url,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl RemoteFetcherConfig {
    /// Create a configuration with the default 10s timeout.
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout_secs: 10,
        }
    }
}

/// HTTP client for a remote schema authority.
#[derive(Debug, Clone)]
pub struct RemoteFetcher {
    client: reqwest::Client,
    base_url: Url,
}

impl RemoteFetcher {
    /// Build a client from configuration.
    pub fn new(config: RemoteFetcherConfig) -> Result<Self, AuthorityError> {
        if config.base_url.cannot_be_a_base() {
            return Err(AuthorityError::InvalidEndpoint {
                endpoint: config.base_url.to_string(),
                reason: "URL cannot be a base".into(),
            });
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthorityError::InvalidEndpoint {
                endpoint: config.base_url.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            base_url: config.base_url,
        })
    }

    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get(&self, url: Url) -> Result<reqwest::Response, AuthorityError> {
        self.client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| AuthorityError::Unreachable {
                endpoint: url.to_string(),
                reason: e.to_string(),
            })
    }
}

impl SchemaAuthority for RemoteFetcher {
    fn endpoint(&self) -> String {
        self.base_url.to_string()
    }

    async fn ping(&self) -> Result<(), AuthorityError> {
        let url = self.url(&["health"]);
        let resp = self.get(url.clone()).await?;
        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        Err(AuthorityError::Status {
            endpoint: url.to_string(),
            status: status.as_u16(),
            body,
        })
    }

    async fn fetch(&self, name: &str) -> Result<Option<Value>, AuthorityError> {
        let url = self.url(&["schemas", name]);
        let resp = self.get(url.clone()).await?;
        let status = resp.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            tracing::debug!(schema_name = %name, "Schema authority has no schema for name");
            return Ok(None);
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthorityError::Status {
                endpoint: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        resp.json::<Value>()
            .await
            .map(Some)
            .map_err(|e| AuthorityError::Decode {
                endpoint: url.to_string(),
                reason: e.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fetcher(base: &str) -> RemoteFetcher {
        RemoteFetcher::new(RemoteFetcherConfig::new(Url::parse(base).unwrap())).unwrap()
    }

    #[test]
    fn builds_lookup_urls() {
        let f = fetcher("http://authority.local/api/");
        assert_eq!(
            f.url(&["schemas", "orderCreated"]).as_str(),
            "http://authority.local/api/schemas/orderCreated"
        );
        let f = fetcher("http://authority.local");
        assert_eq!(f.url(&["health"]).as_str(), "http://authority.local/health");
    }

    #[test]
    fn lookup_names_are_percent_encoded() {
        let f = fetcher("http://authority.local");
        assert_eq!(
            f.url(&["schemas", "orders/created"]).as_str(),
            "http://authority.local/schemas/orders%2Fcreated"
        );
    }

    #[test]
    fn rejects_non_base_urls() {
        let err = RemoteFetcher::new(RemoteFetcherConfig::new(
            Url::parse("mailto:schemas@example.com").unwrap(),
        ))
        .unwrap_err();
        assert!(matches!(err, AuthorityError::InvalidEndpoint { .. }));
    }

    #[tokio::test]
    async fn unreachable_authority_is_connectivity_failure() {
        let mut config = RemoteFetcherConfig::new(Url::parse("http://127.0.0.1:1/").unwrap());
        config.timeout_secs = 1;
        let f = RemoteFetcher::new(config).unwrap();
        let err = f.ping().await.unwrap_err();
        assert!(err.is_connectivity(), "got: {err}");
        let err = f.fetch("orderCreated").await.unwrap_err();
        assert!(err.is_connectivity());
    }
}
