//! # Gateway Configuration
//!
//! The configuration surface consumed by the gateway: which schema source to
//! use, where it lives, the retry budget for remote sources, and the gate
//! policies. Loadable from a serde document (YAML in the CLI) or from
//! environment variables.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

/// Default number of failed connectivity attempts before giving up.
pub const DEFAULT_RETRY_THRESHOLD: u32 = 5;

/// Default delay between connectivity attempts, in milliseconds.
pub const DEFAULT_RETRY_TIMEOUT_MS: u64 = 1_000;

/// Default per-request timeout against the remote authority, in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

/// Default schema directory for the filesystem source.
pub const DEFAULT_SCHEMA_DIR: &str = "schemas";

/// Where schemas come from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SourceConfig {
    /// A local directory of schema files, one logical name per file.
    Filesystem {
        /// Directory holding the schema files.
        directory: PathBuf,
    },
    /// A remote schema authority.
    Remote {
        /// Base URL of the authority.
        endpoint: Url,
        /// Failed attempts before the supervisor gives up.
        #[serde(default = "default_retry_threshold")]
        retry_threshold: u32,
        /// Delay between attempts, in milliseconds.
        #[serde(default = "default_retry_timeout_ms")]
        retry_timeout_ms: u64,
        /// Per-request timeout, in seconds.
        #[serde(default = "default_request_timeout_secs")]
        request_timeout_secs: u64,
    },
}

impl SourceConfig {
    /// Short name of the source kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Filesystem { .. } => "filesystem",
            Self::Remote { .. } => "remote",
        }
    }
}

fn default_retry_threshold() -> u32 {
    DEFAULT_RETRY_THRESHOLD
}

fn default_retry_timeout_ms() -> u64 {
    DEFAULT_RETRY_TIMEOUT_MS
}

fn default_request_timeout_secs() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

/// What to do with a call whose name has no registered schema.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingSchemaPolicy {
    /// Let the call through and record a warning.
    #[default]
    Warn,
    /// Refuse the call with `MissingSchema`.
    Reject,
}

/// Decision policies for the interception gates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatePolicy {
    /// Handling of unvalidated calls and events.
    #[serde(default)]
    pub missing_schema: MissingSchemaPolicy,
    /// Drop events whose payload fails validation instead of delivering them.
    #[serde(default)]
    pub drop_invalid_events: bool,
}

/// Full gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Schema source.
    pub source: SourceConfig,
    /// Gate policies.
    #[serde(default)]
    pub policy: GatePolicy,
}

impl GatewayConfig {
    /// Filesystem configuration with default policies.
    pub fn filesystem(directory: impl Into<PathBuf>) -> Self {
        Self {
            source: SourceConfig::Filesystem {
                directory: directory.into(),
            },
            policy: GatePolicy::default(),
        }
    }

    /// Remote configuration with default policies.
    pub fn remote(endpoint: Url, retry_threshold: u32, retry_timeout: Duration) -> Self {
        Self {
            source: SourceConfig::Remote {
                endpoint,
                retry_threshold,
                retry_timeout_ms: u64::try_from(retry_timeout.as_millis()).unwrap_or(u64::MAX),
                request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            },
            policy: GatePolicy::default(),
        }
    }

    /// Replace the gate policy.
    pub fn with_policy(mut self, policy: GatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `SGATE_SOURCE` (`filesystem` | `remote`, default: `filesystem`)
    /// - `SGATE_SCHEMA_DIR` (default: `schemas`)
    /// - `SGATE_ENDPOINT` (required when `SGATE_SOURCE=remote`)
    /// - `SGATE_RETRY_THRESHOLD` (default: 5)
    /// - `SGATE_RETRY_TIMEOUT_MS` (default: 1000)
    /// - `SGATE_REQUEST_TIMEOUT_SECS` (default: 10)
    /// - `SGATE_MISSING_SCHEMA` (`warn` | `reject`, default: `warn`)
    /// - `SGATE_DROP_INVALID_EVENTS` (`true` | `false`, default: `false`)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let kind = lookup("SGATE_SOURCE").unwrap_or_else(|| "filesystem".to_string());
        let source = match kind.to_ascii_lowercase().as_str() {
            "filesystem" | "fs" => SourceConfig::Filesystem {
                directory: lookup("SGATE_SCHEMA_DIR")
                    .unwrap_or_else(|| DEFAULT_SCHEMA_DIR.to_string())
                    .into(),
            },
            "remote" => {
                let raw = lookup("SGATE_ENDPOINT").ok_or(ConfigError::MissingEndpoint)?;
                let endpoint = Url::parse(&raw)
                    .map_err(|e| ConfigError::InvalidUrl("SGATE_ENDPOINT".into(), e.to_string()))?;
                SourceConfig::Remote {
                    endpoint,
                    retry_threshold: parse_var(
                        &lookup,
                        "SGATE_RETRY_THRESHOLD",
                        DEFAULT_RETRY_THRESHOLD,
                    )?,
                    retry_timeout_ms: parse_var(
                        &lookup,
                        "SGATE_RETRY_TIMEOUT_MS",
                        DEFAULT_RETRY_TIMEOUT_MS,
                    )?,
                    request_timeout_secs: parse_var(
                        &lookup,
                        "SGATE_REQUEST_TIMEOUT_SECS",
                        DEFAULT_REQUEST_TIMEOUT_SECS,
                    )?,
                }
            }
            other => {
                return Err(ConfigError::InvalidValue(
                    "SGATE_SOURCE".into(),
                    format!("unknown source kind '{other}'"),
                ))
            }
        };

        let missing_schema = match lookup("SGATE_MISSING_SCHEMA").as_deref() {
            None | Some("warn") => MissingSchemaPolicy::Warn,
            Some("reject") => MissingSchemaPolicy::Reject,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    "SGATE_MISSING_SCHEMA".into(),
                    format!("expected 'warn' or 'reject', got '{other}'"),
                ))
            }
        };

        let config = Self {
            source,
            policy: GatePolicy {
                missing_schema,
                drop_invalid_events: parse_var(&lookup, "SGATE_DROP_INVALID_EVENTS", false)?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    /// Check invariants that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let SourceConfig::Remote {
            retry_threshold, ..
        } = &self.source
        {
            if *retry_threshold == 0 {
                return Err(ConfigError::InvalidValue(
                    "retry_threshold".into(),
                    "must be at least 1".into(),
                ));
            }
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &str,
    default: T,
) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match lookup(var) {
        None => Ok(default),
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue(var.to_string(), e.to_string())),
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("SGATE_ENDPOINT is required for the remote schema source")]
    MissingEndpoint,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_filesystem_and_warn() {
        let cfg = GatewayConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(
            cfg.source,
            SourceConfig::Filesystem {
                directory: PathBuf::from("schemas")
            }
        );
        assert_eq!(cfg.policy.missing_schema, MissingSchemaPolicy::Warn);
        assert!(!cfg.policy.drop_invalid_events);
    }

    #[test]
    fn remote_reads_retry_budget() {
        let cfg = GatewayConfig::from_lookup(lookup(&[
            ("SGATE_SOURCE", "remote"),
            ("SGATE_ENDPOINT", "http://127.0.0.1:9000"),
            ("SGATE_RETRY_THRESHOLD", "2"),
            ("SGATE_RETRY_TIMEOUT_MS", "50"),
            ("SGATE_MISSING_SCHEMA", "reject"),
            ("SGATE_DROP_INVALID_EVENTS", "true"),
        ]))
        .unwrap();
        match cfg.source {
            SourceConfig::Remote {
                endpoint,
                retry_threshold,
                retry_timeout_ms,
                request_timeout_secs,
            } => {
                assert_eq!(endpoint.as_str(), "http://127.0.0.1:9000/");
                assert_eq!(retry_threshold, 2);
                assert_eq!(retry_timeout_ms, 50);
                assert_eq!(request_timeout_secs, DEFAULT_REQUEST_TIMEOUT_SECS);
            }
            other => panic!("expected remote source, got {other:?}"),
        }
        assert_eq!(cfg.policy.missing_schema, MissingSchemaPolicy::Reject);
        assert!(cfg.policy.drop_invalid_events);
    }

    #[test]
    fn remote_without_endpoint_is_rejected() {
        let err = GatewayConfig::from_lookup(lookup(&[("SGATE_SOURCE", "remote")])).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEndpoint));
    }

    #[test]
    fn zero_retry_threshold_is_rejected() {
        let err = GatewayConfig::from_lookup(lookup(&[
            ("SGATE_SOURCE", "remote"),
            ("SGATE_ENDPOINT", "http://localhost"),
            ("SGATE_RETRY_THRESHOLD", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(..)));
    }

    #[test]
    fn unknown_policy_is_rejected() {
        let err =
            GatewayConfig::from_lookup(lookup(&[("SGATE_MISSING_SCHEMA", "ignore")])).unwrap_err();
        assert!(err.to_string().contains("SGATE_MISSING_SCHEMA"));
    }

    #[test]
    fn yaml_document_applies_defaults() {
        let yaml = r#"
source:
  kind: remote
  endpoint: "https://schemas.internal"
policy:
  missing_schema: reject
"#;
        let cfg: GatewayConfig = serde_yaml::from_str(yaml).unwrap();
        match &cfg.source {
            SourceConfig::Remote {
                retry_threshold,
                retry_timeout_ms,
                ..
            } => {
                assert_eq!(*retry_threshold, DEFAULT_RETRY_THRESHOLD);
                assert_eq!(*retry_timeout_ms, DEFAULT_RETRY_TIMEOUT_MS);
            }
            other => panic!("expected remote source, got {other:?}"),
        }
        assert_eq!(cfg.policy.missing_schema, MissingSchemaPolicy::Reject);
        assert!(!cfg.policy.drop_invalid_events);
    }
}
