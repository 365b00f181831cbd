//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Upstream monitoring API.
pub const DEFAULT_ENDPOINT: &str = "https://monitoring.googleapis.com";

/// OAuth scope granting cloud-platform access.
pub const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";

/// Prometheus-compatible APIs are only served from the `global` location.
pub const DEFAULT_LOCATION: &str = "global";

/// Variable holding the Google Cloud project identifier.
pub const DEFAULT_PROJECT_ENV: &str = "GOOGLE_PROJECT_ID";

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Upstream endpoint and credential scopes.
    pub upstream: UpstreamConfig,

    /// Graceful shutdown settings.
    pub shutdown: ShutdownConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Upstream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Scheme and authority every forwarded request is sent to.
    pub endpoint: String,

    /// OAuth scopes requested for the access token.
    pub scopes: Vec<String>,

    /// Location segment of the base path.
    pub location: String,

    /// Environment variable read for the project identifier.
    pub project_env: String,

    /// Total deadline for one upstream call. Unbounded when unset.
    pub timeout_secs: Option<u64>,

    /// TCP connect timeout for upstream and credential endpoints.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            scopes: vec![CLOUD_PLATFORM_SCOPE.to_string()],
            location: DEFAULT_LOCATION.to_string(),
            project_env: DEFAULT_PROJECT_ENV.to_string(),
            timeout_secs: None,
            connect_timeout_secs: 10,
        }
    }
}

/// Graceful shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// How long in-flight requests may run after shutdown begins.
    pub drain_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_timeout_secs: 30,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default `EnvFilter` directive; `RUST_LOG` takes precedence.
    pub log_filter: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Log upstream response bodies at debug level.
    pub log_bodies: bool,

    /// Prometheus exporter address. Disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "gcproxy=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            log_bodies: true,
            metrics_address: None,
        }
    }
}
