//! Configuration validation.
//!
//! Serde handles syntax; this module checks values that parse but cannot
//! work (unparseable addresses, a relative endpoint, empty scopes). All
//! problems are reported together, not just the first.

use std::net::SocketAddr;

use crate::config::schema::ProxyConfig;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if let Err(e) = config.listener.bind_address.parse::<SocketAddr>() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("invalid socket address {:?}: {}", config.listener.bind_address, e),
        ));
    }

    match url::Url::parse(&config.upstream.endpoint) {
        Ok(url) if matches!(url.scheme(), "http" | "https") && url.has_host() => {
            if url.query().is_some() || url.path() != "/" {
                errors.push(ValidationError::new(
                    "upstream.endpoint",
                    "must not carry a path or query",
                ));
            }
        }
        Ok(_) => errors.push(ValidationError::new(
            "upstream.endpoint",
            "must be an absolute http(s) URL",
        )),
        Err(e) => errors.push(ValidationError::new("upstream.endpoint", e.to_string())),
    }

    if config.upstream.scopes.iter().all(|s| s.trim().is_empty()) {
        errors.push(ValidationError::new("upstream.scopes", "at least one scope is required"));
    }

    if config.upstream.location.trim().is_empty() {
        errors.push(ValidationError::new("upstream.location", "must not be empty"));
    }

    if config.upstream.project_env.trim().is_empty() {
        errors.push(ValidationError::new("upstream.project_env", "must not be empty"));
    }

    if config.upstream.timeout_secs == Some(0) {
        errors.push(ValidationError::new("upstream.timeout_secs", "must be greater than 0"));
    }

    if config.shutdown.drain_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "shutdown.drain_timeout_secs",
            "must be greater than 0",
        ));
    }

    if let Some(addr) = &config.observability.metrics_address {
        if addr.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "observability.metrics_address",
                format!("invalid socket address {:?}", addr),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
