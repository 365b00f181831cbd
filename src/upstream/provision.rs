//! Client provisioning.
//!
//! Runs once before the listener opens. Any error here is fatal: the proxy
//! must not accept traffic it cannot authenticate.

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::auth::{self, AuthError, TokenSource};
use crate::config::UpstreamConfig;
use crate::env::ReadEnv;
use crate::upstream::UpstreamClient;

/// Project- and location-scoped prefix of every upstream path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseReference(Arc<str>);

impl BaseReference {
    pub fn new(project: &str, location: &str) -> Self {
        Self(Arc::from(format!(
            "/v1/projects/{}/locations/{}/prometheus",
            project, location
        )))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BaseReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything the forwarding server needs from provisioning.
#[derive(Debug, Clone)]
pub struct Provisioned {
    pub client: UpstreamClient,
    pub base: BaseReference,
}

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("error building HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),

    #[error("error finding default credentials: {0}")]
    Credentials(#[source] AuthError),

    #[error("error obtaining access token from {origin}: {source}")]
    Token {
        origin: String,
        #[source]
        source: AuthError,
    },

    #[error("{0} must be set")]
    MissingProject(String),

    #[error("provisioning cancelled")]
    Cancelled,
}

/// Discover credentials, resolve the project, and verify a token can be
/// minted.
pub async fn provision<E: ReadEnv>(
    config: &UpstreamConfig,
    env: &E,
    cancel: &CancellationToken,
) -> Result<Provisioned, ProvisionError> {
    let http = UpstreamClient::http_client(config).map_err(ProvisionError::HttpClient)?;
    let credentials = auth::application_default(env, http.clone(), &config.scopes)
        .map_err(ProvisionError::Credentials)?;
    tracing::info!(origin = %credentials.origin, "Credentials found");

    let provisioned = provision_with(config, env, http, credentials.source.clone())?;

    tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ProvisionError::Cancelled),
        result = credentials.source.token() => {
            result.map_err(|source| ProvisionError::Token {
                origin: credentials.origin.to_string(),
                source,
            })?;
        }
    }

    tracing::info!(
        endpoint = %provisioned.client.endpoint(),
        base = %provisioned.base,
        "Upstream client provisioned"
    );
    Ok(provisioned)
}

/// Provision with an already-built credential source.
pub fn provision_with<E: ReadEnv>(
    config: &UpstreamConfig,
    env: &E,
    http: reqwest::Client,
    credentials: Arc<dyn TokenSource>,
) -> Result<Provisioned, ProvisionError> {
    let project = env
        .non_empty(&config.project_env)
        .ok_or_else(|| ProvisionError::MissingProject(config.project_env.clone()))?;

    Ok(Provisioned {
        client: UpstreamClient::new(http, &config.endpoint, credentials),
        base: BaseReference::new(&project, &config.location),
    })
}
