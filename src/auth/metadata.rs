//! Compute Engine metadata server tokens.
//!
//! Workloads on GCE, GKE and Cloud Run get tokens for their attached service
//! account from the instance metadata server.

use futures_util::future::BoxFuture;

use crate::auth::credentials::exchange;
use crate::auth::token::{AccessToken, TokenSource};
use crate::auth::AuthError;

/// Overrides the metadata server host (used by emulators).
pub const METADATA_HOST_ENV: &str = "GCE_METADATA_HOST";
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

const TOKEN_PATH: &str = "/computeMetadata/v1/instance/service-accounts/default/token";

pub struct MetadataServerSource {
    http: reqwest::Client,
    url: String,
}

impl MetadataServerSource {
    pub fn new(http: reqwest::Client, host: &str, scopes: &[String]) -> Self {
        let url = format!("http://{}{}?scopes={}", host, TOKEN_PATH, scopes.join(","));
        Self { http, url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl TokenSource for MetadataServerSource {
    fn token(&self) -> BoxFuture<'_, Result<AccessToken, AuthError>> {
        Box::pin(async move {
            let request = self.http.get(&self.url).header("Metadata-Flavor", "Google");
            exchange(&self.url, request).await
        })
    }
}
