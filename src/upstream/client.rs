//! Authenticated client for the upstream monitoring API.

use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderMap, HeaderValue, Method};

use crate::auth::TokenSource;
use crate::config::UpstreamConfig;
use crate::upstream::UpstreamError;

const USER_AGENT: &str = concat!("gcproxy/", env!("CARGO_PKG_VERSION"));

/// HTTP client bound to one upstream endpoint and one credential source.
///
/// Cheap to clone; clones share the connection pool and token cache.
#[derive(Clone)]
pub struct UpstreamClient {
    http: reqwest::Client,
    endpoint: Arc<str>,
    credentials: Arc<dyn TokenSource>,
}

impl std::fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl UpstreamClient {
    pub fn new(http: reqwest::Client, endpoint: &str, credentials: Arc<dyn TokenSource>) -> Self {
        Self {
            http,
            endpoint: Arc::from(endpoint.trim_end_matches('/')),
            credentials,
        }
    }

    /// Build the shared `reqwest` client from upstream settings.
    ///
    /// Response bodies are never decompressed so relayed bytes match what
    /// upstream sent, along with its `Content-Encoding`.
    pub fn http_client(config: &UpstreamConfig) -> Result<reqwest::Client, reqwest::Error> {
        let mut builder = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs));
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        builder.build()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Absolute URL for a path-and-query on the upstream endpoint.
    pub fn url_for(&self, path_and_query: &str) -> Result<reqwest::Url, UpstreamError> {
        let raw = format!("{}{}", self.endpoint, path_and_query);
        reqwest::Url::parse(&raw).map_err(|source| UpstreamError::InvalidUrl { url: raw, source })
    }

    /// Send one request with a fresh bearer token.
    ///
    /// Any caller-supplied `Authorization` header is replaced.
    pub async fn execute(
        &self,
        method: Method,
        url: reqwest::Url,
        mut headers: HeaderMap,
        body: Option<reqwest::Body>,
    ) -> Result<reqwest::Response, UpstreamError> {
        let token = self.credentials.token().await?;
        let mut authorization = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
            .map_err(|_| UpstreamError::InvalidToken)?;
        authorization.set_sensitive(true);
        headers.insert(header::AUTHORIZATION, authorization);

        let mut request = self.http.request(method, url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }
        request.send().await.map_err(UpstreamError::Send)
    }
}
