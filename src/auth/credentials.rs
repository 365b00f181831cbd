//! Credential files and the OAuth grants they drive.
//!
//! Two file types are understood, as written by `gcloud` and the IAM console:
//! - `service_account`: a signed JWT is exchanged for an access token
//! - `authorized_user`: a refresh token is exchanged for an access token

use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

use futures_util::future::BoxFuture;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};

use crate::auth::token::{AccessToken, TokenSource};
use crate::auth::AuthError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: u64 = 3600;

/// Contents of an application credentials JSON file.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialsFile {
    ServiceAccount(ServiceAccountKey),
    AuthorizedUser(AuthorizedUserKey),
}

#[derive(Clone, Deserialize)]
pub struct ServiceAccountKey {
    pub client_email: String,
    pub private_key: String,
    #[serde(default)]
    pub private_key_id: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for ServiceAccountKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceAccountKey")
            .field("client_email", &self.client_email)
            .field("private_key_id", &self.private_key_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Deserialize)]
pub struct AuthorizedUserKey {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_uri: Option<String>,
}

impl std::fmt::Debug for AuthorizedUserKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedUserKey")
            .field("client_id", &self.client_id)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

impl CredentialsFile {
    pub fn parse(bytes: &[u8]) -> Result<Self, AuthError> {
        serde_json::from_slice(bytes).map_err(AuthError::InvalidCredentials)
    }

    pub fn from_file(path: &Path) -> Result<Self, AuthError> {
        let bytes = std::fs::read(path).map_err(|source| AuthError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&bytes)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            CredentialsFile::ServiceAccount(_) => "service_account",
            CredentialsFile::AuthorizedUser(_) => "authorized_user",
        }
    }

    /// Build the token source for this credential.
    ///
    /// Fails here, not on first use, when the private key does not parse.
    pub fn into_source(
        self,
        http: reqwest::Client,
        scopes: &[String],
    ) -> Result<Box<dyn TokenSource>, AuthError> {
        match self {
            CredentialsFile::ServiceAccount(key) => {
                Ok(Box::new(ServiceAccountSource::new(key, http, scopes)?))
            }
            CredentialsFile::AuthorizedUser(key) => Ok(Box::new(AuthorizedUserSource { key, http })),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct AssertionClaims {
    iss: String,
    scope: String,
    aud: String,
    iat: u64,
    exp: u64,
}

/// JWT-bearer grant signed with a service account key.
pub struct ServiceAccountSource {
    http: reqwest::Client,
    client_email: String,
    key_id: Option<String>,
    signing_key: EncodingKey,
    token_uri: String,
    scope: String,
}

impl ServiceAccountSource {
    pub fn new(
        key: ServiceAccountKey,
        http: reqwest::Client,
        scopes: &[String],
    ) -> Result<Self, AuthError> {
        let signing_key =
            EncodingKey::from_rsa_pem(key.private_key.as_bytes()).map_err(AuthError::Signing)?;
        Ok(Self {
            http,
            client_email: key.client_email,
            key_id: key.private_key_id,
            signing_key,
            token_uri: key.token_uri.unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            scope: scopes.join(" "),
        })
    }

    fn assertion(&self, now: u64) -> Result<String, AuthError> {
        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        let claims = AssertionClaims {
            iss: self.client_email.clone(),
            scope: self.scope.clone(),
            aud: self.token_uri.clone(),
            iat: now,
            exp: now + ASSERTION_LIFETIME_SECS,
        };
        jsonwebtoken::encode(&header, &claims, &self.signing_key).map_err(AuthError::Signing)
    }
}

impl TokenSource for ServiceAccountSource {
    fn token(&self) -> BoxFuture<'_, Result<AccessToken, AuthError>> {
        Box::pin(async move {
            let now = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_secs();
            let assertion = self.assertion(now)?;
            let request = self.http.post(&self.token_uri).form(&[
                ("grant_type", JWT_BEARER_GRANT),
                ("assertion", assertion.as_str()),
            ]);
            exchange(&self.token_uri, request).await
        })
    }
}

/// Refresh-token grant for end-user credentials.
pub struct AuthorizedUserSource {
    key: AuthorizedUserKey,
    http: reqwest::Client,
}

impl TokenSource for AuthorizedUserSource {
    fn token(&self) -> BoxFuture<'_, Result<AccessToken, AuthError>> {
        Box::pin(async move {
            let token_uri = self.key.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI);
            let request = self.http.post(token_uri).form(&[
                ("grant_type", "refresh_token"),
                ("client_id", self.key.client_id.as_str()),
                ("client_secret", self.key.client_secret.as_str()),
                ("refresh_token", self.key.refresh_token.as_str()),
            ]);
            exchange(token_uri, request).await
        })
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

/// Send a token request and decode the standard OAuth token response.
pub(crate) async fn exchange(
    url: &str,
    request: reqwest::RequestBuilder,
) -> Result<AccessToken, AuthError> {
    let response = request.send().await.map_err(|source| AuthError::Request {
        url: url.to_string(),
        source,
    })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AuthError::TokenEndpoint {
            url: url.to_string(),
            status: status.as_u16(),
            body,
        });
    }

    let parsed: TokenResponse = response.json().await.map_err(|source| AuthError::Request {
        url: url.to_string(),
        source,
    })?;
    Ok(AccessToken::expiring_in(
        parsed.access_token,
        parsed.expires_in.unwrap_or(ASSERTION_LIFETIME_SECS),
    ))
}
