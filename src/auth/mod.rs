//! Credential subsystem.
//!
//! # Data Flow
//! ```text
//! environment
//!     → discovery.rs (env file → gcloud file → metadata server)
//!     → credentials.rs / metadata.rs (token grants)
//!     → token.rs (CachedTokenSource, refresh near expiry)
//!     → upstream client adds `Authorization: Bearer …`
//! ```

pub mod credentials;
pub mod discovery;
pub mod metadata;
pub mod token;

use std::path::PathBuf;

pub use discovery::{application_default, CredentialOrigin, Credentials};
pub use token::{AccessToken, CachedTokenSource, StaticToken, TokenSource};

/// Errors raised while obtaining access tokens.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("failed to read credentials file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid credentials file: {0}")]
    InvalidCredentials(#[source] serde_json::Error),

    #[error("failed to sign token assertion: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("token request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("token endpoint {url} returned {status}: {body}")]
    TokenEndpoint { url: String, status: u16, body: String },
}
