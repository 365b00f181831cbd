//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! startup
//!     → provision.rs (credentials + project → UpstreamClient, BaseReference)
//!     → shared read-only with every request handler
//!
//! per request
//!     → client.rs (add bearer token, send)
//! ```

pub mod client;
pub mod provision;

pub use client::UpstreamClient;
pub use provision::{provision, provision_with, BaseReference, ProvisionError, Provisioned};

use crate::auth::AuthError;

/// Errors from a single upstream call.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("invalid upstream URL {url}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("error obtaining access token: {0}")]
    Auth(#[from] AuthError),

    #[error("access token is not a valid header value")]
    InvalidToken,

    #[error("error sending upstream request: {0}")]
    Send(#[source] reqwest::Error),
}
