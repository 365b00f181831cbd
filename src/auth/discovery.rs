//! Application default credential discovery.
//!
//! Lookup order:
//! 1. `GOOGLE_APPLICATION_CREDENTIALS` (must point at a readable file)
//! 2. the gcloud well-known file
//! 3. the metadata server

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::auth::credentials::CredentialsFile;
use crate::auth::metadata::{MetadataServerSource, DEFAULT_METADATA_HOST, METADATA_HOST_ENV};
use crate::auth::token::{CachedTokenSource, TokenSource};
use crate::auth::AuthError;
use crate::env::ReadEnv;

pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
const WELL_KNOWN_FILE: &str = "application_default_credentials.json";

/// Where the credentials came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOrigin {
    EnvFile { path: PathBuf, kind: &'static str },
    WellKnownFile { path: PathBuf, kind: &'static str },
    MetadataServer { host: String },
}

impl fmt::Display for CredentialOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialOrigin::EnvFile { path, kind } => {
                write!(f, "{} ({}) via {}", path.display(), kind, CREDENTIALS_ENV)
            }
            CredentialOrigin::WellKnownFile { path, kind } => {
                write!(f, "{} ({})", path.display(), kind)
            }
            CredentialOrigin::MetadataServer { host } => write!(f, "metadata server {}", host),
        }
    }
}

/// A discovered, caching token source.
#[derive(Clone)]
pub struct Credentials {
    pub origin: CredentialOrigin,
    pub source: Arc<dyn TokenSource>,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("origin", &self.origin)
            .finish_non_exhaustive()
    }
}

/// Path of the gcloud application-default file, if the environment names a
/// config directory.
fn well_known_file<E: ReadEnv>(env: &E) -> Option<PathBuf> {
    if let Some(dir) = env.non_empty("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(dir).join(WELL_KNOWN_FILE));
    }
    if let Some(appdata) = env.non_empty("APPDATA") {
        return Some(PathBuf::from(appdata).join("gcloud").join(WELL_KNOWN_FILE));
    }
    env.non_empty("HOME")
        .map(|home| PathBuf::from(home).join(".config").join("gcloud").join(WELL_KNOWN_FILE))
}

/// Find application default credentials.
///
/// Does no network I/O; a metadata-server source only fails on first use.
pub fn application_default<E: ReadEnv>(
    env: &E,
    http: reqwest::Client,
    scopes: &[String],
) -> Result<Credentials, AuthError> {
    if let Some(path) = env.non_empty(CREDENTIALS_ENV).map(PathBuf::from) {
        let file = CredentialsFile::from_file(&path)?;
        let origin = CredentialOrigin::EnvFile {
            path,
            kind: file.kind(),
        };
        return Ok(cached(origin, file.into_source(http, scopes)?));
    }

    if let Some(path) = well_known_file(env).filter(|p| p.is_file()) {
        let file = CredentialsFile::from_file(&path)?;
        let origin = CredentialOrigin::WellKnownFile {
            path,
            kind: file.kind(),
        };
        return Ok(cached(origin, file.into_source(http, scopes)?));
    }

    let host = env
        .non_empty(METADATA_HOST_ENV)
        .unwrap_or_else(|| DEFAULT_METADATA_HOST.to_string());
    let source = MetadataServerSource::new(http, &host, scopes);
    Ok(cached(
        CredentialOrigin::MetadataServer { host },
        Box::new(source),
    ))
}

fn cached(origin: CredentialOrigin, source: Box<dyn TokenSource>) -> Credentials {
    Credentials {
        origin,
        source: Arc::new(CachedTokenSource::new(source)),
    }
}
