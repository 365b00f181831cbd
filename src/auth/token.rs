//! Access tokens and the sources that produce them.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::future::BoxFuture;
use tokio::sync::Mutex;

use crate::auth::AuthError;

/// Tokens this close to expiry are refreshed before use.
const REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Upper bound on a reported token lifetime.
const MAX_LIFETIME: Duration = Duration::from_secs(24 * 60 * 60);

/// A bearer token and the instant it stops being valid.
#[derive(Clone)]
pub struct AccessToken {
    value: String,
    expires_at: Option<Instant>,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_at: Option<Instant>) -> Self {
        Self {
            value: value.into(),
            expires_at,
        }
    }

    /// Token valid for `expires_in` seconds from now, capped at one day.
    ///
    /// A lifetime the clock cannot represent counts as already expired.
    pub fn expiring_in(value: impl Into<String>, expires_in: u64) -> Self {
        let now = Instant::now();
        let lifetime = Duration::from_secs(expires_in).min(MAX_LIFETIME);
        Self::new(value, Some(now.checked_add(lifetime).unwrap_or(now)))
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Whether the token is still usable `margin` from now.
    fn is_fresh(&self, margin: Duration) -> bool {
        match self.expires_at {
            Some(at) => Instant::now() + margin < at,
            None => true,
        }
    }
}

// Never print the secret.
impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Anything that can hand out a bearer token for upstream calls.
///
/// Implementations must be safe to call from many request tasks at once.
pub trait TokenSource: Send + Sync {
    fn token(&self) -> BoxFuture<'_, Result<AccessToken, AuthError>>;
}

impl<T: TokenSource + ?Sized> TokenSource for Arc<T> {
    fn token(&self) -> BoxFuture<'_, Result<AccessToken, AuthError>> {
        (**self).token()
    }
}

impl<T: TokenSource + ?Sized> TokenSource for Box<T> {
    fn token(&self) -> BoxFuture<'_, Result<AccessToken, AuthError>> {
        (**self).token()
    }
}

/// A fixed token that never expires.
#[derive(Debug, Clone)]
pub struct StaticToken(AccessToken);

impl StaticToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(AccessToken::new(value, None))
    }
}

impl TokenSource for StaticToken {
    fn token(&self) -> BoxFuture<'_, Result<AccessToken, AuthError>> {
        let token = self.0.clone();
        Box::pin(async move { Ok(token) })
    }
}

/// Caches the token of an inner source until it nears expiry.
///
/// The lock is held across the refresh so concurrent callers wait for a
/// single fetch instead of each hitting the token endpoint.
pub struct CachedTokenSource<S> {
    inner: S,
    current: Mutex<Option<AccessToken>>,
}

impl<S: TokenSource> CachedTokenSource<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            current: Mutex::new(None),
        }
    }
}

impl<S: TokenSource> TokenSource for CachedTokenSource<S> {
    fn token(&self) -> BoxFuture<'_, Result<AccessToken, AuthError>> {
        Box::pin(async move {
            let mut current = self.current.lock().await;
            if let Some(token) = current.as_ref().filter(|t| t.is_fresh(REFRESH_MARGIN)) {
                return Ok(token.clone());
            }

            let token = self.inner.token().await?;
            tracing::debug!(expires_at = ?token.expires_at(), "Access token refreshed");
            *current = Some(token.clone());
            Ok(token)
        })
    }
}
