//! HTTP server setup and lifecycle.
//!
//! # Responsibilities
//! - Create the Axum router with the single forwarding handler
//! - Wire up middleware (request span)
//! - Bind the listener and serve until shutdown
//! - Drain in-flight requests within a deadline
//!
//! # States
//! ```text
//! Stopped → Starting → Serving → Draining → Stopped
//! ```

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{routing::any, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::config::ProxyConfig;
use crate::http::forward::forward;
use crate::http::request::RequestSpan;
use crate::lifecycle::Shutdown;
use crate::upstream::{BaseReference, Provisioned, UpstreamClient};

/// Application state injected into the handler. Read-only after startup.
#[derive(Clone)]
pub struct AppState {
    pub client: UpstreamClient,
    pub base: BaseReference,
    pub log_bodies: bool,
}

/// Observable server lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Stopped,
    Starting,
    Serving,
    Draining,
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("error binding {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("error serving: {0}")]
    Serve(#[source] std::io::Error),
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    drain_timeout: Duration,
    state: watch::Sender<ServerState>,
}

impl HttpServer {
    /// Create a new HTTP server around a provisioned upstream.
    pub fn new(provisioned: Provisioned, config: &ProxyConfig) -> Self {
        let state = AppState {
            client: provisioned.client,
            base: provisioned.base,
            log_bodies: config.observability.log_bodies,
        };

        let (tx, _) = watch::channel(ServerState::Stopped);
        Self {
            router: Self::build_router(state),
            drain_timeout: Duration::from_secs(config.shutdown.drain_timeout_secs),
            state: tx,
        }
    }

    /// Every method and path goes to the same handler.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/", any(forward))
            .route("/{*path}", any(forward))
            .with_state(state)
            .layer(TraceLayer::new_for_http().make_span_with(RequestSpan))
    }

    /// The router, for driving requests without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Subscribe to lifecycle transitions.
    pub fn state(&self) -> watch::Receiver<ServerState> {
        self.state.subscribe()
    }

    /// Bind `address` and serve until `shutdown` fires.
    ///
    /// A bind failure triggers `shutdown` so the rest of the process winds
    /// down too.
    pub async fn serve(self, address: &str, shutdown: Shutdown) -> Result<(), ServerError> {
        self.state.send_replace(ServerState::Starting);

        let listener = match TcpListener::bind(address).await {
            Ok(listener) => listener,
            Err(source) => {
                self.state.send_replace(ServerState::Stopped);
                shutdown.trigger();
                return Err(ServerError::Bind {
                    address: address.to_string(),
                    source,
                });
            }
        };

        self.run(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` fires.
    pub async fn run(self, listener: TcpListener, shutdown: Shutdown) -> Result<(), ServerError> {
        let addr: Option<SocketAddr> = listener.local_addr().ok();
        tracing::info!(address = ?addr, "Listening");
        self.state.send_replace(ServerState::Serving);

        let token = shutdown.token();
        let serve = axum::serve(listener, self.router)
            .with_graceful_shutdown(token.clone().cancelled_owned())
            .into_future();
        tokio::pin!(serve);

        let result = tokio::select! {
            result = &mut serve => result.map_err(ServerError::Serve),
            _ = token.cancelled() => {
                self.state.send_replace(ServerState::Draining);
                tracing::info!(deadline = ?self.drain_timeout, "Draining in-flight requests");

                match tokio::time::timeout(self.drain_timeout, &mut serve).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => tracing::error!(error = %e, "Error while draining"),
                    // Connection tasks still running end with the runtime.
                    Err(_) => tracing::warn!(
                        deadline = ?self.drain_timeout,
                        "Drain deadline passed; abandoning remaining requests"
                    ),
                }
                Ok(())
            }
        };

        self.state.send_replace(ServerState::Stopped);
        match &result {
            Ok(()) => tracing::info!("HTTP server stopped"),
            Err(e) => {
                tracing::error!(error = %e, "HTTP server failed");
                shutdown.trigger();
            }
        }
        result
    }
}
