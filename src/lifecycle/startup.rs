//! Startup orchestration.
//!
//! Order: metrics exporter → signal listener → provisioning → bind → serve.
//! Any startup error is fatal and triggers shutdown; the listener only opens
//! once the upstream client is ready.

use std::net::{AddrParseError, SocketAddr};

use crate::config::ProxyConfig;
use crate::env::ReadEnv;
use crate::http::server::{HttpServer, ServerError};
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::upstream::{self, ProvisionError};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("invalid metrics address {address}: {source}")]
    MetricsAddress {
        address: String,
        #[source]
        source: AddrParseError,
    },

    #[error("error starting metrics exporter: {0}")]
    Metrics(#[source] metrics::BuildError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),

    #[error(transparent)]
    Server(#[from] ServerError),
}

/// Run the proxy until a signal or fatal error, then drain.
pub async fn run<E: ReadEnv>(config: ProxyConfig, env: &E) -> Result<(), StartupError> {
    let shutdown = Shutdown::new();
    let signals = signals::spawn_signal_listener(shutdown.clone());

    let result = start(config, env, &shutdown).await;
    if let Err(e) = &result {
        tracing::error!(error = %e, "Fatal error");
    }

    shutdown.trigger();
    if let Err(e) = signals.await {
        tracing::error!(error = %e, "Signal listener task failed");
    }
    result
}

async fn start<E: ReadEnv>(
    config: ProxyConfig,
    env: &E,
    shutdown: &Shutdown,
) -> Result<(), StartupError> {
    if let Some(address) = &config.observability.metrics_address {
        let addr = address
            .parse::<SocketAddr>()
            .map_err(|source| StartupError::MetricsAddress {
                address: address.clone(),
                source,
            })?;
        metrics::init_metrics(addr).map_err(StartupError::Metrics)?;
    }

    let provisioned = upstream::provision(&config.upstream, env, &shutdown.token()).await?;

    let server = HttpServer::new(provisioned, &config);
    server
        .serve(&config.listener.bind_address, shutdown.clone())
        .await?;
    Ok(())
}
