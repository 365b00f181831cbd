//! gcproxy
//!
//! Authenticating reverse proxy in front of the Google Cloud Managed Service
//! for Prometheus query API.
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!  Prometheus client  │                   gcproxy                    │
//!  ──────────────────▶│  listener ─▶ forward ─▶ upstream client ─────┼──▶ monitoring.googleapis.com
//!  ◀──────────────────│  response ◀─ relay   ◀─ (bearer token)  ◀────┼───
//!                     │                                              │
//!                     │  lifecycle: provision → serve → drain        │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use gcproxy::config::{self, LogFormat};
use gcproxy::env::SystemEnv;
use gcproxy::lifecycle::startup;
use gcproxy::observability::logging;

#[derive(Parser)]
#[command(name = "gcproxy")]
#[command(about = "Authenticating proxy for Google Managed Service for Prometheus", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "GCPROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address, overriding the configuration file.
    #[arg(short, long)]
    bind: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let mut config = match config::load_or_default(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("gcproxy: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if cli.json_logs {
        config.observability.log_format = LogFormat::Json;
    }

    if let Err(e) = logging::init_logging(&config.observability) {
        eprintln!("gcproxy: failed to initialize logging: {e}");
        return ExitCode::FAILURE;
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        endpoint = %config.upstream.endpoint,
        "gcproxy starting"
    );

    match startup::run(config, &SystemEnv).await {
        Ok(()) => {
            tracing::info!("Shutdown complete");
            ExitCode::SUCCESS
        }
        Err(_) => ExitCode::FAILURE,
    }
}
