//! Authenticating reverse proxy for Google Cloud Managed Service for Prometheus.
//!
//! Local clients speak plain Prometheus HTTP API to the proxy; the proxy
//! rewrites each request onto the project's Prometheus endpoint at
//! `monitoring.googleapis.com`, adds an OAuth bearer token, and relays the
//! response unchanged.

pub mod auth;
pub mod config;
pub mod env;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod upstream;

pub use config::schema::ProxyConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use upstream::{BaseReference, Provisioned, UpstreamClient};
