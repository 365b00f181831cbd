//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gcproxy_requests_total` (counter): forwarded requests by method, status
//! - `gcproxy_request_duration_seconds` (histogram): handler latency by method
//!
//! Recording is a no-op until an exporter is installed. Methods outside the
//! standard set share the `OTHER` label so clients cannot grow the series count.

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::Method;
use metrics_exporter_prometheus::PrometheusBuilder;

pub use metrics_exporter_prometheus::BuildError;

pub const REQUESTS_TOTAL: &str = "gcproxy_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "gcproxy_request_duration_seconds";

/// Install the Prometheus exporter with its own HTTP listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;

    ::metrics::describe_counter!(REQUESTS_TOTAL, "Requests handled by the proxy");
    ::metrics::describe_histogram!(
        REQUEST_DURATION_SECONDS,
        ::metrics::Unit::Seconds,
        "Time from request receipt to response"
    );

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Metric label for a request method.
pub fn method_label(method: &Method) -> &'static str {
    match *method {
        Method::GET => "GET",
        Method::POST => "POST",
        Method::PUT => "PUT",
        Method::DELETE => "DELETE",
        Method::HEAD => "HEAD",
        Method::OPTIONS => "OPTIONS",
        Method::CONNECT => "CONNECT",
        Method::PATCH => "PATCH",
        Method::TRACE => "TRACE",
        _ => "OTHER",
    }
}

/// Record one handled request.
pub fn record_request(method: &Method, status: u16, start: Instant) {
    let method = method_label(method);
    ::metrics::counter!(
        REQUESTS_TOTAL,
        "method" => method,
        "status" => status.to_string()
    )
    .increment(1);
    ::metrics::histogram!(REQUEST_DURATION_SECONDS, "method" => method)
        .record(start.elapsed().as_secs_f64());
}
