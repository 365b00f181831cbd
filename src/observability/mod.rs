//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Handlers and lifecycle produce:
//!     → logging.rs (structured log events, per-request span)
//!     → metrics.rs (counters, histograms)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → optional Prometheus scrape endpoint
//! ```

pub mod logging;
pub mod metrics;
