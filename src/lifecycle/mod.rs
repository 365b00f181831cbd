//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Provision upstream client → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal or fatal error → Stop accepting → Drain in-flight → Exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered startup: no traffic until the upstream client is ready
//! - One cancellation token for the whole process, passed explicitly
//! - Shutdown has a deadline: remaining requests are dropped after it

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
