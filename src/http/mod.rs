//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request span)
//!     → forward.rs (single handler for every method and path)
//!         → request.rs (upstream path, header copy, streamed body)
//!         → upstream client (bearer token, send)
//!         → response.rs (buffer body, relay status/headers/body, or 500)
//!     → Send to client
//! ```

pub mod forward;
pub mod request;
pub mod response;
pub mod server;

pub use response::ForwardError;
pub use server::{AppState, HttpServer, ServerError, ServerState};
