//! Upstream response → client response.
//!
//! # Responsibilities
//! - Relay upstream status, headers and body unchanged
//! - Map forwarding failures to a plain-text 500
//!
//! # Design Decisions
//! - The upstream body is read to completion before anything is returned, so
//!   a read failure becomes a clean 500 instead of a truncated 200
//! - Bodies are relayed as bytes; no decompression or re-encoding

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::http::request::{connection_listed, is_framing_header};
use crate::upstream::UpstreamError;

/// Failure anywhere in forward-and-relay.
#[derive(Debug, thiserror::Error)]
pub enum ForwardError {
    #[error(transparent)]
    Upstream(#[from] UpstreamError),

    #[error("error reading upstream response body: {0}")]
    ReadBody(#[source] reqwest::Error),
}

/// `error: cause: cause ...`, skipping causes already in the message.
pub fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

impl IntoResponse for ForwardError {
    fn into_response(self) -> Response {
        let message = error_chain(&self);
        tracing::error!(error = %message, "500 Internal Server Error");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"))],
            message,
        )
            .into_response()
    }
}

/// Upstream headers minus connection-level ones, repeated values kept.
pub fn relay_headers(upstream: &HeaderMap) -> HeaderMap {
    let listed = connection_listed(upstream);
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if !is_framing_header(name) && !listed.contains(name) {
            headers.append(name.clone(), value.clone());
        }
    }
    headers
}

/// Assemble the client response from upstream parts.
pub fn build_response(status: StatusCode, headers: HeaderMap, body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    *response.headers_mut() = headers;
    response
}

/// Buffer the upstream body and relay it.
pub async fn relay(upstream: reqwest::Response, log_bodies: bool) -> Result<Response, ForwardError> {
    let status = upstream.status();
    let headers = relay_headers(upstream.headers());
    let body = upstream.bytes().await.map_err(ForwardError::ReadBody)?;

    if log_bodies {
        tracing::debug!(bytes = body.len(), body = %String::from_utf8_lossy(&body), "Upstream response body");
    }

    Ok(build_response(status, headers, body))
}
