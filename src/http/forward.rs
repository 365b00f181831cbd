//! The single proxy handler.

use std::time::Instant;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::{IntoResponse, Response};

use crate::http::request::{forward_headers, outbound_body, upstream_path};
use crate::http::response::{relay, ForwardError};
use crate::http::server::AppState;
use crate::observability::metrics;

/// Forward any request upstream and relay the answer.
///
/// Dropping this future (client gone, runtime shut down) drops the in-flight
/// upstream call with it.
pub async fn forward(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let method = request.method().clone();

    let response = match forward_and_relay(&state, request).await {
        Ok(response) => response,
        Err(e) => e.into_response(),
    };

    metrics::record_request(&method, response.status().as_u16(), start);
    response
}

async fn forward_and_relay(state: &AppState, request: Request<Body>) -> Result<Response, ForwardError> {
    let (parts, body) = request.into_parts();

    let url = state.client.url_for(&upstream_path(&state.base, &parts.uri))?;
    let headers = forward_headers(&parts.headers);

    let upstream = state
        .client
        .execute(parts.method.clone(), url.clone(), headers, outbound_body(body))
        .await?;

    tracing::info!(
        method = %parts.method,
        url = %url,
        status = %upstream.status(),
        "Forwarded"
    );

    relay(upstream, state.log_bodies).await
}
