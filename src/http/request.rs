//! Inbound request → upstream request.
//!
//! # Responsibilities
//! - Compute the upstream path from the base reference and inbound URI
//! - Copy inbound headers into an owned map and force `Accept`
//! - Stream the inbound body to upstream without buffering
//! - Give every request a log span with a generated request ID
//!
//! # Design Decisions
//! - Path and query are concatenated literally; nothing is decoded or re-encoded
//! - The request ID is for logs only and is never sent upstream
//! - Connection-level headers belong to each hop and are not copied

use axum::body::{Body, HttpBody};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Request, Uri};
use tower_http::trace::MakeSpan;
use uuid::Uuid;

use crate::upstream::BaseReference;

/// Headers that describe one connection rather than the message.
pub fn is_framing_header(name: &HeaderName) -> bool {
    matches!(
        name.as_str(),
        "connection" | "keep-alive" | "proxy-connection" | "transfer-encoding" | "upgrade"
    )
}

/// Header names listed in `Connection`; they apply to the current hop only.
pub fn connection_listed(headers: &HeaderMap) -> Vec<HeaderName> {
    headers
        .get_all(header::CONNECTION)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .filter_map(|name| HeaderName::from_bytes(name.trim().as_bytes()).ok())
        .collect()
}

/// `base + path + "?" + raw query`, with a trailing `?` for an empty query.
pub fn upstream_path(base: &BaseReference, uri: &Uri) -> String {
    format!("{}{}?{}", base, uri.path(), uri.query().unwrap_or(""))
}

/// Owned copy of the inbound headers with `Accept: application/json` forced.
///
/// `Host` is left to the outbound client so upstream sees its own authority.
/// Repeated values are kept in order.
pub fn forward_headers(inbound: &HeaderMap) -> HeaderMap {
    let listed = connection_listed(inbound);
    let mut headers = HeaderMap::with_capacity(inbound.len() + 1);
    for (name, value) in inbound {
        if name == header::HOST || is_framing_header(name) || listed.contains(name) {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));
    headers
}

/// Streaming upstream body, or `None` when the inbound request has none.
pub fn outbound_body(body: Body) -> Option<reqwest::Body> {
    if body.is_end_stream() {
        None
    } else {
        Some(reqwest::Body::wrap_stream(body.into_data_stream()))
    }
}

/// Span factory for `TraceLayer` that tags each request with a UUID v4.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, request: &Request<B>) -> tracing::Span {
        tracing::info_span!(
            "request",
            request_id = %Uuid::new_v4(),
            method = %request.method(),
            uri = %request.uri(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> BaseReference {
        BaseReference::new("proj1", "global")
    }

    #[test]
    fn test_upstream_path_with_query() {
        let uri: Uri = "/api/v1/query?query=up".parse().unwrap();
        assert_eq!(
            upstream_path(&base(), &uri),
            "/v1/projects/proj1/locations/global/prometheus/api/v1/query?query=up"
        );
    }

    #[test]
    fn test_upstream_path_empty_query_keeps_separator() {
        for raw in ["/api/v1/labels", "/api/v1/labels?"] {
            let uri: Uri = raw.parse().unwrap();
            assert_eq!(
                upstream_path(&base(), &uri),
                "/v1/projects/proj1/locations/global/prometheus/api/v1/labels?"
            );
        }
    }

    #[test]
    fn test_upstream_path_is_not_reencoded() {
        let uri: Uri = "/api/v1/series?match%5B%5D=up%7Bjob%3D%22a%22%7D&x=%20"
            .parse()
            .unwrap();
        assert_eq!(
            upstream_path(&base(), &uri),
            "/v1/projects/proj1/locations/global/prometheus/api/v1/series?match%5B%5D=up%7Bjob%3D%22a%22%7D&x=%20"
        );
    }

    #[test]
    fn test_root_path() {
        let uri: Uri = "/".parse().unwrap();
        assert_eq!(
            upstream_path(&base(), &uri),
            "/v1/projects/proj1/locations/global/prometheus/?"
        );
    }

    #[test]
    fn test_accept_forced() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::ACCEPT, HeaderValue::from_static("text/html"));
        inbound.append(header::ACCEPT, HeaderValue::from_static("*/*"));

        let headers = forward_headers(&inbound);
        let accept: Vec<_> = headers.get_all(header::ACCEPT).iter().collect();
        assert_eq!(accept, vec!["application/json"]);
    }

    #[test]
    fn test_headers_copied_with_duplicates() {
        let mut inbound = HeaderMap::new();
        inbound.insert("x-scope", HeaderValue::from_static("a"));
        inbound.append("x-scope", HeaderValue::from_static("b"));
        inbound.insert(header::USER_AGENT, HeaderValue::from_static("grafana"));
        inbound.insert(header::HOST, HeaderValue::from_static("localhost:8080"));
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        let headers = forward_headers(&inbound);
        let scope: Vec<_> = headers.get_all("x-scope").iter().collect();
        assert_eq!(scope, vec!["a", "b"]);
        assert_eq!(headers[header::USER_AGENT], "grafana");
        assert!(!headers.contains_key(header::HOST));
        assert!(!headers.contains_key(header::CONNECTION));
        assert_eq!(headers.len(), 4);
    }

    #[test]
    fn test_connection_listed_headers_dropped() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::CONNECTION, HeaderValue::from_static("X-Hop, close"));
        inbound.append(header::CONNECTION, HeaderValue::from_static("te"));
        inbound.insert("x-hop", HeaderValue::from_static("1"));
        inbound.insert(header::TE, HeaderValue::from_static("trailers"));
        inbound.insert("x-keep", HeaderValue::from_static("2"));

        let headers = forward_headers(&inbound);
        assert!(!headers.contains_key("x-hop"));
        assert!(!headers.contains_key(header::TE));
        assert_eq!(headers["x-keep"], "2");
        assert_eq!(headers[header::ACCEPT], "application/json");
    }

    #[test]
    fn test_connection_listed_ignores_blank_entries() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::CONNECTION, HeaderValue::from_static("keep-alive, , Upgrade"));
        assert_eq!(
            connection_listed(&inbound),
            vec![HeaderName::from_static("keep-alive"), header::UPGRADE]
        );
    }

    #[test]
    fn test_inbound_headers_untouched() {
        let mut inbound = HeaderMap::new();
        inbound.insert(header::ACCEPT, HeaderValue::from_static("text/plain"));
        let _ = forward_headers(&inbound);
        assert_eq!(inbound[header::ACCEPT], "text/plain");
    }

    #[test]
    fn test_empty_body_not_streamed() {
        assert!(outbound_body(Body::empty()).is_none());
        assert!(outbound_body(Body::from("query=up")).is_some());
    }
}
