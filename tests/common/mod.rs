//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Method, Request, Uri};
use axum::response::Response;
use axum::Router;
use gcproxy::auth::StaticToken;
use gcproxy::http::{HttpServer, ServerError, ServerState};
use gcproxy::{BaseReference, ProxyConfig, Provisioned, Shutdown, UpstreamClient};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

pub const TEST_TOKEN: &str = "test-token";
pub const BASE: &str = "/v1/projects/proj1/locations/global/prometheus";

/// What the mock upstream saw.
#[derive(Debug, Clone)]
pub struct Captured {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// Start an upstream that records every request and answers with `respond`.
pub async fn start_recording_upstream<F, Fut>(
    respond: F,
) -> (SocketAddr, mpsc::UnboundedReceiver<Captured>)
where
    F: Fn(Captured) -> Fut + Clone + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel();
    let app = Router::new().fallback(move |request: Request<Body>| {
        let tx = tx.clone();
        let respond = respond.clone();
        async move {
            let (parts, body) = request.into_parts();
            let body = axum::body::to_bytes(body, usize::MAX).await.unwrap();
            let captured = Captured {
                method: parts.method,
                uri: parts.uri,
                headers: parts.headers,
                body,
            };
            let _ = tx.send(captured.clone());
            respond(captured).await
        }
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    (addr, rx)
}

/// Start a raw TCP upstream. `f` gets the request head and returns the bytes
/// to write back, or `None` to drop the connection without answering.
pub async fn start_raw_upstream<F>(f: F) -> SocketAddr
where
    F: Fn(String) -> Option<Vec<u8>> + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let f = Arc::new(f);

    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((mut socket, _)) => {
                    let f = f.clone();
                    tokio::spawn(async move {
                        let mut head = Vec::new();
                        let mut buf = [0u8; 1024];
                        while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                            match socket.read(&mut buf).await {
                                Ok(0) | Err(_) => return,
                                Ok(n) => head.extend_from_slice(&buf[..n]),
                            }
                        }
                        if let Some(reply) = f(String::from_utf8_lossy(&head).into_owned()) {
                            let _ = socket.write_all(&reply).await;
                        }
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });
    addr
}

/// A proxy running on an ephemeral port.
pub struct TestProxy {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub state: watch::Receiver<ServerState>,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl TestProxy {
    pub fn url(&self, path_and_query: &str) -> String {
        format!("http://{}{}", self.addr, path_and_query)
    }
}

pub fn provisioned_for(upstream: SocketAddr) -> Provisioned {
    Provisioned {
        client: UpstreamClient::new(
            reqwest::Client::new(),
            &format!("http://{upstream}"),
            Arc::new(StaticToken::new(TEST_TOKEN)),
        ),
        base: BaseReference::new("proj1", "global"),
    }
}

/// Start a proxy in front of `upstream`.
pub async fn start_proxy(upstream: SocketAddr, config: ProxyConfig) -> TestProxy {
    let server = HttpServer::new(provisioned_for(upstream), &config);
    let state = server.state();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.clone()));

    TestProxy {
        addr,
        shutdown,
        state,
        handle,
    }
}

/// Client that talks to the proxy directly and never pools connections.
pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
