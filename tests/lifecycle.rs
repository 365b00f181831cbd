//! Startup, shutdown and drain behaviour.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::IntoResponse;
use gcproxy::auth::metadata::METADATA_HOST_ENV;
use gcproxy::env::MapEnv;
use gcproxy::http::{HttpServer, ServerError, ServerState};
use gcproxy::lifecycle::startup::{self, StartupError};
use gcproxy::upstream::ProvisionError;
use gcproxy::{ProxyConfig, Shutdown};
use tokio::sync::Notify;
use tower::ServiceExt;

mod common;

async fn wait_for_state(
    state: &mut tokio::sync::watch::Receiver<ServerState>,
    wanted: ServerState,
) {
    tokio::time::timeout(Duration::from_secs(5), state.wait_for(|s| *s == wanted))
        .await
        .expect("state not reached")
        .expect("server dropped");
}

/// Upstream that signals when a request arrives and answers after `delay`.
async fn start_slow_upstream(delay: Duration) -> (std::net::SocketAddr, Arc<Notify>) {
    let arrived = Arc::new(Notify::new());
    let notify = arrived.clone();
    let (addr, _seen) = common::start_recording_upstream(move |_| {
        let notify = notify.clone();
        async move {
            notify.notify_one();
            tokio::time::sleep(delay).await;
            "slow".into_response()
        }
    })
    .await;
    (addr, arrived)
}

#[tokio::test]
async fn test_drain_waits_for_in_flight_request() {
    let (upstream, arrived) = start_slow_upstream(Duration::from_millis(500)).await;
    let mut proxy = common::start_proxy(upstream, ProxyConfig::default()).await;
    wait_for_state(&mut proxy.state, ServerState::Serving).await;

    let url = proxy.url("/api/v1/query?query=up");
    let in_flight = tokio::spawn(async move { common::client().get(url).send().await });

    arrived.notified().await;
    proxy.shutdown.trigger();
    wait_for_state(&mut proxy.state, ServerState::Draining).await;

    let res = in_flight.await.unwrap().expect("in-flight request dropped");
    assert_eq!(res.status(), 200);
    assert_eq!(res.text().await.unwrap(), "slow");

    let result = tokio::time::timeout(Duration::from_secs(5), proxy.handle)
        .await
        .expect("server did not stop")
        .unwrap();
    assert!(result.is_ok());
    assert_eq!(*proxy.state.borrow(), ServerState::Stopped);

    // Listener is gone.
    assert!(tokio::net::TcpStream::connect(proxy.addr).await.is_err());
}

#[tokio::test]
async fn test_drain_deadline_bounds_shutdown() {
    let (upstream, arrived) = start_slow_upstream(Duration::from_secs(30)).await;
    let mut config = ProxyConfig::default();
    config.shutdown.drain_timeout_secs = 1;
    let proxy = common::start_proxy(upstream, config).await;

    let url = proxy.url("/api/v1/query?query=up");
    let in_flight = tokio::spawn(async move { common::client().get(url).send().await });
    arrived.notified().await;

    let started = Instant::now();
    proxy.shutdown.trigger();
    let result = tokio::time::timeout(Duration::from_secs(5), proxy.handle)
        .await
        .expect("drain deadline not enforced")
        .unwrap();

    assert!(result.is_ok());
    assert!(started.elapsed() >= Duration::from_millis(900));
    assert!(!in_flight.is_finished());
    in_flight.abort();
}

#[tokio::test]
async fn test_bind_failure_triggers_shutdown() {
    let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = taken.local_addr().unwrap().to_string();

    let server = HttpServer::new(
        common::provisioned_for("127.0.0.1:1".parse().unwrap()),
        &ProxyConfig::default(),
    );
    let state = server.state();
    let shutdown = Shutdown::new();

    let err = server.serve(&address, shutdown.clone()).await.unwrap_err();
    assert!(matches!(err, ServerError::Bind { .. }));
    assert!(shutdown.is_triggered());
    assert_eq!(*state.borrow(), ServerState::Stopped);
}

#[tokio::test]
async fn test_missing_project_never_opens_listener() {
    let free = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = free.local_addr().unwrap();
    drop(free);

    let mut config = ProxyConfig::default();
    config.listener.bind_address = address.to_string();
    let env = MapEnv::new()
        .with("HOME", "/nonexistent-home")
        .with(METADATA_HOST_ENV, "127.0.0.1:1");

    let err = startup::run(config, &env).await.unwrap_err();
    assert!(matches!(
        err,
        StartupError::Provision(ProvisionError::MissingProject(_))
    ));
    assert_eq!(err.to_string(), "GOOGLE_PROJECT_ID must be set");
    assert!(tokio::net::TcpStream::connect(address).await.is_err());
}

#[tokio::test]
async fn test_bad_metrics_address_is_fatal() {
    let free = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = free.local_addr().unwrap();
    drop(free);

    let mut config = ProxyConfig::default();
    config.listener.bind_address = address.to_string();
    config.observability.metrics_address = Some("not-an-address".to_string());
    let env = MapEnv::new().with("GOOGLE_PROJECT_ID", "proj1");

    let err = startup::run(config, &env).await.unwrap_err();
    match err {
        StartupError::MetricsAddress { address: bad, .. } => assert_eq!(bad, "not-an-address"),
        other => panic!("unexpected error: {other}"),
    }
    assert!(tokio::net::TcpStream::connect(address).await.is_err());
}

#[tokio::test]
async fn test_router_without_socket() {
    let free = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream = free.local_addr().unwrap();
    drop(free);

    let server = HttpServer::new(common::provisioned_for(upstream), &ProxyConfig::default());
    let response = server
        .router()
        .oneshot(
            Request::builder()
                .method("PROPFIND")
                .uri("/anything/at/all?x=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}
