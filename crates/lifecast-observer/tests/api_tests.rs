//! Integration tests for the observer endpoints.
//!
//! Most tests drive the `Router` directly via `tower::ServiceExt` without a
//! TCP server. The last one binds a real socket through `spawn_observer`.

#![allow(clippy::unwrap_used)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use lifecast_core::{SessionSettings, Simulation, SimulationHandle, SimulationSettings};
use lifecast_grid::{Grid, Point, Torus};
use lifecast_observer::{AppState, ServerConfig, build_router, spawn_observer};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tower::ServiceExt;

const STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/../../static");

fn running_state() -> Arc<AppState> {
    let grid = Grid::new(Torus::new(32, 24).unwrap());
    let settings = SimulationSettings {
        tick_interval: Duration::from_secs(3600),
        rng_seed: Some(7),
        ..SimulationSettings::default()
    };
    let (simulation, handle) = Simulation::new(grid, settings);
    tokio::spawn(simulation.run());
    Arc::new(AppState::new(handle, SessionSettings::default(), STATIC_DIR))
}

async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, Vec<u8>) {
    let response = build_router(state)
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body.to_vec())
}

// ---------------------------------------------------------------------------
// /api/stats
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stats_report_injected_cells_and_plane_size() {
    let state = running_state();
    let block = vec![
        Point::new(4, 4),
        Point::new(5, 4),
        Point::new(4, 5),
        Point::new(5, 5),
    ];
    assert!(state.simulation.inject(block).await.is_delivered());

    let (status, body) = get(Arc::clone(&state), "/api/stats").await;
    assert_eq!(status, StatusCode::OK);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["live_cells"], 4);
    assert_eq!(json["width"], 32);
    assert_eq!(json["height"], 24);
    assert_eq!(json["sessions_active"], 0);
    assert!(json["generation"].is_u64());
    assert!(json["uptime_seconds"].is_u64());
}

#[tokio::test]
async fn stats_are_unavailable_without_a_loop() {
    let (handle, commands) = SimulationHandle::channel(4, Duration::from_millis(10));
    drop(commands);
    let state = Arc::new(AppState::new(handle, SessionSettings::default(), STATIC_DIR));

    let (status, body) = get(state, "/api/stats").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let json: Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], 503);
    assert!(json["error"].as_str().unwrap().contains("simulation"));
}

// ---------------------------------------------------------------------------
// Static assets and /ws
// ---------------------------------------------------------------------------

#[tokio::test]
async fn root_serves_the_browser_client() {
    let (status, body) = get(running_state(), "/").await;
    assert_eq!(status, StatusCode::OK);
    let html = String::from_utf8(body).unwrap();
    assert!(html.contains("<canvas"));
}

#[tokio::test]
async fn unknown_paths_are_not_found() {
    let (status, _) = get(running_state(), "/no/such/file.txt").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn ws_requires_an_upgrade() {
    let (status, _) = get(running_state(), "/ws").await;
    assert!(status.is_client_error(), "got {status}");
}

// ---------------------------------------------------------------------------
// Over a real socket
// ---------------------------------------------------------------------------

#[tokio::test]
async fn spawned_observer_answers_over_tcp() {
    let state = running_state();
    let config = ServerConfig {
        host: "127.0.0.1".to_owned(),
        port: 0,
    };
    let observer = spawn_observer(&config, state).await.unwrap();
    assert_ne!(observer.local_addr.port(), 0);

    let mut stream = tokio::net::TcpStream::connect(observer.local_addr)
        .await
        .unwrap();
    stream
        .write_all(b"GET /api/stats HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"), "{response}");
    assert!(response.contains("\"live_cells\""));

    observer.task.abort();
}

#[tokio::test]
async fn taken_port_fails_startup() {
    let first = spawn_observer(
        &ServerConfig {
            host: "127.0.0.1".to_owned(),
            port: 0,
        },
        running_state(),
    )
    .await
    .unwrap();

    let clash = ServerConfig {
        host: "127.0.0.1".to_owned(),
        port: first.local_addr.port(),
    };
    assert!(spawn_observer(&clash, running_state()).await.is_err());

    first.task.abort();
}
