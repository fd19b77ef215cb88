//! Shared utilities for integration testing.
#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
use serde_json::Value;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

use api_introspector::config::IntrospectorConfig;

/// What the mock collector has received so far.
#[derive(Default)]
pub struct CollectorState {
    pub reports: Mutex<Vec<Value>>,
    pub pings: Mutex<Vec<Value>>,
    pub headers: Mutex<Vec<HeaderMap>>,
    /// Number of upcoming report requests to answer with 500.
    pub fail_next: AtomicU32,
}

impl CollectorState {
    pub fn reports(&self) -> Vec<Value> {
        self.reports.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<Value> {
        self.reports()
            .iter()
            .flat_map(|r| r["operations"].as_array().cloned().unwrap_or_default())
            .collect()
    }

    pub fn pings(&self) -> Vec<Value> {
        self.pings.lock().unwrap().clone()
    }
}

pub struct MockCollector {
    pub addr: SocketAddr,
    pub state: Arc<CollectorState>,
}

impl MockCollector {
    pub fn endpoint(&self) -> String {
        format!("http://{}/v1/reports", self.addr)
    }
}

/// Start an in-process collector accepting reports on `/v1/reports` and
/// pings on `/v1/reports/ping`.
pub async fn start_mock_collector() -> MockCollector {
    let state = Arc::new(CollectorState::default());
    let app = Router::new()
        .route("/v1/reports", post(receive_report))
        .route("/v1/reports/ping", post(receive_ping))
        .with_state(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockCollector { addr, state }
}

async fn receive_report(
    State(state): State<Arc<CollectorState>>,
    headers: HeaderMap,
    Json(report): Json<Value>,
) -> StatusCode {
    let failing = state
        .fail_next
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if failing {
        return StatusCode::INTERNAL_SERVER_ERROR;
    }
    state.headers.lock().unwrap().push(headers);
    state.reports.lock().unwrap().push(report);
    StatusCode::ACCEPTED
}

async fn receive_ping(State(state): State<Arc<CollectorState>>, Json(ping): Json<Value>) -> StatusCode {
    state.pings.lock().unwrap().push(ping);
    StatusCode::OK
}

/// Start a programmable mock upstream. `f` yields status, content type and
/// body for every request.
pub async fn start_programmable_backend<F, Fut>(f: F) -> SocketAddr
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, &'static str, String)> + Send + 'static,
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
                        read_request(&mut socket).await;
                        let (status, content_type, body) = f().await;
                        let status_text = match status {
                            200 => "200 OK",
                            201 => "201 Created",
                            204 => "204 No Content",
                            404 => "404 Not Found",
                            500 => "500 Internal Server Error",
                            _ => "200 OK",
                        };

                        let response_str = format!(
                            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                            status_text,
                            content_type,
                            body.len(),
                            body
                        );
                        let _ = socket.write_all(response_str.as_bytes()).await;
                        let _ = socket.shutdown().await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    addr
}

/// Consume one request head and its `Content-Length` body.
async fn read_request(socket: &mut tokio::net::TcpStream) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_ascii_lowercase();
    let content_length = head
        .lines()
        .find_map(|line| line.strip_prefix("content-length:"))
        .and_then(|v| v.trim().parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < head_end + content_length {
        match socket.read(&mut chunk).await {
            Ok(0) | Err(_) => return,
            Ok(n) => buf.extend_from_slice(&chunk[..n]),
        }
    }
}

/// An address nothing listens on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

pub fn test_config(endpoint: &str) -> IntrospectorConfig {
    let mut config = IntrospectorConfig::default();
    config.api_key = "test-key".into();
    config.environment = "test".into();
    config.reporting.endpoint = endpoint.to_string();
    config.reporting.timeout_secs = 2;
    config
}

/// Poll `condition` every 20ms for up to `timeout`.
pub async fn wait_until(timeout: Duration, condition: impl Fn() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    condition()
}
