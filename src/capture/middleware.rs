//! Incoming capture middleware.
//!
//! Install with `axum::middleware::from_fn_with_state(introspector,
//! capture_middleware)`. Bodies are buffered only when their size is known
//! and within `max_body_bytes`; anything else streams through and the
//! exchange is reported without that body.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, OriginalUri, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use bytes::Bytes;
use http_body::Body as _;

use super::Introspector;
use crate::operation::{Direction, Exchange};

pub async fn capture_middleware(
    State(introspector): State<Introspector>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());

    if !introspector.admits(&uri) {
        return next.run(request).await;
    }

    let limit = introspector.max_body_bytes();
    let remote_addr = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);

    // 1. Request body
    let (parts, body) = request.into_parts();
    let (body, captured_request) = if fits(&body, limit) {
        match axum::body::to_bytes(body, limit).await {
            Ok(bytes) => (Body::from(bytes.clone()), bytes),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read request body");
                return (StatusCode::BAD_REQUEST, "Failed to read request body").into_response();
            }
        }
    } else {
        (body, Bytes::new())
    };

    let mut snapshot = http::Request::new(captured_request);
    *snapshot.method_mut() = parts.method.clone();
    *snapshot.uri_mut() = uri;
    *snapshot.version_mut() = parts.version;
    *snapshot.headers_mut() = parts.headers.clone();

    let response = next.run(Request::from_parts(parts, body)).await;

    // 2. Response body
    let (parts, body) = response.into_parts();
    let (body, captured_response) = if fits(&body, limit) {
        match axum::body::to_bytes(body, limit).await {
            Ok(bytes) => (Body::from(bytes.clone()), bytes),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read response body");
                return (StatusCode::BAD_GATEWAY, "Failed to read response body").into_response();
            }
        }
    } else {
        (body, Bytes::new())
    };

    let mut observed = http::Response::new(captured_response);
    *observed.status_mut() = parts.status;
    *observed.version_mut() = parts.version;
    *observed.headers_mut() = parts.headers.clone();

    let exchange = Exchange::new(snapshot, observed, Direction::Incoming).with_remote_addr(remote_addr);
    tokio::spawn(async move {
        introspector.record(exchange).await;
    });

    Response::from_parts(parts, body)
}

/// Known size, within the limit.
fn fits(body: &Body, limit: usize) -> bool {
    body.size_hint()
        .upper()
        .is_some_and(|upper| upper <= limit as u64)
}
