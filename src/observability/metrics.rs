//! Prometheus metrics.
//!
//! | name | kind | labels |
//! |------|------|--------|
//! | `introspector_exchanges_total` | counter | `direction` |
//! | `introspector_operations_total` | counter | `outcome` |
//! | `introspector_reports_total` | counter | `result` |
//! | `introspector_pending_operations` | gauge | |

use std::net::SocketAddr;

use axum::{routing::get, Router};
use metrics::{counter, describe_counter, describe_gauge, gauge, Unit};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;
use tokio::net::TcpListener;

use crate::lifecycle::Shutdown;
use crate::operation::Direction;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

/// Install the Prometheus recorder. Safe to call more than once.
pub fn install_recorder() -> Result<(), BuildError> {
    if HANDLE.get().is_none() {
        let handle = PrometheusBuilder::new().install_recorder()?;
        HANDLE.set(handle).ok();
        describe_metrics();
    }
    Ok(())
}

/// Install the recorder and serve `/metrics` on `addr` until shutdown.
pub async fn init_metrics(
    addr: SocketAddr,
    shutdown: Shutdown,
) -> Result<tokio::task::JoinHandle<()>, Box<dyn std::error::Error + Send + Sync>> {
    install_recorder()?;

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(address = %addr, "Metrics endpoint listening");

    let mut rx = shutdown.subscribe();
    Ok(tokio::spawn(async move {
        let served = axum::serve(listener, router())
            .with_graceful_shutdown(async move {
                let _ = rx.recv().await;
            })
            .await;
        if let Err(e) = served {
            tracing::error!(error = %e, "Metrics endpoint failed");
        }
    }))
}

/// Renders the current metrics snapshot.
pub async fn metrics_handler() -> String {
    HANDLE
        .get()
        .map(|h| h.render())
        .unwrap_or_else(|| "# recorder not installed\n".into())
}

pub fn router() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

fn describe_metrics() {
    describe_counter!(
        "introspector_exchanges_total",
        Unit::Count,
        "Exchanges handed to the assembler"
    );
    describe_counter!(
        "introspector_operations_total",
        Unit::Count,
        "Operations offered to the reporter, by outcome"
    );
    describe_counter!(
        "introspector_reports_total",
        Unit::Count,
        "Report deliveries, by result"
    );
    describe_gauge!(
        "introspector_pending_operations",
        Unit::Count,
        "Operations waiting for the next flush"
    );
}

pub fn record_exchange(direction: Direction) {
    counter!("introspector_exchanges_total", "direction" => direction.as_str()).increment(1);
}

pub fn record_operation(outcome: &'static str) {
    counter!("introspector_operations_total", "outcome" => outcome).increment(1);
}

pub fn record_report(delivered: bool) {
    let result = if delivered { "success" } else { "failure" };
    counter!("introspector_reports_total", "result" => result).increment(1);
}

pub fn set_pending(pending: usize) {
    gauge!("introspector_pending_operations").set(pending as f64);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_handler_renders_recorded_values() {
        install_recorder().unwrap();
        record_report(true);
        record_operation("queued");
        set_pending(3);

        let body = metrics_handler().await;
        assert!(body.contains("introspector_reports_total"));
        assert!(body.contains("introspector_pending_operations"));
    }
}
