//! Deduplicating, batching reporter.
//!
//! # Data Flow
//! ```text
//! report(op)
//!     → content hash (hash.rs)
//!     → seen? drop : push to pending
//!     → pending > batch_size? wake worker
//!
//! worker (tokio task)
//!     → every batch interval, or when woken: flush()
//!     → every ping interval (service name set): sink.ping()
//!
//! flush()
//!     → take pending → sink.send() with timeout
//!     → on failure, put the batch back in front of pending
//! ```
//!
//! # Design Decisions
//! - The seen-set gates construction of duplicates, not delivery: a failed
//!   batch is retried as-is and its hashes stay marked
//! - Buffer and seen-set share one mutex, never held across an await
//! - Flushes are serialized so a retry never overtakes a running delivery
//! - The stopped flag lives under the buffer mutex: an operation is either
//!   queued before `stop` takes that lock, and so in its final flush, or
//!   rejected

pub mod hash;
pub mod sink;

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{broadcast, Notify};
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};

pub use hash::{canonical_json, content_hash};
pub use sink::{DeliveryError, HttpSink, ReportSink};

use crate::config::IntrospectorConfig;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::operation::{Operation, Report, ReporterInfo};

/// Retry cadence for failed batches when batching is disabled.
const IMMEDIATE_RETRY_PERIOD: Duration = Duration::from_secs(5);

/// Extra time granted to the worker on stop, on top of one delivery timeout.
const STOP_GRACE: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct ReporterSettings {
    pub info: ReporterInfo,
    /// Flush once more than this many operations are pending. `0` sends
    /// every operation as soon as it is reported.
    pub batch_size: usize,
    /// Periodic flush cadence. Zero also means send immediately.
    pub batch_interval: Duration,
    pub ping_interval: Duration,
    pub delivery_timeout: Duration,
}

impl ReporterSettings {
    pub fn from_config(config: &IntrospectorConfig) -> Self {
        Self {
            info: ReporterInfo {
                environment: config.environment.clone(),
                service_name: config.service_name.clone(),
            },
            batch_size: config.reporting.batch_size,
            batch_interval: Duration::from_secs(config.reporting.batch_interval_secs),
            ping_interval: Duration::from_secs(config.reporting.ping_interval_secs),
            delivery_timeout: Duration::from_secs(config.reporting.timeout_secs),
        }
    }

    pub fn send_immediately(&self) -> bool {
        self.batch_size == 0 || self.batch_interval.is_zero()
    }
}

/// What `report` did with an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportOutcome {
    /// New shape, buffered for delivery.
    Queued,
    /// Same shape was reported before.
    Duplicate,
    /// The reporter was stopped or the operation could not be hashed.
    Rejected,
}

impl ReportOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            ReportOutcome::Queued => "queued",
            ReportOutcome::Duplicate => "duplicate",
            ReportOutcome::Rejected => "rejected",
        }
    }
}

/// Point-in-time reporter counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ReporterStatus {
    pub pending: usize,
    pub seen: usize,
    pub delivered_batches: u64,
    pub failed_batches: u64,
}

#[derive(Default)]
struct State {
    seen: HashSet<String>,
    pending: Vec<Operation>,
    stopped: bool,
}

struct Inner {
    settings: ReporterSettings,
    sink: Arc<dyn ReportSink>,
    state: Mutex<State>,
    flush_lock: tokio::sync::Mutex<()>,
    wake: Notify,
    shutdown: Shutdown,
    worker: Mutex<Option<JoinHandle<()>>>,
    delivered: AtomicU64,
    failed: AtomicU64,
}

/// Cheaply cloneable handle; all clones share one buffer and seen-set.
#[derive(Clone)]
pub struct Reporter {
    inner: Arc<Inner>,
}

impl Reporter {
    pub fn new(settings: ReporterSettings, sink: Arc<dyn ReportSink>) -> Self {
        Self {
            inner: Arc::new(Inner {
                settings,
                sink,
                state: Mutex::new(State::default()),
                flush_lock: tokio::sync::Mutex::new(()),
                wake: Notify::new(),
                shutdown: Shutdown::new(),
                worker: Mutex::new(None),
                delivered: AtomicU64::new(0),
                failed: AtomicU64::new(0),
            }),
        }
    }

    pub fn settings(&self) -> &ReporterSettings {
        &self.inner.settings
    }

    /// Spawn the background worker. Calling it again is a no-op.
    pub fn start(&self) {
        let mut worker = lock(&self.inner.worker);
        if worker.is_some() || lock(&self.inner.state).stopped {
            return;
        }

        tracing::info!(
            batch_size = self.inner.settings.batch_size,
            batch_interval_ms = self.inner.settings.batch_interval.as_millis() as u64,
            immediate = self.inner.settings.send_immediately(),
            "Reporter starting"
        );

        let shutdown = self.inner.shutdown.subscribe();
        *worker = Some(tokio::spawn(self.clone().run(shutdown)));
    }

    /// Record an operation unless an identical shape was seen before.
    ///
    /// Returns immediately unless the reporter is in send-immediately mode,
    /// in which case the caller waits for the delivery attempt.
    pub async fn report(&self, operation: Operation) -> ReportOutcome {
        let outcome = self.enqueue(operation);
        metrics::record_operation(outcome.as_str());

        if outcome == ReportOutcome::Queued {
            if self.inner.settings.send_immediately() {
                // Failures are logged and the batch kept for the next flush.
                let _ = self.flush().await;
            } else if self.pending_len() > self.inner.settings.batch_size {
                self.inner.wake.notify_one();
            }
        }
        outcome
    }

    fn enqueue(&self, operation: Operation) -> ReportOutcome {
        let hash = match content_hash(&operation) {
            Ok(hash) => hash,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to hash operation");
                return ReportOutcome::Rejected;
            }
        };

        // `stop` sets the flag under this lock before its final flush.
        let mut state = lock(&self.inner.state);
        if state.stopped {
            tracing::debug!("Reporter stopped, dropping operation");
            return ReportOutcome::Rejected;
        }
        if !state.seen.insert(hash) {
            return ReportOutcome::Duplicate;
        }
        tracing::debug!(
            method = %operation.request.method,
            uri = %operation.request.uri,
            status = operation.response.status_code,
            "Queued new operation shape"
        );
        state.pending.push(operation);
        metrics::set_pending(state.pending.len());
        ReportOutcome::Queued
    }

    /// Deliver everything pending as one report.
    ///
    /// Returns the number of operations delivered. On failure the batch goes
    /// back to the front of the buffer.
    pub async fn flush(&self) -> Result<usize, DeliveryError> {
        let _flushing = self.inner.flush_lock.lock().await;

        let operations = std::mem::take(&mut lock(&self.inner.state).pending);
        if operations.is_empty() {
            return Ok(0);
        }

        let report = Report {
            reporter: self.inner.settings.info.clone(),
            operations,
        };
        let count = report.operations.len();
        let timeout = self.inner.settings.delivery_timeout;

        let result = match time::timeout(timeout, self.inner.sink.send(&report)).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Timeout(timeout)),
        };

        match result {
            Ok(()) => {
                self.inner.delivered.fetch_add(1, Ordering::Relaxed);
                metrics::record_report(true);
                metrics::set_pending(self.pending_len());
                tracing::info!(operations = count, "Report delivered");
                Ok(count)
            }
            Err(e) => {
                self.inner.failed.fetch_add(1, Ordering::Relaxed);
                metrics::record_report(false);

                let mut state = lock(&self.inner.state);
                let mut restored = report.operations;
                restored.append(&mut state.pending);
                state.pending = restored;
                metrics::set_pending(state.pending.len());

                tracing::warn!(operations = count, error = %e, "Report delivery failed, will retry");
                Err(e)
            }
        }
    }

    /// Signal the worker, wait for it (bounded), then flush one last time.
    /// Safe to call more than once.
    pub async fn stop(&self) {
        {
            let mut state = lock(&self.inner.state);
            if state.stopped {
                return;
            }
            state.stopped = true;
        }
        self.inner.shutdown.trigger();

        let handle = lock(&self.inner.worker).take();
        if let Some(mut handle) = handle {
            let grace = self.inner.settings.delivery_timeout + STOP_GRACE;
            if time::timeout(grace, &mut handle).await.is_err() {
                tracing::warn!(grace_ms = grace.as_millis() as u64, "Reporter worker did not stop in time, aborting");
                handle.abort();
            }
        }

        match self.flush().await {
            Ok(count) => tracing::info!(operations = count, "Reporter stopped"),
            Err(e) => tracing::warn!(error = %e, "Final report flush failed"),
        }
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.inner.state).pending.len()
    }

    pub fn status(&self) -> ReporterStatus {
        let state = lock(&self.inner.state);
        ReporterStatus {
            pending: state.pending.len(),
            seen: state.seen.len(),
            delivered_batches: self.inner.delivered.load(Ordering::Relaxed),
            failed_batches: self.inner.failed.load(Ordering::Relaxed),
        }
    }

    async fn ping(&self) {
        let timeout = self.inner.settings.delivery_timeout;
        let info = &self.inner.settings.info;
        match time::timeout(timeout, self.inner.sink.ping(info)).await {
            Ok(Ok(())) => tracing::debug!("Ping delivered"),
            Ok(Err(e)) => tracing::warn!(error = %e, "Ping failed"),
            Err(_) => tracing::warn!(timeout_ms = timeout.as_millis() as u64, "Ping timed out"),
        }
    }

    async fn run(self, mut shutdown: broadcast::Receiver<()>) {
        let settings = &self.inner.settings;
        let period = if settings.batch_interval.is_zero() {
            IMMEDIATE_RETRY_PERIOD
        } else {
            settings.batch_interval
        };
        let mut flush_ticker = time::interval(period);
        flush_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let pinging = settings.info.service_name.is_some() && !settings.ping_interval.is_zero();
        let mut ping_ticker = time::interval(settings.ping_interval.max(Duration::from_secs(1)));
        ping_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = flush_ticker.tick() => {
                    let _ = self.flush().await;
                }
                _ = self.inner.wake.notified() => {
                    let _ = self.flush().await;
                }
                _ = ping_ticker.tick(), if pinging => {
                    self.ping().await;
                }
                _ = shutdown.recv() => {
                    tracing::debug!("Reporter worker received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
