//! Observability subsystem.
//!
//! # Responsibilities
//! - Structured logging via `tracing`
//! - Prometheus metrics for capture and delivery
//!
//! # Design Decisions
//! - Both are installed once per process; repeated init calls are no-ops
//! - Recording functions are cheap when no recorder is installed, so the
//!   library can be embedded without enabling metrics

pub mod logging;
pub mod metrics;
