//! Capture subsystem: where exchanges enter the pipeline.
//!
//! # Data Flow
//! ```text
//! incoming: axum request → middleware.rs (buffer bodies) ─┐
//! outgoing: reqwest request → outgoing.rs (buffer bodies) ─┤
//!                                                          ↓
//!                           Introspector::admits (cheap checks, before buffering)
//!                           Introspector::record (predicate, assemble, report)
//!                                                          ↓
//!                                                      Reporter
//! ```
//!
//! # Design Decisions
//! - A disabled introspector is inert: no validation, no reporter, no
//!   worker, and every exchange passes straight through
//! - Filtering happens before bodies are buffered, so skipped traffic costs
//!   nothing beyond a few comparisons
//! - Capture never awaits delivery; the middleware hands exchanges to a
//!   spawned task

pub mod introspector;
pub mod middleware;
pub mod outgoing;

pub use introspector::{CaptureError, ExchangeFilter, Introspector};
pub use middleware::capture_middleware;
pub use outgoing::ObservedClient;
