//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → proxy stops accepting → reporter worker exits
//!     → final report flush → exit
//! ```
//!
//! # Design Decisions
//! - One broadcast channel fans the signal out to every task
//! - Shutdown has a deadline: the reporter waits a bounded time for its
//!   worker before the final flush

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::{shutdown_signal, spawn_signal_handler};
