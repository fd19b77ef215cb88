//! HTTP serving subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, trace + timeout layers)
//!     → capture middleware (buffer bodies, spawn report)
//!     → proxy_handler (forward to upstream)
//!     → Send to client
//! ```

pub mod server;

pub use server::{AppState, HttpServer, Upstream};
