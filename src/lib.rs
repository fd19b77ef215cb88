//! Runtime API introspection.
//!
//! Observes HTTP exchanges, infers a JSON-Schema-like description of every
//! request and response, and reports each distinct operation shape once to
//! a collector.

pub mod capture;
pub mod classify;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod operation;
pub mod reporter;
pub mod schema;

pub use capture::{capture_middleware, Introspector, ObservedClient};
pub use config::IntrospectorConfig;
pub use lifecycle::Shutdown;
pub use operation::{assemble, Exchange, Operation};
pub use reporter::Reporter;
