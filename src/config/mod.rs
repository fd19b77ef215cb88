//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → IntrospectorConfig (validated, immutable)
//!     → shared via Arc with the introspector and the proxy
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded
//! - All fields have defaults to allow minimal configs
//! - The collector endpoint has no default; it must be configured
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    IntrospectorConfig, InterceptionConfig, ObservabilityConfig, ProxyConfig, ReportingConfig,
};
pub use validation::{validate_config, validate_proxy, ValidationError};
