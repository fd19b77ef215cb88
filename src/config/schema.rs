//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files. Every
//! section has defaults so a minimal file only names the API key, the
//! environment and the collector endpoint.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct IntrospectorConfig {
    /// Key sent as `X-API-Key` with every report.
    pub api_key: String,

    /// Environment name attached to reports (e.g. "production").
    pub environment: String,

    /// Optional service name; enables periodic liveness pings.
    pub service_name: Option<String>,

    /// Master switch. When false nothing is captured or sent.
    pub enabled: bool,

    /// Report delivery settings.
    pub reporting: ReportingConfig,

    /// Which exchanges are observed.
    pub interception: InterceptionConfig,

    /// Observing reverse proxy settings.
    pub proxy: ProxyConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

impl Default for IntrospectorConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            environment: String::new(),
            service_name: None,
            enabled: true,
            reporting: ReportingConfig::default(),
            interception: InterceptionConfig::default(),
            proxy: ProxyConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

/// Report delivery configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReportingConfig {
    /// Collector URL reports are POSTed to. Required.
    pub endpoint: String,

    /// Flush once more than this many operations are pending (0 = send
    /// immediately).
    pub batch_size: usize,

    /// Seconds between periodic flushes (0 = send immediately).
    pub batch_interval_secs: u64,

    /// Per-delivery timeout in seconds.
    pub timeout_secs: u64,

    /// Seconds between liveness pings when `service_name` is set.
    pub ping_interval_secs: u64,
}

impl Default for ReportingConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            batch_size: 10,
            batch_interval_secs: 5,
            timeout_secs: 10,
            ping_interval_secs: 300,
        }
    }
}

/// Interception filter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterceptionConfig {
    /// Fraction of exchanges observed, in `[0, 1]`.
    pub sample_rate: f64,

    /// Bodies larger than this are not buffered, and not schema'd.
    pub max_body_bytes: usize,

    /// Request paths starting with any of these are never observed.
    pub exclude_path_prefixes: Vec<String>,
}

impl Default for InterceptionConfig {
    fn default() -> Self {
        Self {
            sample_rate: 1.0,
            max_body_bytes: 2 * 1024 * 1024,
            exclude_path_prefixes: Vec::new(),
        }
    }
}

/// Observing reverse proxy configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Base URL all traffic is forwarded to.
    pub upstream: String,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            upstream: "http://127.0.0.1:3000".to_string(),
            request_timeout_secs: 30,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level or full filter directive. `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Emit JSON lines instead of human-readable logs.
    pub json_logs: bool,

    /// Enable the Prometheus metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
