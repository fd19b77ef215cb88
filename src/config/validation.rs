//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges and URLs
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Pure function: IntrospectorConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use super::IntrospectorConfig;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("api_key must not be empty")]
    MissingApiKey,

    #[error("environment must not be empty")]
    MissingEnvironment,

    #[error("reporting.endpoint must be an http(s) URL, got {0:?}")]
    InvalidEndpoint(String),

    #[error("interception.sample_rate must be within [0, 1], got {0}")]
    InvalidSampleRate(f64),

    #[error("interception.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("reporting.timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("proxy.upstream must be an http URL, got {0:?}")]
    InvalidUpstream(String),

    #[error("{field} is not a socket address: {value:?}")]
    InvalidAddress { field: &'static str, value: String },
}

/// Check the settings every embedding needs. Proxy and metrics settings are
/// covered by [`validate_proxy`]. A disabled configuration always passes.
pub fn validate_config(config: &IntrospectorConfig) -> Result<(), Vec<ValidationError>> {
    if !config.enabled {
        return Ok(());
    }

    let mut errors = Vec::new();

    if config.api_key.trim().is_empty() {
        errors.push(ValidationError::MissingApiKey);
    }
    if config.environment.trim().is_empty() {
        errors.push(ValidationError::MissingEnvironment);
    }
    if !is_http_url(&config.reporting.endpoint) {
        errors.push(ValidationError::InvalidEndpoint(
            config.reporting.endpoint.clone(),
        ));
    }

    let rate = config.interception.sample_rate;
    if !(0.0..=1.0).contains(&rate) {
        errors.push(ValidationError::InvalidSampleRate(rate));
    }
    if config.interception.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }
    if config.reporting.timeout_secs == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Additional checks for running the observing proxy.
pub fn validate_proxy(config: &IntrospectorConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = match validate_config(config) {
        Ok(()) => Vec::new(),
        Err(errors) => errors,
    };

    let upstream_ok = config
        .proxy
        .upstream
        .parse::<http::Uri>()
        .is_ok_and(|uri| uri.scheme_str() == Some("http") && uri.authority().is_some());
    if !upstream_ok {
        errors.push(ValidationError::InvalidUpstream(config.proxy.upstream.clone()));
    }
    if config.proxy.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "proxy.bind_address",
            value: config.proxy.bind_address.clone(),
        });
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: config.observability.metrics_address.clone(),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host().is_some())
        .unwrap_or(false)
}
