//! The `Introspector` facade.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::{validate_config, IntrospectorConfig, ValidationError};
use crate::observability::metrics;
use crate::operation::{assemble, Exchange};
use crate::reporter::{
    DeliveryError, HttpSink, ReportOutcome, ReportSink, Reporter, ReporterSettings, ReporterStatus,
};

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("invalid configuration: {}", join(.0))]
    Config(Vec<ValidationError>),

    #[error("invalid reporting endpoint: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("failed to build report sink: {0}")]
    Sink(#[from] DeliveryError),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Extra caller-supplied check run on every complete exchange.
pub type ExchangeFilter = Arc<dyn Fn(&Exchange) -> bool + Send + Sync>;

struct Active {
    endpoint: Url,
    sample_rate: f64,
    max_body_bytes: usize,
    exclude_path_prefixes: Vec<String>,
    reporter: Reporter,
    filter: Option<ExchangeFilter>,
}

/// Owns the reporter and the interception policy. Clones share both.
#[derive(Clone)]
pub struct Introspector {
    active: Option<Arc<Active>>,
}

impl Introspector {
    /// Validate `config` and build the HTTP report sink.
    ///
    /// A disabled configuration is accepted as-is and yields an inert
    /// introspector.
    pub fn new(config: &IntrospectorConfig) -> Result<Self, CaptureError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        validate_config(config).map_err(CaptureError::Config)?;

        let endpoint = Url::parse(&config.reporting.endpoint)?;
        let sink = HttpSink::new(
            endpoint.clone(),
            &config.api_key,
            Duration::from_secs(config.reporting.timeout_secs),
        )?;
        Ok(Self::build(config, endpoint, Arc::new(sink)))
    }

    /// Like [`Introspector::new`] but delivering to a caller-provided sink.
    pub fn with_sink(
        config: &IntrospectorConfig,
        sink: Arc<dyn ReportSink>,
    ) -> Result<Self, CaptureError> {
        if !config.enabled {
            return Ok(Self::disabled());
        }
        validate_config(config).map_err(CaptureError::Config)?;

        let endpoint = Url::parse(&config.reporting.endpoint)?;
        Ok(Self::build(config, endpoint, sink))
    }

    fn build(
        config: &IntrospectorConfig,
        endpoint: Url,
        sink: Arc<dyn ReportSink>,
    ) -> Self {
        let reporter = Reporter::new(ReporterSettings::from_config(config), sink);
        Self {
            active: Some(Arc::new(Active {
                endpoint,
                sample_rate: config.interception.sample_rate,
                max_body_bytes: config.interception.max_body_bytes,
                exclude_path_prefixes: config.interception.exclude_path_prefixes.clone(),
                reporter,
                filter: None,
            })),
        }
    }

    pub fn disabled() -> Self {
        Self { active: None }
    }

    /// Install a predicate consulted for every complete exchange. Must be
    /// called before the introspector is cloned.
    pub fn with_filter(mut self, filter: ExchangeFilter) -> Self {
        match self.active.as_mut().map(Arc::get_mut) {
            Some(Some(active)) => active.filter = Some(filter),
            Some(None) => tracing::warn!("Introspector already shared, ignoring exchange filter"),
            None => {}
        }
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.active.is_some()
    }

    /// Largest body, in bytes, that capture sources should buffer.
    pub fn max_body_bytes(&self) -> usize {
        self.active.as_ref().map_or(0, |a| a.max_body_bytes)
    }

    pub fn reporter(&self) -> Option<&Reporter> {
        self.active.as_ref().map(|a| &a.reporter)
    }

    pub fn status(&self) -> Option<ReporterStatus> {
        self.reporter().map(Reporter::status)
    }

    /// Start the reporter's background worker.
    pub fn start(&self) {
        match self.reporter() {
            Some(reporter) => reporter.start(),
            None => tracing::info!("Introspector disabled, nothing will be captured"),
        }
    }

    /// Stop the worker and flush whatever is pending.
    pub async fn stop(&self) {
        if let Some(reporter) = self.reporter() {
            reporter.stop().await;
        }
    }

    /// Cheap pre-buffering checks: enabled, not addressed to the collector,
    /// path not excluded, and the sampling draw.
    pub fn admits(&self, uri: &http::Uri) -> bool {
        let Some(active) = self.active.as_deref() else {
            return false;
        };
        if targets_endpoint(uri, &active.endpoint) {
            return false;
        }
        let path = uri.path();
        if active
            .exclude_path_prefixes
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
        {
            return false;
        }
        sampled(active.sample_rate)
    }

    /// Filter, assemble and report one exchange.
    pub async fn observe(&self, exchange: Exchange) -> Option<ReportOutcome> {
        if !self.admits(exchange.request.uri()) {
            return None;
        }
        self.record(exchange).await
    }

    /// Assemble and report an exchange that already passed [`admits`].
    ///
    /// [`admits`]: Introspector::admits
    pub async fn record(&self, exchange: Exchange) -> Option<ReportOutcome> {
        let active = self.active.as_deref()?;
        if let Some(filter) = &active.filter {
            if !filter(&exchange) {
                return None;
            }
        }

        metrics::record_exchange(exchange.direction);
        tracing::trace!(
            direction = %exchange.direction,
            method = %exchange.request.method(),
            path = exchange.path(),
            status = exchange.response.status().as_u16(),
            "Captured exchange"
        );

        let operation = assemble(&exchange);
        Some(active.reporter.report(operation).await)
    }
}

fn sampled(rate: f64) -> bool {
    if rate >= 1.0 {
        true
    } else if rate <= 0.0 {
        false
    } else {
        fastrand::f64() < rate
    }
}

/// Whether `uri` points at the collector's host and port.
fn targets_endpoint(uri: &http::Uri, endpoint: &Url) -> bool {
    let (Some(host), Some(endpoint_host)) = (uri.host(), endpoint.host_str()) else {
        return false;
    };
    if !host.eq_ignore_ascii_case(endpoint_host) {
        return false;
    }
    let port = uri.port_u16().or(match uri.scheme_str() {
        Some("https") => Some(443),
        _ => Some(80),
    });
    port == endpoint.port_or_known_default()
}
