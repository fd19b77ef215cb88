//! Report delivery.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::Serialize;
use thiserror::Error;
use url::Url;

use crate::operation::{Report, ReporterInfo};

pub const RUNTIME_HEADER: &str = "x-introspector-runtime";
pub const VERSION_HEADER: &str = "x-introspector-version";
pub const API_KEY_HEADER: &str = "x-api-key";

/// Errors from a single delivery attempt. All of them are recoverable: the
/// reporter keeps the batch and retries on the next flush.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("collector answered {status}: {body}")]
    Status { status: u16, body: String },

    #[error("delivery timed out after {0:?}")]
    Timeout(Duration),

    #[error("failed to encode report: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("invalid api key header value")]
    InvalidApiKey,
}

/// Destination for reports.
#[async_trait]
pub trait ReportSink: Send + Sync {
    /// Deliver one batch. `Ok` means the collector accepted it.
    async fn send(&self, report: &Report) -> Result<(), DeliveryError>;

    /// Announce that this reporter is alive.
    async fn ping(&self, reporter: &ReporterInfo) -> Result<(), DeliveryError>;
}

#[derive(Serialize)]
struct Ping<'a> {
    reporter: &'a ReporterInfo,
}

/// POSTs reports as JSON to a collector endpoint.
pub struct HttpSink {
    client: reqwest::Client,
    endpoint: Url,
    ping_url: Url,
}

impl HttpSink {
    pub fn new(endpoint: Url, api_key: &str, timeout: Duration) -> Result<Self, DeliveryError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(RUNTIME_HEADER, HeaderValue::from_static("rust"));
        headers.insert(
            VERSION_HEADER,
            HeaderValue::from_static(env!("CARGO_PKG_VERSION")),
        );
        let mut key = HeaderValue::from_str(api_key).map_err(|_| DeliveryError::InvalidApiKey)?;
        key.set_sensitive(true);
        headers.insert(API_KEY_HEADER, key);

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        let ping_url = ping_url(&endpoint);
        Ok(Self {
            client,
            endpoint,
            ping_url,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    async fn post<T: Serialize + ?Sized>(&self, url: &Url, payload: &T) -> Result<(), DeliveryError> {
        let body = serde_json::to_vec(payload)?;
        let response = self.client.post(url.clone()).body(body).send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(DeliveryError::Status {
            status: status.as_u16(),
            body,
        })
    }
}

#[async_trait]
impl ReportSink for HttpSink {
    async fn send(&self, report: &Report) -> Result<(), DeliveryError> {
        self.post(&self.endpoint, report).await
    }

    async fn ping(&self, reporter: &ReporterInfo) -> Result<(), DeliveryError> {
        self.post(&self.ping_url, &Ping { reporter }).await
    }
}

/// `<endpoint>/ping`, keeping any path the endpoint already has.
pub fn ping_url(endpoint: &Url) -> Url {
    let mut base = endpoint.clone();
    if !base.path().ends_with('/') {
        let path = format!("{}/", base.path());
        base.set_path(&path);
    }
    base.join("ping").unwrap_or_else(|_| endpoint.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ping_url_appends_segment() {
        let url = Url::parse("https://collector.example.com/v1/reports").unwrap();
        assert_eq!(ping_url(&url).as_str(), "https://collector.example.com/v1/reports/ping");

        let url = Url::parse("http://localhost:9000/").unwrap();
        assert_eq!(ping_url(&url).as_str(), "http://localhost:9000/ping");
    }

    #[test]
    fn test_rejects_unprintable_api_key() {
        let url = Url::parse("http://localhost:9000/reports").unwrap();
        let result = HttpSink::new(url, "bad\nkey", Duration::from_secs(1));
        assert!(matches!(result, Err(DeliveryError::InvalidApiKey)));
    }

    #[test]
    fn test_error_messages() {
        let err = DeliveryError::Status {
            status: 503,
            body: "busy".into(),
        };
        assert_eq!(err.to_string(), "collector answered 503: busy");
        assert_eq!(
            DeliveryError::Timeout(Duration::from_secs(2)).to_string(),
            "delivery timed out after 2s"
        );
    }
}
