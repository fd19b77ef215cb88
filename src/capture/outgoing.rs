//! Outgoing capture for `reqwest`.

use bytes::Bytes;
use reqwest::{Client, Request, RequestBuilder, Response};

use super::Introspector;
use crate::operation::{Direction, Exchange};

/// A `reqwest::Client` whose requests are reported as outgoing operations.
///
/// Response bodies with a known length within `max_body_bytes` are buffered
/// and handed back as a rebuilt `Response`; the rebuilt response no longer
/// knows its final URL after redirects.
#[derive(Clone)]
pub struct ObservedClient {
    client: Client,
    introspector: Introspector,
}

impl ObservedClient {
    pub fn new(client: Client, introspector: Introspector) -> Self {
        Self {
            client,
            introspector,
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    pub fn get(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.client.get(url)
    }

    pub fn post(&self, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.client.post(url)
    }

    pub fn request(&self, method: reqwest::Method, url: impl reqwest::IntoUrl) -> RequestBuilder {
        self.client.request(method, url)
    }

    /// Build and execute a request made with this client's builders.
    pub async fn send(&self, builder: RequestBuilder) -> Result<Response, reqwest::Error> {
        self.execute(builder.build()?).await
    }

    pub async fn execute(&self, request: Request) -> Result<Response, reqwest::Error> {
        let uri = request.url().as_str().parse::<http::Uri>().ok();
        let Some(uri) = uri.filter(|uri| self.introspector.admits(uri)) else {
            return self.client.execute(request).await;
        };

        let mut snapshot = http::Request::new(request_body(&request));
        *snapshot.method_mut() = request.method().clone();
        *snapshot.uri_mut() = uri;
        *snapshot.headers_mut() = request.headers().clone();

        let response = self.client.execute(request).await?;

        let status = response.status();
        let version = response.version();
        let headers = response.headers().clone();
        let limit = self.introspector.max_body_bytes() as u64;

        let (response, body) = match response.content_length() {
            Some(len) if len <= limit => {
                let body = response.bytes().await?;
                let mut rebuilt = http::Response::new(body.clone());
                *rebuilt.status_mut() = status;
                *rebuilt.version_mut() = version;
                *rebuilt.headers_mut() = headers.clone();
                (Response::from(rebuilt), body)
            }
            _ => (response, Bytes::new()),
        };

        let mut observed = http::Response::new(body);
        *observed.status_mut() = status;
        *observed.headers_mut() = headers;

        let exchange = Exchange::new(snapshot, observed, Direction::Outgoing);
        let introspector = self.introspector.clone();
        tokio::spawn(async move {
            introspector.record(exchange).await;
        });

        Ok(response)
    }
}

/// In-memory request bodies only; streams are not captured.
fn request_body(request: &Request) -> Bytes {
    request
        .body()
        .and_then(|body| body.as_bytes())
        .map(Bytes::copy_from_slice)
        .unwrap_or_default()
}
