//! Reported URI normalization.

use std::net::SocketAddr;

use http::header::{HeaderMap, HOST};
use http::uri::Authority;
use url::Url;

const X_FORWARDED_HOST: &str = "x-forwarded-host";
const X_FORWARDED_PROTO: &str = "x-forwarded-proto";
const X_FORWARDED_PORT: &str = "x-forwarded-port";

/// Build the URI reported for a request: scheme, canonical host and path,
/// never the query string.
///
/// Host resolution prefers proxy headers, then `Host`, then the URI's own
/// authority, then the peer address. `X-Forwarded-Port` replaces the port of
/// whichever host won. `127.0.0.1` is reported as `localhost` and default
/// ports are omitted.
pub fn reported_uri<B>(request: &http::Request<B>, remote_addr: Option<SocketAddr>) -> String {
    let headers = request.headers();
    let uri = request.uri();
    let path = uri.path();

    let scheme = first_value(headers, X_FORWARDED_PROTO)
        .map(|proto| proto.to_ascii_lowercase())
        .or_else(|| uri.scheme_str().map(str::to_owned))
        .unwrap_or_else(|| "http".to_owned());

    let forwarded_port =
        first_value(headers, X_FORWARDED_PORT).and_then(|port| port.parse::<u16>().ok());

    let authority = first_value(headers, X_FORWARDED_HOST)
        .or_else(|| first_value(headers, HOST.as_str()))
        .or_else(|| uri.authority().map(Authority::to_string))
        .or_else(|| remote_addr.map(|addr| addr.to_string()))
        .unwrap_or_else(|| "localhost".to_owned());

    let Ok(mut url) = Url::parse(&format!("{scheme}://{authority}{path}")) else {
        return path.to_owned();
    };

    if let Some(port) = forwarded_port {
        // Fails only for cannot-be-a-base URLs, which an http(s) URL is not.
        let _ = url.set_port(Some(port));
    }
    if url.host_str() == Some("127.0.0.1") {
        let _ = url.set_host(Some("localhost"));
    }
    url.set_query(None);
    url.set_fragment(None);

    url.to_string()
}

/// First comma-separated entry of the first `name` header.
fn first_value(headers: &HeaderMap, name: &str) -> Option<String> {
    let raw = headers.get(name)?.to_str().ok()?;
    let first = raw.split(',').next()?.trim();
    (!first.is_empty()).then(|| first.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(uri: &str, headers: &[(&str, &str)]) -> http::Request<()> {
        let mut builder = http::Request::builder().uri(uri);
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).unwrap()
    }

    #[test]
    fn test_loopback_becomes_localhost_and_query_is_stripped() {
        let req = request("http://127.0.0.1:3000/api/test?foo=bar", &[]);
        assert_eq!(reported_uri(&req, None), "http://localhost:3000/api/test");
    }

    #[test]
    fn test_host_header_for_origin_form() {
        let req = request("/users/1?x=1", &[("host", "api.example.com:8080")]);
        assert_eq!(reported_uri(&req, None), "http://api.example.com:8080/users/1");
    }

    #[test]
    fn test_forwarded_headers_win() {
        let req = request(
            "/orders",
            &[
                ("host", "10.0.0.5:8080"),
                ("x-forwarded-host", "shop.example.com, proxy.internal"),
                ("x-forwarded-proto", "https"),
                ("x-forwarded-port", "8443"),
            ],
        );
        assert_eq!(reported_uri(&req, None), "https://shop.example.com:8443/orders");
    }

    #[test]
    fn test_default_ports_are_dropped() {
        let req = request("/", &[("host", "example.com:80")]);
        assert_eq!(reported_uri(&req, None), "http://example.com/");

        let req = request(
            "/a",
            &[("x-forwarded-host", "example.com"), ("x-forwarded-proto", "https"), ("x-forwarded-port", "443")],
        );
        assert_eq!(reported_uri(&req, None), "https://example.com/a");
    }

    #[test]
    fn test_forwarded_port_applies_without_forwarded_host() {
        let req = request(
            "/orders",
            &[
                ("host", "internal:8080"),
                ("x-forwarded-proto", "https"),
                ("x-forwarded-port", "443"),
            ],
        );
        assert_eq!(reported_uri(&req, None), "https://internal/orders");

        let req = request("/orders", &[("host", "internal:8080"), ("x-forwarded-port", "9000")]);
        assert_eq!(reported_uri(&req, None), "http://internal:9000/orders");
    }

    #[test]
    fn test_falls_back_to_peer_address() {
        let req = request("/ping", &[]);
        let addr: SocketAddr = "127.0.0.1:4000".parse().unwrap();
        assert_eq!(reported_uri(&req, Some(addr)), "http://localhost:4000/ping");
        assert_eq!(reported_uri(&req, None), "http://localhost/ping");
    }

    #[test]
    fn test_unparseable_host_falls_back_to_path() {
        let req = request("/odd", &[("host", "bad host")]);
        assert_eq!(reported_uri(&req, None), "/odd");
    }
}
