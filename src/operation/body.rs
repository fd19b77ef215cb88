//! Body media-type handling.

use bytes::Bytes;
use http::header::{HeaderMap, CONTENT_TYPE};
use http::StatusCode;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use super::BodySchema;
use crate::classify::CaptureSite;
use crate::schema::schema_from_value;

// application/json, application/problem+json, application/vnd.api+json, ...
static JSON_MEDIA: Lazy<Regex> = Lazy::new(|| Regex::new(r"application/(?:.*\+)?json").unwrap());
static XML_MEDIA: Lazy<Regex> = Lazy::new(|| Regex::new(r"application/(?:.*\+)?xml").unwrap());

const JSON: &str = "application/json";

/// Lower-cased media type without parameters, e.g. `application/json`.
pub fn media_type(headers: &HeaderMap) -> Option<String> {
    let raw = headers.get(CONTENT_TYPE)?.to_str().ok()?;
    let media = raw.split(';').next()?.trim().to_ascii_lowercase();
    (!media.is_empty()).then_some(media)
}

/// Whether a response with this status can carry a body at all.
pub fn status_allows_body(status: StatusCode) -> bool {
    !(status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED)
}

/// Describe a buffered body.
///
/// JSON bodies get a structural schema; XML and text bodies only their
/// media type. A body without `Content-Type` is tried as JSON. Anything
/// else, and JSON that does not parse, is omitted.
pub fn body_schema(headers: &HeaderMap, body: &Bytes) -> Option<BodySchema> {
    if body.is_empty() {
        return None;
    }

    let Some(media) = media_type(headers) else {
        return serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|value| schema_from_value(&value, Some(CaptureSite::Body)))
            .map(|schema| BodySchema::structured(JSON, schema.into()));
    };

    if JSON_MEDIA.is_match(&media) {
        return match serde_json::from_slice::<Value>(body) {
            Ok(value) => schema_from_value(&value, Some(CaptureSite::Body))
                .map(|schema| BodySchema::structured(media, schema.into())),
            Err(e) => {
                tracing::debug!(media_type = %media, error = %e, "Ignoring body that is not valid JSON");
                None
            }
        };
    }

    if XML_MEDIA.is_match(&media) || media.starts_with("text/") {
        return Some(BodySchema::media_only(media));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;
    use serde_json::json;

    fn headers(content_type: Option<&str>) -> HeaderMap {
        let mut map = HeaderMap::new();
        if let Some(ct) = content_type {
            map.insert(CONTENT_TYPE, HeaderValue::from_str(ct).unwrap());
        }
        map
    }

    #[test]
    fn test_json_body_is_schemad() {
        let body = Bytes::from_static(br#"{"hello":"world"}"#);
        let schema = body_schema(&headers(Some("application/json; charset=utf-8")), &body).unwrap();
        assert_eq!(
            serde_json::to_value(&schema).unwrap(),
            json!({
                "type": "string",
                "contentMediaType": "application/json",
                "contentSchema": {
                    "type": "object",
                    "properties": {"hello": {"type": "string", "minLength": 5, "maxLength": 5}},
                    "required": ["hello"]
                }
            })
        );
    }

    #[test]
    fn test_vendor_json_suffix() {
        let body = Bytes::from_static(b"[1]");
        let schema = body_schema(&headers(Some("Application/Problem+JSON")), &body).unwrap();
        assert_eq!(schema.content_media_type, "application/problem+json");
        assert!(schema.content_schema.is_some());
    }

    #[test]
    fn test_invalid_json_is_absent() {
        let body = Bytes::from_static(b"{not json");
        assert!(body_schema(&headers(Some("application/json")), &body).is_none());
    }

    #[test]
    fn test_text_and_xml_carry_media_type_only() {
        let body = Bytes::from_static(b"<a/>");
        let schema = body_schema(&headers(Some("application/atom+xml")), &body).unwrap();
        assert_eq!(schema, BodySchema::media_only("application/atom+xml"));

        let schema = body_schema(&headers(Some("text/plain")), &Bytes::from_static(b"hi")).unwrap();
        assert_eq!(schema, BodySchema::media_only("text/plain"));
    }

    #[test]
    fn test_other_media_types_are_omitted() {
        let body = Bytes::from_static(b"\x89PNG");
        assert!(body_schema(&headers(Some("image/png")), &body).is_none());
    }

    #[test]
    fn test_missing_content_type_tries_json() {
        let body = Bytes::from_static(br#"{"ok":true}"#);
        let schema = body_schema(&headers(None), &body).unwrap();
        assert_eq!(schema.content_media_type, "application/json");

        assert!(body_schema(&headers(None), &Bytes::from_static(b"plain words")).is_none());
    }

    #[test]
    fn test_empty_body_is_absent() {
        assert!(body_schema(&headers(Some("application/json")), &Bytes::new()).is_none());
    }

    #[test]
    fn test_bodyless_statuses() {
        assert!(!status_allows_body(StatusCode::NO_CONTENT));
        assert!(!status_allows_body(StatusCode::NOT_MODIFIED));
        assert!(!status_allows_body(StatusCode::CONTINUE));
        assert!(status_allows_body(StatusCode::OK));
    }
}
