//! Content-type classification of scalar values.
//!
//! # Responsibilities
//! - Project JSON values onto a closed [`Scalar`] model
//! - Pick the most specific matching [`ContentType`] for a scalar
//! - Refine generic strings from field-name hints
//!
//! # Design Decisions
//! - Pure functions only; no state, no I/O
//! - Containers never reach this module (`Scalar::from_value` rejects them)

mod content_type;
mod extensions;
mod field_name;

pub use content_type::ContentType;
pub use extensions::is_known_extension;
pub use field_name::{hint as field_name_hint, tokenize};

use serde_json::Value;

use crate::schema::SchemaType;

/// Where a value was captured. Rules only fire at the sites they allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CaptureSite {
    Body,
    Query,
    Header,
    Url,
}

/// A classifiable leaf value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Null,
    Bool(bool),
    Number(f64),
    Str(&'a str),
}

impl<'a> Scalar<'a> {
    /// Returns `None` for arrays and objects.
    pub fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Null => Some(Scalar::Null),
            Value::Bool(b) => Some(Scalar::Bool(*b)),
            Value::Number(n) => n.as_f64().map(Scalar::Number),
            Value::String(s) => Some(Scalar::Str(s)),
            Value::Array(_) | Value::Object(_) => None,
        }
    }
}

/// The winning rule and the schema it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub content_type: ContentType,
    pub schema: SchemaType,
}

/// Classify `scalar` as captured at `site` (any site when `None`).
///
/// `field` is the property or parameter name the value was found under. It
/// is only consulted when the value matched nothing more specific than
/// `string`, and never overrides a format rule that already matched.
pub fn classify(
    scalar: Scalar<'_>,
    site: Option<CaptureSite>,
    field: Option<&str>,
) -> Option<Classification> {
    let allowed = |rule: &ContentType| site.map_or(true, |s| rule.allowed_in(s));

    let (content_type, schema) = ContentType::ALL
        .iter()
        .filter(|rule| allowed(*rule))
        .find_map(|rule| rule.schema_from_scalar(scalar).map(|schema| (*rule, schema)))?;

    if content_type == ContentType::String {
        if let Some(upgrade) = field.and_then(field_name_hint).filter(|rule| allowed(rule)) {
            let schema = match upgrade.format() {
                Some(format) => SchemaType::formatted(format),
                None => schema,
            };
            return Some(Classification {
                content_type: upgrade,
                schema,
            });
        }
    }

    Some(Classification {
        content_type,
        schema,
    })
}

/// Shorthand for the schema half of [`classify`].
pub fn schema_for(
    scalar: Scalar<'_>,
    site: Option<CaptureSite>,
    field: Option<&str>,
) -> Option<SchemaType> {
    classify(scalar, site, field).map(|c| c.schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::StringFormat;

    fn body(value: &str) -> ContentType {
        classify(Scalar::Str(value), Some(CaptureSite::Body), None)
            .unwrap()
            .content_type
    }

    #[test]
    fn test_uuid_never_hex_or_string() {
        for value in [
            "550e8400-e29b-41d4-a716-446655440000",
            "AAAAAAAA-BBBB-CCCC-DDDD-EEEEEEEEEEEE",
        ] {
            assert_eq!(body(value), ContentType::Uuid);
            let query = classify(Scalar::Str(value), Some(CaptureSite::Query), None).unwrap();
            assert_eq!(query.content_type, ContentType::Uuid);
        }
    }

    #[test]
    fn test_boolean_literal_strings() {
        for site in [CaptureSite::Body, CaptureSite::Query, CaptureSite::Header] {
            let c = classify(Scalar::Str("false"), Some(site), None).unwrap();
            assert_eq!(c.schema, SchemaType::formatted(StringFormat::Boolean));
        }
    }

    #[test]
    fn test_body_priorities() {
        assert_eq!(body("2024-01-15"), ContentType::Date);
        assert_eq!(body("2024-01-15T08:00:00Z"), ContentType::DateTime);
        assert_eq!(body("cafebabe"), ContentType::Hex);
        assert_eq!(body("git@github.com:org/repo.git"), ContentType::GitUri);
        assert_eq!(body("https://example.com"), ContentType::Uri);
        assert_eq!(body("someone@example.com"), ContentType::Email);
        assert_eq!(body("photo.png"), ContentType::Filename);
        assert_eq!(body("hello"), ContentType::String);
    }

    #[test]
    fn test_scalars_by_json_type() {
        let c = classify(Scalar::Null, None, None).unwrap();
        assert_eq!(c.schema, SchemaType::Null);
        let c = classify(Scalar::Bool(true), None, None).unwrap();
        assert_eq!(c.schema, SchemaType::Boolean);
        let c = classify(Scalar::Number(7.0), None, None).unwrap();
        assert_eq!(c.content_type, ContentType::Integer);
        let c = classify(Scalar::Number(7.25), None, None).unwrap();
        assert_eq!(c.content_type, ContentType::Float);
    }

    #[test]
    fn test_headers_skip_body_only_rules() {
        let c = classify(
            Scalar::Str("https://example.com"),
            Some(CaptureSite::Header),
            None,
        )
        .unwrap();
        assert_eq!(c.content_type, ContentType::String);
        assert!(classify(Scalar::Null, Some(CaptureSite::Header), None).is_none());
    }

    #[test]
    fn test_field_name_upgrades_only_bare_strings() {
        let c = classify(Scalar::Str("yesterday"), Some(CaptureSite::Body), Some("created_at")).unwrap();
        assert_eq!(c.content_type, ContentType::DateTime);
        assert_eq!(c.schema, SchemaType::formatted(StringFormat::DateTime));

        let c = classify(Scalar::Str("not a link"), Some(CaptureSite::Body), Some("avatarUrl")).unwrap();
        assert_eq!(c.content_type, ContentType::Uri);

        // a value that already matched a format keeps it
        let c = classify(Scalar::Str("cafebabe"), Some(CaptureSite::Body), Some("homepage_url")).unwrap();
        assert_eq!(c.content_type, ContentType::Hex);
    }

    #[test]
    fn test_email_named_field_needs_an_address() {
        let c = classify(Scalar::Str("not set"), Some(CaptureSite::Body), Some("email")).unwrap();
        assert_eq!(c.content_type, ContentType::String);
        assert_eq!(c.schema, SchemaType::string_of_length(7));

        let c = classify(Scalar::Str("ops@example.com"), Some(CaptureSite::Body), Some("contactEmail")).unwrap();
        assert_eq!(c.content_type, ContentType::Email);
    }

    #[test]
    fn test_id_hint_is_display_only() {
        let c = classify(Scalar::Str("abc_123"), Some(CaptureSite::Body), Some("user_id")).unwrap();
        assert_eq!(c.content_type, ContentType::Id);
        assert_eq!(c.schema, SchemaType::string_of_length(7));
    }

    #[test]
    fn test_hint_respects_site() {
        // uri is a body-only rule, so the hint does not apply to query params
        let c = classify(Scalar::Str("elsewhere"), Some(CaptureSite::Query), Some("redirect_url")).unwrap();
        assert_eq!(c.content_type, ContentType::String);
    }

    #[test]
    fn test_scalar_projection() {
        let value = serde_json::json!({"a": 1});
        assert!(Scalar::from_value(&value).is_none());
        let value = serde_json::json!(["x"]);
        assert!(Scalar::from_value(&value).is_none());
        let value = serde_json::json!(12);
        assert_eq!(Scalar::from_value(&value), Some(Scalar::Number(12.0)));
    }
}
