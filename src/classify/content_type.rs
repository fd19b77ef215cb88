//! The ordered content-type rule table.
//!
//! Rules are listed from concrete to abstract. Classification walks them in
//! declaration order and stops at the first rule that produces a schema, so a
//! general rule (bare `string`) can never shadow a specific one (`uuid`).

use std::fmt;

use base64::alphabet;
use base64::engine::{GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use once_cell::sync::Lazy;
use regex::Regex;

use super::extensions::is_known_extension;
use super::{CaptureSite, Scalar};
use crate::schema::{NumericSchema, SchemaType, StringFormat, StringSchema};

static UUID: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}$").unwrap()
});

static DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9]{4}(-[0-9]{2})?(-[0-9]{2})?$").unwrap());

static DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9]{4}(-[0-9]{2})?(-[0-9]{2})?(T[0-9]{2}:[0-9]{2}(:[0-9]{2})?(\.[0-9]+)?([+-][0-9]{2}:[0-9]{2}|Z)?)?$",
    )
    .unwrap()
});

// RFC 1123, as emitted in `Date` and `Last-Modified` headers.
static UTC_DATE_TIME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(Mon|Tue|Wed|Thu|Fri|Sat|Sun),\s[0-3][0-9]\s(Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s[0-3][0-9]{3}\s[0-2][0-9]:[0-5][0-9]:[0-5][0-9]\sGMT$",
    )
    .unwrap()
});

static HEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[0-9a-f]{4,}$").unwrap());

static BASE64: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^([a-z0-9+/]{4})*([a-z0-9+/]{3}=|[a-z0-9+/]{2}==)?$").unwrap()
});

// Must run before `EMAIL`: `git@host:org/repo` is also a valid address.
static GIT_URI: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)git@[\w.-]+\.\w+:([a-z-]+)+/?([a-z-]+)*(\.git)?").unwrap()
});

static URI: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(?:[a-z]+:)?//[^\s/$.?#].[^\s]*$").unwrap());

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)[a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@(?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?",
    )
    .unwrap()
});

// Lenient about trailing bits so partially-padded payloads still decode.
static BASE64_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_allow_trailing_bits(true),
);

/// A semantic content type. Variant order is rule priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ContentType {
    Null,
    Boolean,
    Float,
    Integer,
    Number,
    BooleanString,
    Uuid,
    Date,
    DateTime,
    UtcDateTime,
    Hex,
    Base64,
    GitUri,
    Uri,
    Email,
    Filename,
    String,
    Array,
    Object,
    /// Display-only refinement of `string`, reachable through field names.
    Id,
}

impl ContentType {
    /// Every rule in priority order.
    pub const ALL: [ContentType; 20] = [
        ContentType::Null,
        ContentType::Boolean,
        ContentType::Float,
        ContentType::Integer,
        ContentType::Number,
        ContentType::BooleanString,
        ContentType::Uuid,
        ContentType::Date,
        ContentType::DateTime,
        ContentType::UtcDateTime,
        ContentType::Hex,
        ContentType::Base64,
        ContentType::GitUri,
        ContentType::Uri,
        ContentType::Email,
        ContentType::Filename,
        ContentType::String,
        ContentType::Array,
        ContentType::Object,
        ContentType::Id,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ContentType::Null => "null",
            ContentType::Boolean => "boolean",
            ContentType::Float => "float",
            ContentType::Integer => "integer",
            ContentType::Number => "number",
            ContentType::BooleanString => "boolean-string",
            ContentType::Uuid => "uuid",
            ContentType::Date => "date",
            ContentType::DateTime => "date-time",
            ContentType::UtcDateTime => "utc-date-time",
            ContentType::Hex => "hex",
            ContentType::Base64 => "base64",
            ContentType::GitUri => "git-uri",
            ContentType::Uri => "uri",
            ContentType::Email => "email",
            ContentType::Filename => "filename",
            ContentType::String => "string",
            ContentType::Array => "array",
            ContentType::Object => "object",
            ContentType::Id => "id",
        }
    }

    /// Look a rule up by its name or a known alias, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        if let Some(found) = Self::ALL.iter().find(|ct| ct.name() == lower) {
            return Some(*found);
        }
        match lower.as_str() {
            "int" => Some(ContentType::Integer),
            "datetime" => Some(ContentType::DateTime),
            "url" | "uri-template" => Some(ContentType::Uri),
            "ssh-uri" | "gituri" => Some(ContentType::GitUri),
            "booleanstring" => Some(ContentType::BooleanString),
            _ => None,
        }
    }

    /// JSON type of values this rule describes.
    pub fn base_type(self) -> &'static str {
        match self {
            ContentType::Null => "null",
            ContentType::Boolean => "boolean",
            ContentType::Float | ContentType::Integer | ContentType::Number => "number",
            ContentType::Array => "array",
            ContentType::Object => "object",
            _ => "string",
        }
    }

    /// Whether this is the most generic rule for its JSON type.
    pub fn is_base(self) -> bool {
        matches!(
            self,
            ContentType::Null
                | ContentType::Boolean
                | ContentType::Number
                | ContentType::String
                | ContentType::Array
                | ContentType::Object
        )
    }

    pub fn allowed_in(self, site: CaptureSite) -> bool {
        use CaptureSite::*;
        use ContentType::*;

        match self {
            Integer | Uuid | Date => true,
            Float | Number | BooleanString | DateTime | UtcDateTime | String => {
                matches!(site, Body | Query | Header)
            }
            Hex | Base64 => matches!(site, Body | Url),
            Null | Boolean | GitUri | Uri | Email | Filename | Array | Object => site == Body,
            Id => matches!(site, Body | Query),
        }
    }

    /// The string format this rule tags schemas with, if any.
    pub fn format(self) -> Option<StringFormat> {
        match self {
            ContentType::BooleanString => Some(StringFormat::Boolean),
            ContentType::Uuid => Some(StringFormat::Uuid),
            ContentType::Date => Some(StringFormat::Date),
            ContentType::DateTime => Some(StringFormat::DateTime),
            ContentType::UtcDateTime => Some(StringFormat::UtcDateTime),
            ContentType::Hex => Some(StringFormat::Hex),
            ContentType::Base64 => Some(StringFormat::Base64),
            ContentType::GitUri => Some(StringFormat::GitUri),
            ContentType::Uri => Some(StringFormat::Uri),
            ContentType::Email => Some(StringFormat::Email),
            ContentType::Filename => Some(StringFormat::Filename),
            _ => None,
        }
    }

    /// Apply this rule to a scalar. `None` means the rule does not match.
    ///
    /// `array` and `object` never match a scalar; the schema builder handles
    /// containers itself.
    pub fn schema_from_scalar(self, scalar: Scalar<'_>) -> Option<SchemaType> {
        match (self, scalar) {
            (ContentType::Null, Scalar::Null) => Some(SchemaType::Null),
            (ContentType::Boolean, Scalar::Bool(_)) => Some(SchemaType::Boolean),
            (ContentType::Float, Scalar::Number(n)) if n.is_finite() && !is_integral(n) => {
                Some(SchemaType::Number(float_bounds(n)))
            }
            (ContentType::Integer, Scalar::Number(n)) if is_integral(n) => {
                Some(SchemaType::Integer(magnitude_bounds(n)))
            }
            (ContentType::Number, Scalar::Number(n)) if n.is_finite() => {
                let bounds = if is_integral(n) {
                    magnitude_bounds(n)
                } else {
                    float_bounds(n)
                };
                Some(SchemaType::Number(bounds))
            }
            (ContentType::String, Scalar::Str(s)) => {
                Some(SchemaType::string_of_length(s.chars().count()))
            }
            (rule, Scalar::Str(s)) => {
                let format = rule.format()?;
                rule.matches_text(s).then(|| SchemaType::formatted(format))
            }
            _ => None,
        }
    }

    fn matches_text(self, s: &str) -> bool {
        match self {
            ContentType::BooleanString => s == "true" || s == "false",
            ContentType::Uuid => UUID.is_match(s),
            ContentType::Date => DATE.is_match(s),
            ContentType::DateTime => DATE_TIME.is_match(s),
            ContentType::UtcDateTime => UTC_DATE_TIME.is_match(s),
            ContentType::Hex => HEX.is_match(s),
            ContentType::Base64 => is_ascii_base64(s),
            ContentType::GitUri => GIT_URI.is_match(s),
            ContentType::Uri => URI.is_match(s),
            ContentType::Email => EMAIL.is_match(s),
            ContentType::Filename => s
                .rsplit_once('.')
                .is_some_and(|(_, ext)| is_known_extension(ext)),
            _ => false,
        }
    }

    /// Whether an already-built schema satisfies this rule.
    ///
    /// A schema usually satisfies several rules at once: an email-formatted
    /// string is also a `string`, an integer is also a `number`.
    pub fn matches_schema(self, schema: &SchemaType) -> bool {
        match (self, schema) {
            (ContentType::Null, SchemaType::Null) => true,
            (ContentType::Boolean, SchemaType::Boolean) => true,
            (ContentType::Float, SchemaType::Number(n)) => {
                n.multiple_of.is_some_and(|m| m > 0.0 && m < 1.0)
            }
            (ContentType::Integer, SchemaType::Integer(_)) => true,
            (ContentType::Number, SchemaType::Number(_) | SchemaType::Integer(_)) => true,
            (ContentType::String, SchemaType::String(_)) => true,
            (ContentType::Array, SchemaType::Array(_)) => true,
            (ContentType::Object, SchemaType::Object(_)) => true,
            (rule, SchemaType::String(s)) => rule.format().is_some() && s.format == rule.format(),
            _ => false,
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn is_integral(n: f64) -> bool {
    n.is_finite() && n.fract() == 0.0
}

/// Bounds from a single sample: the value rounded down and up to the
/// power-of-ten bucket matching its integer digit count (42 -> 40..50).
/// A bound that overflows at the edges of `f64` is omitted.
fn magnitude_bounds(n: f64) -> NumericSchema {
    let digits = format!("{}", n.floor()).len() as i32;
    let precision = 10f64.powi(digits - 1);
    NumericSchema {
        minimum: finite((n / precision).floor() * precision),
        maximum: finite((n / precision).ceil() * precision),
        multiple_of: None,
    }
}

fn float_bounds(n: f64) -> NumericSchema {
    let decimals = format!("{n}")
        .split_once('.')
        .map(|(_, fraction)| fraction.len() as i32)
        .unwrap_or(0);
    NumericSchema {
        multiple_of: finite(1.0 / 10f64.powi(decimals)).filter(|m| *m > 0.0),
        ..magnitude_bounds(n)
    }
}

fn finite(value: f64) -> Option<f64> {
    value.is_finite().then_some(value)
}

fn is_ascii_base64(s: &str) -> bool {
    if s.is_empty() || !BASE64.is_match(s) {
        return false;
    }
    BASE64_ENGINE
        .decode(s)
        .map(|bytes| bytes.is_ascii())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric(schema: SchemaType) -> (Option<f64>, Option<f64>, Option<f64>) {
        match schema {
            SchemaType::Integer(n) | SchemaType::Number(n) => (n.minimum, n.maximum, n.multiple_of),
            other => panic!("expected numeric schema, got {other:?}"),
        }
    }

    #[test]
    fn test_priority_order_matches_variant_order() {
        let mut sorted = ContentType::ALL;
        sorted.sort();
        assert_eq!(sorted, ContentType::ALL);
        assert!(ContentType::Date < ContentType::DateTime);
        assert!(ContentType::Uuid < ContentType::Hex);
        assert!(ContentType::GitUri < ContentType::Email);
    }

    #[test]
    fn test_from_name_and_aliases() {
        assert_eq!(ContentType::from_name("uuid"), Some(ContentType::Uuid));
        assert_eq!(ContentType::from_name("INT"), Some(ContentType::Integer));
        assert_eq!(ContentType::from_name("datetime"), Some(ContentType::DateTime));
        assert_eq!(ContentType::from_name("url"), Some(ContentType::Uri));
        assert_eq!(ContentType::from_name("uri-template"), Some(ContentType::Uri));
        assert_eq!(ContentType::from_name("ssh-uri"), Some(ContentType::GitUri));
        assert_eq!(ContentType::from_name("phone"), None);
    }

    #[test]
    fn test_integer_magnitude_bounds() {
        let schema = ContentType::Integer.schema_from_scalar(Scalar::Number(42.0)).unwrap();
        assert_eq!(numeric(schema), (Some(40.0), Some(50.0), None));

        let schema = ContentType::Integer.schema_from_scalar(Scalar::Number(30.0)).unwrap();
        assert_eq!(numeric(schema), (Some(30.0), Some(30.0), None));

        let schema = ContentType::Integer.schema_from_scalar(Scalar::Number(0.0)).unwrap();
        assert_eq!(numeric(schema), (Some(0.0), Some(0.0), None));

        assert!(ContentType::Integer.schema_from_scalar(Scalar::Number(1.5)).is_none());
    }

    #[test]
    fn test_float_bounds_and_granularity() {
        let schema = ContentType::Float.schema_from_scalar(Scalar::Number(3.14)).unwrap();
        assert_eq!(numeric(schema), (Some(3.0), Some(4.0), Some(0.01)));

        let schema = ContentType::Float.schema_from_scalar(Scalar::Number(30.5)).unwrap();
        assert_eq!(numeric(schema), (Some(30.0), Some(40.0), Some(0.1)));

        assert!(ContentType::Float.schema_from_scalar(Scalar::Number(3.0)).is_none());
    }

    #[test]
    fn test_bounds_at_f64_extremes_are_omitted() {
        let huge = ContentType::Integer.schema_from_scalar(Scalar::Number(1.7e308)).unwrap();
        let (minimum, maximum, _) = numeric(huge.clone());
        assert!(minimum.is_some_and(f64::is_finite));
        assert_eq!(maximum, None);
        let json = serde_json::to_value(&huge).unwrap();
        assert!(json.get("maximum").is_none());

        let tiny = ContentType::Float.schema_from_scalar(Scalar::Number(1e-320)).unwrap();
        assert_eq!(numeric(tiny.clone()), (Some(0.0), Some(1.0), None));
        let json = serde_json::to_value(&tiny).unwrap();
        assert!(json.get("multipleOf").is_none());
    }

    #[test]
    fn test_string_formats() {
        let cases = [
            (ContentType::Uuid, "550e8400-e29b-41d4-a716-446655440000", true),
            (ContentType::Uuid, "550e8400e29b41d4a716446655440000", false),
            (ContentType::Date, "2024-01-15", true),
            (ContentType::Date, "2024-01-15T10:00:00Z", false),
            (ContentType::DateTime, "2024-01-15T10:00:00.123+02:00", true),
            (ContentType::UtcDateTime, "Tue, 15 Nov 1994 08:12:31 GMT", true),
            (ContentType::Hex, "deadBEEF", true),
            (ContentType::Hex, "abc", false),
            (ContentType::Base64, "aGVsbG8gd29ybGQ=", true),
            (ContentType::Base64, "", false),
            (ContentType::GitUri, "git@github.com:org/repo.git", true),
            (ContentType::Uri, "https://example.com/a?b=c", true),
            (ContentType::Uri, "example.com", false),
            (ContentType::Email, "jane.doe@example.com", true),
            (ContentType::Filename, "report.PDF", true),
            (ContentType::Filename, "report.unknownext", false),
            (ContentType::BooleanString, "true", true),
            (ContentType::BooleanString, "True", false),
        ];
        for (rule, input, expected) in cases {
            assert_eq!(
                rule.schema_from_scalar(Scalar::Str(input)).is_some(),
                expected,
                "{rule} on {input:?}"
            );
        }
    }

    #[test]
    fn test_base64_must_decode_to_ascii() {
        // "test" is valid base64 alphabet but decodes to non-ASCII bytes
        assert!(!is_ascii_base64("test"));
        assert!(is_ascii_base64("dGVzdA=="));
    }

    #[test]
    fn test_formatted_strings_carry_no_lengths() {
        let schema = ContentType::Email
            .schema_from_scalar(Scalar::Str("a@b.io"))
            .unwrap();
        assert_eq!(schema, SchemaType::formatted(StringFormat::Email));
    }

    #[test]
    fn test_site_allowances() {
        assert!(ContentType::Integer.allowed_in(CaptureSite::Url));
        assert!(!ContentType::Float.allowed_in(CaptureSite::Url));
        assert!(ContentType::Hex.allowed_in(CaptureSite::Url));
        assert!(!ContentType::Hex.allowed_in(CaptureSite::Header));
        assert!(!ContentType::Email.allowed_in(CaptureSite::Query));
        assert!(ContentType::String.allowed_in(CaptureSite::Header));
        assert!(!ContentType::Object.allowed_in(CaptureSite::Query));
    }

    #[test]
    fn test_schema_matching_is_hierarchical() {
        let email = SchemaType::formatted(StringFormat::Email);
        assert!(ContentType::Email.matches_schema(&email));
        assert!(ContentType::String.matches_schema(&email));
        assert!(!ContentType::Uri.matches_schema(&email));

        let int = SchemaType::Integer(NumericSchema::default());
        assert!(ContentType::Integer.matches_schema(&int));
        assert!(ContentType::Number.matches_schema(&int));
        assert!(!ContentType::Float.matches_schema(&int));

        let bare = SchemaType::string_of_length(3);
        assert!(!ContentType::Id.matches_schema(&bare));
    }
}
