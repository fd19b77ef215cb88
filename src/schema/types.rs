//! Structural schema types.
//!
//! The serialized form follows the JSON Schema vocabulary (`type`, `minimum`,
//! `minLength`, `items`, `properties`, `anyOf`, ...). Object properties live in
//! a `BTreeMap` and `required` in a `BTreeSet`, so serializing a schema always
//! yields the same bytes regardless of the order fields were observed in.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize, Serializer};

/// One structural shape observed at a position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SchemaType {
    Null,
    Boolean,
    Integer(NumericSchema),
    Number(NumericSchema),
    String(StringSchema),
    Array(ArraySchema),
    Object(ObjectSchema),
}

/// Bounds shared by `integer` and `number` schemas.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NumericSchema {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_bound"
    )]
    pub minimum: Option<f64>,

    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_bound"
    )]
    pub maximum: Option<f64>,

    /// Smallest observed decimal granularity (`0.01` for `3.14`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub multiple_of: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StringSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<StringFormat>,
}

/// Closed set of string refinements the classifier can detect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StringFormat {
    Boolean,
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
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArraySchema {
    /// Absent when no element was ever observed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ObjectSchema {
    #[serde(default)]
    pub properties: BTreeMap<String, Schema>,

    /// Always a subset of the keys of `properties`.
    #[serde(default)]
    pub required: BTreeSet<String>,
}

/// A schema position: either one shape or a union of shapes with distinct
/// base types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Schema {
    AnyOf {
        #[serde(rename = "anyOf")]
        any_of: Vec<SchemaType>,
    },
    Single(SchemaType),
}

impl SchemaType {
    /// The JSON Schema `type` keyword for this shape.
    pub fn type_name(&self) -> &'static str {
        match self {
            SchemaType::Null => "null",
            SchemaType::Boolean => "boolean",
            SchemaType::Integer(_) => "integer",
            SchemaType::Number(_) => "number",
            SchemaType::String(_) => "string",
            SchemaType::Array(_) => "array",
            SchemaType::Object(_) => "object",
        }
    }

    /// A string schema carrying only a format tag.
    pub fn formatted(format: StringFormat) -> Self {
        SchemaType::String(StringSchema {
            format: Some(format),
            ..Default::default()
        })
    }

    /// A bare string schema pinned to one length.
    pub fn string_of_length(length: usize) -> Self {
        SchemaType::String(StringSchema {
            min_length: Some(length),
            max_length: Some(length),
            format: None,
        })
    }

    pub fn format(&self) -> Option<StringFormat> {
        match self {
            SchemaType::String(s) => s.format,
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectSchema> {
        match self {
            SchemaType::Object(o) => Some(o),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArraySchema> {
        match self {
            SchemaType::Array(a) => Some(a),
            _ => None,
        }
    }
}

impl Schema {
    /// Collapse a list of union members. Returns `None` for an empty list.
    pub fn from_members(mut members: Vec<SchemaType>) -> Option<Self> {
        match members.len() {
            0 => None,
            1 => members.pop().map(Schema::Single),
            _ => Some(Schema::AnyOf { any_of: members }),
        }
    }

    pub fn members(&self) -> &[SchemaType] {
        match self {
            Schema::Single(schema) => std::slice::from_ref(schema),
            Schema::AnyOf { any_of } => any_of,
        }
    }

    pub fn into_members(self) -> Vec<SchemaType> {
        match self {
            Schema::Single(schema) => vec![schema],
            Schema::AnyOf { any_of } => any_of,
        }
    }

    pub fn is_union(&self) -> bool {
        matches!(self, Schema::AnyOf { any_of } if any_of.len() > 1)
    }

    /// The single shape, when this position is not a union.
    pub fn as_single(&self) -> Option<&SchemaType> {
        match self {
            Schema::Single(schema) => Some(schema),
            Schema::AnyOf { any_of } if any_of.len() == 1 => any_of.first(),
            Schema::AnyOf { .. } => None,
        }
    }
}

impl From<SchemaType> for Schema {
    fn from(schema: SchemaType) -> Self {
        Schema::Single(schema)
    }
}

impl StringFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            StringFormat::Boolean => "boolean",
            StringFormat::Uuid => "uuid",
            StringFormat::Date => "date",
            StringFormat::DateTime => "date-time",
            StringFormat::UtcDateTime => "utc-date-time",
            StringFormat::Hex => "hex",
            StringFormat::Base64 => "base64",
            StringFormat::GitUri => "git-uri",
            StringFormat::Uri => "uri",
            StringFormat::Email => "email",
            StringFormat::Filename => "filename",
        }
    }
}

impl fmt::Display for StringFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Integral bounds go out as JSON integers (`40`, not `40.0`).
fn serialize_bound<S: Serializer>(value: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(v) if v.fract() == 0.0 && v.abs() < 9.007_199_254_740_992e15 => {
            serializer.serialize_i64(*v as i64)
        }
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}
