//! Operation records and the report envelope.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::schema::Schema;

/// Which side of the service initiated the exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// A request served by this process.
    Incoming,
    /// A request this process made to someone else.
    Outgoing,
}

impl Direction {
    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Incoming => "incoming",
            Direction::Outgoing => "outgoing",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One observed exchange reduced to its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub direction: Direction,
    pub request: RequestShape,
    pub response: ResponseShape,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestShape {
    pub method: String,
    /// Absolute URI without query string or fragment.
    pub uri: String,
    pub headers: BTreeMap<String, Schema>,
    pub query: BTreeMap<String, Schema>,
    pub body: Option<BodySchema>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseShape {
    pub status_code: u16,
    pub headers: BTreeMap<String, Schema>,
    pub body: Option<BodySchema>,
}

/// Body description. Bodies travel as strings on the wire, so the outer
/// type is always `string`; structure lives in `contentSchema`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodySchema {
    #[serde(rename = "type", default)]
    pub encoding: BodyEncoding,
    pub content_media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_schema: Option<Schema>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyEncoding {
    #[default]
    String,
}

impl BodySchema {
    pub fn media_only(media_type: impl Into<String>) -> Self {
        Self {
            encoding: BodyEncoding::String,
            content_media_type: media_type.into(),
            content_schema: None,
        }
    }

    pub fn structured(media_type: impl Into<String>, schema: Schema) -> Self {
        Self {
            encoding: BodyEncoding::String,
            content_media_type: media_type.into(),
            content_schema: Some(schema),
        }
    }
}

/// Identifies the process that produced a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReporterInfo {
    pub environment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_name: Option<String>,
}

/// The payload POSTed to the collector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub reporter: ReporterInfo,
    pub operations: Vec<Operation>,
}
