//! Exchange-to-operation assembly.

use std::collections::BTreeMap;

use http::HeaderMap;

use super::body::{body_schema, status_allows_body};
use super::uri::reported_uri;
use super::{Exchange, Operation, RequestShape, ResponseShape};
use crate::classify::{schema_for, CaptureSite, Scalar};
use crate::schema::{merge_types, Schema, SchemaType};

/// Reduce a captured exchange to an [`Operation`].
///
/// Never fails: unreadable header values, unparseable bodies and odd hosts
/// degrade to absent entries rather than aborting the whole record.
pub fn assemble(exchange: &Exchange) -> Operation {
    let request = &exchange.request;
    let response = &exchange.response;

    let response_body = if status_allows_body(response.status()) {
        body_schema(response.headers(), response.body())
    } else {
        None
    };

    Operation {
        direction: exchange.direction,
        request: RequestShape {
            method: request.method().as_str().to_owned(),
            uri: reported_uri(request, exchange.remote_addr),
            headers: header_schemas(request.headers()),
            query: query_schemas(request.uri().query()),
            body: body_schema(request.headers(), request.body()),
        },
        response: ResponseShape {
            status_code: response.status().as_u16(),
            headers: header_schemas(response.headers()),
            body: response_body,
        },
    }
}

/// One schema per header name. Repeated headers merge every value.
pub fn header_schemas(headers: &HeaderMap) -> BTreeMap<String, Schema> {
    let mut observed: BTreeMap<String, Vec<SchemaType>> = BTreeMap::new();
    for (name, value) in headers {
        let Ok(text) = value.to_str() else {
            continue;
        };
        if let Some(schema) = schema_for(Scalar::Str(text), Some(CaptureSite::Header), None) {
            observed.entry(name.as_str().to_owned()).or_default().push(schema);
        }
    }
    collapse(observed)
}

/// One schema per query parameter. Repeated parameters merge every value.
pub fn query_schemas(query: Option<&str>) -> BTreeMap<String, Schema> {
    let mut observed: BTreeMap<String, Vec<SchemaType>> = BTreeMap::new();
    for (name, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        if let Some(schema) = schema_for(Scalar::Str(&value), Some(CaptureSite::Query), Some(&*name)) {
            observed.entry(name.into_owned()).or_default().push(schema);
        }
    }
    collapse(observed)
}

fn collapse(observed: BTreeMap<String, Vec<SchemaType>>) -> BTreeMap<String, Schema> {
    observed
        .into_iter()
        .filter_map(|(name, schemas)| Schema::from_members(merge_types(schemas)).map(|s| (name, s)))
        .collect()
}
