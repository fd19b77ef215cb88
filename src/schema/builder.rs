//! Value-to-schema construction.

use serde_json::Value;

use super::merge::merge_types;
use super::{ArraySchema, ObjectSchema, Schema, SchemaType};
use crate::classify::{schema_for, CaptureSite, ContentType, Scalar};

/// Infer the schema of one observed value.
///
/// Returns `None` when nothing matches at `site` (for example a JSON `null`
/// inside a header), which callers treat as "omit this entry".
pub fn schema_from_value(value: &Value, site: Option<CaptureSite>) -> Option<SchemaType> {
    build(value, site, None)
}

/// Like [`schema_from_value`], with the name the value was found under so
/// field-name hints can refine bare strings.
pub fn schema_from_field(
    value: &Value,
    site: Option<CaptureSite>,
    field: &str,
) -> Option<SchemaType> {
    build(value, site, Some(field))
}

fn build(value: &Value, site: Option<CaptureSite>, field: Option<&str>) -> Option<SchemaType> {
    let permits = |rule: ContentType| site.map_or(true, |s| rule.allowed_in(s));

    match value {
        Value::Array(items) => {
            if !permits(ContentType::Array) {
                return None;
            }
            let element_schemas = items.iter().filter_map(|item| build(item, site, None));
            let merged = merge_types(element_schemas);
            Some(SchemaType::Array(ArraySchema {
                items: Schema::from_members(merged).map(Box::new),
                min_items: Some(items.len()),
                max_items: Some(items.len()),
            }))
        }
        Value::Object(map) => {
            if !permits(ContentType::Object) {
                return None;
            }
            let mut object = ObjectSchema::default();
            for (key, value) in map {
                if let Some(schema) = build(value, site, Some(key)) {
                    object.required.insert(key.clone());
                    object.properties.insert(key.clone(), schema.into());
                }
            }
            Some(SchemaType::Object(object))
        }
        scalar => Scalar::from_value(scalar).and_then(|s| schema_for(s, site, field)),
    }
}
