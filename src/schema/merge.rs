//! Schema merging.
//!
//! Merging takes every schema observed for one position and produces the
//! smallest union that still describes all of them. Each input member is
//! matched against the content-type rules; rules shared by more members win,
//! ties go to the more specific rule. Every member is then handed to the
//! winning rule it satisfies, and each rule folds its members with its own
//! merge function.

use std::collections::{BTreeMap, BTreeSet};

use super::{ArraySchema, NumericSchema, ObjectSchema, Schema, SchemaType, StringSchema};
use crate::classify::ContentType;

/// Merge schema members into a minimal list of alternatives, ordered by
/// rule priority.
pub fn merge_types<I>(schemas: I) -> Vec<SchemaType>
where
    I: IntoIterator<Item = SchemaType>,
{
    let members: Vec<(SchemaType, Vec<ContentType>)> = schemas
        .into_iter()
        .map(|schema| {
            let rules = ContentType::ALL
                .into_iter()
                .filter(|rule| rule.matches_schema(&schema))
                .collect();
            (schema, rules)
        })
        .collect();

    let mut counts: BTreeMap<ContentType, usize> = BTreeMap::new();
    for (_, rules) in &members {
        for rule in rules {
            *counts.entry(*rule).or_default() += 1;
        }
    }

    // BTreeMap iterates in rule order; a stable sort keeps that for ties.
    let mut priority: Vec<(ContentType, usize)> = counts.into_iter().collect();
    priority.sort_by(|a, b| b.1.cmp(&a.1));

    let mut groups: BTreeMap<ContentType, Vec<SchemaType>> = BTreeMap::new();
    for (schema, rules) in members {
        if let Some((owner, _)) = priority.iter().find(|(rule, _)| rules.contains(rule)) {
            groups.entry(*owner).or_default().push(schema);
        }
    }

    priority
        .iter()
        .filter_map(|(rule, _)| groups.remove(rule).map(|group| merge_group(*rule, group)))
        .collect()
}

/// Merge any number of schemas (singles or unions). `None` only when every
/// input was an empty union.
pub fn merge_all<I>(schemas: I) -> Option<Schema>
where
    I: IntoIterator<Item = Schema>,
{
    let members = schemas.into_iter().flat_map(Schema::into_members);
    Schema::from_members(merge_types(members))
}

/// Merge two schemas describing the same position.
pub fn merge(a: &Schema, b: &Schema) -> Schema {
    merge_all([a.clone(), b.clone()]).unwrap_or_else(|| a.clone())
}

/// True when `sample` is already covered by `predicate`: merging it in would
/// leave `predicate` unchanged.
pub fn fits_schema(sample: &Schema, predicate: &Schema) -> bool {
    if sample.is_union() {
        return sample
            .members()
            .iter()
            .all(|member| fits_schema(&member.clone().into(), predicate));
    }
    if predicate.is_union() {
        return predicate
            .members()
            .iter()
            .any(|member| fits_schema(sample, &member.clone().into()));
    }

    let (Some(sample), Some(predicate)) = (sample.as_single(), predicate.as_single()) else {
        return false;
    };
    if sample.type_name() != predicate.type_name() {
        return false;
    }

    let merged = merge_types([sample.clone(), predicate.clone()]);
    merged.len() == 1 && merged[0] == *predicate
}

/// Folds successive observations of one position.
#[derive(Debug, Clone, Default)]
pub struct SchemaAccumulator {
    current: Option<Schema>,
    samples: usize,
}

impl SchemaAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observation. Returns `true` if the accumulated schema changed.
    pub fn add(&mut self, schema: Schema) -> bool {
        self.samples += 1;
        match self.current.take() {
            None => {
                self.current = Some(schema);
                true
            }
            Some(current) if fits_schema(&schema, &current) => {
                self.current = Some(current);
                false
            }
            Some(current) => {
                let merged = merge(&current, &schema);
                let widened = merged != current;
                self.current = Some(merged);
                widened
            }
        }
    }

    pub fn schema(&self) -> Option<&Schema> {
        self.current.as_ref()
    }

    pub fn into_schema(self) -> Option<Schema> {
        self.current
    }

    pub fn samples(&self) -> usize {
        self.samples
    }
}

fn merge_group(rule: ContentType, group: Vec<SchemaType>) -> SchemaType {
    match rule {
        ContentType::Float => {
            let numbers = numerics(&group);
            SchemaType::Number(NumericSchema {
                multiple_of: numbers
                    .iter()
                    .filter_map(|n| n.multiple_of)
                    .reduce(f64::min),
                ..bounds(&numbers)
            })
        }
        ContentType::Integer => SchemaType::Integer(bounds(&numerics(&group))),
        ContentType::Number => {
            let numbers = numerics(&group);
            SchemaType::Number(NumericSchema {
                multiple_of: all_or_none(numbers.iter().map(|n| n.multiple_of), f64::min),
                ..bounds(&numbers)
            })
        }
        ContentType::String => {
            let strings: Vec<&StringSchema> = group
                .iter()
                .filter_map(|s| match s {
                    SchemaType::String(s) => Some(s),
                    _ => None,
                })
                .collect();
            SchemaType::String(StringSchema {
                min_length: all_or_none(strings.iter().map(|s| s.min_length), usize::min),
                max_length: all_or_none(strings.iter().map(|s| s.max_length), usize::max),
                format: None,
            })
        }
        ContentType::Array => merge_arrays(group),
        ContentType::Object => merge_objects(group),
        // Rules without bounds to combine keep the first observation.
        _ => group
            .into_iter()
            .next()
            .unwrap_or(SchemaType::Null),
    }
}

fn numerics(group: &[SchemaType]) -> Vec<&NumericSchema> {
    group
        .iter()
        .filter_map(|s| match s {
            SchemaType::Integer(n) | SchemaType::Number(n) => Some(n),
            _ => None,
        })
        .collect()
}

fn bounds(numbers: &[&NumericSchema]) -> NumericSchema {
    NumericSchema {
        minimum: all_or_none(numbers.iter().map(|n| n.minimum), f64::min),
        maximum: all_or_none(numbers.iter().map(|n| n.maximum), f64::max),
        multiple_of: None,
    }
}

/// Fold `values` with `f` when every one is present. A single missing bound
/// drops the bound instead of guessing.
fn all_or_none<T, I, F>(values: I, f: F) -> Option<T>
where
    I: IntoIterator<Item = Option<T>>,
    F: Fn(T, T) -> T,
{
    let mut acc: Option<T> = None;
    for value in values {
        let value = value?;
        acc = Some(match acc {
            Some(prev) => f(prev, value),
            None => value,
        });
    }
    acc
}

fn merge_arrays(group: Vec<SchemaType>) -> SchemaType {
    let arrays: Vec<ArraySchema> = group
        .into_iter()
        .filter_map(|s| match s {
            SchemaType::Array(a) => Some(a),
            _ => None,
        })
        .collect();

    let min_items = all_or_none(arrays.iter().map(|a| a.min_items), usize::min);
    let max_items = all_or_none(arrays.iter().map(|a| a.max_items), usize::max);
    let items = arrays
        .into_iter()
        .filter_map(|a| a.items)
        .flat_map(|items| items.into_members());

    SchemaType::Array(ArraySchema {
        items: Schema::from_members(merge_types(items)).map(Box::new),
        min_items,
        max_items,
    })
}

fn merge_objects(group: Vec<SchemaType>) -> SchemaType {
    let objects: Vec<ObjectSchema> = group
        .into_iter()
        .filter_map(|s| match s {
            SchemaType::Object(o) => Some(o),
            _ => None,
        })
        .collect();

    let required: BTreeSet<String> = objects
        .iter()
        .flat_map(|o| o.properties.keys())
        .filter(|name| objects.iter().all(|o| o.required.contains(*name)))
        .cloned()
        .collect();

    let mut by_name: BTreeMap<String, Vec<Schema>> = BTreeMap::new();
    for object in objects {
        for (name, schema) in object.properties {
            by_name.entry(name).or_default().push(schema);
        }
    }

    let properties = by_name
        .into_iter()
        .filter_map(|(name, schemas)| merge_all(schemas).map(|merged| (name, merged)))
        .collect();

    SchemaType::Object(ObjectSchema {
        properties,
        required,
    })
}
