//! Schema inference and merging.
//!
//! # Responsibilities
//! - The structural schema model and its JSON Schema-compatible encoding
//! - Building a schema from one observed value
//! - Merging observations of the same position into a minimal union
//!
//! # Design Decisions
//! - Schemas are plain immutable values; merging always returns new ones
//! - Ordered maps and sets everywhere so serialization is canonical

mod builder;
mod merge;
mod types;

pub use builder::{schema_from_field, schema_from_value};
pub use merge::{fits_schema, merge, merge_all, merge_types, SchemaAccumulator};
pub use types::{
    ArraySchema, NumericSchema, ObjectSchema, Schema, SchemaType, StringFormat, StringSchema,
};
