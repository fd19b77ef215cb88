//! Operation assembly.
//!
//! # Responsibilities
//! - Turn a buffered request/response pair into an [`Operation`]
//! - Normalize the reported URI (host, port, no query)
//! - Describe headers, query parameters and bodies as schemas
//!
//! # Design Decisions
//! - Assembly is infallible; a malformed exchange yields a sparse record
//! - Raw values never leave this module, only their schemas

mod assembler;
mod body;
mod exchange;
mod types;
mod uri;

pub use assembler::{assemble, header_schemas, query_schemas};
pub use body::{body_schema, media_type, status_allows_body};
pub use exchange::Exchange;
pub use types::{
    BodyEncoding, BodySchema, Direction, Operation, Report, ReporterInfo, RequestShape,
    ResponseShape,
};
pub use uri::reported_uri;
