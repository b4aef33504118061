//! # pirate-hsds-schema
//!
//! The HSDS field catalogue (`{organization, service, location}` and their
//! transitive children) and its conversion to a strict JSON Schema
//! (Draft-07), the contract the LLM provider is given for structured
//! output and the reconciler checks candidates against before a database
//! transaction ever opens.

pub mod errors;
pub mod fields;
pub mod schema;

pub use errors::SchemaErrors;
pub use fields::{FieldDef, FieldType, FormatToken, ENTITIES};
pub use schema::{aligned_payload_schema, entity_schema};
