//! Metadata sources for colguard.
//!
//! Entity definitions can be built in code through [`SchemaRegistry::builder`]
//! or loaded from a sidecar [`SchemaDocument`] in JSON or TOML. Documents are
//! checked against their JSON Schema before conversion.

pub mod definition;
pub mod document;
pub mod errors;
pub mod schema;
pub mod validate;

pub use definition::{
    EntityDefinition, FieldDeclaration, FieldKind, MetadataSource, SchemaRegistry,
    SchemaRegistryBuilder,
};
pub use document::{ColumnSpec, EntitySpec, FieldSpec, SchemaDocument};
pub use errors::{IssueSeverity, Result, SchemaError, SchemaIssue, SchemaReport};
pub use schema::document_json_schema;
pub use validate::{
    ValidatedSchema, lint_document, load_document_value, validate_document,
    validate_document_json,
};
