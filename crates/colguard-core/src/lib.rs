//! Core contracts for colguard.
//!
//! This crate defines the value model, the record abstraction, field
//! metadata and the error types shared by the rule catalog, the schema
//! sources and the validation engine.

pub mod error;
pub mod message;
pub mod metadata;
pub mod record;
pub mod rule;
pub mod value;

pub use error::{Error, Result, RuleKind, ValidationError, ViolationKind};
pub use message::{MessageArg, render_template};
pub use metadata::{
    BackingValue, Charset, EnumCase, EnumType, FieldMetadata, FieldType, MAX_DECIMAL_SCALE,
    text_length,
};
pub use record::{DynamicRecord, Record};
pub use rule::{ColumnRule, FieldContext, Mode};
pub use value::{BlobStream, EnumValue, ObjectValue, Value};
