use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::message::{MessageArg, render_template};
use crate::record::Record;

/// Configuration errors raised while building metadata, rules or engines.
///
/// These are programmer errors and are never raised by a validation pass.
#[derive(Debug, Error)]
pub enum Error {
    /// The record type is not known as a persisted entity.
    #[error("{type_name} is not a persisted entity")]
    NotAnEntity { type_name: String },
    /// A field name that is not declared on the entity.
    #[error("undefined field {field} in entity {type_name}")]
    UnknownField { field: String, type_name: String },
    /// A validator rule was configured with invalid parameters.
    #[error("invalid rule configuration: {0}")]
    InvalidRule(String),
    /// A charset name that cannot be mapped to a length rule.
    #[error("unknown charset: {0}")]
    UnknownCharset(String),
    /// Entity metadata violates internal invariants.
    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

/// Convenience alias for configuration results.
pub type Result<T> = std::result::Result<T, Error>;

/// Built-in rule variants, used to classify rule violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    Email,
    Filter,
    Greater,
    Ip,
    MinLength,
    Number,
    Regexp,
    Slug,
    Type,
    Url,
}

/// Classification of a validation failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Empty,
    TooLong,
    WrongLength,
    Negative,
    PrecisionExceeded,
    InvalidEnum,
    WrongType,
    NonScalarItem,
    ItemContainsSeparator,
    StreamExpected,
    Rule(RuleKind),
    /// Raised by a user-defined rule or callback.
    Custom,
}

/// First violation found by a validation pass.
///
/// Keeps the message template and its arguments apart so callers can
/// translate the message; `Display` renders the template.
#[derive(Clone)]
pub struct ValidationError {
    kind: ViolationKind,
    template: String,
    args: Vec<MessageArg>,
    field: String,
    record: Arc<dyn Record>,
}

impl ValidationError {
    pub fn new(
        kind: ViolationKind,
        template: impl Into<String>,
        args: Vec<MessageArg>,
        field: impl Into<String>,
        record: Arc<dyn Record>,
    ) -> Self {
        Self {
            kind,
            template: template.into(),
            args,
            field: field.into(),
            record,
        }
    }

    pub fn kind(&self) -> ViolationKind {
        self.kind
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn args(&self) -> &[MessageArg] {
        &self.args
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    pub fn record(&self) -> &Arc<dyn Record> {
        &self.record
    }

    /// The rendered message.
    pub fn message(&self) -> String {
        render_template(&self.template, &self.args)
    }
}

impl fmt::Debug for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValidationError")
            .field("kind", &self.kind)
            .field("template", &self.template)
            .field("args", &self.args)
            .field("field", &self.field)
            .field("entity", &self.record.type_name())
            .finish()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

impl std::error::Error for ValidationError {}
