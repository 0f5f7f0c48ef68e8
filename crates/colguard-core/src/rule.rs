use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{ValidationError, ViolationKind};
use crate::message::MessageArg;
use crate::metadata::FieldMetadata;
use crate::record::Record;
use crate::value::Value;

/// Write operation a validation pass runs for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Insert,
    Update,
}

impl Mode {
    pub fn as_str(self) -> &'static str {
        match self {
            Mode::Insert => "insert",
            Mode::Update => "update",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything a check needs to know about the field being validated.
#[derive(Debug, Clone, Copy)]
pub struct FieldContext<'a> {
    pub field: &'a str,
    pub value: &'a Value,
    pub metadata: &'a FieldMetadata,
    pub record: &'a Arc<dyn Record>,
    pub mode: Mode,
}

impl<'a> FieldContext<'a> {
    /// Build a violation for this field.
    pub fn violation(
        &self,
        kind: ViolationKind,
        template: impl Into<String>,
        args: Vec<MessageArg>,
    ) -> ValidationError {
        ValidationError::new(kind, template, args, self.field, Arc::clone(self.record))
    }

    /// Violation whose only template argument is the field name.
    pub fn fail(&self, kind: ViolationKind, template: impl Into<String>) -> ValidationError {
        self.violation(kind, template, vec![self.field.into()])
    }
}

/// A pluggable check over one field value.
///
/// Implementations fail by returning a [`ValidationError`]; they never
/// mutate the record.
pub trait ColumnRule: fmt::Debug + Send + Sync {
    /// Whether the rule runs for the given mode.
    fn applies_on(&self, mode: Mode) -> bool;

    fn validate(&self, ctx: &FieldContext<'_>) -> Result<(), ValidationError>;
}

impl<R: ColumnRule + ?Sized> ColumnRule for Arc<R> {
    fn applies_on(&self, mode: Mode) -> bool {
        (**self).applies_on(mode)
    }

    fn validate(&self, ctx: &FieldContext<'_>) -> Result<(), ValidationError> {
        (**self).validate(ctx)
    }
}
