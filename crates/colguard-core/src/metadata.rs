use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::value::Value;

/// Storage classification used to pick the built-in check for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// integer, smallint, bigint.
    Integer,
    /// float, smallfloat: numeric checks without a precision check.
    Float,
    Decimal,
    /// string, text, guid: length is counted in characters.
    String,
    /// Length is counted in bytes.
    AsciiString,
    Enum,
    SimpleArray,
    Blob,
    /// No built-in check applies.
    Other,
}

impl FieldType {
    /// Map a column type name (`integer`, `decimal`, `ascii_string`, ...).
    /// Unknown names map to [`FieldType::Other`].
    pub fn from_column_type(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "integer" | "int" | "smallint" | "bigint" => FieldType::Integer,
            "float" | "smallfloat" => FieldType::Float,
            "decimal" => FieldType::Decimal,
            "string" | "text" | "guid" => FieldType::String,
            "ascii_string" => FieldType::AsciiString,
            "enum" => FieldType::Enum,
            "simple_array" => FieldType::SimpleArray,
            "blob" => FieldType::Blob,
            _ => FieldType::Other,
        }
    }
}

/// Character set of a stored string, deciding how its length is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Charset {
    Utf8,
    /// Length is counted in UTF-16 code units.
    Utf16,
    Utf32,
    SingleByte,
    /// Length is counted in bytes.
    Binary,
}

impl Charset {
    pub fn name(self) -> &'static str {
        match self {
            Charset::Utf8 => "utf8",
            Charset::Utf16 => "utf16",
            Charset::Utf32 => "utf32",
            Charset::SingleByte => "latin1",
            Charset::Binary => "binary",
        }
    }

    /// Number of storage characters `value` occupies in this charset.
    pub fn length(self, value: &str) -> usize {
        match self {
            Charset::Utf8 | Charset::Utf32 | Charset::SingleByte => value.chars().count(),
            Charset::Utf16 => value.encode_utf16().count(),
            Charset::Binary => value.len(),
        }
    }
}

impl FromStr for Charset {
    type Err = Error;

    fn from_str(name: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = name.trim().to_ascii_lowercase();
        let charset = match normalized.as_str() {
            "utf8" | "utf-8" | "utf8mb3" | "utf8mb4" => Charset::Utf8,
            "utf16" | "utf-16" | "utf16le" | "utf-16le" | "utf16be" | "utf-16be" | "ucs2"
            | "ucs-2" => Charset::Utf16,
            "utf32" | "utf-32" => Charset::Utf32,
            "latin1" | "iso-8859-1" | "iso-8859-15" | "cp1252" | "windows-1252" | "ascii"
            | "us-ascii" => Charset::SingleByte,
            "binary" => Charset::Binary,
            _ => return Err(Error::UnknownCharset(name.to_string())),
        };
        Ok(charset)
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Character length of `value`; without a charset, Unicode code points.
pub fn text_length(value: &str, charset: Option<Charset>) -> usize {
    charset.unwrap_or(Charset::Utf8).length(value)
}

/// Backing value of an enum case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum BackingValue {
    Int(i64),
    Str(String),
}

/// One named case of an enum type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EnumCase {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<BackingValue>,
}

/// A closed set of named cases, optionally value-backed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct EnumType {
    pub name: String,
    pub cases: Vec<EnumCase>,
}

impl EnumType {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            cases: Vec::new(),
        }
    }

    pub fn case(mut self, name: impl Into<String>) -> Self {
        self.cases.push(EnumCase {
            name: name.into(),
            value: None,
        });
        self
    }

    pub fn backed_case(mut self, name: impl Into<String>, value: BackingValue) -> Self {
        self.cases.push(EnumCase {
            name: name.into(),
            value: Some(value),
        });
        self
    }

    pub fn is_backed(&self) -> bool {
        !self.cases.is_empty() && self.cases.iter().all(|case| case.value.is_some())
    }

    pub fn has_case(&self, name: &str) -> bool {
        self.cases.iter().any(|case| case.name == name)
    }

    /// Look a case up by backing value. Integer-backed enums accept numeric
    /// strings and string-backed enums accept integers in their decimal form.
    pub fn case_for_value(&self, value: &Value) -> Option<&EnumCase> {
        if !self.is_backed() {
            return None;
        }
        self.cases.iter().find(|case| match (&case.value, value) {
            (Some(BackingValue::Int(backing)), Value::Int(candidate)) => backing == candidate,
            (Some(BackingValue::Int(backing)), Value::Text(candidate)) => {
                candidate.parse::<i64>().is_ok_and(|parsed| parsed == *backing)
            }
            (Some(BackingValue::Str(backing)), Value::Text(candidate)) => backing == candidate,
            (Some(BackingValue::Str(backing)), Value::Int(candidate)) => {
                *backing == candidate.to_string()
            }
            _ => false,
        })
    }
}

/// Largest scale a decimal column may declare.
pub const MAX_DECIMAL_SCALE: u32 = 65;

/// Declared storage properties of one field.
///
/// Facets that do not apply to `field_type` are carried but never checked.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldMetadata {
    pub field_type: FieldType,
    pub nullable: bool,
    pub has_default: bool,
    pub insertable: bool,
    pub updatable: bool,
    pub identifier: bool,
    pub unique: bool,
    pub unsigned: bool,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub length: Option<u32>,
    pub fixed_length: bool,
    pub charset: Option<Charset>,
    pub enum_type: Option<Arc<EnumType>>,
}

impl FieldMetadata {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            nullable: false,
            has_default: false,
            insertable: true,
            updatable: true,
            identifier: false,
            unique: false,
            unsigned: false,
            precision: None,
            scale: None,
            length: None,
            fixed_length: false,
            charset: None,
            enum_type: None,
        }
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn with_default(mut self) -> Self {
        self.has_default = true;
        self
    }

    pub fn not_insertable(mut self) -> Self {
        self.insertable = false;
        self
    }

    pub fn not_updatable(mut self) -> Self {
        self.updatable = false;
        self
    }

    pub fn identifier(mut self) -> Self {
        self.identifier = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn unsigned(mut self) -> Self {
        self.unsigned = true;
        self
    }

    pub fn precision(mut self, precision: u32) -> Self {
        self.precision = Some(precision);
        self
    }

    pub fn scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    pub fn length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn fixed_length(mut self) -> Self {
        self.fixed_length = true;
        self
    }

    pub fn charset(mut self, charset: Charset) -> Self {
        self.charset = Some(charset);
        self
    }

    pub fn enum_type(mut self, enum_type: Arc<EnumType>) -> Self {
        self.enum_type = Some(enum_type);
        self
    }

    /// Whether a `null` value is acceptable. A declared default exempts the
    /// field even though the default itself is applied by the storage layer.
    pub fn accepts_null(&self) -> bool {
        self.nullable || self.has_default
    }

    /// Reject decimal facets no column can have: a scale above
    /// [`MAX_DECIMAL_SCALE`] or above the declared precision.
    pub fn check_facets(&self) -> Result<()> {
        if self.field_type != FieldType::Decimal {
            return Ok(());
        }
        let Some(scale) = self.scale.filter(|scale| *scale > 0) else {
            return Ok(());
        };
        if scale > MAX_DECIMAL_SCALE {
            return Err(Error::InvalidSchema(format!(
                "scale {scale} exceeds the maximum of {MAX_DECIMAL_SCALE}"
            )));
        }
        match self.precision.filter(|precision| *precision > 0) {
            Some(precision) if scale > precision => Err(Error::InvalidSchema(format!(
                "scale {scale} exceeds precision {precision}"
            ))),
            _ => Ok(()),
        }
    }
}
