use std::fmt;
use std::io::{self, Read};
use std::sync::{Arc, Mutex};

/// Runtime value of a record field.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    /// Instance of a declared enum type.
    Enum(EnumValue),
    Array(Vec<Value>),
    /// Opaque object; `display` is its string conversion, if it has one.
    Object(ObjectValue),
    /// Handle to binary content, as stored in blob columns.
    Stream(BlobStream),
}

/// A case of a named enum type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumValue {
    pub enum_type: String,
    pub case: String,
}

impl EnumValue {
    pub fn new(enum_type: impl Into<String>, case: impl Into<String>) -> Self {
        Self {
            enum_type: enum_type.into(),
            case: case.into(),
        }
    }
}

/// Non-scalar value with an optional string conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectValue {
    pub type_name: String,
    pub display: Option<String>,
}

impl ObjectValue {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            display: None,
        }
    }

    pub fn with_display(mut self, display: impl Into<String>) -> Self {
        self.display = Some(display.into());
        self
    }
}

/// Shared handle to a readable stream.
///
/// Clones share the underlying reader; closing one closes all of them.
#[derive(Clone)]
pub struct BlobStream {
    inner: Arc<Mutex<Option<Box<dyn Read + Send>>>>,
}

impl BlobStream {
    pub fn new(reader: impl Read + Send + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(Box::new(reader)))),
        }
    }

    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::new(io::Cursor::new(bytes.into()))
    }

    /// Drop the reader. Subsequent reads fail and `is_open` returns false.
    pub fn close(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.take();
        }
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().map(|guard| guard.is_some()).unwrap_or(false)
    }

    pub fn read_to_end(&self, buf: &mut Vec<u8>) -> io::Result<usize> {
        let mut guard = self
            .inner
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "stream lock poisoned"))?;
        match guard.as_mut() {
            Some(reader) => reader.read_to_end(buf),
            None => Err(io::Error::new(io::ErrorKind::BrokenPipe, "stream is closed")),
        }
    }
}

impl fmt::Debug for BlobStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobStream")
            .field("open", &self.is_open())
            .finish()
    }
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(value) => Some(value),
            _ => None,
        }
    }

    /// String conversion of scalar and string-convertible values.
    ///
    /// `null` and `false` convert to an empty string, `true` to `"1"`.
    /// Arrays, enum instances, streams and objects without a display form
    /// have no string conversion.
    pub fn scalar_string(&self) -> Option<String> {
        match self {
            Value::Null => Some(String::new()),
            Value::Bool(true) => Some("1".to_string()),
            Value::Bool(false) => Some(String::new()),
            Value::Int(value) => Some(value.to_string()),
            Value::Float(value) => Some(value.to_string()),
            Value::Text(value) => Some(value.clone()),
            Value::Object(object) => object.display.clone(),
            Value::Enum(_) | Value::Array(_) | Value::Stream(_) => None,
        }
    }

    /// Numeric view of the value; numeric strings are parsed.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(value) => Some(*value as f64),
            Value::Float(value) => Some(*value),
            Value::Text(value) => value.trim().parse::<f64>().ok(),
            _ => None,
        }
    }

    /// True for values that can be stored in a single scalar slot.
    pub fn is_scalar(&self) -> bool {
        match self {
            Value::Null | Value::Bool(_) | Value::Int(_) | Value::Float(_) | Value::Text(_) => true,
            Value::Object(object) => object.display.is_some(),
            Value::Enum(_) | Value::Array(_) | Value::Stream(_) => false,
        }
    }

    /// Convert a JSON document value. Objects become opaque values without
    /// a string form.
    pub fn from_json(value: &serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(value) => Value::Bool(*value),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(value) => Value::Int(value),
                None => Value::Float(number.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(value) => Value::Text(value.clone()),
            serde_json::Value::Array(items) => {
                Value::Array(items.iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(_) => Value::Object(ObjectValue::new("object")),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(i64::from(value))
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::Text(value)
    }
}

impl From<EnumValue> for Value {
    fn from(value: EnumValue) -> Self {
        Value::Enum(value)
    }
}

impl From<BlobStream> for Value {
    fn from(value: BlobStream) -> Self {
        Value::Stream(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::Array(items.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}
