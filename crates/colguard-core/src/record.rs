use std::collections::BTreeMap;
use std::fmt;

use crate::value::Value;

/// A record instance that can be validated before it is written.
///
/// `type_name` identifies the concrete record type and keys the metadata
/// lookup. `field_value` returns `None` for fields that are unset.
pub trait Record: fmt::Debug + Send + Sync {
    fn type_name(&self) -> &str;

    fn field_value(&self, field: &str) -> Option<Value>;
}

/// Record backed by a name/value map, used for records that only exist as
/// data (JSON documents, rows).
#[derive(Debug, Clone)]
pub struct DynamicRecord {
    type_name: String,
    values: BTreeMap<String, Value>,
}

impl DynamicRecord {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            values: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(field, value);
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(field.into(), value.into());
    }

    pub fn unset(&mut self, field: &str) {
        self.values.remove(field);
    }

    /// Build a record from a JSON object. Non-object documents yield `None`.
    pub fn from_json(type_name: impl Into<String>, document: &serde_json::Value) -> Option<Self> {
        let object = document.as_object()?;
        let mut record = Self::new(type_name);
        for (field, value) in object {
            record.set(field.clone(), Value::from_json(value));
        }
        Some(record)
    }
}

impl Record for DynamicRecord {
    fn type_name(&self) -> &str {
        &self.type_name
    }

    fn field_value(&self, field: &str) -> Option<Value> {
        self.values.get(field).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_object_becomes_record() {
        let document = serde_json::json!({"name": "Desk", "qty": 3});
        let record = DynamicRecord::from_json("Product", &document).expect("object document");

        assert_eq!(record.type_name(), "Product");
        assert!(matches!(record.field_value("qty"), Some(Value::Int(3))));
        assert!(record.field_value("missing").is_none());
    }

    #[test]
    fn non_object_document_is_rejected() {
        assert!(DynamicRecord::from_json("Product", &serde_json::json!([1, 2])).is_none());
    }
}
