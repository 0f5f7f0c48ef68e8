use std::fs;
use std::path::Path;

use jsonschema::JSONSchema;
use serde_json::Value;

use colguard_core::FieldType;

use crate::definition::SchemaRegistry;
use crate::document::{SchemaDocument, is_toml};
use crate::errors::{Result, SchemaError, SchemaIssue, SchemaReport};
use crate::schema::document_json_schema;

/// Converted document with accumulated warnings.
#[derive(Debug, Clone)]
pub struct ValidatedSchema {
    pub document: SchemaDocument,
    pub registry: SchemaRegistry,
    pub warnings: Vec<SchemaIssue>,
}

/// Read a JSON or TOML document as a JSON value, for structural checks.
pub fn load_document_value(path: &Path) -> Result<Value> {
    let contents = fs::read_to_string(path)?;
    if is_toml(path) {
        Ok(toml::from_str(&contents)?)
    } else {
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Validate a document JSON value against the document JSON Schema.
pub fn validate_document_json(
    document_json: &Value,
    document_schema: &Value,
) -> Result<SchemaReport> {
    let compiled = JSONSchema::compile(document_schema)
        .map_err(|err| SchemaError::JsonSchema(err.to_string()))?;

    let mut report = SchemaReport::default();
    if let Err(errors) = compiled.validate(document_json) {
        for error in errors {
            let path = normalized_json_pointer(&error.instance_path.to_string());
            report.push(SchemaIssue::error("schema_violation", path, error.to_string()));
        }
    }
    Ok(report)
}

/// Warn about declarations that parse but have no effect.
pub fn lint_document(document: &SchemaDocument) -> SchemaReport {
    let mut report = SchemaReport::default();
    for (entity_idx, entity) in document.entities.iter().enumerate() {
        for (field_idx, field) in entity.fields.iter().enumerate() {
            let path = format!("/entities/{entity_idx}/fields/{field_idx}");
            match &field.column {
                Some(_) if !field.kind.is_assignable() => {
                    report.push(
                        SchemaIssue::warning(
                            "column_ignored",
                            format!("{path}/column"),
                            format!(
                                "{}.{} is not an assignable field; its column is never validated",
                                entity.name, field.name
                            ),
                        )
                        .with_hint("use kind = \"instance\" or drop the column"),
                    );
                }
                Some(column) => {
                    let field_type = FieldType::from_column_type(&column.column_type);
                    if field_type == FieldType::Enum && column.enum_type.is_none() {
                        report.push(
                            SchemaIssue::warning(
                                "enum_unchecked",
                                format!("{path}/column"),
                                format!(
                                    "{}.{} has no enum_type; its values are not checked",
                                    entity.name, field.name
                                ),
                            )
                            .with_hint("reference one of the document enums"),
                        );
                    }
                    if field_type == FieldType::Other {
                        report.push(SchemaIssue::warning(
                            "unchecked_type",
                            format!("{path}/column/type"),
                            format!(
                                "column type '{}' has no built-in check",
                                column.column_type
                            ),
                        ));
                    }
                }
                None if !field.rules.is_empty() => {
                    report.push(SchemaIssue::warning(
                        "rules_ignored",
                        format!("{path}/rules"),
                        format!(
                            "{}.{} has rules but no column; they never run",
                            entity.name, field.name
                        ),
                    ));
                }
                None => {}
            }
        }
    }
    report
}

/// Validate a document end to end: structure, deserialization, conversion.
pub fn validate_document(document_json: &Value) -> std::result::Result<ValidatedSchema, SchemaReport> {
    let schema = match serde_json::to_value(document_json_schema()) {
        Ok(schema) => schema,
        Err(err) => return Err(single_error("schema_generation_error", err.to_string())),
    };

    let structural = match validate_document_json(document_json, &schema) {
        Ok(report) => report,
        Err(err) => return Err(single_error("schema_validation_error", err.to_string())),
    };
    if !structural.is_ok() {
        return Err(structural);
    }

    let document: SchemaDocument = match serde_json::from_value(document_json.clone()) {
        Ok(document) => document,
        Err(err) => return Err(single_error("invalid_document", err.to_string())),
    };

    let registry = match document.to_registry() {
        Ok(registry) => registry,
        Err(err) => return Err(single_error("invalid_metadata", err.to_string())),
    };

    let lint = lint_document(&document);
    Ok(ValidatedSchema {
        document,
        registry,
        warnings: lint.warnings,
    })
}

fn single_error(code: &str, message: String) -> SchemaReport {
    let mut report = SchemaReport::default();
    report.push(SchemaIssue::error(code, "/", message));
    report
}

fn normalized_json_pointer(pointer: &str) -> String {
    if pointer.is_empty() {
        "/".to_string()
    } else {
        pointer.to_string()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn schema() -> Value {
        serde_json::to_value(document_json_schema()).unwrap()
    }

    #[test]
    fn structural_errors_carry_pointers() {
        let document = json!({"entities": [{"name": 42}]});
        let report = validate_document_json(&document, &schema()).unwrap();
        assert!(!report.is_ok());
        assert_eq!(report.errors[0].code, "schema_violation");
        assert_eq!(report.errors[0].path, "/entities/0/name");
    }

    #[test]
    fn missing_entities_is_reported_at_root() {
        let report = validate_document_json(&json!({}), &schema()).unwrap();
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].path, "/");
    }

    #[test]
    fn lint_flags_ineffective_declarations() {
        let document: SchemaDocument = serde_json::from_value(json!({
            "entities": [{
                "name": "A",
                "fields": [
                    {"name": "total", "kind": "computed", "column": {"type": "integer"}},
                    {"name": "state", "column": {"type": "enum"}},
                    {"name": "loose", "rules": [{"rule": "slug"}]},
                    {"name": "stamp", "column": {"type": "datetime"}}
                ]
            }]
        }))
        .unwrap();
        let report = lint_document(&document);
        let codes: Vec<_> = report.warnings.iter().map(|issue| issue.code.as_str()).collect();
        assert_eq!(
            codes,
            ["column_ignored", "enum_unchecked", "rules_ignored", "unchecked_type"]
        );
        assert!(report.is_ok());
    }

    #[test]
    fn end_to_end_validation_reports_conversion_failures() {
        let document = json!({
            "entities": [{"name": "A", "extends": "Missing"}]
        });
        let report = validate_document(&document).unwrap_err();
        assert_eq!(report.errors[0].code, "invalid_metadata");

        let ok = validate_document(&json!({"entities": [{"name": "A"}]})).unwrap();
        assert_eq!(ok.registry.len(), 1);
        assert!(ok.warnings.is_empty());
    }
}
