//! Sidecar schema documents, written as JSON or TOML.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

use colguard_core::{Charset, EnumType, Error, FieldMetadata, FieldType};
use colguard_rules::{RuleSpec, ValidatorRule};

use crate::definition::{EntityDefinition, FieldDeclaration, FieldKind, SchemaRegistry};
use crate::errors::Result;

fn yes() -> bool {
    true
}

fn is_true(value: &bool) -> bool {
    *value
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Root of a schema document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SchemaDocument {
    /// Enum types referenced by `enum_type` columns.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub enums: Vec<EnumType>,
    pub entities: Vec<EntitySpec>,
}

/// One record type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct EntitySpec {
    pub name: String,
    /// False for mapped superclasses, which cannot be validated directly.
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub entity: bool,
    /// Parent type whose fields are inherited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

/// One declared field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FieldSpec {
    pub name: String,
    #[serde(default)]
    pub kind: FieldKind,
    /// Column mapping; fields without one are not validated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<ColumnSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub rules: Vec<RuleSpec>,
}

/// Column declaration of a mapped field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ColumnSpec {
    /// Column type name (integer, decimal, string, enum, simple_array, ...).
    #[serde(rename = "type")]
    pub column_type: String,
    #[serde(default, skip_serializing_if = "is_false")]
    pub nullable: bool,
    /// Default value applied by the storage layer. Only its presence matters
    /// here: a column with a default accepts null.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<serde_json::Value>,
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub insertable: bool,
    #[serde(default = "yes", skip_serializing_if = "is_true")]
    pub updatable: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub id: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unsigned: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub fixed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charset: Option<String>,
    /// Name of an enum declared in the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_type: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub unique: bool,
}

impl ColumnSpec {
    fn metadata(
        &self,
        enums: &HashMap<&str, Arc<EnumType>>,
    ) -> colguard_core::Result<FieldMetadata> {
        let enum_type = match self.enum_type.as_deref() {
            Some(name) => Some(enums.get(name).cloned().ok_or_else(|| {
                Error::InvalidSchema(format!("unknown enum type {name}"))
            })?),
            None => None,
        };
        let charset = self.charset.as_deref().map(Charset::from_str).transpose()?;

        Ok(FieldMetadata {
            field_type: FieldType::from_column_type(&self.column_type),
            nullable: self.nullable,
            has_default: self.default.is_some(),
            insertable: self.insertable,
            updatable: self.updatable,
            identifier: self.id,
            unique: self.unique,
            unsigned: self.unsigned,
            precision: self.precision,
            scale: self.scale,
            length: self.length,
            fixed_length: self.fixed,
            charset,
            enum_type,
        })
    }
}

impl SchemaDocument {
    pub fn from_json_str(input: &str) -> Result<Self> {
        Ok(serde_json::from_str(input)?)
    }

    pub fn from_toml_str(input: &str) -> Result<Self> {
        Ok(toml::from_str(input)?)
    }

    /// Read a document from disk; `.toml` files are parsed as TOML, anything
    /// else as JSON.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let document = if is_toml(path) {
            Self::from_toml_str(&contents)?
        } else {
            Self::from_json_str(&contents)?
        };
        debug!(
            path = %path.display(),
            entities = document.entities.len(),
            "schema document loaded"
        );
        Ok(document)
    }

    /// Resolve enum references, parse charsets and build every rule.
    pub fn to_registry(&self) -> colguard_core::Result<SchemaRegistry> {
        let mut enums = HashMap::new();
        for enum_type in &self.enums {
            if enums
                .insert(enum_type.name.as_str(), Arc::new(enum_type.clone()))
                .is_some()
            {
                return Err(Error::InvalidSchema(format!(
                    "duplicate enum type {}",
                    enum_type.name
                )));
            }
        }

        let mut builder = SchemaRegistry::builder();
        for entity in &self.entities {
            let mut definition = EntityDefinition::new(entity.name.as_str());
            definition.entity = entity.entity;
            definition.extends = entity.extends.clone();
            for field in &entity.fields {
                definition = definition.field(field_declaration(field, &enums).map_err(
                    |err| match err {
                        Error::InvalidRule(message) => Error::InvalidRule(format!(
                            "{}.{}: {message}",
                            entity.name, field.name
                        )),
                        other => other,
                    },
                )?);
            }
            builder = builder.entity(definition);
        }
        builder.build()
    }
}

fn field_declaration(
    field: &FieldSpec,
    enums: &HashMap<&str, Arc<EnumType>>,
) -> colguard_core::Result<FieldDeclaration> {
    let column = field
        .column
        .as_ref()
        .map(|column| column.metadata(enums))
        .transpose()?;
    let rules = field
        .rules
        .iter()
        .map(RuleSpec::build)
        .collect::<colguard_core::Result<Vec<ValidatorRule>>>()?;
    Ok(FieldDeclaration {
        name: field.name.clone(),
        kind: field.kind,
        column,
        rules,
    })
}

pub(crate) fn is_toml(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"))
}

#[cfg(test)]
mod tests {
    use colguard_core::BackingValue;

    use super::*;
    use crate::definition::MetadataSource;

    const PRODUCT: &str = r#"{
        "enums": [
            {"name": "Status", "cases": [{"name": "Draft", "value": "draft"}, {"name": "Live", "value": "live"}]}
        ],
        "entities": [
            {
                "name": "Product",
                "fields": [
                    {"name": "id", "column": {"type": "integer", "id": true}},
                    {"name": "barcode", "column": {"type": "string", "length": 10, "fixed": true}},
                    {"name": "price", "column": {"type": "decimal", "unsigned": true, "precision": 10, "scale": 2}},
                    {"name": "status", "column": {"type": "enum", "enum_type": "Status", "default": "draft"}},
                    {"name": "slug", "column": {"type": "string", "length": 64},
                     "rules": [{"rule": "slug"}, {"rule": "min_length", "length": 3, "on_update": false}]},
                    {"name": "views", "kind": "computed"}
                ]
            }
        ]
    }"#;

    #[test]
    fn converts_columns_to_metadata() {
        let registry = SchemaDocument::from_json_str(PRODUCT)
            .unwrap()
            .to_registry()
            .unwrap();
        let product = registry.definition("Product").unwrap();

        let id = product.find_field("id").unwrap().column.as_ref().unwrap();
        assert!(id.identifier);
        assert_eq!(id.field_type, FieldType::Integer);

        let barcode = product.find_field("barcode").unwrap().column.as_ref().unwrap();
        assert!(barcode.fixed_length);
        assert_eq!(barcode.length, Some(10));

        let status = product.find_field("status").unwrap().column.as_ref().unwrap();
        assert!(status.has_default);
        assert!(!status.nullable);
        let status_enum = status.enum_type.as_ref().unwrap();
        assert!(status_enum.is_backed());
        assert_eq!(
            status_enum.cases[1].value,
            Some(BackingValue::Str("live".to_string()))
        );

        let slug = product.find_field("slug").unwrap();
        assert_eq!(slug.rules.len(), 2);

        let views = product.find_field("views").unwrap();
        assert_eq!(views.kind, FieldKind::Computed);
        assert!(views.column.is_none());
    }

    #[test]
    fn reads_toml_documents() {
        let document = SchemaDocument::from_toml_str(
            r#"
[[entities]]
name = "Tag"

[[entities.fields]]
name = "label"
column = { type = "string", length = 20, charset = "utf8mb4" }
rules = [{ rule = "type", type = "alpha" }]
"#,
        )
        .unwrap();
        let registry = document.to_registry().unwrap();
        let label = registry.definition("Tag").unwrap().find_field("label").unwrap();
        assert_eq!(label.column.as_ref().unwrap().charset, Some(Charset::Utf8));
        assert_eq!(label.rules.len(), 1);
    }

    #[test]
    fn reports_conversion_errors() {
        let unknown_enum = SchemaDocument::from_json_str(
            r#"{"entities": [{"name": "A", "fields": [{"name": "s", "column": {"type": "enum", "enum_type": "Nope"}}]}]}"#,
        )
        .unwrap();
        assert!(matches!(unknown_enum.to_registry(), Err(Error::InvalidSchema(_))));

        let bad_charset = SchemaDocument::from_json_str(
            r#"{"entities": [{"name": "A", "fields": [{"name": "s", "column": {"type": "string", "charset": "klingon"}}]}]}"#,
        )
        .unwrap();
        assert!(matches!(bad_charset.to_registry(), Err(Error::UnknownCharset(_))));

        let bad_rule = SchemaDocument::from_json_str(
            r#"{"entities": [{"name": "A", "fields": [{"name": "s", "column": {"type": "string"}, "rules": [{"rule": "filter", "filter": "uuid"}]}]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            bad_rule.to_registry(),
            Err(Error::InvalidRule(message)) if message.starts_with("A.s:")
        ));

        let bad_scale = SchemaDocument::from_json_str(
            r#"{"entities": [{"name": "A", "fields": [{"name": "d", "column": {"type": "decimal", "precision": 5, "scale": 200000000}}]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            bad_scale.to_registry(),
            Err(Error::InvalidSchema(message)) if message.starts_with("A.d: scale")
        ));
    }

    #[test]
    fn serializes_without_defaults() {
        let document = SchemaDocument::from_json_str(
            r#"{"entities": [{"name": "A", "fields": [{"name": "s", "column": {"type": "string"}}]}]}"#,
        )
        .unwrap();
        let json = serde_json::to_value(&document).unwrap();
        assert_eq!(
            json["entities"][0]["fields"][0]["column"],
            serde_json::json!({"type": "string"})
        );
    }
}
