//! Entity definitions and the in-memory registry that serves them.

use std::collections::{BTreeMap, HashSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use colguard_core::{Error, FieldMetadata, Result};
use colguard_rules::ValidatorRule;

/// How a field is stored on its record type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    /// Regular assignable instance field.
    #[default]
    Instance,
    /// Shared by all instances; never persisted.
    Static,
    /// Derived from other fields; never assigned.
    Computed,
    /// Assigned once at construction; not assignable afterwards.
    Readonly,
}

impl FieldKind {
    /// Only instance fields can carry persisted values.
    pub fn is_assignable(self) -> bool {
        self == FieldKind::Instance
    }
}

/// One declared field, with its column metadata and attached rules.
#[derive(Debug, Clone)]
pub struct FieldDeclaration {
    pub name: String,
    pub kind: FieldKind,
    /// `None` when the field is not mapped to a column.
    pub column: Option<FieldMetadata>,
    pub rules: Vec<ValidatorRule>,
}

impl FieldDeclaration {
    /// A mapped instance field.
    pub fn column(name: impl Into<String>, metadata: FieldMetadata) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Instance,
            column: Some(metadata),
            rules: Vec::new(),
        }
    }

    /// A field without column metadata.
    pub fn unmapped(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldKind::Instance,
            column: None,
            rules: Vec::new(),
        }
    }

    pub fn kind(mut self, kind: FieldKind) -> Self {
        self.kind = kind;
        self
    }

    /// Attach a rule; rules run in attachment order.
    pub fn rule(mut self, rule: impl Into<ValidatorRule>) -> Self {
        self.rules.push(rule.into());
        self
    }
}

/// Declared shape of one record type.
#[derive(Debug, Clone)]
pub struct EntityDefinition {
    pub name: String,
    /// Whether the type is a persisted entity. Mapped superclasses carry
    /// fields for their children but are not entities themselves.
    pub entity: bool,
    pub extends: Option<String>,
    pub fields: Vec<FieldDeclaration>,
}

impl EntityDefinition {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            entity: true,
            extends: None,
            fields: Vec::new(),
        }
    }

    /// A type that only contributes fields to the types extending it.
    pub fn mapped_superclass(name: impl Into<String>) -> Self {
        Self {
            entity: false,
            ..Self::new(name)
        }
    }

    pub fn extends(mut self, parent: impl Into<String>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    pub fn field(mut self, field: FieldDeclaration) -> Self {
        self.fields.push(field);
        self
    }

    /// Shorthand for a mapped instance field with rules.
    pub fn column(
        mut self,
        name: impl Into<String>,
        metadata: FieldMetadata,
        rules: impl IntoIterator<Item = ValidatorRule>,
    ) -> Self {
        let mut field = FieldDeclaration::column(name, metadata);
        field.rules.extend(rules);
        self.fields.push(field);
        self
    }

    pub fn find_field(&self, name: &str) -> Option<&FieldDeclaration> {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// Where the validator looks up entity definitions.
pub trait MetadataSource: Send + Sync {
    fn definition(&self, type_name: &str) -> Option<&EntityDefinition>;
}

/// In-memory set of entity definitions.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry {
    definitions: BTreeMap<String, EntityDefinition>,
}

impl SchemaRegistry {
    pub fn builder() -> SchemaRegistryBuilder {
        SchemaRegistryBuilder::default()
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.definitions.keys().map(String::as_str)
    }
}

impl MetadataSource for SchemaRegistry {
    fn definition(&self, type_name: &str) -> Option<&EntityDefinition> {
        self.definitions.get(type_name)
    }
}

#[derive(Debug, Default)]
pub struct SchemaRegistryBuilder {
    definitions: Vec<EntityDefinition>,
}

impl SchemaRegistryBuilder {
    pub fn entity(mut self, definition: EntityDefinition) -> Self {
        self.definitions.push(definition);
        self
    }

    /// Check names and inheritance links, then freeze the registry.
    pub fn build(self) -> Result<SchemaRegistry> {
        let mut definitions = BTreeMap::new();
        for definition in self.definitions {
            let mut seen = HashSet::new();
            for field in &definition.fields {
                if !seen.insert(field.name.as_str()) {
                    return Err(Error::InvalidSchema(format!(
                        "duplicate field {} in {}",
                        field.name, definition.name
                    )));
                }
                if let Some(column) = &field.column {
                    column.check_facets().map_err(|err| match err {
                        Error::InvalidSchema(message) => Error::InvalidSchema(format!(
                            "{}.{}: {message}",
                            definition.name, field.name
                        )),
                        other => other,
                    })?;
                }
            }
            if definitions.contains_key(&definition.name) {
                return Err(Error::InvalidSchema(format!(
                    "duplicate entity {}",
                    definition.name
                )));
            }
            definitions.insert(definition.name.clone(), definition);
        }

        for definition in definitions.values() {
            check_ancestry(definition, &definitions)?;
        }

        Ok(SchemaRegistry { definitions })
    }
}

fn check_ancestry(
    definition: &EntityDefinition,
    definitions: &BTreeMap<String, EntityDefinition>,
) -> Result<()> {
    let mut visited = HashSet::from([definition.name.as_str()]);
    let mut current = definition;
    while let Some(parent) = current.extends.as_deref() {
        let Some(next) = definitions.get(parent) else {
            return Err(Error::InvalidSchema(format!(
                "{} extends unknown type {parent}",
                current.name
            )));
        };
        if !visited.insert(next.name.as_str()) {
            return Err(Error::InvalidSchema(format!(
                "inheritance cycle through {}",
                definition.name
            )));
        }
        current = next;
    }
    Ok(())
}
