use std::collections::HashSet;
use std::sync::Arc;

use tracing::debug;

use colguard_core::{Error, Result};
use colguard_schema::{EntityDefinition, MetadataSource};

use crate::descriptor::{DescriptorCache, EntityDescriptor, ResolvedField};
use crate::options::ResolverOptions;

/// Turns entity definitions into descriptors, optionally caching them.
pub struct MetadataResolver {
    source: Arc<dyn MetadataSource>,
    options: ResolverOptions,
    cache: DescriptorCache,
}

impl std::fmt::Debug for MetadataResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataResolver")
            .field("options", &self.options)
            .field("cached", &self.cache.len())
            .finish()
    }
}

impl MetadataResolver {
    pub fn new(source: impl MetadataSource + 'static, options: ResolverOptions) -> Self {
        Self::with_source(Arc::new(source), options)
    }

    pub fn with_source(source: Arc<dyn MetadataSource>, options: ResolverOptions) -> Self {
        Self {
            source,
            options,
            cache: DescriptorCache::new(),
        }
    }

    pub fn options(&self) -> ResolverOptions {
        self.options
    }

    pub fn cache(&self) -> &DescriptorCache {
        &self.cache
    }

    /// Fail unless `type_name` is declared and marked as a persisted entity.
    pub fn ensure_entity(&self, type_name: &str) -> Result<()> {
        match self.source.definition(type_name) {
            Some(definition) if definition.entity => Ok(()),
            _ => Err(Error::NotAnEntity {
                type_name: type_name.to_string(),
            }),
        }
    }

    /// Descriptor for `type_name`, from the cache when enabled.
    pub fn resolve(&self, type_name: &str) -> Result<Arc<EntityDescriptor>> {
        if self.options.use_cache {
            if let Some(descriptor) = self.cache.get(type_name) {
                debug!(entity = type_name, "descriptor cache hit");
                return Ok(descriptor);
            }
        }

        let descriptor = self.build(type_name)?;
        debug!(
            entity = type_name,
            fields = descriptor.fields.len(),
            cached = self.options.use_cache,
            "descriptor built"
        );
        if self.options.use_cache {
            Ok(self.cache.publish(descriptor))
        } else {
            Ok(Arc::new(descriptor))
        }
    }

    fn build(&self, type_name: &str) -> Result<EntityDescriptor> {
        self.ensure_entity(type_name)?;

        let mut fields = Vec::new();
        let mut seen = HashSet::new();
        for definition in self.lineage(type_name)? {
            for field in &definition.fields {
                // A redeclared field hides the inherited declaration.
                if !seen.insert(field.name.as_str()) {
                    continue;
                }
                if !field.kind.is_assignable() {
                    continue;
                }
                let Some(metadata) = &field.column else {
                    continue;
                };
                fields.push(ResolvedField {
                    name: field.name.clone(),
                    metadata: metadata.clone(),
                    rules: field.rules.clone(),
                });
            }
        }

        Ok(EntityDescriptor {
            type_name: type_name.to_string(),
            fields,
        })
    }

    /// The type itself, then its ancestors, nearest first.
    fn lineage<'a>(&'a self, type_name: &str) -> Result<Vec<&'a EntityDefinition>> {
        let mut lineage = Vec::new();
        let mut visited = HashSet::new();
        let mut next = Some(type_name.to_string());
        while let Some(name) = next {
            let definition = self.source.definition(&name).ok_or_else(|| {
                Error::InvalidSchema(format!("{type_name} inherits from unknown type {name}"))
            })?;
            if !visited.insert(definition.name.as_str()) {
                return Err(Error::InvalidSchema(format!(
                    "inheritance cycle through {type_name}"
                )));
            }
            next = definition.extends.clone();
            lineage.push(definition);
        }
        Ok(lineage)
    }
}

#[cfg(test)]
mod tests {
    use colguard_core::{FieldMetadata, FieldType};
    use colguard_rules::Slug;
    use colguard_schema::{FieldDeclaration, FieldKind, SchemaRegistry};

    use super::*;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::builder()
            .entity(
                EntityDefinition::mapped_superclass("Base")
                    .column("id", FieldMetadata::new(FieldType::Integer).identifier(), [])
                    .column("title", FieldMetadata::new(FieldType::String).length(10), []),
            )
            .entity(
                EntityDefinition::new("Page")
                    .extends("Base")
                    .column(
                        "title",
                        FieldMetadata::new(FieldType::String).length(200),
                        [Slug::new().into()],
                    )
                    .column("body", FieldMetadata::new(FieldType::String), [])
                    .field(FieldDeclaration::unmapped("draft"))
                    .field(
                        FieldDeclaration::column("words", FieldMetadata::new(FieldType::Integer))
                            .kind(FieldKind::Computed),
                    )
                    .field(
                        FieldDeclaration::column("TABLE", FieldMetadata::new(FieldType::String))
                            .kind(FieldKind::Static),
                    ),
            )
            .build()
            .unwrap()
    }

    #[test]
    fn own_fields_come_first_and_shadow_inherited_ones() {
        let resolver = MetadataResolver::new(registry(), ResolverOptions::default());
        let descriptor = resolver.resolve("Page").unwrap();
        let names: Vec<_> = descriptor.field_names().collect();
        assert_eq!(names, ["title", "body", "id"]);

        let title = descriptor.field("title").unwrap();
        assert_eq!(title.metadata.length, Some(200));
        assert_eq!(title.rules.len(), 1);
    }

    #[test]
    fn rejects_non_entities() {
        let resolver = MetadataResolver::new(registry(), ResolverOptions::default());
        assert!(matches!(
            resolver.resolve("Base"),
            Err(Error::NotAnEntity { type_name }) if type_name == "Base"
        ));
        assert!(matches!(
            resolver.ensure_entity("Nope"),
            Err(Error::NotAnEntity { .. })
        ));
    }

    #[test]
    fn caching_reuses_snapshots() {
        let cached = MetadataResolver::new(registry(), ResolverOptions::cached());
        let first = cached.resolve("Page").unwrap();
        let second = cached.resolve("Page").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cached.cache().len(), 1);

        let uncached = MetadataResolver::new(registry(), ResolverOptions::default());
        let first = uncached.resolve("Page").unwrap();
        let second = uncached.resolve("Page").unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert!(uncached.cache().is_empty());
    }
}
