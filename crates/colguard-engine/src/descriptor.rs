use std::sync::Arc;

use dashmap::DashMap;

use colguard_core::FieldMetadata;
use colguard_rules::ValidatorRule;

/// A validated field of an entity, with its metadata and rules.
#[derive(Debug, Clone)]
pub struct ResolvedField {
    pub name: String,
    pub metadata: FieldMetadata,
    pub rules: Vec<ValidatorRule>,
}

/// Resolved fields of one entity type, in validation order.
///
/// Never mutated once built; shared through `Arc`.
#[derive(Debug, Clone)]
pub struct EntityDescriptor {
    pub type_name: String,
    pub fields: Vec<ResolvedField>,
}

impl EntityDescriptor {
    pub fn field(&self, name: &str) -> Option<&ResolvedField> {
        self.fields.iter().find(|field| field.name == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|field| field.name.as_str())
    }
}

/// Descriptors keyed by type name.
///
/// Readers never block each other. Two threads resolving the same type for
/// the first time may both build it; the first published snapshot wins and
/// both get that one.
#[derive(Debug, Default)]
pub struct DescriptorCache {
    entries: DashMap<String, Arc<EntityDescriptor>>,
}

impl DescriptorCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, type_name: &str) -> Option<Arc<EntityDescriptor>> {
        self.entries
            .get(type_name)
            .map(|entry| Arc::clone(entry.value()))
    }

    /// Store `descriptor` unless another one was published first, and return
    /// the stored snapshot.
    pub fn publish(&self, descriptor: EntityDescriptor) -> Arc<EntityDescriptor> {
        let entry = self
            .entries
            .entry(descriptor.type_name.clone())
            .or_insert_with(|| Arc::new(descriptor));
        Arc::clone(entry.value())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use colguard_core::FieldType;

    use super::*;

    fn descriptor(type_name: &str, field: &str) -> EntityDescriptor {
        EntityDescriptor {
            type_name: type_name.to_string(),
            fields: vec![ResolvedField {
                name: field.to_string(),
                metadata: FieldMetadata::new(FieldType::String),
                rules: Vec::new(),
            }],
        }
    }

    #[test]
    fn first_publish_wins() {
        let cache = DescriptorCache::new();
        let first = cache.publish(descriptor("Product", "name"));
        let second = cache.publish(descriptor("Product", "other"));
        assert!(Arc::ptr_eq(&first, &second));
        assert!(second.contains("name"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn concurrent_publishers_share_one_snapshot() {
        let cache = Arc::new(DescriptorCache::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || cache.publish(descriptor("Order", "total")))
            })
            .collect();
        let snapshots: Vec<_> = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .collect();
        for snapshot in &snapshots {
            assert!(Arc::ptr_eq(snapshot, &snapshots[0]));
        }
        assert!(Arc::ptr_eq(&cache.get("Order").unwrap(), &snapshots[0]));
    }
}
