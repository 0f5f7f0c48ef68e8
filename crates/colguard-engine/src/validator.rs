use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace};

use colguard_core::{
    ColumnRule, Error, FieldContext, Mode, Record, Result, ValidationError, Value, ViolationKind,
};

use crate::checks::{EMPTY, check_field};
use crate::descriptor::{EntityDescriptor, ResolvedField};
use crate::lifecycle::PostValidateListener;
use crate::resolver::MetadataResolver;

/// Ad-hoc check registered for one field of one validator.
pub type CustomValidator =
    Box<dyn Fn(&FieldContext<'_>) -> std::result::Result<(), ValidationError> + Send + Sync>;

/// Validates one record before it is written.
///
/// A pass walks the resolved fields in order and stops at the first
/// violation: per field, the mode filter, the null policy, the built-in type
/// check, the attached rules and finally the custom validators.
pub struct EntityValidator {
    record: Arc<dyn Record>,
    descriptor: Arc<EntityDescriptor>,
    custom: HashMap<String, Vec<CustomValidator>>,
    listeners: Vec<Arc<dyn PostValidateListener>>,
}

impl std::fmt::Debug for EntityValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityValidator")
            .field("entity", &self.descriptor.type_name)
            .field("custom", &self.custom.keys().collect::<Vec<_>>())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl EntityValidator {
    /// Resolve the record's metadata. Fails when its type is not a persisted
    /// entity or its declarations are inconsistent.
    pub fn new(record: Arc<dyn Record>, resolver: &MetadataResolver) -> Result<Self> {
        let descriptor = resolver.resolve(record.type_name())?;
        Ok(Self {
            record,
            descriptor,
            custom: HashMap::new(),
            listeners: Vec::new(),
        })
    }

    pub fn record(&self) -> &Arc<dyn Record> {
        &self.record
    }

    pub fn descriptor(&self) -> &EntityDescriptor {
        &self.descriptor
    }

    /// Register a check for `field`, run after its rules. Fails when the
    /// entity does not validate a field of that name.
    pub fn add_custom_validator<F>(&mut self, field: &str, validator: F) -> Result<&mut Self>
    where
        F: Fn(&FieldContext<'_>) -> std::result::Result<(), ValidationError>
            + Send
            + Sync
            + 'static,
    {
        if !self.descriptor.contains(field) {
            return Err(Error::UnknownField {
                field: field.to_string(),
                type_name: self.descriptor.type_name.clone(),
            });
        }
        self.custom
            .entry(field.to_string())
            .or_default()
            .push(Box::new(validator));
        Ok(self)
    }

    /// Notify `listener` after every successful pass.
    pub fn with_listener(mut self, listener: Arc<dyn PostValidateListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Run one pass for `mode`.
    pub fn validate(&self, mode: Mode) -> std::result::Result<(), ValidationError> {
        let type_name = self.descriptor.type_name.as_str();
        for field in &self.descriptor.fields {
            if let Err(err) = self.validate_field(field, mode) {
                debug!(
                    entity = type_name,
                    field = %field.name,
                    kind = ?err.kind(),
                    mode = %mode,
                    "validation failed"
                );
                return Err(err);
            }
        }

        debug!(
            entity = type_name,
            mode = %mode,
            fields = self.descriptor.fields.len(),
            "validation passed"
        );
        for listener in &self.listeners {
            listener.post_validate(&self.record, mode);
        }
        Ok(())
    }

    fn validate_field(
        &self,
        field: &ResolvedField,
        mode: Mode,
    ) -> std::result::Result<(), ValidationError> {
        let metadata = &field.metadata;
        let writable = match mode {
            Mode::Insert => metadata.insertable,
            Mode::Update => metadata.updatable,
        };
        if !writable {
            trace!(field = %field.name, mode = %mode, "field skipped by mode");
            return Ok(());
        }

        let value = self
            .record
            .field_value(&field.name)
            .unwrap_or(Value::Null);

        if value.is_null() {
            if mode == Mode::Insert && metadata.identifier {
                trace!(field = %field.name, "generated identifier skipped");
                return Ok(());
            }
            if metadata.accepts_null() {
                return Ok(());
            }
        }

        let ctx = FieldContext {
            field: &field.name,
            value: &value,
            metadata,
            record: &self.record,
            mode,
        };
        if value.is_null() {
            return Err(ctx.fail(ViolationKind::Empty, EMPTY));
        }

        check_field(&ctx)?;
        for rule in field.rules.iter().filter(|rule| rule.applies_on(mode)) {
            rule.validate(&ctx)?;
        }
        for validator in self.custom.get(&field.name).into_iter().flatten() {
            validator(&ctx)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use colguard_core::{DynamicRecord, FieldMetadata, FieldType};
    use colguard_rules::{MinLength, Slug};
    use colguard_schema::{EntityDefinition, SchemaRegistry};

    use super::*;
    use crate::options::ResolverOptions;

    fn resolver() -> MetadataResolver {
        let registry = SchemaRegistry::builder()
            .entity(
                EntityDefinition::new("Article")
                    .column("id", FieldMetadata::new(FieldType::Integer).identifier(), [])
                    .column(
                        "slug",
                        FieldMetadata::new(FieldType::String).length(20),
                        [Slug::new().into(), MinLength::new(3).on_update(false).into()],
                    )
                    .column(
                        "created_by",
                        FieldMetadata::new(FieldType::String).not_updatable(),
                        [],
                    )
                    .column(
                        "revision",
                        FieldMetadata::new(FieldType::Integer).not_insertable(),
                        [],
                    )
                    .column("note", FieldMetadata::new(FieldType::String).nullable(), [])
                    .column("state", FieldMetadata::new(FieldType::String).with_default(), []),
            )
            .entity(EntityDefinition::mapped_superclass("Base"))
            .build()
            .unwrap();
        MetadataResolver::new(registry, ResolverOptions::default())
    }

    fn article() -> DynamicRecord {
        DynamicRecord::new("Article")
            .with("slug", "hello-world")
            .with("created_by", "admin")
            .with("revision", 1)
    }

    fn validator(record: DynamicRecord, resolver: &MetadataResolver) -> EntityValidator {
        EntityValidator::new(Arc::new(record), resolver).unwrap()
    }

    #[test]
    fn construction_requires_an_entity() {
        let resolver = resolver();
        let err = EntityValidator::new(Arc::new(DynamicRecord::new("Base")), &resolver).unwrap_err();
        assert_eq!(err.to_string(), "Base is not a persisted entity");
        assert!(EntityValidator::new(Arc::new(DynamicRecord::new("Ghost")), &resolver).is_err());
    }

    #[test]
    fn null_identifier_is_only_skipped_on_insert() {
        let resolver = resolver();
        assert!(validator(article(), &resolver).validate(Mode::Insert).is_ok());
        let err = validator(article(), &resolver)
            .validate(Mode::Update)
            .unwrap_err();
        assert_eq!(err.field(), "id");
        assert_eq!(err.kind(), ViolationKind::Empty);
        assert_eq!(err.message(), "id is empty");
    }

    #[test]
    fn mode_filters_fields_and_rules() {
        let resolver = resolver();
        let record = article().with("id", 7).with("slug", "ab").with("created_by", Value::Null);
        // created_by is not updatable and min_length is insert-only.
        assert!(validator(record.clone(), &resolver).validate(Mode::Update).is_ok());

        let err = validator(record, &resolver)
            .validate(Mode::Insert)
            .unwrap_err();
        assert_eq!(err.field(), "slug");
        assert_eq!(err.message(), "slug: is less than 3 characters");

        let no_revision = article().with("revision", Value::Null);
        assert!(validator(no_revision, &resolver).validate(Mode::Insert).is_ok());
    }

    #[test]
    fn stops_at_the_first_failing_field() {
        let resolver = resolver();
        let record = article().with("slug", "-bad-").with("created_by", vec!["x"]);
        let err = validator(record, &resolver)
            .validate(Mode::Insert)
            .unwrap_err();
        assert_eq!(err.field(), "slug");
    }

    #[test]
    fn custom_validators_run_after_rules() {
        let resolver = resolver();
        let calls = Arc::new(AtomicUsize::new(0));
        let mut validator = validator(article(), &resolver);
        let counter = Arc::clone(&calls);
        validator
            .add_custom_validator("slug", move |ctx| {
                counter.fetch_add(1, Ordering::SeqCst);
                match ctx.value.as_str() {
                    Some("hello-world") => Ok(()),
                    _ => Err(ctx.fail(ViolationKind::Custom, "%s is taken")),
                }
            })
            .unwrap();
        assert!(validator.validate(Mode::Insert).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mut taken = EntityValidator::new(
            Arc::new(article().with("slug", "taken-slug")),
            &resolver,
        )
        .unwrap();
        taken
            .add_custom_validator("slug", |ctx| Err(ctx.fail(ViolationKind::Custom, "%s is taken")))
            .unwrap();
        let err = taken.validate(Mode::Insert).unwrap_err();
        assert_eq!(err.message(), "slug is taken");
    }

    #[test]
    fn custom_validators_need_a_validated_field() {
        let resolver = resolver();
        let mut validator = validator(article(), &resolver);
        let err = validator
            .add_custom_validator("missing", |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownField { ref field, .. } if field == "missing"));
    }

    #[test]
    fn listeners_hear_successful_passes_only() {
        let resolver = resolver();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: Arc<dyn PostValidateListener> =
            Arc::new(move |record: &Arc<dyn Record>, mode: Mode| {
                sink.lock().unwrap().push((record.type_name().to_string(), mode));
            });

        let ok = validator(article(), &resolver).with_listener(Arc::clone(&listener));
        ok.validate(Mode::Insert).unwrap();
        let failing = validator(article().with("slug", "!"), &resolver).with_listener(listener);
        assert!(failing.validate(Mode::Insert).is_err());

        assert_eq!(
            *seen.lock().unwrap(),
            vec![("Article".to_string(), Mode::Insert)]
        );
    }
}
