//! Hooks for the persistence layer.

use std::sync::Arc;

use thiserror::Error;
use tracing::warn;

use colguard_core::{Error, Mode, Record, ValidationError};

use crate::resolver::MetadataResolver;
use crate::validator::EntityValidator;

/// Receives records that passed validation.
pub trait PostValidateListener: Send + Sync {
    fn post_validate(&self, record: &Arc<dyn Record>, mode: Mode);
}

impl<F> PostValidateListener for F
where
    F: Fn(&Arc<dyn Record>, Mode) + Send + Sync,
{
    fn post_validate(&self, record: &Arc<dyn Record>, mode: Mode) {
        self(record, mode)
    }
}

/// Persistence events the subscriber reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleEvent {
    PrePersist,
    PreUpdate,
}

impl LifecycleEvent {
    pub fn mode(self) -> Mode {
        match self {
            LifecycleEvent::PrePersist => Mode::Insert,
            LifecycleEvent::PreUpdate => Mode::Update,
        }
    }
}

/// Why a write must be aborted.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Config(#[from] Error),
    #[error("{0}")]
    Validation(#[from] ValidationError),
}

/// Validates records before insert and update.
///
/// Any error returned means the surrounding write must not happen.
pub struct ValidationSubscriber {
    resolver: MetadataResolver,
    listeners: Vec<Arc<dyn PostValidateListener>>,
}

impl std::fmt::Debug for ValidationSubscriber {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationSubscriber")
            .field("resolver", &self.resolver)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl ValidationSubscriber {
    pub fn new(resolver: MetadataResolver) -> Self {
        Self {
            resolver,
            listeners: Vec::new(),
        }
    }

    pub fn with_listener(mut self, listener: Arc<dyn PostValidateListener>) -> Self {
        self.listeners.push(listener);
        self
    }

    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    pub fn subscribed_events(&self) -> &'static [LifecycleEvent] {
        &[LifecycleEvent::PrePersist, LifecycleEvent::PreUpdate]
    }

    pub fn pre_persist(&self, record: Arc<dyn Record>) -> Result<(), LifecycleError> {
        self.handle(LifecycleEvent::PrePersist, record)
    }

    pub fn pre_update(&self, record: Arc<dyn Record>) -> Result<(), LifecycleError> {
        self.handle(LifecycleEvent::PreUpdate, record)
    }

    pub fn handle(&self, event: LifecycleEvent, record: Arc<dyn Record>) -> Result<(), LifecycleError> {
        let mut validator = EntityValidator::new(record, &self.resolver)?;
        for listener in &self.listeners {
            validator = validator.with_listener(Arc::clone(listener));
        }
        validator.validate(event.mode()).map_err(|err| {
            warn!(
                entity = %err.record().type_name(),
                field = %err.field(),
                event = ?event,
                "write aborted by validation"
            );
            LifecycleError::from(err)
        })
    }
}
