//! Validation engine for colguard.
//!
//! [`MetadataResolver`] turns entity definitions into cached descriptors;
//! [`EntityValidator`] runs one fail-fast pass over a record; and
//! [`ValidationSubscriber`] wires both into persistence events.

pub mod checks;
pub mod descriptor;
pub mod lifecycle;
pub mod options;
pub mod resolver;
pub mod validator;

pub use descriptor::{DescriptorCache, EntityDescriptor, ResolvedField};
pub use lifecycle::{LifecycleError, LifecycleEvent, PostValidateListener, ValidationSubscriber};
pub use options::ResolverOptions;
pub use resolver::MetadataResolver;
pub use validator::{CustomValidator, EntityValidator};
