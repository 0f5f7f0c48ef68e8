/// Options that control how metadata is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResolverOptions {
    /// Keep resolved descriptors for the life of the resolver instead of
    /// rebuilding them on every pass.
    pub use_cache: bool,
}

impl ResolverOptions {
    pub fn cached() -> Self {
        Self { use_cache: true }
    }
}
