//! # Source Registry
//!
//! The set of sources that currently own a listener task.
//!
//! Mutation requires `&mut self`, and the only owner is the
//! `DiscoveryListener`, so check-then-insert never races without any lock.

use std::collections::HashSet;

use shared_types::SourceId;

/// Registered source identifiers.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    sources: HashSet<SourceId>,
}

impl SourceRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `source`.
    ///
    /// Returns `true` if it was not registered before, `false` otherwise.
    pub fn try_register(&mut self, source: SourceId) -> bool {
        self.sources.insert(source)
    }

    /// Remove `source` so a later announcement registers it again.
    ///
    /// Returns `true` if it was registered.
    pub fn deregister(&mut self, source: &SourceId) -> bool {
        self.sources.remove(source)
    }

    /// Whether `source` is registered.
    #[must_use]
    pub fn contains(&self, source: &SourceId) -> bool {
        self.sources.contains(source)
    }

    /// Number of registered sources.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Whether no source is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Registered sources in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &SourceId> {
        self.sources.iter()
    }
}
