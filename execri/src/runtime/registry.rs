//! In-memory registries backing the runtime service.
//!
//! Registries carry no lock of their own: both live inside the runtime
//! engine and are guarded jointly by the service lock.

use crate::runtime::types::{ContainerEntry, Entry, SandboxEntry};
use std::collections::BTreeMap;

/// Registry of entries keyed by ID, iterated in ID order.
#[derive(Debug)]
pub struct Registry<E> {
    entries: BTreeMap<String, E>,
}

/// Pod sandboxes, keyed by sandbox ID.
pub type SandboxRegistry = Registry<SandboxEntry>;

/// Containers, keyed by container ID.
pub type ContainerRegistry = Registry<ContainerEntry>;

impl<E: Entry> Registry<E> {
    /// Create empty registry.
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Check if an entry exists.
    pub fn contains(&self, id: &str) -> bool {
        self.entries.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&E> {
        self.entries.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut E> {
        self.entries.get_mut(id)
    }

    /// Insert an entry under its own ID, returning the entry it replaced.
    pub fn insert(&mut self, entry: E) -> Option<E> {
        self.entries.insert(entry.id().to_string(), entry)
    }

    pub fn remove(&mut self, id: &str) -> Option<E> {
        self.entries.remove(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.entries.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut E> {
        self.entries.values_mut()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<E: Entry> Default for Registry<E> {
    fn default() -> Self {
        Self::new()
    }
}
