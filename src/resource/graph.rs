//! Dependency edges and the invalidation cascade
//!
//! Edges point from a dependency to its dependents and are stored as keys
//! in the dependency's cache entry. Evicting a resource evicts everything
//! reachable through those edges.

use crate::resource::cache::{ResourceCache, Slot};
use crate::resource::key::ResourceKey;
use crate::resource::model::Resource;
use dashmap::mapref::entry::Entry;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info};

enum Eviction {
    Evicted(Vec<ResourceKey>),
    Superseded,
    Untouched,
}

fn same_resource(a: &Arc<dyn Resource>, b: &Arc<dyn Resource>) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

impl ResourceCache {
    /// Record that `dependent` was built from `dependency`.
    ///
    /// Idempotent. If `dependency` is no longer published, the dependent's
    /// in-flight construction is superseded so it cannot publish content
    /// built from an evicted input.
    ///
    /// # Panics
    ///
    /// When a key is made to depend on itself.
    pub fn add_dependent(&self, dependency: &ResourceKey, dependent: &ResourceKey) {
        self.record_dependent(dependency, None, dependent);
    }

    /// `add_dependent` for a dependent built from the instance `used`.
    ///
    /// If `dependency` now maps to another instance, the dependent was built
    /// from a replaced input and its construction is superseded instead.
    pub(crate) fn add_dependent_checked(
        &self,
        dependency: &ResourceKey,
        used: &Arc<dyn Resource>,
        dependent: &ResourceKey,
    ) {
        self.record_dependent(dependency, Some(used), dependent);
    }

    fn record_dependent(
        &self,
        dependency: &ResourceKey,
        used: Option<&Arc<dyn Resource>>,
        dependent: &ResourceKey,
    ) {
        assert!(
            dependency != dependent,
            "a resource cannot depend on itself: {}",
            dependency
        );

        let recorded = match self.entries().get_mut(dependency) {
            Some(mut slot) => match slot.value_mut() {
                Slot::Published(entry)
                    if used.map_or(true, |used| same_resource(&entry.resource, used)) =>
                {
                    if entry.dependents.insert(dependent.clone()) {
                        debug!("{} is depending on {}", dependent, dependency);
                    }
                    true
                }
                _ => false,
            },
            None => false,
        };

        if !recorded {
            debug!(
                "{} was replaced before {} finished with it",
                dependency, dependent
            );
            self.supersede(dependent);
        }
    }

    /// Current dependents of a published resource
    pub fn dependents(&self, key: &ResourceKey) -> Vec<ResourceKey> {
        self.entries()
            .get(key)
            .map(|slot| match slot.value() {
                Slot::Published(entry) => entry.dependents.iter().cloned().collect(),
                Slot::Pending(_) => Vec::new(),
            })
            .unwrap_or_default()
    }

    /// Evict `key` and, transitively, everything that depends on it.
    ///
    /// A construction in flight for any visited key is superseded instead.
    /// Returns the evicted keys.
    pub fn invalidate(&self, key: &ResourceKey) -> Vec<ResourceKey> {
        self.invalidate_matching(key, None)
    }

    /// `invalidate`, but only if `key` still maps to `expected`
    pub(crate) fn invalidate_matching(
        &self,
        key: &ResourceKey,
        expected: Option<&Arc<dyn Resource>>,
    ) -> Vec<ResourceKey> {
        let mut evicted = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(key.clone(), expected)];

        while let Some((current, expected)) = stack.pop() {
            if !visited.insert(current.clone()) {
                continue;
            }

            match self.evict(&current, expected) {
                Eviction::Evicted(dependents) => {
                    debug!("Evicted {}", current);
                    stack.extend(dependents.into_iter().map(|dependent| (dependent, None)));
                    evicted.push(current);
                }
                Eviction::Superseded => {
                    debug!("Superseded in-flight construction of {}", current);
                }
                Eviction::Untouched => {}
            }
        }

        if !evicted.is_empty() {
            info!("Invalidated {} ({} resources evicted)", key, evicted.len());
        }
        evicted
    }

    fn evict(&self, key: &ResourceKey, expected: Option<&Arc<dyn Resource>>) -> Eviction {
        let Entry::Occupied(mut occupied) = self.entries().entry(key.clone()) else {
            return Eviction::Untouched;
        };

        let matches = match occupied.get_mut() {
            Slot::Pending(pending) => {
                pending.superseded = true;
                return Eviction::Superseded;
            }
            Slot::Published(entry) => expected.map_or(true, |e| same_resource(&entry.resource, e)),
        };
        if !matches {
            return Eviction::Untouched;
        }

        match occupied.remove() {
            Slot::Published(entry) => Eviction::Evicted(entry.dependents.into_iter().collect()),
            Slot::Pending(_) => Eviction::Untouched,
        }
    }

    fn supersede(&self, key: &ResourceKey) {
        if let Some(mut slot) = self.entries().get_mut(key) {
            if let Slot::Pending(pending) = slot.value_mut() {
                pending.superseded = true;
            }
        }
    }
}
