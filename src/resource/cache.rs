//! Concurrent resource cache
//!
//! Maps a `ResourceKey` to either a published resource or an in-flight
//! construction. An absent key is the empty state.
//!
//! # Entry States
//!
//! | State | Meaning |
//! |-------|---------|
//! | absent | Nothing cached; the next `load` starts a construction |
//! | Pending | One construction in flight; later callers join it |
//! | Published | Built; handed out while `needs_replacing` is false |
//!
//! Construction runs in its own task, so it finishes even when every
//! caller stops waiting. A construction whose entry was invalidated while
//! it ran is discarded and its waiters start over.
//!
//! Constructions that wait on other constructions are tracked in a
//! wait-for map. Joining a construction that already waits, directly or
//! transitively, on the joining one fails with `DependencyCycle`.

use crate::error::{HearthError, HearthResult};
use crate::resource::creator::{CreationContext, CreatorRegistry, ResourceCreator};
use crate::resource::key::{Location, ResourceArgs, ResourceKey, ResourceKind};
use crate::resource::model::{downcast, Resource};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

type Completion = Shared<BoxFuture<'static, BuildOutcome>>;

/// How a construction ended, as seen by everyone waiting on it
#[derive(Clone)]
pub(crate) enum BuildOutcome {
    Published(Arc<dyn Resource>),
    /// Built, but the entry was invalidated meanwhile
    Discarded,
    Failed(Arc<HearthError>),
}

pub(crate) struct PendingBuild {
    pub(crate) id: u64,
    pub(crate) superseded: bool,
    completion: Completion,
}

pub(crate) struct PublishedEntry {
    pub(crate) resource: Arc<dyn Resource>,
    /// Keys to invalidate when this resource goes away
    pub(crate) dependents: HashSet<ResourceKey>,
}

pub(crate) enum Slot {
    Pending(PendingBuild),
    Published(PublishedEntry),
}

/// Construction key to the keys whose constructions it is waiting on
type WaitFor = HashMap<ResourceKey, Vec<ResourceKey>>;

struct Inner {
    entries: DashMap<ResourceKey, Slot>,
    registry: CreatorRegistry,
    next_build: AtomicU64,
    waits: Mutex<WaitFor>,
}

enum Claim {
    Ready(Arc<dyn Resource>),
    Wait(Completion, Option<WaitEdge>),
}

/// One recorded wait, removed when the waiter stops waiting
struct WaitEdge {
    cache: ResourceCache,
    waiter: ResourceKey,
    target: ResourceKey,
}

impl Drop for WaitEdge {
    fn drop(&mut self) {
        let mut waits = self.cache.waits();
        if let Some(targets) = waits.get_mut(&self.waiter) {
            if let Some(at) = targets.iter().position(|t| t == &self.target) {
                targets.swap_remove(at);
            }
            if targets.is_empty() {
                waits.remove(&self.waiter);
            }
        }
    }
}

/// Whether following waits from `from` reaches any of `keys`
fn waits_on(waits: &WaitFor, from: &ResourceKey, keys: &[ResourceKey]) -> bool {
    let mut stack = vec![from];
    let mut seen = HashSet::new();
    while let Some(current) = stack.pop() {
        if keys.contains(current) {
            return true;
        }
        if seen.insert(current) {
            stack.extend(waits.get(current).into_iter().flatten());
        }
    }
    false
}

/// Shared handle to the cache; clones refer to the same entries
#[derive(Clone)]
pub struct ResourceCache {
    inner: Arc<Inner>,
}

impl ResourceCache {
    /// Create an empty cache served by `registry`
    pub fn new(registry: CreatorRegistry) -> Self {
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                registry,
                next_build: AtomicU64::new(1),
                waits: Mutex::new(HashMap::new()),
            }),
        }
    }

    pub fn registry(&self) -> &CreatorRegistry {
        &self.inner.registry
    }

    /// Build a key, rejecting kinds with no registered creator
    pub fn key(
        &self,
        kind: ResourceKind,
        location: Location,
        name: impl Into<String>,
        args: ResourceArgs,
    ) -> HearthResult<ResourceKey> {
        self.inner.registry.key(kind, location, name, args)
    }

    /// Cache-only lookup. Never constructs.
    ///
    /// A stale published resource is evicted, with its dependents, and
    /// reported as absent.
    pub fn find(&self, key: &ResourceKey) -> Option<Arc<dyn Resource>> {
        let resource = self.published(key)?;
        if self.is_stale(&resource) {
            self.invalidate_matching(key, Some(&resource));
            return None;
        }
        Some(resource)
    }

    /// Typed `find`
    pub fn find_as<T: Resource>(&self, key: &ResourceKey) -> Option<Arc<T>> {
        self.find(key).and_then(downcast::<T>)
    }

    /// Find-or-build.
    ///
    /// Concurrent calls for the same key share one construction and all
    /// receive the same resource or the same error.
    pub async fn load(&self, key: &ResourceKey) -> HearthResult<Arc<dyn Resource>> {
        self.load_from(key, &[]).await
    }

    /// `load` on behalf of constructions already in progress for `ancestors`
    pub(crate) async fn load_from(
        &self,
        key: &ResourceKey,
        ancestors: &[ResourceKey],
    ) -> HearthResult<Arc<dyn Resource>> {
        loop {
            let (completion, _edge) = match self.claim(key, ancestors)? {
                Claim::Ready(resource) => return Ok(resource),
                Claim::Wait(completion, edge) => (completion, edge),
            };

            match completion.await {
                BuildOutcome::Published(resource) => return Ok(resource),
                BuildOutcome::Failed(error) => return Err(HearthError::Shared(error)),
                BuildOutcome::Discarded => {
                    debug!("Construction of {} was superseded, retrying", key);
                }
            }
        }
    }

    /// Typed `load`
    pub async fn load_as<T: Resource>(&self, key: &ResourceKey) -> HearthResult<Arc<T>> {
        let resource = self.load(key).await?;
        downcast::<T>(resource)
            .ok_or_else(|| HearthError::Internal(format!("{} did not build the expected type", key)))
    }

    /// Number of published resources
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .iter()
            .filter(|slot| matches!(slot.value(), Slot::Published(_)))
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Whether a construction is in flight for `key`
    pub fn is_pending(&self, key: &ResourceKey) -> bool {
        self.inner
            .entries
            .get(key)
            .is_some_and(|slot| matches!(slot.value(), Slot::Pending(_)))
    }

    /// Published keys whose resources watch `path`
    pub fn keys_for_path(&self, path: &Path) -> Vec<ResourceKey> {
        self.inner
            .entries
            .iter()
            .filter_map(|slot| match slot.value() {
                Slot::Published(entry) if entry.resource.watched_paths().iter().any(|p| p == path) => {
                    Some(slot.key().clone())
                }
                _ => None,
            })
            .collect()
    }

    /// Snapshot of every published resource with its dependents
    pub(crate) fn published_entries(&self) -> Vec<(Arc<dyn Resource>, Vec<ResourceKey>)> {
        self.inner
            .entries
            .iter()
            .filter_map(|slot| match slot.value() {
                Slot::Published(entry) => Some((
                    entry.resource.clone(),
                    entry.dependents.iter().cloned().collect(),
                )),
                Slot::Pending(_) => None,
            })
            .collect()
    }

    pub(crate) fn entries(&self) -> &DashMap<ResourceKey, Slot> {
        &self.inner.entries
    }

    pub(crate) fn published(&self, key: &ResourceKey) -> Option<Arc<dyn Resource>> {
        self.inner.entries.get(key).and_then(|slot| match slot.value() {
            Slot::Published(entry) => Some(entry.resource.clone()),
            Slot::Pending(_) => None,
        })
    }

    fn is_stale(&self, resource: &Arc<dyn Resource>) -> bool {
        match resource.needs_replacing() {
            Ok(stale) => {
                if stale {
                    debug!("{} needs replacing", resource.key());
                }
                stale
            }
            Err(e) => {
                warn!("Staleness check failed for {}, replacing: {}", resource.key(), e);
                true
            }
        }
    }

    fn claim(&self, key: &ResourceKey, ancestors: &[ResourceKey]) -> HearthResult<Claim> {
        if let Some(resource) = self.published(key) {
            if !self.is_stale(&resource) {
                return Ok(Claim::Ready(resource));
            }
            self.invalidate_matching(key, Some(&resource));
        }

        let creator = self.inner.registry.select(key)?;

        // held across the join decision so two constructions cannot both
        // start waiting on each other
        let mut waits = self.waits();
        let waiter = ancestors.last();

        let completion = match self.inner.entries.entry(key.clone()) {
            Entry::Occupied(occupied) => match occupied.get() {
                Slot::Pending(pending) => {
                    if let Some(waiter) = waiter {
                        if waits_on(&waits, key, ancestors) {
                            warn!("{} and {} are waiting on each other", waiter, key);
                            return Err(HearthError::DependencyCycle {
                                key: waiter.to_string(),
                                dependency: key.to_string(),
                            });
                        }
                    }
                    debug!("Joining construction of {}", key);
                    pending.completion.clone()
                }
                Slot::Published(entry) => return Ok(Claim::Ready(entry.resource.clone())),
            },
            Entry::Vacant(vacant) => {
                let pending = self.start_build(key, creator, ancestors.to_vec());
                let completion = pending.completion.clone();
                vacant.insert(Slot::Pending(pending));
                completion
            }
        };

        let edge = waiter.map(|waiter| {
            waits.entry(waiter.clone()).or_default().push(key.clone());
            WaitEdge {
                cache: self.clone(),
                waiter: waiter.clone(),
                target: key.clone(),
            }
        });

        Ok(Claim::Wait(completion, edge))
    }

    fn waits(&self) -> MutexGuard<'_, WaitFor> {
        self.inner
            .waits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn start_build(
        &self,
        key: &ResourceKey,
        creator: Arc<dyn ResourceCreator>,
        ancestors: Vec<ResourceKey>,
    ) -> PendingBuild {
        let id = self.inner.next_build.fetch_add(1, Ordering::Relaxed);
        debug!("Starting construction #{} of {}", id, key);

        let cache = self.clone();
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let cx = CreationContext::new(cache.clone(), task_key.clone(), ancestors);
            let result = creator.create(&cx).await;
            cache.complete(id, &task_key, result)
        });

        let cache = self.clone();
        let key = key.clone();
        let completion = async move {
            match handle.await {
                Ok(outcome) => outcome,
                Err(join_error) => {
                    cache.abandon(id, &key);
                    if join_error.is_panic() {
                        std::panic::resume_unwind(join_error.into_panic());
                    }
                    BuildOutcome::Failed(Arc::new(HearthError::Internal(format!(
                        "construction of {} was cancelled",
                        key
                    ))))
                }
            }
        }
        .boxed()
        .shared();

        PendingBuild {
            id,
            superseded: false,
            completion,
        }
    }

    /// Evaluate a finished construction against the entry's current state
    fn complete(
        &self,
        id: u64,
        key: &ResourceKey,
        result: HearthResult<Arc<dyn Resource>>,
    ) -> BuildOutcome {
        let Entry::Occupied(mut occupied) = self.inner.entries.entry(key.clone()) else {
            debug!("Entry for {} vanished during construction #{}", key, id);
            return match result {
                Ok(_) => BuildOutcome::Discarded,
                Err(e) => BuildOutcome::Failed(Arc::new(e)),
            };
        };

        let superseded = match occupied.get() {
            Slot::Pending(pending) if pending.id == id => pending.superseded,
            _ => {
                debug!("Construction #{} of {} no longer owns its entry", id, key);
                return match result {
                    Ok(_) => BuildOutcome::Discarded,
                    Err(e) => BuildOutcome::Failed(Arc::new(e)),
                };
            }
        };

        match result {
            Ok(resource) if !superseded => {
                debug_assert_eq!(resource.key(), key, "creator built the wrong key");
                occupied.insert(Slot::Published(PublishedEntry {
                    resource: resource.clone(),
                    dependents: HashSet::new(),
                }));
                info!("Published {}", key);
                BuildOutcome::Published(resource)
            }
            Ok(_) => {
                occupied.remove();
                debug!("Discarded construction #{} of {}: invalidated while building", id, key);
                BuildOutcome::Discarded
            }
            Err(e) => {
                occupied.remove();
                warn!("Failed to build {}: {}", key, e);
                BuildOutcome::Failed(Arc::new(e))
            }
        }
    }

    /// Drop a pending entry whose construction task died
    fn abandon(&self, id: u64, key: &ResourceKey) {
        self.inner
            .entries
            .remove_if(key, |_, slot| matches!(slot, Slot::Pending(p) if p.id == id));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::testing::{key, TestCreator, TestResource};
    use std::time::Duration;

    fn cache_with(creators: &[Arc<TestCreator>]) -> ResourceCache {
        let mut registry = CreatorRegistry::new();
        for creator in creators {
            registry.register(creator.clone());
        }
        ResourceCache::new(registry)
    }

    #[tokio::test]
    async fn find_never_constructs() {
        let creator = TestCreator::new(ResourceKind::Document);
        let cache = cache_with(&[creator.clone()]);

        assert!(cache.find(&key("index")).is_none());
        assert_eq!(creator.calls(), 0);
        assert!(!cache.is_pending(&key("index")));
    }

    #[tokio::test]
    async fn load_publishes_and_hits() {
        let creator = TestCreator::new(ResourceKind::Document);
        let cache = cache_with(&[creator.clone()]);

        let first = cache.load(&key("index")).await.unwrap();
        let second = cache.load(&key("index")).await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(creator.calls(), 1);
        assert!(cache.find(&key("index")).is_some());
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_loads_join_one_construction() {
        let creator = TestCreator::new(ResourceKind::Document).with_delay(Duration::from_millis(50));
        let cache = cache_with(&[creator.clone()]);

        let tasks: Vec<_> = (0..6)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.load(&key("index")).await })
            })
            .collect();

        let mut results = Vec::new();
        for task in tasks {
            results.push(task.await.unwrap().unwrap());
        }

        assert_eq!(creator.calls(), 1);
        assert_eq!(results.len(), 6);
        assert!(results.iter().all(|r| Arc::ptr_eq(r, &results[0])));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn distinct_keys_stay_distinct() {
        let creator = TestCreator::new(ResourceKind::Document).with_delay(Duration::from_millis(20));
        let cache = cache_with(&[creator.clone()]);

        let tasks: Vec<_> = (0..24)
            .map(|i| {
                let cache = cache.clone();
                let name = if i % 2 == 0 { "index" } else { "other" };
                tokio::spawn(async move { cache.load(&key(name)).await })
            })
            .collect();

        for task in tasks {
            let resource = task.await.unwrap().unwrap();
            assert!(["index", "other"].contains(&resource.key().name()));
        }

        assert_eq!(creator.calls_for("index"), 1);
        assert_eq!(creator.calls_for("other"), 1);
        assert_eq!(
            cache.find(&key("index")).unwrap().key().name(),
            "index"
        );
        assert_eq!(
            cache.find(&key("other")).unwrap().key().name(),
            "other"
        );
    }

    #[tokio::test]
    async fn failures_are_not_cached() {
        let creator = TestCreator::new(ResourceKind::Document).failing(1);
        let cache = cache_with(&[creator.clone()]);

        let err = cache.load(&key("index")).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(cache.find(&key("index")).is_none());
        assert!(!cache.is_pending(&key("index")));

        cache.load(&key("index")).await.unwrap();
        assert_eq!(creator.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn joined_waiters_share_the_failure() {
        let creator = TestCreator::new(ResourceKind::Document)
            .with_delay(Duration::from_millis(30))
            .failing(1);
        let cache = cache_with(&[creator.clone()]);

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move { cache.load(&key("index")).await })
            })
            .collect();

        for task in tasks {
            let err = task.await.unwrap().unwrap_err();
            assert!(matches!(err.root(), HearthError::Io { .. }));
        }
        assert_eq!(creator.calls(), 1);
    }

    #[tokio::test]
    async fn unknown_name_is_no_such_resource() {
        let creator = TestCreator::new(ResourceKind::Document).rejecting("secret");
        let cache = cache_with(&[creator.clone()]);

        let err = cache.load(&key("secret")).await.unwrap_err();
        assert!(matches!(err, HearthError::NoSuchResource { .. }));
        assert_eq!(creator.calls(), 0);
    }

    #[tokio::test]
    async fn stale_resource_is_rebuilt() {
        let creator = TestCreator::new(ResourceKind::Document);
        let cache = cache_with(&[creator.clone()]);

        let first = cache.load_as::<TestResource>(&key("index")).await.unwrap();
        first.mark_stale();

        assert!(cache.find(&key("index")).is_none());

        let second = cache.load_as::<TestResource>(&key("index")).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(creator.calls(), 2);
    }

    #[tokio::test]
    async fn load_replaces_stale_without_find() {
        let creator = TestCreator::new(ResourceKind::Document);
        let cache = cache_with(&[creator.clone()]);

        let first = cache.load_as::<TestResource>(&key("index")).await.unwrap();
        first.mark_stale();

        let second = cache.load_as::<TestResource>(&key("index")).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(creator.calls(), 2);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn invalidated_build_is_discarded_and_retried() {
        let creator = TestCreator::new(ResourceKind::Document).gated();
        let cache = cache_with(&[creator.clone()]);

        let loader = {
            let cache = cache.clone();
            tokio::spawn(async move { cache.load(&key("index")).await })
        };

        while !cache.is_pending(&key("index")) {
            tokio::task::yield_now().await;
        }

        // nothing is published yet, so nothing is evicted
        assert!(cache.invalidate(&key("index")).is_empty());

        creator.open_gate(2);
        let resource = loader.await.unwrap().unwrap();

        assert_eq!(creator.calls(), 2);
        assert_eq!(resource.key(), &key("index"));
        assert!(cache.find(&key("index")).is_some());
    }
}
