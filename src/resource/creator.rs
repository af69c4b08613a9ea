//! Resource creators and dispatch
//!
//! Each resource kind registers one or more creators. A request is served
//! by the first creator of its kind, in registration order, whose
//! `can_load` accepts the name and arguments.

use crate::error::{HearthError, HearthResult};
use crate::resource::cache::ResourceCache;
use crate::resource::key::{Location, ResourceArgs, ResourceKey, ResourceKind};
use crate::resource::model::{downcast, Resource};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Typed constructor for one resource kind
#[async_trait]
pub trait ResourceCreator: Send + Sync {
    /// The kind of resource this creator builds
    fn kind(&self) -> ResourceKind;

    /// Capability predicate, used to choose among creators of the same kind
    fn can_load(&self, name: &str, args: &ResourceArgs) -> bool;

    /// Deterministic backing path for a resource, if it is file backed
    fn locate(&self, location: Location, name: &str, args: &ResourceArgs) -> Option<PathBuf>;

    /// Build the resource for `cx.key()`.
    ///
    /// Sub-resources must be obtained through `cx.depend_on` so the
    /// dependency edge is recorded.
    async fn create(&self, cx: &CreationContext) -> HearthResult<Arc<dyn Resource>>;
}

/// Ordered table of creators, built once at startup
#[derive(Clone, Default)]
pub struct CreatorRegistry {
    creators: Vec<Arc<dyn ResourceCreator>>,
}

impl CreatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a creator; earlier registrations win ties
    pub fn register(&mut self, creator: Arc<dyn ResourceCreator>) -> &mut Self {
        self.creators.push(creator);
        self
    }

    /// Builder-style `register`
    pub fn with(mut self, creator: Arc<dyn ResourceCreator>) -> Self {
        self.register(creator);
        self
    }

    /// Whether any creator serves this kind
    pub fn handles(&self, kind: ResourceKind) -> bool {
        self.creators.iter().any(|c| c.kind() == kind)
    }

    /// Kinds with at least one creator, sorted
    pub fn kinds(&self) -> Vec<ResourceKind> {
        let mut kinds: Vec<_> = self.creators.iter().map(|c| c.kind()).collect();
        kinds.sort();
        kinds.dedup();
        kinds
    }

    /// Build a key, rejecting kinds nothing can construct
    pub fn key(
        &self,
        kind: ResourceKind,
        location: Location,
        name: impl Into<String>,
        args: ResourceArgs,
    ) -> HearthResult<ResourceKey> {
        if !self.handles(kind) {
            return Err(HearthError::NoCreator(kind));
        }
        Ok(ResourceKey::new(kind, location, name, args))
    }

    /// The creator responsible for a key
    pub fn select(&self, key: &ResourceKey) -> HearthResult<Arc<dyn ResourceCreator>> {
        self.creators
            .iter()
            .filter(|c| c.kind() == key.kind())
            .find(|c| c.can_load(key.name(), key.args()))
            .cloned()
            .ok_or_else(|| HearthError::NoSuchResource {
                key: key.to_string(),
            })
    }

    /// Backing path of a key according to its creator
    pub fn locate(&self, key: &ResourceKey) -> Option<PathBuf> {
        self.select(key)
            .ok()
            .and_then(|c| c.locate(key.location(), key.name(), key.args()))
    }
}

/// Handle given to a creator for the duration of one construction
pub struct CreationContext {
    cache: ResourceCache,
    key: ResourceKey,
    /// Constructions waiting on this one, outermost first
    ancestors: Vec<ResourceKey>,
}

impl CreationContext {
    pub(crate) fn new(cache: ResourceCache, key: ResourceKey, ancestors: Vec<ResourceKey>) -> Self {
        Self {
            cache,
            key,
            ancestors,
        }
    }

    /// The key under construction
    pub fn key(&self) -> &ResourceKey {
        &self.key
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// Load a sub-resource and record that the resource under construction
    /// depends on it.
    ///
    /// Depending on a key that is itself waiting for this construction would
    /// never complete, so it fails with `DependencyCycle`.
    pub async fn depend_on(&self, dependency: &ResourceKey) -> HearthResult<Arc<dyn Resource>> {
        if dependency == &self.key || self.ancestors.contains(dependency) {
            return Err(HearthError::DependencyCycle {
                key: self.key.to_string(),
                dependency: dependency.to_string(),
            });
        }

        let mut chain = self.ancestors.clone();
        chain.push(self.key.clone());

        let resource = self.cache.load_from(dependency, &chain).await?;
        self.cache
            .add_dependent_checked(dependency, &resource, &self.key);
        Ok(resource)
    }

    /// Typed `depend_on`
    pub async fn depend_on_as<T: Resource>(&self, dependency: &ResourceKey) -> HearthResult<Arc<T>> {
        let resource = self.depend_on(dependency).await?;
        downcast::<T>(resource).ok_or_else(|| {
            HearthError::Internal(format!("{} did not build the expected type", dependency))
        })
    }
}
