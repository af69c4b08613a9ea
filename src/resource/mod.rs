//! Resource cache and dependency-invalidation engine
//!
//! Resources are typed artifacts identified by a structural [`ResourceKey`]
//! and built lazily by a [`ResourceCreator`]. The [`ResourceCache`] makes
//! sure each key is built at most once at a time, records the dependency
//! edges creators declare while building, and evicts dependents when one
//! of their inputs is invalidated.

pub mod cache;
pub mod creator;
pub mod graph;
pub mod hash;
pub mod inspect;
pub mod key;
pub mod model;
pub mod paths;
pub mod source;
pub mod watch;

#[cfg(test)]
pub(crate) mod testing;

pub use cache::ResourceCache;
pub use creator::{CreationContext, CreatorRegistry, ResourceCreator};
pub use inspect::CacheSnapshot;
pub use key::{Location, RequiredModule, ResourceArgs, ResourceKey, ResourceKind};
pub use model::{downcast, Resource};
pub use paths::AppPaths;
pub use watch::{ChangeKind, FileChange, LocationResolver, ResourceWatcher};
