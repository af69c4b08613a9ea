//! The published resource contract

use crate::error::HearthResult;
use crate::resource::key::ResourceKey;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Upcasting support so `Arc<dyn Resource>` can be recovered as its concrete type
pub trait AsAny: Any + Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Any + Send + Sync> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A published artifact.
///
/// Resources are immutable once published. Their dependents are tracked by
/// the cache as key-based edges, not by the resource itself.
pub trait Resource: AsAny + fmt::Debug {
    /// The key this resource was built for
    fn key(&self) -> &ResourceKey;

    /// Content identity of the served bytes, computed once at construction
    fn content_hash(&self) -> Option<&str>;

    /// When construction finished
    fn created_at(&self) -> DateTime<Utc>;

    /// Paths whose changes should invalidate this resource, including
    /// optional inputs that did not exist at construction time
    fn watched_paths(&self) -> Vec<PathBuf> {
        Vec::new()
    }

    /// Staleness predicate, checked before a published entry is handed out
    fn needs_replacing(&self) -> HearthResult<bool>;

    /// Cache-busting URI of the form `/<hash>/<name>`
    fn uri(&self) -> Option<String> {
        self.content_hash()
            .map(|hash| format!("/{}/{}", hash, self.key().name()))
    }
}

/// Recover the concrete resource type
pub fn downcast<T: Resource>(resource: Arc<dyn Resource>) -> Option<Arc<T>> {
    resource.into_any().downcast::<T>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::key::{Location, ResourceArgs, ResourceKind};

    #[derive(Debug)]
    struct Fixed {
        key: ResourceKey,
        hash: Option<String>,
    }

    impl Resource for Fixed {
        fn key(&self) -> &ResourceKey {
            &self.key
        }

        fn content_hash(&self) -> Option<&str> {
            self.hash.as_deref()
        }

        fn created_at(&self) -> DateTime<Utc> {
            DateTime::<Utc>::UNIX_EPOCH
        }

        fn needs_replacing(&self) -> HearthResult<bool> {
            Ok(false)
        }
    }

    fn fixed(hash: Option<&str>) -> Fixed {
        Fixed {
            key: ResourceKey::new(ResourceKind::Static, Location::Public, "js/app.js", ResourceArgs::None),
            hash: hash.map(str::to_string),
        }
    }

    #[test]
    fn uri_uses_hash_and_name() {
        assert_eq!(fixed(Some("abc123")).uri().unwrap(), "/abc123/js/app.js");
        assert!(fixed(None).uri().is_none());
    }

    #[test]
    fn downcast_recovers_concrete_type() {
        let resource: Arc<dyn Resource> = Arc::new(fixed(Some("abc")));
        let recovered = downcast::<Fixed>(resource).unwrap();
        assert_eq!(recovered.hash.as_deref(), Some("abc"));
    }
}
