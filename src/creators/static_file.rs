//! Files served as-is

use crate::creators::SourceRoot;
use crate::error::HearthResult;
use crate::resource::source::{read_or_hash_source, SourceFile};
use crate::resource::{CreationContext, Location, Resource, ResourceArgs, ResourceCreator, ResourceKey, ResourceKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A static file; large files are hashed but not held in memory
#[derive(Debug)]
pub struct StaticResource {
    key: ResourceKey,
    source: SourceFile,
    created_at: DateTime<Utc>,
}

impl StaticResource {
    pub fn path(&self) -> &Path {
        self.source.path()
    }

    /// Contents, when the file was small enough to load
    pub fn bytes(&self) -> Option<&[u8]> {
        self.source.bytes.as_deref()
    }

    pub fn size(&self) -> u64 {
        self.source.stamp.size
    }
}

impl Resource for StaticResource {
    fn key(&self) -> &ResourceKey {
        &self.key
    }

    fn content_hash(&self) -> Option<&str> {
        Some(&self.source.hash)
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn watched_paths(&self) -> Vec<PathBuf> {
        vec![self.source.stamp.path.clone()]
    }

    fn needs_replacing(&self) -> HearthResult<bool> {
        self.source.stamp.is_stale()
    }
}

pub struct StaticFileCreator {
    root: SourceRoot,
}

impl StaticFileCreator {
    pub fn new(root: SourceRoot) -> Self {
        Self { root }
    }
}

#[async_trait]
impl ResourceCreator for StaticFileCreator {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Static
    }

    fn can_load(&self, _name: &str, args: &ResourceArgs) -> bool {
        matches!(args, ResourceArgs::None)
    }

    fn locate(&self, location: Location, name: &str, _args: &ResourceArgs) -> Option<PathBuf> {
        self.root.paths().resolve(location, name)
    }

    async fn create(&self, cx: &CreationContext) -> HearthResult<Arc<dyn Resource>> {
        let key = cx.key();
        let path = self.root.path_for(key)?;
        let source = read_or_hash_source(key.kind(), key.name(), &path, self.root.max_size()).await?;

        Ok(Arc::new(StaticResource {
            key: key.clone(),
            source,
            created_at: Utc::now(),
        }))
    }
}
