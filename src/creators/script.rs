//! Script source files

use crate::creators::SourceRoot;
use crate::error::HearthResult;
use crate::resource::source::{read_source, SourceFile};
use crate::resource::{CreationContext, Location, Resource, ResourceArgs, ResourceCreator, ResourceKey, ResourceKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Script text, not yet compiled
#[derive(Debug)]
pub struct ScriptResource {
    key: ResourceKey,
    source: SourceFile,
    text: String,
    created_at: DateTime<Utc>,
}

impl ScriptResource {
    pub fn path(&self) -> &Path {
        self.source.path()
    }

    pub fn text(&self) -> &str {
        &self.text
    }
}

impl Resource for ScriptResource {
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

pub struct ScriptCreator {
    root: SourceRoot,
}

impl ScriptCreator {
    pub fn new(root: SourceRoot) -> Self {
        Self { root }
    }
}

#[async_trait]
impl ResourceCreator for ScriptCreator {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Script
    }

    fn can_load(&self, name: &str, args: &ResourceArgs) -> bool {
        name.ends_with(".js") && matches!(args, ResourceArgs::None)
    }

    fn locate(&self, location: Location, name: &str, _args: &ResourceArgs) -> Option<PathBuf> {
        self.root.paths().resolve(location, name)
    }

    async fn create(&self, cx: &CreationContext) -> HearthResult<Arc<dyn Resource>> {
        let key = cx.key();
        let path = self.root.path_for(key)?;
        let source = read_source(key.kind(), key.name(), &path, self.root.max_size()).await?;
        let text = source.text()?;

        Ok(Arc::new(ScriptResource {
            key: key.clone(),
            source,
            text,
            created_at: Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creators::fixture::{advance_mtime, App};
    use crate::error::HearthError;

    fn key(name: &str) -> ResourceKey {
        ResourceKey::new(ResourceKind::Script, Location::Base, name, ResourceArgs::None)
    }

    #[tokio::test]
    async fn touched_file_is_rebuilt_with_same_hash() {
        let app = App::new();
        let path = app.write("helper.js", "module.exports = 1;");

        let first = app.cache.load_as::<ScriptResource>(&key("helper.js")).await.unwrap();
        advance_mtime(&path);
        assert!(first.needs_replacing().unwrap());
        assert!(app.cache.find(&key("helper.js")).is_none());

        let second = app.cache.load_as::<ScriptResource>(&key("helper.js")).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.content_hash(), second.content_hash());
    }

    #[tokio::test]
    async fn changed_bytes_change_hash() {
        let app = App::new();
        app.write("helper.js", "module.exports = 1;");
        let first = app.cache.load_as::<ScriptResource>(&key("helper.js")).await.unwrap();

        app.touch("helper.js", "module.exports = 2;");
        let second = app.cache.load_as::<ScriptResource>(&key("helper.js")).await.unwrap();

        assert_ne!(first.content_hash(), second.content_hash());
        assert_eq!(second.text(), "module.exports = 2;");
    }

    #[tokio::test]
    async fn oversized_script_is_not_viable() {
        let app = App::with_limit(8);
        app.write("big.js", "var x = 'far too long';");

        let err = app.cache.load(&key("big.js")).await.unwrap_err();
        assert!(matches!(err.root(), HearthError::NotViable { .. }));
        assert!(app.cache.is_empty());
    }

    #[tokio::test]
    async fn non_script_names_are_rejected() {
        let app = App::new();
        let err = app.cache.load(&key("helper.ts")).await.unwrap_err();
        assert!(matches!(err, HearthError::NoSuchResource { .. }));
    }
}
