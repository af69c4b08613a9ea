//! HTML markup

use crate::creators::SourceRoot;
use crate::error::HearthResult;
use crate::resource::source::{read_source, SourceFile};
use crate::resource::{CreationContext, Location, Resource, ResourceArgs, ResourceCreator, ResourceKey, ResourceKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug)]
pub struct HtmlResource {
    key: ResourceKey,
    source: SourceFile,
    html: String,
    created_at: DateTime<Utc>,
}

impl HtmlResource {
    pub fn html(&self) -> &str {
        &self.html
    }
}

impl Resource for HtmlResource {
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

pub struct HtmlCreator {
    root: SourceRoot,
}

impl HtmlCreator {
    pub fn new(root: SourceRoot) -> Self {
        Self { root }
    }
}

#[async_trait]
impl ResourceCreator for HtmlCreator {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Html
    }

    fn can_load(&self, name: &str, args: &ResourceArgs) -> bool {
        name.ends_with(".html") && matches!(args, ResourceArgs::None)
    }

    fn locate(&self, location: Location, name: &str, _args: &ResourceArgs) -> Option<PathBuf> {
        self.root.paths().resolve(location, name)
    }

    async fn create(&self, cx: &CreationContext) -> HearthResult<Arc<dyn Resource>> {
        let key = cx.key();
        let path = self.root.path_for(key)?;
        let source = read_source(key.kind(), key.name(), &path, self.root.max_size()).await?;
        let html = source.text()?;

        Ok(Arc::new(HtmlResource {
            key: key.clone(),
            source,
            html,
            created_at: Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creators::fixture::App;
    use crate::error::HearthError;

    fn key(name: &str) -> ResourceKey {
        ResourceKey::new(ResourceKind::Html, Location::Base, name, ResourceArgs::None)
    }

    #[tokio::test]
    async fn loads_markup() {
        let app = App::new();
        app.write("index.html", "<html><body>hi</body></html>");

        let html = app.cache.load_as::<HtmlResource>(&key("index.html")).await.unwrap();
        assert!(html.html().contains("hi"));
        assert_eq!(html.watched_paths(), vec![app.path("index.html")]);
    }

    #[tokio::test]
    async fn invalid_utf8_is_not_viable() {
        let app = App::new();
        std::fs::write(app.path("broken.html"), [0xff, 0xfe, 0x00]).unwrap();

        let err = app.cache.load(&key("broken.html")).await.unwrap_err();
        assert!(matches!(err.root(), HearthError::NotViable { .. }));
    }

    #[tokio::test]
    async fn names_cannot_escape_the_root() {
        let app = App::new();
        let err = app.cache.load(&key("../outside.html")).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
