//! Stylesheets, from CSS or LESS sources
//!
//! Both creators serve `*.css` names; `ResourceArgs::Less(true)` selects the
//! LESS creator, which reads `<stem>.less` instead. After the source becomes
//! CSS, every relative `@import` and `url()` target is loaded as a
//! dependency and rewritten to that dependency's cache-busting URI, so the
//! stylesheet is rebuilt whenever something it references changes.

use crate::creators::SourceRoot;
use crate::error::{HearthError, HearthResult};
use crate::resource::hash::content_hash;
use crate::resource::source::{read_source, FileStamp};
use crate::resource::{CreationContext, Location, Resource, ResourceArgs, ResourceCreator, ResourceKey, ResourceKind};
use crate::script::{normalize, LessProcessor};
use crate::uri::UriMatch;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use regex::Regex;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"@import\s+(?:"([^"]+)"|'([^']+)')"#).expect("valid import pattern")
});

static URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"url\(\s*(?:"([^"]+)"|'([^']+)'|([^\s"')]+))\s*\)"#).expect("valid url pattern")
});

static ABSOLUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[a-zA-Z][a-zA-Z0-9+.-]*:|//|#)").expect("valid absolute pattern")
});

#[derive(Debug)]
pub struct StylesheetResource {
    key: ResourceKey,
    stamp: FileStamp,
    css: String,
    hash: String,
    created_at: DateTime<Utc>,
}

impl StylesheetResource {
    /// Served CSS, with references rewritten
    pub fn css(&self) -> &str {
        &self.css
    }

    /// The file this stylesheet was built from
    pub fn source_path(&self) -> &Path {
        &self.stamp.path
    }
}

impl Resource for StylesheetResource {
    fn key(&self) -> &ResourceKey {
        &self.key
    }

    fn content_hash(&self) -> Option<&str> {
        Some(&self.hash)
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn watched_paths(&self) -> Vec<PathBuf> {
        vec![self.stamp.path.clone()]
    }

    fn needs_replacing(&self) -> HearthResult<bool> {
        self.stamp.is_stale()
    }
}

/// Plain `.css` files
pub struct CssCreator {
    root: SourceRoot,
}

impl CssCreator {
    pub fn new(root: SourceRoot) -> Self {
        Self { root }
    }
}

#[async_trait]
impl ResourceCreator for CssCreator {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Stylesheet
    }

    fn can_load(&self, name: &str, args: &ResourceArgs) -> bool {
        name.ends_with(".css") && !args.is_less()
    }

    fn locate(&self, location: Location, name: &str, _args: &ResourceArgs) -> Option<PathBuf> {
        self.root.paths().resolve(location, name)
    }

    async fn create(&self, cx: &CreationContext) -> HearthResult<Arc<dyn Resource>> {
        let key = cx.key();
        let path = self.root.path_for(key)?;
        let source = read_source(key.kind(), key.name(), &path, self.root.max_size()).await?;
        let css = source.text()?;

        publish(cx, source.stamp, &css).await
    }
}

/// `.css` names built from a `<stem>.less` source
pub struct LessCreator {
    root: SourceRoot,
    less: Arc<dyn LessProcessor>,
}

impl LessCreator {
    pub fn new(root: SourceRoot, less: Arc<dyn LessProcessor>) -> Self {
        Self { root, less }
    }
}

#[async_trait]
impl ResourceCreator for LessCreator {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Stylesheet
    }

    fn can_load(&self, name: &str, args: &ResourceArgs) -> bool {
        name.ends_with(".css") && args.is_less()
    }

    fn locate(&self, location: Location, name: &str, _args: &ResourceArgs) -> Option<PathBuf> {
        let stem = name.strip_suffix(".css")?;
        self.root.paths().resolve(location, &format!("{}.less", stem))
    }

    async fn create(&self, cx: &CreationContext) -> HearthResult<Arc<dyn Resource>> {
        let key = cx.key();
        let path = self
            .locate(key.location(), key.name(), key.args())
            .ok_or_else(|| HearthError::not_found(key.kind(), key.name()))?;
        let source = read_source(key.kind(), key.name(), &path, self.root.max_size()).await?;
        let css = self.less.process(&path, &source.text()?).await?;
        debug!("Processed {} into {}", path.display(), key.name());

        publish(cx, source.stamp, &css).await
    }
}

async fn publish(cx: &CreationContext, stamp: FileStamp, css: &str) -> HearthResult<Arc<dyn Resource>> {
    let css = rewrite_references(cx, css).await?;
    let hash = content_hash(css.as_bytes());

    Ok(Arc::new(StylesheetResource {
        key: cx.key().clone(),
        stamp,
        css,
        hash,
        created_at: Utc::now(),
    }))
}

/// Imports first, then every `url()`
async fn rewrite_references(cx: &CreationContext, css: &str) -> HearthResult<String> {
    let css = rewrite_matches(cx, css, &IMPORT).await?;
    rewrite_matches(cx, &css, &URL).await
}

async fn rewrite_matches(cx: &CreationContext, css: &str, pattern: &Regex) -> HearthResult<String> {
    let targets: Vec<Range<usize>> = pattern
        .captures_iter(css)
        .filter_map(|caps| caps.iter().skip(1).flatten().next().map(|m| m.range()))
        .collect();

    let mut rewritten = String::with_capacity(css.len());
    let mut copied = 0;
    for range in targets {
        let target = &css[range.clone()];
        if let Some(replacement) = rewrite_target(cx, target).await? {
            rewritten.push_str(&css[copied..range.start]);
            rewritten.push_str(&replacement);
            copied = range.end;
        }
    }
    rewritten.push_str(&css[copied..]);
    Ok(rewritten)
}

/// New text for one reference, or `None` to leave it as written
async fn rewrite_target(cx: &CreationContext, target: &str) -> HearthResult<Option<String>> {
    if ABSOLUTE.is_match(target) {
        return Ok(None);
    }

    let key = cx.key();
    let split = target.find(['?', '#']).unwrap_or(target.len());
    let (reference, suffix) = target.split_at(split);

    let joined = match reference.strip_prefix('/') {
        Some(rooted) => rooted.to_string(),
        None => match key.name().rsplit_once('/') {
            Some((dir, _)) => format!("{}/{}", dir, reference),
            None => reference.to_string(),
        },
    };
    let Some(name) = normalize(&joined) else {
        warn!("{} references {} outside its location", key, target);
        return Ok(None);
    };

    let uri = UriMatch::new(&format!("/{}", name));
    let kind = if uri.path.ends_with(".css") {
        ResourceKind::Stylesheet
    } else {
        ResourceKind::Static
    };
    let dependency_key = cx.cache().key(kind, key.location(), uri.path.as_str(), ResourceArgs::None)?;

    let dependency = match cx.depend_on(&dependency_key).await {
        Ok(dependency) => dependency,
        Err(e) if e.is_not_found() => {
            warn!("{} references missing {}", key, target);
            return Ok(None);
        }
        Err(e) if matches!(e.root(), HearthError::DependencyCycle { .. }) => {
            warn!("{} is part of an import cycle through {}, leaving it as written", key, target);
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    let rewritten = if uri.versioned {
        format!("/{}", name)
    } else {
        dependency.uri().unwrap_or_else(|| format!("/{}", name))
    };
    Ok(Some(format!("{}{}", rewritten, suffix)))
}
