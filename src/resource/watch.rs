//! File-system change notifications feeding cache invalidation
//!
//! The watcher observes the application root recursively. Every change is
//! mapped to the published keys that watch the changed path, and those keys
//! are invalidated with their dependents. Evicted keys can optionally be
//! rebuilt in the background so the next request is a hit.

use crate::error::HearthResult;
use crate::resource::cache::ResourceCache;
use crate::resource::key::ResourceKey;
use crate::resource::paths::AppPaths;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::future::Future;
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Kind of file change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Modified,
    Removed,
}

/// One changed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChange {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl FileChange {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Changes carried by a notify event; access events carry none
    pub fn from_event(event: Event) -> Vec<Self> {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Modify(_) | EventKind::Any | EventKind::Other => ChangeKind::Modified,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Access(_) => return Vec::new(),
        };
        event
            .paths
            .into_iter()
            .map(|path| Self::new(path, kind))
            .collect()
    }
}

/// Maps changed paths to the cache keys built from them
#[derive(Debug, Clone)]
pub struct LocationResolver {
    paths: AppPaths,
}

impl LocationResolver {
    pub fn new(paths: AppPaths) -> Self {
        Self { paths }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Published keys affected by a change
    pub fn affected(&self, cache: &ResourceCache, change: &FileChange) -> Vec<ResourceKey> {
        let path = self.absolute(&change.path);
        if self.paths.locate(&path).is_none() {
            return Vec::new();
        }
        cache.keys_for_path(&path)
    }

    fn absolute(&self, path: &Path) -> PathBuf {
        if path.is_relative() {
            self.paths.root().join(path)
        } else {
            path.to_path_buf()
        }
    }
}

/// Applies changes to a cache
#[derive(Clone)]
pub struct ChangeHandler {
    cache: ResourceCache,
    resolver: LocationResolver,
    reload: bool,
}

impl ChangeHandler {
    pub fn new(cache: ResourceCache, resolver: LocationResolver, reload: bool) -> Self {
        Self {
            cache,
            resolver,
            reload,
        }
    }

    /// Invalidate everything built from the changed path.
    ///
    /// Returns the evicted keys. With reload enabled, each evicted key is
    /// rebuilt in a background task.
    pub fn handle(&self, change: &FileChange) -> Vec<ResourceKey> {
        let mut evicted = Vec::new();
        for key in self.resolver.affected(&self.cache, change) {
            for gone in self.cache.invalidate(&key) {
                if !evicted.contains(&gone) {
                    evicted.push(gone);
                }
            }
        }

        if evicted.is_empty() {
            debug!("{:?} {} affects no cached resource", change.kind, change.path.display());
            return evicted;
        }

        info!(
            "{:?} {}: {} resources invalidated",
            change.kind,
            change.path.display(),
            evicted.len()
        );

        if self.reload {
            for key in &evicted {
                self.reload_in_background(key.clone());
            }
        }
        evicted
    }

    fn reload_in_background(&self, key: ResourceKey) {
        let cache = self.cache.clone();
        tokio::spawn(async move {
            match cache.load(&key).await {
                Ok(_) => debug!("Reloaded {}", key),
                Err(e) if e.is_not_found() => debug!("Not reloading {}: {}", key, e),
                Err(e) => warn!("Failed to reload {}: {}", key, e),
            }
        });
    }
}

/// Recursive watch of an application root driving a `ChangeHandler`
pub struct ResourceWatcher {
    handler: ChangeHandler,
    events: mpsc::UnboundedReceiver<notify::Result<Event>>,
    _watcher: RecommendedWatcher,
}

impl ResourceWatcher {
    /// Start watching `paths.root()`
    pub fn new(cache: ResourceCache, paths: AppPaths, reload: bool) -> HearthResult<Self> {
        let (tx, events) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(paths.root(), RecursiveMode::Recursive)?;
        info!("Watching {}", paths.root().display());

        Ok(Self {
            handler: ChangeHandler::new(cache, LocationResolver::new(paths), reload),
            events,
            _watcher: watcher,
        })
    }

    pub fn handler(&self) -> &ChangeHandler {
        &self.handler
    }

    /// Process notifications until `shutdown` resolves
    pub async fn run<F>(mut self, shutdown: F) -> HearthResult<()>
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Stopping watcher");
                    return Ok(());
                }
                event = self.events.recv() => match event {
                    Some(Ok(event)) => {
                        for change in FileChange::from_event(event) {
                            self.handler.handle(&change);
                        }
                    }
                    Some(Err(e)) => warn!("Watch error: {}", e),
                    None => return Ok(()),
                },
            }
        }
    }
}
