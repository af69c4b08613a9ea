//! Wiring of an application root into a ready-to-use resource cache

use crate::config::Config;
use crate::creators::{standard_registry, SettingsCreator, SettingsResource};
use crate::error::HearthResult;
use crate::resource::{AppPaths, Location, ResourceArgs, ResourceCache, ResourceKey, ResourceKind};
use crate::script::{LessProcessor, PassthroughLess, ScriptCompiler, SourceCompiler};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

/// An application root with its cache
#[derive(Clone)]
pub struct Engine {
    paths: AppPaths,
    cache: ResourceCache,
}

impl Engine {
    /// Build an engine with the default compiler and LESS processor.
    ///
    /// `root` overrides `app.root` from the configuration.
    pub fn new(config: &Config, root: Option<PathBuf>) -> Self {
        Self::with_collaborators(
            config,
            root,
            Arc::new(SourceCompiler),
            Arc::new(PassthroughLess),
        )
    }

    pub fn with_collaborators(
        config: &Config,
        root: Option<PathBuf>,
        compiler: Arc<dyn ScriptCompiler>,
        less: Arc<dyn LessProcessor>,
    ) -> Self {
        let paths = AppPaths::new(root.unwrap_or_else(|| config.app.root.clone()));
        debug!("Application root: {}", paths.root().display());

        let registry = standard_registry(paths.clone(), &config.resources, compiler, less);
        Self {
            paths,
            cache: ResourceCache::new(registry),
        }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    pub fn cache(&self) -> &ResourceCache {
        &self.cache
    }

    /// The application's `app.toml`, if it has one
    pub async fn settings(&self) -> HearthResult<Option<Arc<SettingsResource>>> {
        match self.cache.load_as::<SettingsResource>(&SettingsCreator::key()).await {
            Ok(settings) => Ok(Some(settings)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Key for a resource named on the command line or in a request.
    ///
    /// Stylesheets listed under `less` in `app.toml` are built from their
    /// LESS source even without `less`.
    pub async fn key_for(
        &self,
        kind: ResourceKind,
        name: &str,
        location: Option<Location>,
        less: bool,
    ) -> HearthResult<ResourceKey> {
        let location = location.unwrap_or_else(|| default_location(kind));

        let args = if kind == ResourceKind::Stylesheet {
            let listed = match self.settings().await? {
                Some(settings) => settings.settings().less.iter().any(|n| n == name),
                None => false,
            };
            ResourceArgs::Less(less || listed)
        } else {
            ResourceArgs::None
        };

        self.cache.key(kind, location, name, args)
    }
}

/// Where a kind lives unless told otherwise
pub fn default_location(kind: ResourceKind) -> Location {
    match kind {
        ResourceKind::Static | ResourceKind::Stylesheet => Location::Public,
        ResourceKind::Document | ResourceKind::Module => Location::Virtual,
        ResourceKind::Script | ResourceKind::Html | ResourceKind::Settings => Location::Base,
    }
}
