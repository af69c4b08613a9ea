//! The application settings file, `app.toml` in the application root

use crate::creators::SourceRoot;
use crate::error::{HearthError, HearthResult};
use crate::resource::source::{read_source, SourceFile};
use crate::resource::{CreationContext, Location, Resource, ResourceArgs, ResourceCreator, ResourceKey, ResourceKind};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

pub const SETTINGS_FILE: &str = "app.toml";

/// Settings an application declares about itself
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppSettings {
    /// Display name
    pub name: Option<String>,

    /// Document served for the application root
    pub index: String,

    /// Stylesheets built from `.less` sources, by `.css` name
    pub less: Vec<String>,

    /// Documents to build when watching starts
    pub preload: Vec<String>,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            name: None,
            index: "index".to_string(),
            less: Vec::new(),
            preload: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct SettingsResource {
    key: ResourceKey,
    source: SourceFile,
    settings: AppSettings,
    created_at: DateTime<Utc>,
}

impl SettingsResource {
    pub fn settings(&self) -> &AppSettings {
        &self.settings
    }
}

impl Resource for SettingsResource {
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

pub struct SettingsCreator {
    root: SourceRoot,
}

impl SettingsCreator {
    pub fn new(root: SourceRoot) -> Self {
        Self { root }
    }

    /// Key of the settings file
    pub fn key() -> ResourceKey {
        ResourceKey::new(ResourceKind::Settings, Location::Base, SETTINGS_FILE, ResourceArgs::None)
    }
}

#[async_trait]
impl ResourceCreator for SettingsCreator {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Settings
    }

    fn can_load(&self, name: &str, args: &ResourceArgs) -> bool {
        name == SETTINGS_FILE && matches!(args, ResourceArgs::None)
    }

    fn locate(&self, location: Location, name: &str, _args: &ResourceArgs) -> Option<PathBuf> {
        self.root.paths().resolve(location, name)
    }

    async fn create(&self, cx: &CreationContext) -> HearthResult<Arc<dyn Resource>> {
        let key = cx.key();
        let path = self.root.path_for(key)?;
        let source = read_source(key.kind(), key.name(), &path, self.root.max_size()).await?;
        let settings: AppSettings = toml::from_str(&source.text()?)
            .map_err(|e| HearthError::not_viable(&path, e.message().to_string()))?;

        Ok(Arc::new(SettingsResource {
            key: key.clone(),
            source,
            settings,
            created_at: Utc::now(),
        }))
    }
}
