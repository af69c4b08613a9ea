//! Creators for the application's resource kinds
//!
//! | Kind | Creator | Source |
//! |------|---------|--------|
//! | static | `StaticFileCreator` | any file |
//! | script | `ScriptCreator` | `*.js` |
//! | stylesheet | `CssCreator`, `LessCreator` | `*.css`, or `<stem>.less` with `--less` |
//! | html | `HtmlCreator` | `*.html` |
//! | document | `DocumentCreator` | `<name>.html` plus optional `<name>.server.js` |
//! | module | `ModuleCreator` | `<identifier>.js`, required by a script environment |
//! | settings | `SettingsCreator` | `app.toml` |

pub mod document;
pub mod html;
pub mod module;
pub mod script;
pub mod settings;
pub mod static_file;
pub mod stylesheet;

pub use document::{DocumentCreator, DocumentEnvironment};
pub use html::{HtmlCreator, HtmlResource};
pub use module::{ModuleCreator, ModuleEnvironment};
pub use script::{ScriptCreator, ScriptResource};
pub use settings::{AppSettings, SettingsCreator, SettingsResource};
pub use static_file::{StaticFileCreator, StaticResource};
pub use stylesheet::{CssCreator, LessCreator, StylesheetResource};

use crate::config::schema::ResourcesConfig;
use crate::error::{HearthError, HearthResult};
use crate::resource::{AppPaths, CreatorRegistry, ResourceKey};
use crate::script::{LessProcessor, ScriptCompiler};
use std::path::PathBuf;
use std::sync::Arc;

/// Where file-backed creators read from, and how much they may hold
#[derive(Debug, Clone)]
pub struct SourceRoot {
    paths: AppPaths,
    max_size: u64,
}

impl SourceRoot {
    pub fn new(paths: AppPaths, max_size: u64) -> Self {
        Self { paths, max_size }
    }

    pub fn paths(&self) -> &AppPaths {
        &self.paths
    }

    /// Largest file whose contents are kept in memory
    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Backing path of a key; keys that cannot live on disk are not found
    pub fn path_for(&self, key: &ResourceKey) -> HearthResult<PathBuf> {
        self.paths
            .resolve(key.location(), key.name())
            .ok_or_else(|| HearthError::not_found(key.kind(), key.name()))
    }
}

/// Registry with every standard creator, in dispatch order
pub fn standard_registry(
    paths: AppPaths,
    resources: &ResourcesConfig,
    compiler: Arc<dyn ScriptCompiler>,
    less: Arc<dyn LessProcessor>,
) -> CreatorRegistry {
    let root = SourceRoot::new(paths, resources.max_file_size_to_load);

    CreatorRegistry::new()
        .with(Arc::new(StaticFileCreator::new(root.clone())))
        .with(Arc::new(ScriptCreator::new(root.clone())))
        .with(Arc::new(CssCreator::new(root.clone())))
        .with(Arc::new(LessCreator::new(root.clone(), less)))
        .with(Arc::new(HtmlCreator::new(root.clone())))
        .with(Arc::new(DocumentCreator::new(root.clone(), compiler.clone())))
        .with(Arc::new(ModuleCreator::new(compiler)))
        .with(Arc::new(SettingsCreator::new(root)))
}
