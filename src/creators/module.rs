//! Module environments created by `require`
//!
//! A module is identified by its resolved identifier together with the
//! environment that required it, so the same script required from two
//! documents gets two independent environments. The module's script, its
//! parent and the module are linked so a change to any of them rebuilds
//! the others:
//!
//! ```text
//! script ──> parent ──> module
//!    └──────────────────> module
//! ```

use crate::creators::script::ScriptResource;
use crate::error::{HearthError, HearthResult};
use crate::resource::{CreationContext, Location, Resource, ResourceArgs, ResourceCreator, ResourceKey, ResourceKind};
use crate::script::{CompiledScript, ScriptCompiler};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

#[derive(Debug)]
pub struct ModuleEnvironment {
    key: ResourceKey,
    parent: ResourceKey,
    source: Arc<ScriptResource>,
    script: CompiledScript,
    created_at: DateTime<Utc>,
}

impl ModuleEnvironment {
    /// Resolved module identifier
    pub fn identifier(&self) -> &str {
        self.key.name()
    }

    /// Key of the environment that required this module
    pub fn parent(&self) -> &ResourceKey {
        &self.parent
    }

    pub fn script(&self) -> &CompiledScript {
        &self.script
    }
}

impl Resource for ModuleEnvironment {
    fn key(&self) -> &ResourceKey {
        &self.key
    }

    fn content_hash(&self) -> Option<&str> {
        self.source.content_hash()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    fn watched_paths(&self) -> Vec<PathBuf> {
        self.source.watched_paths()
    }

    fn needs_replacing(&self) -> HearthResult<bool> {
        self.source.needs_replacing()
    }
}

pub struct ModuleCreator {
    compiler: Arc<dyn ScriptCompiler>,
}

impl ModuleCreator {
    pub fn new(compiler: Arc<dyn ScriptCompiler>) -> Self {
        Self { compiler }
    }
}

#[async_trait]
impl ResourceCreator for ModuleCreator {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Module
    }

    fn can_load(&self, _name: &str, args: &ResourceArgs) -> bool {
        args.required_module().is_some()
    }

    fn locate(&self, _location: Location, _name: &str, _args: &ResourceArgs) -> Option<PathBuf> {
        None
    }

    async fn create(&self, cx: &CreationContext) -> HearthResult<Arc<dyn Resource>> {
        let key = cx.key();
        let required = key
            .args()
            .required_module()
            .ok_or_else(|| HearthError::NoSuchResource {
                key: key.to_string(),
            })?;
        let parent = required.requester.as_ref();

        // modules are only required by running environments
        let Some(running) = cx.cache().find(parent) else {
            return Err(HearthError::not_found(parent.kind(), parent.name()));
        };

        let script_key = cx.cache().key(
            ResourceKind::Script,
            Location::Base,
            format!("{}.js", required.identifier),
            ResourceArgs::None,
        )?;
        let source = cx.depend_on_as::<ScriptResource>(&script_key).await?;
        let script = self
            .compiler
            .compile(source.path(), script_key.name(), source.text())?;

        let used: Arc<dyn Resource> = source.clone();
        cx.cache().add_dependent_checked(&script_key, &used, parent);
        cx.cache().add_dependent_checked(parent, &running, key);
        debug!("Linked module {} to {}", required.identifier, parent);

        Ok(Arc::new(ModuleEnvironment {
            key: key.clone(),
            parent: parent.clone(),
            source,
            script,
            created_at: Utc::now(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::creators::document::DocumentEnvironment;
    use crate::creators::fixture::App;
    use crate::script::{module_key, require_module};

    fn doc(name: &str) -> ResourceKey {
        ResourceKey::new(ResourceKind::Document, Location::Virtual, name, ResourceArgs::None)
    }

    fn script(name: &str) -> ResourceKey {
        ResourceKey::new(ResourceKind::Script, Location::Base, name, ResourceArgs::None)
    }

    fn app_with_helper() -> App {
        let app = App::new();
        app.write("index.html", "<h1>hello</h1>");
        app.write("index.server.js", "var helper = require('./modules/helper');");
        app.write("modules/helper.js", "module.exports = require('helper2');");
        app.write("modules/helper2.js", "module.exports = 2;");
        app
    }

    #[tokio::test]
    async fn require_builds_module_with_three_edges() {
        let app = app_with_helper();
        let document = app.cache.load(&doc("index")).await.unwrap();

        let module = require_module(&app.cache, document.key(), Some(&["./modules/helper", "index"]))
            .await
            .unwrap();

        assert_eq!(module.identifier(), "modules/helper");
        assert_eq!(module.parent(), document.key());
        assert_eq!(module.script().requires(), ["helper2"]);
        assert_eq!(
            module.content_hash(),
            app.cache.find(&script("modules/helper.js")).unwrap().content_hash()
        );

        let script_dependents = app.cache.dependents(&script("modules/helper.js"));
        assert!(script_dependents.contains(module.key()));
        assert!(script_dependents.contains(document.key()));
        assert!(app.cache.dependents(document.key()).contains(module.key()));
    }

    #[tokio::test]
    async fn nested_require_resolves_against_module() {
        let app = app_with_helper();
        let document = app.cache.load(&doc("index")).await.unwrap();

        let helper = require_module(&app.cache, document.key(), Some(&["./modules/helper", "index"]))
            .await
            .unwrap();
        let helper2 = require_module(
            &app.cache,
            document.key(),
            Some(&["helper2", helper.identifier()]),
        )
        .await
        .unwrap();

        assert_eq!(helper2.identifier(), "modules/helper2");
    }

    #[tokio::test]
    async fn module_script_change_rebuilds_parent_and_module() {
        let app = app_with_helper();
        let document = app.cache.load(&doc("index")).await.unwrap();
        let module = require_module(&app.cache, document.key(), Some(&["./modules/helper", "index"]))
            .await
            .unwrap();

        app.cache.invalidate(&script("modules/helper.js"));

        assert!(app.cache.find(document.key()).is_none());
        assert!(app.cache.find(module.key()).is_none());
    }

    #[tokio::test]
    async fn parent_change_evicts_module() {
        let app = app_with_helper();
        let document = app.cache.load(&doc("index")).await.unwrap();
        let module = require_module(&app.cache, document.key(), Some(&["./modules/helper", "index"]))
            .await
            .unwrap();

        app.touch("index.html", "<h1>changed</h1>");
        assert!(app.cache.find(&doc("index")).is_none());
        assert!(app.cache.find(module.key()).is_none());
        assert!(app.cache.find(&script("modules/helper.js")).is_some());
    }

    #[tokio::test]
    async fn same_identifier_from_two_parents_is_two_modules() {
        let app = app_with_helper();
        app.write("about.html", "<h1>about</h1>");
        let index = app.cache.load(&doc("index")).await.unwrap();
        let about = app.cache.load(&doc("about")).await.unwrap();

        let a = require_module(&app.cache, index.key(), Some(&["modules/helper", "index"]))
            .await
            .unwrap();
        let b = require_module(&app.cache, about.key(), Some(&["modules/helper", "about"]))
            .await
            .unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_ne!(a.key(), b.key());
    }

    #[tokio::test]
    async fn requester_must_be_published() {
        let app = app_with_helper();
        let key = module_key(&app.cache, &doc("index"), "modules/helper").unwrap();

        let err = app.cache.load(&key).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn missing_module_script_is_not_found() {
        let app = app_with_helper();
        let document = app.cache.load_as::<DocumentEnvironment>(&doc("index")).await.unwrap();

        let err = require_module(&app.cache, document.key(), Some(&["nothing", "index"]))
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn module_keys_need_module_args() {
        let app = app_with_helper();
        let key = ResourceKey::new(ResourceKind::Module, Location::Virtual, "helper", ResourceArgs::None);
        let err = app.cache.load(&key).await.unwrap_err();
        assert!(matches!(err, HearthError::NoSuchResource { .. }));
    }
}
