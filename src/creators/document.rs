//! Document environments: a page's markup plus its optional scripts
//!
//! The document `index` is built from `index.html` and, when present, the
//! client script `index.js`, the shared script `index.shared.js` and the
//! server script `index.server.js`, all in the application root. Absent
//! scripts are still watched so that creating one rebuilds the document.

use crate::creators::html::HtmlResource;
use crate::creators::script::ScriptResource;
use crate::creators::SourceRoot;
use crate::error::HearthResult;
use crate::resource::hash::combined_hash;
use crate::resource::source::exists;
use crate::resource::{CreationContext, Location, Resource, ResourceArgs, ResourceCreator, ResourceKey, ResourceKind};
use crate::script::{CompiledScript, ScriptCompiler};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

const CLIENT_SCRIPT_SUFFIX: &str = ".js";
const SHARED_SCRIPT_SUFFIX: &str = ".shared.js";
const SERVER_SCRIPT_SUFFIX: &str = ".server.js";

/// Hash stand-in for a script the document does not have
const ABSENT: &str = "none";

/// One of a document's optional scripts
#[derive(Debug)]
struct DocumentScript {
    path: PathBuf,
    source: Option<Arc<ScriptResource>>,
}

impl DocumentScript {
    fn hash(&self) -> &str {
        self.source
            .as_ref()
            .and_then(|source| source.content_hash())
            .unwrap_or(ABSENT)
    }

    fn needs_replacing(&self) -> HearthResult<bool> {
        match &self.source {
            Some(source) => source.needs_replacing(),
            None => Ok(self.path.is_file()),
        }
    }
}

#[derive(Debug)]
pub struct DocumentEnvironment {
    key: ResourceKey,
    html: Arc<HtmlResource>,
    client: DocumentScript,
    shared: DocumentScript,
    server: DocumentScript,
    shared_script: Option<CompiledScript>,
    server_script: Option<CompiledScript>,
    hash: String,
    created_at: DateTime<Utc>,
}

impl DocumentEnvironment {
    pub fn html(&self) -> &HtmlResource {
        &self.html
    }

    /// Compiled server script, if the document has one
    pub fn script(&self) -> Option<&CompiledScript> {
        self.server_script.as_ref()
    }

    /// Compiled script run on both sides, if the document has one
    pub fn shared_script(&self) -> Option<&CompiledScript> {
        self.shared_script.as_ref()
    }

    /// Script sent to the browser, if the document has one
    pub fn client_script(&self) -> Option<&ScriptResource> {
        self.client.source.as_deref()
    }

    /// Identifier modules required from this document resolve against
    pub fn module_identifier(&self) -> &str {
        self.key.name()
    }

    fn scripts(&self) -> [&DocumentScript; 3] {
        [&self.client, &self.shared, &self.server]
    }
}

impl Resource for DocumentEnvironment {
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
        self.scripts()
            .iter()
            .map(|script| script.path.clone())
            .collect()
    }

    /// Stale when any input is, or when a missing script has appeared
    fn needs_replacing(&self) -> HearthResult<bool> {
        if self.html.needs_replacing()? {
            return Ok(true);
        }
        for script in self.scripts() {
            if script.needs_replacing()? {
                return Ok(true);
            }
        }
        Ok(false)
    }
}

pub struct DocumentCreator {
    root: SourceRoot,
    compiler: Arc<dyn ScriptCompiler>,
}

impl DocumentCreator {
    pub fn new(root: SourceRoot, compiler: Arc<dyn ScriptCompiler>) -> Self {
        Self { root, compiler }
    }

    async fn optional_script(&self, cx: &CreationContext, suffix: &str) -> HearthResult<DocumentScript> {
        let key = cx.cache().key(
            ResourceKind::Script,
            Location::Base,
            format!("{}{}", cx.key().name(), suffix),
            ResourceArgs::None,
        )?;
        let path = self.root.path_for(&key)?;

        let source = if exists(&path).await {
            Some(cx.depend_on_as::<ScriptResource>(&key).await?)
        } else {
            debug!("{} has no {}", cx.key(), key.name());
            None
        };

        Ok(DocumentScript { path, source })
    }

    fn compile(&self, script: &DocumentScript) -> HearthResult<Option<CompiledScript>> {
        script
            .source
            .as_ref()
            .map(|source| {
                self.compiler
                    .compile(source.path(), source.key().name(), source.text())
            })
            .transpose()
    }
}

#[async_trait]
impl ResourceCreator for DocumentCreator {
    fn kind(&self) -> ResourceKind {
        ResourceKind::Document
    }

    fn can_load(&self, name: &str, args: &ResourceArgs) -> bool {
        !name.contains('.') && matches!(args, ResourceArgs::None)
    }

    fn locate(&self, _location: Location, name: &str, _args: &ResourceArgs) -> Option<PathBuf> {
        self.root.paths().resolve(Location::Base, &format!("{}.html", name))
    }

    async fn create(&self, cx: &CreationContext) -> HearthResult<Arc<dyn Resource>> {
        let key = cx.key();
        let html_key = cx.cache().key(
            ResourceKind::Html,
            Location::Base,
            format!("{}.html", key.name()),
            ResourceArgs::None,
        )?;

        let html = cx.depend_on_as::<HtmlResource>(&html_key).await?;
        let client = self.optional_script(cx, CLIENT_SCRIPT_SUFFIX).await?;
        let shared = self.optional_script(cx, SHARED_SCRIPT_SUFFIX).await?;
        let server = self.optional_script(cx, SERVER_SCRIPT_SUFFIX).await?;

        let shared_script = self.compile(&shared)?;
        let server_script = self.compile(&server)?;

        let hash = combined_hash([
            html.content_hash().unwrap_or(ABSENT),
            client.hash(),
            shared.hash(),
            server.hash(),
        ]);

        Ok(Arc::new(DocumentEnvironment {
            key: key.clone(),
            html,
            client,
            shared,
            server,
            shared_script,
            server_script,
            hash,
            created_at: Utc::now(),
        }))
    }
}
