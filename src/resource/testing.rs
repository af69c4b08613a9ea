//! Test fixtures: an in-memory resource and a scriptable creator

use crate::error::{HearthError, HearthResult};
use crate::resource::creator::{CreationContext, ResourceCreator};
use crate::resource::hash::content_hash;
use crate::resource::key::{Location, ResourceArgs, ResourceKey, ResourceKind};
use crate::resource::model::Resource;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

/// Document key in the virtual location
pub fn key(name: &str) -> ResourceKey {
    ResourceKey::new(ResourceKind::Document, Location::Virtual, name, ResourceArgs::None)
}

#[derive(Debug)]
pub struct TestResource {
    key: ResourceKey,
    hash: String,
    created_at: DateTime<Utc>,
    stale: AtomicBool,
    watched: Vec<PathBuf>,
}

impl TestResource {
    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::SeqCst);
    }
}

impl Resource for TestResource {
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
        self.watched.clone()
    }

    fn needs_replacing(&self) -> HearthResult<bool> {
        Ok(self.stale.load(Ordering::SeqCst))
    }
}

/// Creator that counts invocations and can be told to delay, fail,
/// wait on a gate, or depend on other keys
pub struct TestCreator {
    kind: ResourceKind,
    calls: AtomicUsize,
    calls_by_name: Mutex<HashMap<String, usize>>,
    delay: Duration,
    failures: AtomicUsize,
    rejected: Option<&'static str>,
    gate: Option<Semaphore>,
    dependencies: Mutex<HashMap<String, Vec<ResourceKey>>>,
    watched: Mutex<HashMap<String, PathBuf>>,
}

impl TestCreator {
    pub fn new(kind: ResourceKind) -> Arc<Self> {
        Arc::new(Self::bare(kind))
    }

    fn bare(kind: ResourceKind) -> Self {
        Self {
            kind,
            calls: AtomicUsize::new(0),
            calls_by_name: Mutex::new(HashMap::new()),
            delay: Duration::ZERO,
            failures: AtomicUsize::new(0),
            rejected: None,
            gate: None,
            dependencies: Mutex::new(HashMap::new()),
            watched: Mutex::new(HashMap::new()),
        }
    }

    fn rebuild(self: Arc<Self>, change: impl FnOnce(&mut Self)) -> Arc<Self> {
        let mut creator = Arc::try_unwrap(self).unwrap_or_else(|_| panic!("creator already shared"));
        change(&mut creator);
        Arc::new(creator)
    }

    pub fn with_delay(self: Arc<Self>, delay: Duration) -> Arc<Self> {
        self.rebuild(|c| c.delay = delay)
    }

    /// Fail the next `count` constructions with an I/O error
    pub fn failing(self: Arc<Self>, count: usize) -> Arc<Self> {
        self.rebuild(|c| c.failures = AtomicUsize::new(count))
    }

    pub fn rejecting(self: Arc<Self>, name: &'static str) -> Arc<Self> {
        self.rebuild(|c| c.rejected = Some(name))
    }

    /// Block constructions until `open_gate` releases them
    pub fn gated(self: Arc<Self>) -> Arc<Self> {
        self.rebuild(|c| c.gate = Some(Semaphore::new(0)))
    }

    pub fn open_gate(&self, constructions: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(constructions);
        }
    }

    pub fn depends(&self, name: &str, dependency: ResourceKey) {
        self.dependencies
            .lock()
            .unwrap()
            .entry(name.to_string())
            .or_default()
            .push(dependency);
    }

    pub fn watch(&self, name: &str, path: PathBuf) {
        self.watched.lock().unwrap().insert(name.to_string(), path);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn calls_for(&self, name: &str) -> usize {
        self.calls_by_name
            .lock()
            .unwrap()
            .get(name)
            .copied()
            .unwrap_or(0)
    }
}

#[async_trait]
impl ResourceCreator for TestCreator {
    fn kind(&self) -> ResourceKind {
        self.kind
    }

    fn can_load(&self, name: &str, _args: &ResourceArgs) -> bool {
        self.rejected != Some(name)
    }

    fn locate(&self, _location: Location, _name: &str, _args: &ResourceArgs) -> Option<PathBuf> {
        None
    }

    async fn create(&self, cx: &CreationContext) -> HearthResult<Arc<dyn Resource>> {
        let name = cx.key().name().to_string();
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        *self
            .calls_by_name
            .lock()
            .unwrap()
            .entry(name.clone())
            .or_default() += 1;

        if let Some(gate) = &self.gate {
            gate.acquire()
                .await
                .map_err(|e| HearthError::Internal(e.to_string()))?
                .forget();
        }

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(HearthError::io(
                format!("building {}", name),
                std::io::Error::other("simulated failure"),
            ));
        }

        let dependencies = self
            .dependencies
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .unwrap_or_default();
        for dependency in &dependencies {
            cx.depend_on(dependency).await?;
        }

        let watched = self
            .watched
            .lock()
            .unwrap()
            .get(&name)
            .cloned()
            .into_iter()
            .collect();

        Ok(Arc::new(TestResource {
            key: cx.key().clone(),
            hash: content_hash(format!("{}#{}", name, call).as_bytes()),
            created_at: Utc::now(),
            stale: AtomicBool::new(false),
            watched,
        }))
    }
}
