//! Serializable view of the cache and its dependency links

use crate::resource::cache::ResourceCache;
use crate::resource::key::{Location, ResourceKey, ResourceKind};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};

/// One published resource
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotNode {
    pub id: usize,
    pub key: String,
    pub kind: ResourceKind,
    pub location: Location,
    pub name: String,
    pub hash: Option<String>,
    pub uri: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Edge from a dependency to one of its dependents, by node id
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotLink {
    pub source: usize,
    pub target: usize,
}

/// Point-in-time copy of the published part of a cache
#[derive(Debug, Clone, Serialize)]
pub struct CacheSnapshot {
    pub nodes: Vec<SnapshotNode>,
    pub links: Vec<SnapshotLink>,
    pub kinds: Vec<ResourceKind>,
    pub locations: Vec<Location>,
}

impl CacheSnapshot {
    pub fn node(&self, key: &ResourceKey) -> Option<&SnapshotNode> {
        let key = key.to_string();
        self.nodes.iter().find(|node| node.key == key)
    }

    /// Whether `dependent` is recorded as depending on `dependency`
    pub fn links(&self, dependency: &ResourceKey, dependent: &ResourceKey) -> bool {
        match (self.node(dependency), self.node(dependent)) {
            (Some(source), Some(target)) => self.links.contains(&SnapshotLink {
                source: source.id,
                target: target.id,
            }),
            _ => false,
        }
    }
}

impl ResourceCache {
    /// Snapshot of published resources and the edges between them.
    ///
    /// Edges to keys that are no longer published are left out.
    pub fn inspect(&self) -> CacheSnapshot {
        let mut entries = self.published_entries();
        entries.sort_by_key(|(resource, _)| resource.key().to_string());

        let ids: HashMap<ResourceKey, usize> = entries
            .iter()
            .enumerate()
            .map(|(id, (resource, _))| (resource.key().clone(), id))
            .collect();

        let mut kinds = BTreeSet::new();
        let mut locations = BTreeSet::new();
        let mut nodes = Vec::with_capacity(entries.len());
        let mut links = Vec::new();

        for (id, (resource, dependents)) in entries.iter().enumerate() {
            let key = resource.key();
            kinds.insert(key.kind());
            locations.insert(key.location());

            nodes.push(SnapshotNode {
                id,
                key: key.to_string(),
                kind: key.kind(),
                location: key.location(),
                name: key.name().to_string(),
                hash: resource.content_hash().map(str::to_string),
                uri: resource.uri(),
                created_at: resource.created_at(),
            });

            let mut targets: Vec<usize> = dependents.iter().filter_map(|d| ids.get(d).copied()).collect();
            targets.sort_unstable();
            links.extend(targets.into_iter().map(|target| SnapshotLink { source: id, target }));
        }

        CacheSnapshot {
            nodes,
            links,
            kinds: kinds.into_iter().collect(),
            locations: locations.into_iter().collect(),
        }
    }
}
