//! Structural resource identity
//!
//! A `ResourceKey` is the only identity the cache knows about. Lookups,
//! join deduplication and dependency edges are all keyed by it, so it
//! derives equality and hashing over every field.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Closed set of resource kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Any file served as-is
    Static,
    /// Script source text
    Script,
    /// CSS, possibly produced from a LESS source
    Stylesheet,
    /// HTML markup backing a document
    Html,
    /// Document script environment (HTML plus optional server script)
    Document,
    /// Module script environment created by `require`
    Module,
    /// The application settings file
    Settings,
}

impl ResourceKind {
    /// All kinds, in registration order
    pub fn all() -> &'static [Self] {
        &[
            Self::Static,
            Self::Script,
            Self::Stylesheet,
            Self::Html,
            Self::Document,
            Self::Module,
            Self::Settings,
        ]
    }

    /// Name used in keys, logs and the CLI
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Static => "static",
            Self::Script => "script",
            Self::Stylesheet => "stylesheet",
            Self::Html => "html",
            Self::Document => "document",
            Self::Module => "module",
            Self::Settings => "settings",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| format!("unknown resource kind '{}'", s))
    }
}

/// Where a resource lives relative to the application root
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Location {
    /// The application root itself
    Base,
    /// `<root>/public`, served to clients
    Public,
    /// `<root>/private`, never served
    Private,
    /// Not backed by the file system
    Virtual,
}

impl Location {
    /// All locations
    pub fn all() -> &'static [Self] {
        &[Self::Base, Self::Public, Self::Private, Self::Virtual]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Base => "base",
            Self::Public => "public",
            Self::Private => "private",
            Self::Virtual => "virtual",
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Location {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|location| location.as_str() == s)
            .ok_or_else(|| format!("unknown location '{}'", s))
    }
}

/// A module request: which environment asked, and for which identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequiredModule {
    /// Key of the calling script environment
    pub requester: Box<ResourceKey>,
    /// Resolved module identifier
    pub identifier: String,
}

impl RequiredModule {
    pub fn new(requester: ResourceKey, identifier: impl Into<String>) -> Self {
        Self {
            requester: Box::new(requester),
            identifier: identifier.into(),
        }
    }
}

/// Typed construction arguments
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum ResourceArgs {
    #[default]
    None,
    /// Build a stylesheet from its `.less` source when true
    Less(bool),
    /// Module environment arguments
    Module(RequiredModule),
}

impl ResourceArgs {
    pub fn is_less(&self) -> bool {
        matches!(self, Self::Less(true))
    }

    pub fn required_module(&self) -> Option<&RequiredModule> {
        match self {
            Self::Module(required) => Some(required),
            _ => None,
        }
    }
}

impl fmt::Display for ResourceArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => Ok(()),
            Self::Less(less) => write!(f, "[less={}]", less),
            Self::Module(required) => write!(f, "[required by {}]", required.requester),
        }
    }
}

/// Immutable structural identity of a cacheable artifact
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    kind: ResourceKind,
    location: Location,
    name: String,
    args: ResourceArgs,
}

impl ResourceKey {
    /// Create a key without checking the creator registry.
    ///
    /// Outside the crate keys come from `CreatorRegistry::key` or
    /// `ResourceCache::key`, which reject kinds nothing can build.
    pub(crate) fn new(
        kind: ResourceKind,
        location: Location,
        name: impl Into<String>,
        args: ResourceArgs,
    ) -> Self {
        Self {
            kind,
            location,
            name: name.into(),
            args,
        }
    }

    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    pub fn location(&self) -> Location {
        self.location
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn args(&self) -> &ResourceArgs {
        &self.args
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}/{}{}",
            self.kind, self.location, self.name, self.args
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn key(name: &str, args: ResourceArgs) -> ResourceKey {
        ResourceKey::new(ResourceKind::Stylesheet, Location::Base, name, args)
    }

    #[test]
    fn equality_is_structural() {
        assert_eq!(key("site.css", ResourceArgs::None), key("site.css", ResourceArgs::None));
        assert_ne!(
            key("site.css", ResourceArgs::Less(true)),
            key("site.css", ResourceArgs::Less(false))
        );
        assert_ne!(
            key("site.css", ResourceArgs::None),
            ResourceKey::new(ResourceKind::Stylesheet, Location::Public, "site.css", ResourceArgs::None)
        );
    }

    #[test]
    fn hashing_matches_equality() {
        let mut set = HashSet::new();
        set.insert(key("a.css", ResourceArgs::None));
        set.insert(key("a.css", ResourceArgs::None));
        set.insert(key("b.css", ResourceArgs::None));
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn module_keys_include_requester() {
        let index = ResourceKey::new(ResourceKind::Document, Location::Virtual, "index", ResourceArgs::None);
        let other = ResourceKey::new(ResourceKind::Document, Location::Virtual, "other", ResourceArgs::None);

        let from_index = ResourceKey::new(
            ResourceKind::Module,
            Location::Virtual,
            "helper",
            ResourceArgs::Module(RequiredModule::new(index, "helper")),
        );
        let from_other = ResourceKey::new(
            ResourceKind::Module,
            Location::Virtual,
            "helper",
            ResourceArgs::Module(RequiredModule::new(other, "helper")),
        );

        assert_ne!(from_index, from_other);
    }

    #[test]
    fn display_format() {
        assert_eq!(key("site.css", ResourceArgs::Less(true)).to_string(), "stylesheet:base/site.css[less=true]");
    }

    #[test]
    fn kind_and_location_parse() {
        assert_eq!("stylesheet".parse::<ResourceKind>().unwrap(), ResourceKind::Stylesheet);
        assert_eq!("public".parse::<Location>().unwrap(), Location::Public);
        assert!("nonsense".parse::<ResourceKind>().is_err());
    }
}
