//! Mapping between locations and the file system

use crate::resource::key::Location;
use std::path::{Component, Path, PathBuf};

/// Directory layout of an application
#[derive(Debug, Clone)]
pub struct AppPaths {
    root: PathBuf,
}

impl AppPaths {
    /// Create the layout for an application root.
    ///
    /// The root is canonicalized when it exists so watch notifications,
    /// which carry absolute paths, compare equal to resolved paths.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = std::fs::canonicalize(&root).unwrap_or(root);
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory backing a location, if it has one
    pub fn dir(&self, location: Location) -> Option<PathBuf> {
        match location {
            Location::Base => Some(self.root.clone()),
            Location::Public => Some(self.root.join("public")),
            Location::Private => Some(self.root.join("private")),
            Location::Virtual => None,
        }
    }

    /// Path of a named resource in a location.
    ///
    /// Names that climb out of their location are refused.
    pub fn resolve(&self, location: Location, name: &str) -> Option<PathBuf> {
        let relative = Path::new(name);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if name.is_empty() || escapes {
            return None;
        }
        self.dir(location).map(|dir| dir.join(relative))
    }

    /// Reverse of `resolve`: the most specific location containing a path
    pub fn locate(&self, path: &Path) -> Option<(Location, String)> {
        let path = if path.is_relative() {
            self.root.join(path)
        } else {
            path.to_path_buf()
        };

        for location in [Location::Public, Location::Private, Location::Base] {
            let Some(dir) = self.dir(location) else {
                continue;
            };
            if let Ok(rest) = path.strip_prefix(&dir) {
                let name = rest
                    .components()
                    .filter_map(|c| match c {
                        Component::Normal(part) => part.to_str(),
                        _ => None,
                    })
                    .collect::<Vec<_>>()
                    .join("/");
                if !name.is_empty() {
                    return Some((location, name));
                }
            }
        }
        None
    }
}
