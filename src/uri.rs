//! Parsing of served URIs
//!
//! Resources are served as `/<hash>/<name>`. A URI counts as versioned when
//! it carries a content hash or its name carries an explicit version, such
//! as `/jquery-2.0.2.min.js` or `/fancybox-2.1.5/fancybox.pack.js`. Versioned
//! URIs never change content, so they are not rewritten to cache-busting
//! form.

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static URI_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?:([0-9a-f]{64})/)?(.*?)(?:\.([^./]+))?$").expect("valid uri pattern")
});

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"-\d+(?:\.\d+)*(?:[.-]?(?:alpha|beta|pre))?(?:(?:[.-](?:min|pack))?$|/)")
        .expect("valid version pattern")
});

/// A URI split into hash, name and extension
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UriMatch {
    /// Normalized URI, without query string or fragment
    pub uri: String,
    /// Content hash prefix, if present
    pub hash: Option<String>,
    /// Path after the hash, without extension or surrounding slashes
    pub name: String,
    /// Text after the last dot of the final segment
    pub extension: Option<String>,
    /// `name` plus extension: the resource name relative to its location
    pub path: String,
    pub versioned: bool,
}

impl UriMatch {
    pub fn new(uri: &str) -> Self {
        let uri = normalize_uri(uri);

        let (hash, mut name, mut extension) = match URI_PATTERN.captures(&uri) {
            Some(caps) => (
                caps.get(1).map(|m| m.as_str().to_string()),
                caps.get(2).map(|m| m.as_str().to_string()).unwrap_or_default(),
                caps.get(3).map(|m| m.as_str().to_string()),
            ),
            None => (None, String::new(), None),
        };

        if name.ends_with('/') {
            name.pop();
        }
        if let Some(ext) = extension.as_mut() {
            if ext.ends_with('/') {
                ext.pop();
            }
        }

        let path = match &extension {
            Some(ext) => format!("{}.{}", name, ext),
            None => name.clone(),
        };
        let versioned = hash.is_some() || VERSION_PATTERN.is_match(&name);

        Self {
            uri,
            hash,
            name,
            extension,
            path,
            versioned,
        }
    }
}

impl fmt::Display for UriMatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri)
    }
}

/// Absolute, with `.`/`..` collapsed; `..` at the root stays at the root
fn normalize_uri(uri: &str) -> String {
    let end = uri.find(['?', '#']).unwrap_or(uri.len());
    let raw = &uri[..end];

    let mut segments: Vec<&str> = Vec::new();
    for segment in raw.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }

    let mut normalized = format!("/{}", segments.join("/"));
    if raw.ends_with('/') && !segments.is_empty() {
        normalized.push('/');
    }
    normalized
}
