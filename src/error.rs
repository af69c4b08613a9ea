//! Error types for Hearth
//!
//! All modules use `HearthResult<T>` as their return type. Contract
//! violations (malformed call-site arguments, a resource depending on
//! itself) are not represented here; they panic.

use crate::resource::ResourceKind;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// Result type alias for Hearth operations
pub type HearthResult<T> = Result<T, HearthError>;

/// All errors that can occur in Hearth
#[derive(Error, Debug)]
pub enum HearthError {
    // Construction errors
    #[error("Resource not viable at {path}: {reason}")]
    NotViable { path: PathBuf, reason: String },

    #[error("Resource not found: {kind} {name}")]
    NotFound { kind: ResourceKind, name: String },

    #[error("No such resource: no creator accepts {key}")]
    NoSuchResource { key: String },

    #[error("No creator registered for {0} resources")]
    NoCreator(ResourceKind),

    #[error("Dependency cycle: {key} depends on {dependency}, which is waiting for it")]
    DependencyCycle { key: String, dependency: String },

    // Module errors
    #[error("Module identifier '{identifier}' required from '{caller}' resolves outside the application root")]
    Resolution { identifier: String, caller: String },

    /// A failure shared by every caller joined on the same construction
    #[error(transparent)]
    Shared(Arc<HearthError>),

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    #[error("File watch error: {0}")]
    Watch(#[from] notify::Error),

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),

    #[error("{0}")]
    User(String),
}

impl HearthError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create a not-viable error for content that was read but cannot be used
    pub fn not_viable(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::NotViable {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a not-found error for a missing input resource
    pub fn not_found(kind: ResourceKind, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }

    /// The underlying error, looking through any shared wrapper
    pub fn root(&self) -> &HearthError {
        match self {
            Self::Shared(inner) => inner.root(),
            other => other,
        }
    }

    /// Check if the error describes a missing resource
    pub fn is_not_found(&self) -> bool {
        matches!(
            self.root(),
            Self::NotFound { .. } | Self::NoSuchResource { .. }
        )
    }

    /// Check if error is retryable
    ///
    /// Nothing is negatively cached, so a retry always rebuilds from scratch.
    pub fn is_retryable(&self) -> bool {
        matches!(self.root(), Self::Io { .. } | Self::Watch(_))
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self.root() {
            Self::NotFound { .. } => Some("Check app.root in your config, or pass --location"),
            Self::Resolution { .. } => {
                Some("Module identifiers are relative to the requiring module and may not leave the app root")
            }
            Self::NoSuchResource { .. } => {
                Some("Stylesheets must be named *.css; pass --less to build one from a .less source")
            }
            Self::ConfigInvalid { .. } => Some("Run: hearth config init --force"),
            _ => None,
        }
    }
}
