//! Hearth - resource cache and dependency-invalidation engine
//!
//! Builds application resources (files, stylesheets, documents, script
//! modules) on demand, shares each construction between concurrent
//! callers, records which resources were built from which, and evicts
//! dependents transitively when a source changes.

pub mod cli;
pub mod config;
pub mod creators;
pub mod engine;
pub mod error;
pub mod resource;
pub mod script;
pub mod ui;
pub mod uri;

pub use engine::Engine;
pub use error::{HearthError, HearthResult};
