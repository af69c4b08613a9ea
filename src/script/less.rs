//! LESS to CSS seam

use crate::error::HearthResult;
use async_trait::async_trait;
use std::path::Path;

/// Turns LESS source into CSS
#[async_trait]
pub trait LessProcessor: Send + Sync {
    async fn process(&self, path: &Path, source: &str) -> HearthResult<String>;
}

/// Hands the source back unchanged; plain CSS is valid LESS
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughLess;

#[async_trait]
impl LessProcessor for PassthroughLess {
    async fn process(&self, _path: &Path, source: &str) -> HearthResult<String> {
        Ok(source.to_string())
    }
}
