//! Loading modules on behalf of a requesting script environment

use crate::creators::module::ModuleEnvironment;
use crate::error::HearthResult;
use crate::resource::{Location, RequiredModule, ResourceArgs, ResourceCache, ResourceKey, ResourceKind};
use crate::script::resolve::require;
use std::sync::Arc;
use tracing::debug;

/// Key of the module environment `identifier` required by `requester`
pub fn module_key(
    cache: &ResourceCache,
    requester: &ResourceKey,
    identifier: &str,
) -> HearthResult<ResourceKey> {
    cache.key(
        ResourceKind::Module,
        Location::Virtual,
        identifier,
        ResourceArgs::Module(RequiredModule::new(requester.clone(), identifier)),
    )
}

/// Handle a `require(requested, caller)` call made while `requester` runs.
///
/// The same identifier required by two different environments yields two
/// independent module environments.
///
/// # Panics
///
/// When `args` is not exactly `[requested, caller]`.
pub async fn require_module(
    cache: &ResourceCache,
    requester: &ResourceKey,
    args: Option<&[&str]>,
) -> HearthResult<Arc<ModuleEnvironment>> {
    let identifier = require(args)?;
    debug!("{} requires module {}", requester, identifier);
    let key = module_key(cache, requester, &identifier)?;
    cache.load_as::<ModuleEnvironment>(&key).await
}
