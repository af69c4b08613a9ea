//! Watch command - keep the cache current while sources change

use crate::cli::args::WatchArgs;
use crate::config::Config;
use crate::engine::Engine;
use crate::error::HearthResult;
use crate::resource::{ResourceKind, ResourceWatcher};
use crate::ui::{self, UiContext};
use std::path::PathBuf;
use tracing::warn;

/// Execute the watch command
pub async fn execute(args: WatchArgs, config: &Config, root: Option<PathBuf>) -> HearthResult<()> {
    let ctx = UiContext::detect();

    if !config.watch.enabled {
        ui::step_warn_hint(&ctx, "Watching is disabled", "Set watch.enabled = true");
        return Ok(());
    }

    let engine = Engine::new(config, root);

    let mut documents = args.documents;
    if let Some(settings) = engine.settings().await? {
        for name in &settings.settings().preload {
            if !documents.contains(name) {
                documents.push(name.clone());
            }
        }
    }

    for name in &documents {
        let key = engine.key_for(ResourceKind::Document, name, None, false).await?;
        match engine.cache().load(&key).await {
            Ok(_) => ui::step_ok(&ctx, &format!("Built {}", key)),
            Err(e) => warn!("Failed to build {}: {}", key, e),
        }
    }

    let reload = args.reload || config.watch.reload_on_change;
    let watcher = ResourceWatcher::new(engine.cache().clone(), engine.paths().clone(), reload)?;
    ui::step_info(
        &ctx,
        &format!("Watching {} (Ctrl-C to stop)", engine.paths().root().display()),
    );

    watcher
        .run(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl-C: {}", e);
            }
        })
        .await
}
