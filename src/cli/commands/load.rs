//! Load command - build one resource and report it

use crate::cli::args::{LoadArgs, OutputFormat};
use crate::config::Config;
use crate::creators::{DocumentEnvironment, ModuleEnvironment};
use crate::engine::Engine;
use crate::error::{HearthError, HearthResult};
use crate::resource::{downcast, CacheSnapshot, Resource, ResourceKind};
use crate::script::require_module;
use crate::ui::{self, UiContext};
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;

/// What a load produced
#[derive(Debug, Serialize)]
struct LoadReport {
    key: String,
    hash: Option<String>,
    uri: Option<String>,
    created_at: DateTime<Utc>,
    watched: Vec<PathBuf>,
    requires: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    cache: Option<CacheSnapshot>,
}

/// Execute the load command
pub async fn execute(args: LoadArgs, config: &Config, root: Option<PathBuf>) -> HearthResult<()> {
    let engine = Engine::new(config, root);

    let resource = if args.kind == ResourceKind::Module {
        load_module(&engine, &args).await?
    } else {
        let key = engine
            .key_for(args.kind, &args.name, args.location, args.less)
            .await?;
        engine.cache().load(&key).await?
    };

    let report = LoadReport {
        key: resource.key().to_string(),
        hash: resource.content_hash().map(str::to_string),
        uri: resource.uri(),
        created_at: resource.created_at(),
        watched: resource.watched_paths(),
        requires: requires(&resource),
        cache: args.inspect.then(|| engine.cache().inspect()),
    };

    match args.format {
        OutputFormat::Table => print_table(&report),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Plain => print_plain(&report),
    }

    Ok(())
}

/// Modules only exist on behalf of a requiring document
async fn load_module(engine: &Engine, args: &LoadArgs) -> HearthResult<Arc<dyn Resource>> {
    let from = args.from.as_deref().ok_or_else(|| {
        HearthError::User("Loading a module requires --from <DOCUMENT>".to_string())
    })?;

    let key = engine
        .key_for(ResourceKind::Document, from, None, false)
        .await?;
    let document = engine.cache().load_as::<DocumentEnvironment>(&key).await?;
    let caller = document.module_identifier().to_string();

    let request = [args.name.as_str(), caller.as_str()];
    let module: Arc<dyn Resource> = require_module(engine.cache(), &key, Some(&request[..])).await?;
    Ok(module)
}

fn requires(resource: &Arc<dyn Resource>) -> Vec<String> {
    if let Some(document) = downcast::<DocumentEnvironment>(resource.clone()) {
        return document
            .shared_script()
            .into_iter()
            .chain(document.script())
            .flat_map(|script| script.requires().iter().cloned())
            .collect();
    }
    if let Some(module) = downcast::<ModuleEnvironment>(resource.clone()) {
        return module.script().requires().to_vec();
    }
    Vec::new()
}

fn print_table(report: &LoadReport) {
    let ctx = UiContext::detect();
    ui::section(&ctx, &report.key);

    ui::key_value(&ctx, "hash", report.hash.as_deref().unwrap_or("-"));
    ui::key_value(&ctx, "uri", report.uri.as_deref().unwrap_or("-"));
    ui::key_value(
        &ctx,
        "created",
        &report.created_at.format("%Y-%m-%d %H:%M:%S").to_string(),
    );
    for path in &report.watched {
        ui::key_value(&ctx, "watches", &path.display().to_string());
    }
    if !report.requires.is_empty() {
        ui::key_value(&ctx, "requires", &report.requires.join(", "));
    }

    if let Some(ref snapshot) = report.cache {
        println!();
        print_snapshot(&ctx, snapshot);
    }
}

fn print_snapshot(ctx: &UiContext, snapshot: &CacheSnapshot) {
    ui::section(ctx, "Cache");

    println!(
        "{:<4} {:<12} {:<10} {:<30} {:<14}",
        style("ID").bold(),
        style("KIND").bold(),
        style("LOCATION").bold(),
        style("NAME").bold(),
        style("HASH").bold()
    );
    println!("{}", "-".repeat(72));

    for node in &snapshot.nodes {
        let hash = node
            .hash
            .as_deref()
            .map(|h| h.chars().take(12).collect::<String>())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{:<4} {:<12} {:<10} {:<30} {:<14}",
            node.id,
            node.kind,
            node.location,
            truncate(&node.name, 30),
            style(hash).dim()
        );
    }

    if !snapshot.links.is_empty() {
        println!();
        for link in &snapshot.links {
            let source = &snapshot.nodes[link.source];
            let target = &snapshot.nodes[link.target];
            ui::step_info(ctx, &format!("{} -> {}", source.key, target.key));
        }
    }
}

fn print_plain(report: &LoadReport) {
    println!("{}", report.uri.as_deref().unwrap_or(&report.key));

    if let Some(ref snapshot) = report.cache {
        for node in &snapshot.nodes {
            println!("{}", node.key);
        }
        for link in &snapshot.links {
            println!(
                "{} -> {}",
                snapshot.nodes[link.source].key, snapshot.nodes[link.target].key
            );
        }
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
