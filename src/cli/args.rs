//! CLI argument definitions using clap derive

use crate::resource::{Location, ResourceKind};
use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Hearth - resource cache and dependency-invalidation engine
///
/// Builds application resources on demand, tracks which resources were
/// built from which, and invalidates them when their sources change.
#[derive(Parser, Debug)]
#[command(name = "hearth")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "HEARTH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Application root (overrides app.root)
    #[arg(short, long, global = true, env = "HEARTH_ROOT")]
    pub root: Option<PathBuf>,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Build a resource and show what it resolved to
    Load(LoadArgs),

    /// Resolve a module identifier against its caller
    Resolve(ResolveArgs),

    /// Watch the application root and invalidate changed resources
    Watch(WatchArgs),

    /// Show or edit configuration
    Config(ConfigArgs),
}

/// Arguments for the load command
#[derive(Parser, Debug)]
pub struct LoadArgs {
    /// Resource kind (static, script, stylesheet, html, document, module, settings)
    pub kind: ResourceKind,

    /// Resource name within its location
    pub name: String,

    /// Location to load from (defaults per kind)
    #[arg(short, long)]
    pub location: Option<Location>,

    /// Build a stylesheet from its .less source
    #[arg(long)]
    pub less: bool,

    /// Document requiring the module (module kind only)
    #[arg(long, value_name = "DOCUMENT")]
    pub from: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Also print every cached resource and dependency link
    #[arg(long)]
    pub inspect: bool,
}

/// Output format for load
#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Plain,
}

/// Arguments for the resolve command
#[derive(Parser, Debug)]
pub struct ResolveArgs {
    /// Requested module identifier
    pub requested: String,

    /// Identifier of the requiring module
    pub caller: String,
}

/// Arguments for the watch command
#[derive(Parser, Debug)]
pub struct WatchArgs {
    /// Documents to build before watching (added to app.toml preload)
    pub documents: Vec<String>,

    /// Rebuild invalidated resources in the background
    #[arg(long)]
    pub reload: bool,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing config
        #[arg(short, long)]
        force: bool,
    },
}
