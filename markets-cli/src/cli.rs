//! CLI argument definitions using clap.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::config::CONFIG_FILE_NAME;

/// schema-manager - reconcile the SA Markets Directory backend schema
#[derive(Parser, Debug)]
#[command(name = "schema-manager")]
#[command(version)]
#[command(
    about = "schema-manager - reconcile the SA Markets Directory backend schema",
    long_about = None
)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Print verbose logs to the console (also enabled by `DEBUG=true`)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Backend base URL
    #[arg(long, global = true, env = "POCKETBASE_URL")]
    pub url: Option<String>,

    /// Path to the configuration file
    #[arg(long, global = true, default_value = CONFIG_FILE_NAME)]
    pub config: PathBuf,
}

/// Environment variable that turns on verbose logging when set to `true`.
pub const DEBUG_ENV: &str = "DEBUG";

impl Cli {
    /// Whether verbose logging is on, from `--debug` or `DEBUG=true`.
    pub fn debug_enabled(&self) -> bool {
        self.debug || debug_env_enabled(std::env::var(DEBUG_ENV).ok().as_deref())
    }
}

/// Only the exact value `true` enables debug; anything else leaves it off.
fn debug_env_enabled(value: Option<&str>) -> bool {
    value == Some("true")
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Dump the live schema to the generated-schema file
    Generate(GenerateArgs),

    /// Compare the declared schema with the live backend
    #[command(visible_alias = "diff")]
    Compare(CompareArgs),

    /// Apply the declared schema to the live backend
    Apply(ApplyArgs),

    /// Insert reference rows (categories, amenity types)
    Seed,

    /// Print manual setup instructions
    Setup,

    /// Validate the declared schema without contacting the backend
    Validate(ValidateArgs),

    /// Delete the cached admin credentials
    Logout,
}

// =============================================================================
// Generate Command
// =============================================================================

/// Arguments for the `generate` command
#[derive(Args, Debug)]
pub struct GenerateArgs {
    /// Output path (defaults to the configured generated-schema path)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

// =============================================================================
// Compare Command
// =============================================================================

/// Arguments for the `compare` command
#[derive(Args, Debug)]
pub struct CompareArgs {
    /// Path to the declared schema
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Print the diff as JSON
    #[arg(long)]
    pub json: bool,
}

// =============================================================================
// Apply Command
// =============================================================================

/// Arguments for the `apply` command
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Path to the declared schema
    #[arg(short, long)]
    pub schema: Option<PathBuf>,

    /// Apply without asking for confirmation
    #[arg(short, long)]
    pub yes: bool,
}

// =============================================================================
// Validate Command
// =============================================================================

/// Arguments for the `validate` command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Path to the declared schema
    #[arg(short, long)]
    pub schema: Option<PathBuf>,
}
