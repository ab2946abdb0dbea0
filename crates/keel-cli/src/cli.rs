//! CLI argument definitions using clap derive API

use clap::{Args, Parser, Subcommand};

/// Keel - versioned schema migrations for DuckDB
#[derive(Parser, Debug)]
#[command(name = "keel")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Global options
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Global arguments available to all commands
#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to project directory
    #[arg(short = 'p', long, global = true, default_value = ".")]
    pub project_dir: String,

    /// Override config file path
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Override database path (`:memory:` allowed)
    #[arg(short, long, global = true, env = "KEEL_DATABASE")]
    pub database: Option<String>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the schema into a database that has never been installed
    Install(RunArgs),

    /// Apply pending migrations to an installed database
    Update(RunArgs),

    /// Show installation state, versions, pending migrations and drift
    Status(OutputArgs),

    /// List the migrations the next run would apply, without running them
    Plan(OutputArgs),

    /// Show the latest recorded attempt for each migration
    History(OutputArgs),

    /// Clear a run lock left behind by an interrupted run
    Unlock,
}

/// Arguments for the install and update commands
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Stop starting new migrations after this many seconds
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,
}

/// Arguments for read-only reporting commands
#[derive(Args, Debug)]
pub struct OutputArgs {
    /// Print machine-readable JSON instead of text
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
#[path = "cli_test.rs"]
mod tests;
