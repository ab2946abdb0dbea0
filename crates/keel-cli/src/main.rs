//! Keel CLI - versioned schema migrations for DuckDB

use clap::Parser;
use std::process::ExitCode;

mod cli;
mod commands;

use cli::Cli;
use commands::{common, history, install, plan, status, unlock, update};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.global.verbose);

    let result = match &cli.command {
        cli::Commands::Install(args) => install::execute(args, &cli.global),
        cli::Commands::Update(args) => update::execute(args, &cli.global),
        cli::Commands::Status(args) => status::execute(args, &cli.global),
        cli::Commands::Plan(args) => plan::execute(args, &cli.global),
        cli::Commands::History(args) => history::execute(args, &cli.global),
        cli::Commands::Unlock => unlock::execute(&cli.global),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            if err.downcast_ref::<common::ExitCode>().is_none() {
                eprintln!("Error: {err:#}");
            }
            ExitCode::from(u8::try_from(common::exit_code(&err)).unwrap_or(1))
        }
    }
}

/// `RUST_LOG` wins; otherwise `info` with `--verbose`, `warn` without.
fn init_logging(verbose: bool) {
    let default_level = if verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}
