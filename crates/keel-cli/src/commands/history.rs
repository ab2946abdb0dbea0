//! History command implementation

use anyhow::{Context, Result};
use keel_core::MigrationStatus;
use keel_meta::{Engine, MetaStore};

use crate::cli::{GlobalArgs, OutputArgs};
use crate::commands::common::Deployment;

/// Execute the history command
pub(crate) fn execute(args: &OutputArgs, global: &GlobalArgs) -> Result<()> {
    let deployment = Deployment::open(global)?;
    let store = MetaStore::new(&deployment.db);
    let engine = Engine::new(
        &deployment.db,
        &store,
        &store,
        &store,
        &deployment.catalog,
    );

    let records = engine.history()?;

    if args.json {
        let json = serde_json::to_string_pretty(&records).context("Failed to serialize history")?;
        println!("{json}");
        return Ok(());
    }

    if records.is_empty() {
        println!("No migrations recorded");
        return Ok(());
    }

    for record in &records {
        let marker = match record.status {
            MigrationStatus::Success => "ok  ",
            MigrationStatus::Failed => "FAIL",
        };
        println!(
            "{marker} {}  {}  v{}  {} ms",
            record.executed_at.format("%Y-%m-%d %H:%M:%S"),
            record.filename,
            record.version_tag,
            record.execution_time_ms
        );
        if let Some(error) = &record.error_message {
            println!("     {error}");
        }
    }
    Ok(())
}
