//! Status command implementation

use anyhow::{Context, Result};
use keel_core::Drift;
use keel_meta::{Engine, MetaStore, StatusReport};

use crate::cli::{GlobalArgs, OutputArgs};
use crate::commands::common::Deployment;

/// Execute the status command
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

    let report = engine.status()?;
    if args.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize status")?;
        println!("{json}");
    } else {
        print_status(&deployment.config.name, &report);
    }
    Ok(())
}

fn print_status(name: &str, report: &StatusReport) {
    println!("Project: {name}");
    println!("  State:          {}", report.state);
    println!(
        "  Stored version: {}",
        report.stored_version.as_deref().unwrap_or("none")
    );
    println!("  Target version: {}", report.target_version);
    println!("  Pending:        {}", report.pending.len());
    for filename in &report.pending {
        println!("    {filename}");
    }

    if let Some(run) = report.marker.as_ref().and_then(|m| m.active_run.as_ref()) {
        println!(
            "  Lock:           {} by run {} since {}",
            run.kind,
            run.run_id,
            run.started_at.to_rfc3339()
        );
    }

    if !report.drift.is_empty() {
        println!();
        println!("Drift:");
        for drift in &report.drift {
            match drift {
                Drift::Modified { filename, .. } => {
                    println!("  modified after apply: {filename}")
                }
                Drift::Missing { filename } => println!("  no longer deployed:   {filename}"),
            }
        }
    }
}
