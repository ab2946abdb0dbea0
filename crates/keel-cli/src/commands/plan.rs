//! Plan command implementation

use anyhow::{Context, Result};
use keel_meta::{Engine, MetaStore};
use serde::Serialize;

use crate::cli::{GlobalArgs, OutputArgs};
use crate::commands::common::Deployment;

#[derive(Debug, Serialize)]
struct PlannedUnit<'a> {
    filename: &'a str,
    order_key: u64,
    checksum: &'a str,
}

/// Execute the plan command
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

    let pending = engine.pending()?;

    if args.json {
        let units: Vec<PlannedUnit<'_>> = pending
            .iter()
            .map(|u| PlannedUnit {
                filename: u.filename(),
                order_key: u.order_key().value(),
                checksum: u.checksum(),
            })
            .collect();
        let json = serde_json::to_string_pretty(&units).context("Failed to serialize plan")?;
        println!("{json}");
        return Ok(());
    }

    if pending.is_empty() {
        println!(
            "Nothing to apply; target version {}",
            deployment.catalog.target_version()
        );
        return Ok(());
    }

    println!(
        "{} migration(s) pending for version {}:",
        pending.len(),
        deployment.catalog.target_version()
    );
    for unit in &pending {
        println!("  {:>6}  {}", unit.order_key(), unit.filename());
    }
    Ok(())
}
