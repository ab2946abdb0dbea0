//! Unlock command implementation

use anyhow::Result;
use keel_meta::{Engine, MetaStore};

use crate::cli::GlobalArgs;
use crate::commands::common::Deployment;

/// Execute the unlock command
pub(crate) fn execute(global: &GlobalArgs) -> Result<()> {
    let deployment = Deployment::open(global)?;
    let store = MetaStore::new(&deployment.db);
    let engine = Engine::new(
        &deployment.db,
        &store,
        &store,
        &store,
        &deployment.catalog,
    );

    match engine.unlock()? {
        Some(run) => println!(
            "Cleared {} lock held by run {} (started {})",
            run.kind,
            run.run_id,
            run.started_at.to_rfc3339()
        ),
        None => println!("No run lock held"),
    }
    Ok(())
}
