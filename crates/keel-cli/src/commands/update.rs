//! Update command implementation

use anyhow::Result;
use keel_meta::{Engine, MetaStore, UpdateOutcome};

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{finish_run, Deployment};

/// Execute the update command
pub(crate) fn execute(args: &RunArgs, global: &GlobalArgs) -> Result<()> {
    let deployment = Deployment::open(global)?;
    let store = MetaStore::new(&deployment.db);
    let engine = Engine::new(
        &deployment.db,
        &store,
        &store,
        &store,
        &deployment.catalog,
    );

    match engine.update(deployment.timeout(args.timeout))? {
        UpdateOutcome::AlreadyCurrent { version } => {
            println!("Already current at version {version}");
            Ok(())
        }
        UpdateOutcome::Ran(report) => finish_run(report, "Update"),
    }
}
