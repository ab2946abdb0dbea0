//! Install command implementation

use anyhow::Result;
use keel_meta::{Engine, MetaStore};

use crate::cli::{GlobalArgs, RunArgs};
use crate::commands::common::{finish_run, Deployment};

/// Execute the install command
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

    println!(
        "Installing {} at version {}",
        deployment.config.name,
        deployment.catalog.target_version()
    );
    let report = engine.install(deployment.timeout(args.timeout))?;
    finish_run(report, "Install")
}
