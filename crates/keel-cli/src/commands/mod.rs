//! CLI command implementations

pub(crate) mod common;
pub(crate) mod history;
pub(crate) mod install;
pub(crate) mod plan;
pub(crate) mod status;
pub(crate) mod unlock;
pub(crate) mod update;
