//! High-level operations.
//!
//! This module contains the implementation of aidlgate commands.

pub mod check;
pub mod freeze;
pub mod load;
pub mod metadata;

use anyhow::Result;

use crate::builder::ActionGraph;

pub use check::{check, CheckReport};
pub use freeze::{freeze_api, update_api, FreezeTarget};
pub use load::Project;
pub use metadata::{metadata, write_metadata, InterfaceMetadata};

/// Declare the action graph of a loaded project.
pub fn plan(project: &Project) -> Result<ActionGraph> {
    crate::builder::plan(&project.registry, &project.workspace, &project.compiler_path())
}
