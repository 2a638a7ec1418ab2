//! Implementation of `aidlgate update-api` and `aidlgate freeze-api`.

use anyhow::{anyhow, Result};

use crate::api::IdlCompiler;
use crate::core::interface::Interface;
use crate::freeze::{ConfigPatcher, FreezeOutcome, Orchestrator, UpdateOutcome};
use crate::ops::load::Project;

/// What `freeze-api` acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreezeTarget {
    /// One interface, by `name` or `//namespace:name`
    Interface(String),
    /// Every interface selected by the freeze owners
    All,
}

fn find<'p>(project: &'p Project, name: &str) -> Result<&'p Interface> {
    project.registry.find(name).ok_or_else(|| {
        let known: Vec<String> = project
            .registry
            .interfaces()
            .map(|i| i.key.to_string())
            .collect();
        anyhow!(
            "unknown interface `{}`\navailable interfaces: {}",
            name,
            if known.is_empty() {
                "(none)".to_string()
            } else {
                known.join(", ")
            }
        )
    })
}

pub fn update_api(
    project: &Project,
    compiler: &dyn IdlCompiler,
    patcher: &dyn ConfigPatcher,
    name: &str,
) -> Result<UpdateOutcome> {
    let iface = find(project, name)?;
    Orchestrator::new(&project.registry, compiler, patcher, &project.workspace).update_current(iface)
}

pub fn freeze_api(
    project: &Project,
    compiler: &dyn IdlCompiler,
    patcher: &dyn ConfigPatcher,
    target: &FreezeTarget,
) -> Result<Vec<FreezeOutcome>> {
    let orchestrator = Orchestrator::new(&project.registry, compiler, patcher, &project.workspace);
    match target {
        FreezeTarget::Interface(name) => orchestrator.freeze_api(find(project, name)?),
        FreezeTarget::All => orchestrator.freeze_all(),
    }
}
