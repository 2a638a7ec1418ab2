//! `aidlgate freeze-api` command

use std::path::Path;

use anyhow::Result;

use crate::cli::FreezeApiArgs;
use aidlgate::freeze::TomlPatcher;
use aidlgate::ops::{self, FreezeTarget, Project};

pub fn execute(args: FreezeApiArgs, root: &Path) -> Result<()> {
    let target = match args.name {
        Some(name) if !args.all => FreezeTarget::Interface(name),
        _ => FreezeTarget::All,
    };

    let project = Project::load(root)?;
    let compiler = project.compiler()?;
    let outcomes = ops::freeze_api(&project, &compiler, &TomlPatcher::new(), &target)?;

    let frozen = outcomes.iter().filter(|o| o.is_frozen()).count();
    for outcome in &outcomes {
        eprintln!("    {}", outcome);
    }
    eprintln!("      Frozen {} of {} interfaces", frozen, outcomes.len());
    Ok(())
}
