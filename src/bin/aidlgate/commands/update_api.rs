//! `aidlgate update-api` command

use std::path::Path;

use anyhow::Result;

use crate::cli::UpdateApiArgs;
use aidlgate::freeze::TomlPatcher;
use aidlgate::ops::{self, Project};

pub fn execute(args: UpdateApiArgs, root: &Path) -> Result<()> {
    let project = Project::load(root)?;
    let compiler = project.compiler()?;
    let outcome = ops::update_api(&project, &compiler, &TomlPatcher::new(), &args.name)?;

    if outcome.current_changed {
        eprintln!("    Updated current API of {}", outcome.interface);
    } else {
        eprintln!("  Up to date current API of {}", outcome.interface);
    }
    for patch in &outcome.patches {
        eprintln!("     Patched {}", patch);
    }
    Ok(())
}
