//! `aidlgate plan` command

use std::path::Path;

use anyhow::Result;

use crate::cli::PlanArgs;
use aidlgate::ops::{self, Project};

pub fn execute(args: PlanArgs, root: &Path) -> Result<()> {
    let project = Project::load(root)?;
    let graph = ops::plan(&project)?;

    if args.json {
        println!("{}", graph.to_json()?);
        return Ok(());
    }

    for action in graph.order()? {
        println!("{}", action);
        for prerequisite in graph.prerequisites(&action.name) {
            println!("    after {}", prerequisite);
        }
    }
    Ok(())
}
