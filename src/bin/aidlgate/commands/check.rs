//! `aidlgate check` command

use std::path::Path;

use anyhow::Result;

use crate::cli::CheckArgs;
use aidlgate::api::IdlCompiler;
use aidlgate::ops::{self, Project};

pub fn execute(args: CheckArgs, root: &Path) -> Result<()> {
    let project = Project::load(root)?;
    let compiler = if args.run {
        Some(project.compiler()?)
    } else {
        None
    };

    let report = ops::check(&project, compiler.as_ref().map(|c| c as &dyn IdlCompiler))?;

    eprintln!(
        "     Checked {} interfaces, {} bindings, {} modules{}",
        report.interfaces,
        report.bindings,
        report.modules,
        if report.dumps_checked {
            " (with API dumps)"
        } else {
            ""
        }
    );
    Ok(())
}
