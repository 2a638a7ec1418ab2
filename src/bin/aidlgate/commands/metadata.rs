//! `aidlgate metadata` command

use std::path::Path;

use anyhow::Result;

use crate::cli::MetadataArgs;
use aidlgate::api::IdlCompiler;
use aidlgate::ops::{self, Project};

pub fn execute(args: MetadataArgs, root: &Path) -> Result<()> {
    let project = Project::load(root)?;
    // Without a compiler, development is judged from `current` on disk.
    let compiler = project.compiler().ok();

    let entries = ops::metadata(&project, compiler.as_ref().map(|c| c as &dyn IdlCompiler))?;
    let json = ops::write_metadata(&entries, args.output.as_deref())?;

    match &args.output {
        Some(path) => eprintln!("       Wrote metadata of {} interfaces to {}", entries.len(), path.display()),
        None => println!("{}", json),
    }
    Ok(())
}
