//! aidlgate CLI - versioning and freeze gate for AIDL interfaces

use std::io::IsTerminal;
use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use aidlgate::registry::Violations;
use aidlgate::util::diagnostic::emit;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        report(&e, color);
        std::process::exit(1);
    }
}

fn report(e: &anyhow::Error, color: bool) {
    match e.downcast_ref::<Violations>() {
        Some(violations) => {
            for diagnostic in violations.diagnostics() {
                emit(&diagnostic, color);
            }
            eprintln!("error: aborting due to {} violation(s)", violations.len());
        }
        None => eprintln!("error: {:#}", e),
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("aidlgate=debug")
    } else {
        EnvFilter::new("aidlgate=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let root = cli.directory.unwrap_or_else(|| PathBuf::from("."));

    // Execute command
    match cli.command {
        Commands::Check(args) => commands::check::execute(args, &root),
        Commands::Plan(args) => commands::plan::execute(args, &root),
        Commands::UpdateApi(args) => commands::update_api::execute(args, &root),
        Commands::FreezeApi(args) => commands::freeze_api::execute(args, &root),
        Commands::Metadata(args) => commands::metadata::execute(args, &root),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
