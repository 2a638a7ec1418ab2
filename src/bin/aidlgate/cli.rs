//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// aidlgate - versioning, freezing and compatibility gate for AIDL interfaces
#[derive(Parser)]
#[command(name = "aidlgate")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Run as if started in <DIR>
    #[arg(short = 'C', long = "directory", global = true, env = "AIDLGATE_ROOT", value_name = "DIR")]
    pub directory: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Validate declarations and consumers
    Check(CheckArgs),

    /// Print every declared build action
    Plan(PlanArgs),

    /// Regenerate the `current` snapshot of an interface
    UpdateApi(UpdateApiArgs),

    /// Freeze the tip of an interface as a new version
    FreezeApi(FreezeApiArgs),

    /// Export interface metadata as JSON
    Metadata(MetadataArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args)]
pub struct CheckArgs {
    /// Also run the dump checks through the IDL compiler
    #[arg(long)]
    pub run: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Emit the plan as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct UpdateApiArgs {
    /// Interface name, or //namespace:name
    pub name: String,
}

#[derive(Args)]
pub struct FreezeApiArgs {
    /// Interface name, or //namespace:name
    #[arg(required_unless_present = "all", conflicts_with = "all")]
    pub name: Option<String>,

    /// Freeze every interface selected by the freeze owners
    #[arg(long)]
    pub all: bool,
}

#[derive(Args)]
pub struct MetadataArgs {
    /// Write to a file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}
