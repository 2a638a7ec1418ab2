//! The IDL compiler collaborator.
//!
//! Dumping an API and judging equality or compatibility of two dumps are
//! delegated to the IDL compiler. [`IdlCompiler`] is the seam; the real
//! implementation shells out to the `aidl` binary.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::Config;
use crate::util::process::{find_idl_compiler, ProcessBuilder};

/// How strictly two dumps are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckLevel {
    /// Identical surface.
    Equal,
    /// The new dump is a backward-compatible evolution of the old one.
    Compatible,
}

impl fmt::Display for CheckLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckLevel::Equal => write!(f, "equal"),
            CheckLevel::Compatible => write!(f, "compatible"),
        }
    }
}

/// Verdict of a dump comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Pass,
    /// Failed, with the compiler's explanation.
    Fail(String),
}

impl CheckOutcome {
    pub fn passed(&self) -> bool {
        matches!(self, CheckOutcome::Pass)
    }
}

/// Inputs of an API dump.
#[derive(Debug, Clone)]
pub struct DumpRequest {
    /// Sources, each below `include_root`
    pub srcs: Vec<PathBuf>,
    pub include_root: PathBuf,
    /// Other `-I` roots: declared include dirs and imported versions
    pub include_dirs: Vec<PathBuf>,
    pub stability: Option<String>,
    pub no_license: bool,
    pub out_dir: PathBuf,
}

/// Inputs of a dump comparison.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub old: PathBuf,
    pub new: PathBuf,
    pub level: CheckLevel,
    pub include_dirs: Vec<PathBuf>,
}

pub trait IdlCompiler: Send + Sync {
    /// Write the canonical dump of `request.srcs` into `request.out_dir`.
    fn dump_api(&self, request: &DumpRequest) -> Result<()>;

    /// Compare two dumps. `Err` means the comparison could not run at all.
    fn check_api(&self, request: &CheckRequest) -> Result<CheckOutcome>;
}

/// The `aidl` binary.
#[derive(Debug, Clone)]
pub struct ProcessCompiler {
    path: PathBuf,
}

impl ProcessCompiler {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        ProcessCompiler { path: path.into() }
    }

    /// The configured compiler, or the one found on `PATH`.
    pub fn locate(config: &Config) -> Option<Self> {
        config
            .compiler
            .path
            .clone()
            .or_else(find_idl_compiler)
            .map(ProcessCompiler::new)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dump_command(&self, request: &DumpRequest) -> ProcessBuilder {
        let mut cmd = ProcessBuilder::new(&self.path)
            .arg("--dumpapi")
            .arg("--structured");
        if let Some(stability) = &request.stability {
            cmd = cmd.arg(format!("--stability={}", stability));
        }
        if request.no_license {
            cmd = cmd.arg("--no_license");
        }
        cmd = cmd.arg(format!("-I{}", request.include_root.display()));
        for dir in &request.include_dirs {
            cmd = cmd.arg(format!("-I{}", dir.display()));
        }
        cmd.arg("--out").arg(&request.out_dir).args(&request.srcs)
    }

    pub fn check_command(&self, request: &CheckRequest) -> ProcessBuilder {
        let mut cmd =
            ProcessBuilder::new(&self.path).arg(format!("--checkapi={}", request.level));
        for dir in &request.include_dirs {
            cmd = cmd.arg(format!("-I{}", dir.display()));
        }
        cmd.arg(&request.old).arg(&request.new)
    }
}

impl IdlCompiler for ProcessCompiler {
    fn dump_api(&self, request: &DumpRequest) -> Result<()> {
        std::fs::create_dir_all(&request.out_dir).with_context(|| {
            format!("failed to create dump directory: {}", request.out_dir.display())
        })?;
        self.dump_command(request)
            .exec_and_check()
            .context("failed to dump API")?;
        Ok(())
    }

    fn check_api(&self, request: &CheckRequest) -> Result<CheckOutcome> {
        let output = self.check_command(request).exec()?;
        if output.status.success() {
            return Ok(CheckOutcome::Pass);
        }
        let mut detail = String::from_utf8_lossy(&output.stderr).into_owned();
        if detail.trim().is_empty() {
            detail = String::from_utf8_lossy(&output.stdout).into_owned();
        }
        Ok(CheckOutcome::Fail(detail))
    }
}
