//! Test utilities and mocks for aidlgate unit tests.
//!
//! [`MockCompiler`] stands in for the `aidl` binary: a dump copies the
//! sources, equality compares trees, and compatibility only asks that every
//! line of the old dump survive. [`RecordingPatcher`] records patches
//! instead of editing declaration files.

pub mod fixtures;

use std::cell::RefCell;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::api::compiler::{CheckLevel, CheckOutcome, CheckRequest, DumpRequest, IdlCompiler};
use crate::core::interface::HASH_FILE;
use crate::freeze::{ConfigPatcher, Patch};
use crate::util::fs::{read_tree, write_string};

fn is_hash_file(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n == HASH_FILE)
}

/// Drop a leading `/* ... */` or `//` comment block.
fn strip_license(text: &str) -> String {
    let trimmed = text.trim_start();
    if let Some(rest) = trimmed.strip_prefix("/*") {
        if let Some(end) = rest.find("*/") {
            return rest[end + 2..].trim_start().to_string();
        }
    }
    let body: Vec<&str> = trimmed
        .lines()
        .skip_while(|l| l.trim_start().starts_with("//"))
        .collect();
    let mut out = body.join("\n").trim_start().to_string();
    if text.ends_with('\n') && !out.is_empty() {
        out.push('\n');
    }
    out
}

/// In-process stand-in for the IDL compiler.
#[derive(Debug, Clone, Default)]
pub struct MockCompiler;

impl MockCompiler {
    pub fn new() -> Self {
        MockCompiler
    }
}

impl IdlCompiler for MockCompiler {
    fn dump_api(&self, request: &DumpRequest) -> Result<()> {
        for src in &request.srcs {
            let rel = src
                .strip_prefix(&request.include_root)
                .with_context(|| format!("{} is outside the include root", src.display()))?;
            let text = std::fs::read_to_string(src)
                .with_context(|| format!("{}: No such file", src.display()))?;
            let text = if request.no_license {
                strip_license(&text)
            } else {
                text
            };
            write_string(&request.out_dir.join(rel), &text)?;
        }
        Ok(())
    }

    fn check_api(&self, request: &CheckRequest) -> Result<CheckOutcome> {
        let old = read_tree(&request.old, &is_hash_file)?;
        let new = read_tree(&request.new, &is_hash_file)?;

        match request.level {
            CheckLevel::Equal if old == new => Ok(CheckOutcome::Pass),
            CheckLevel::Equal => Ok(CheckOutcome::Fail(format!(
                "{} and {} differ",
                request.old.display(),
                request.new.display()
            ))),
            CheckLevel::Compatible => {
                for (rel, bytes) in &old {
                    let Some(new_bytes) = new.get(rel) else {
                        return Ok(CheckOutcome::Fail(format!("{} was removed", rel.display())));
                    };
                    let new_text = String::from_utf8_lossy(new_bytes);
                    let new_lines: Vec<&str> = new_text.lines().map(str::trim).collect();
                    let old_text = String::from_utf8_lossy(bytes);
                    for line in old_text.lines().map(str::trim).filter(|l| !l.is_empty()) {
                        if !new_lines.contains(&line) {
                            return Ok(CheckOutcome::Fail(format!(
                                "{}: `{}` was removed",
                                rel.display(),
                                line
                            )));
                        }
                    }
                }
                Ok(CheckOutcome::Pass)
            }
        }
    }
}

/// Records patches; optionally fails every batch.
#[derive(Debug, Default)]
pub struct RecordingPatcher {
    patches: RefCell<Vec<Patch>>,
    fail: bool,
}

impl RecordingPatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        RecordingPatcher {
            patches: RefCell::new(Vec::new()),
            fail: true,
        }
    }

    /// Patches applied so far, in order.
    pub fn patches(&self) -> Vec<Patch> {
        self.patches.borrow().clone()
    }
}

impl ConfigPatcher for RecordingPatcher {
    fn apply(&self, patches: &[Patch]) -> Result<()> {
        if self.fail {
            bail!("patch tool exited with status 1");
        }
        self.patches.borrow_mut().extend_from_slice(patches);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_license() {
        assert_eq!(strip_license("/* Copyright */\ninterface IFoo {}\n"), "interface IFoo {}\n");
        assert_eq!(strip_license("// a\n// b\n\ninterface IFoo {}\n"), "interface IFoo {}\n");
        assert_eq!(strip_license("interface IFoo {}\n"), "interface IFoo {}\n");
    }
}
