//! Dump checks: integrity, equality of `current` and compatibility.
//!
//! Each stable interface is checked independently, so the runner fans out
//! over interfaces with `rayon`. Violations are collected, never fail-fast.

use std::path::Path;

use anyhow::Result;
use rayon::prelude::*;

use crate::api::compiler::{CheckLevel, CheckOutcome, CheckRequest, IdlCompiler};
use crate::api::dump::{self, Dump};
use crate::api::errors::ApiCheckError;
use crate::api::hash::{self, HashChain};
use crate::core::interface::Interface;
use crate::core::workspace::Workspace;
use crate::freeze::FreezeError;
use crate::registry::{Registry, Violation, Violations};

/// Verify the stored hash chain of every frozen dump, and of `current` when
/// it carries one.
pub fn check_integrity(iface: &Interface) -> Vec<Violation> {
    let mut violations = Vec::new();
    let mut previous: Option<(String, HashChain)> = None;

    for version in iface.version_list() {
        let dump = match Dump::frozen(iface, &version) {
            Ok(dump) => dump,
            Err(e) => {
                violations.push(e);
                previous = None;
                continue;
            }
        };
        let Some(chain) = dump.hash else {
            violations.push(
                FreezeError::MissingHashFile {
                    interface: iface.key.to_string(),
                    version: version.clone(),
                }
                .into(),
            );
            previous = None;
            continue;
        };

        let prev = previous.as_ref().map(|(v, c)| (v.as_str(), c));
        if let Err(e) = hash::verify(&dump.dir, &dump.interface, &version, &chain, prev) {
            violations.push(e.into());
        }
        previous = Some((version, chain));
    }

    match Dump::current(iface) {
        Ok(Some(current)) => {
            if let Some(chain) = &current.hash {
                let prev = previous.as_ref().map(|(v, c)| (v.as_str(), c));
                if let Err(e) =
                    hash::verify(&current.dir, &current.interface, &current.version, chain, prev)
                {
                    violations.push(e.into());
                }
            }
        }
        Ok(None) => {}
        Err(e) => violations.push(e),
    }

    violations
}

fn compare(
    compiler: &dyn IdlCompiler,
    old: &Path,
    new: &Path,
    level: CheckLevel,
    include_dirs: Vec<std::path::PathBuf>,
) -> Result<CheckOutcome> {
    compiler.check_api(&CheckRequest {
        old: old.to_path_buf(),
        new: new.to_path_buf(),
        level,
        include_dirs,
    })
}

/// Run every dump check of one interface. `out_dir` receives the tip dump.
///
/// `Err` means a check could not run at all (the compiler failed to dump,
/// say); findings are returned as violations.
pub fn check_interface(
    registry: &Registry,
    compiler: &dyn IdlCompiler,
    iface: &Interface,
    out_dir: &Path,
) -> Result<Vec<Violation>> {
    if iface.unstable {
        return Ok(Vec::new());
    }
    let name = iface.key.to_string();
    let next = iface.next_version();
    let mut violations = Vec::new();

    let tot = dump::dump_from_source(registry, compiler, iface, &out_dir.join("dump"))?;

    let current = match Dump::current(iface) {
        Ok(current) => current,
        Err(e) => {
            violations.push(e);
            None
        }
    };
    match &current {
        Some(current) => {
            let outcome = compare(
                compiler,
                &current.dir,
                &tot.dir,
                CheckLevel::Equal,
                dump::include_dirs(registry, iface, &next),
            )?;
            if let CheckOutcome::Fail(detail) = outcome {
                violations.push(
                    ApiCheckError::CurrentOutOfDate {
                        interface: name.clone(),
                        frozen: iface.is_frozen(),
                        detail,
                    }
                    .into(),
                );
            }
        }
        None => violations.push(
            ApiCheckError::MissingCurrentDump {
                interface: name.clone(),
            }
            .into(),
        ),
    }

    violations.extend(check_integrity(iface));

    // Consecutive pairs over [v1 .. vN, current]; missing dumps were
    // reported above.
    let mut chain: Vec<(String, std::path::PathBuf)> = iface
        .version_list()
        .into_iter()
        .map(|v| {
            let dir = iface.version_dir(&v);
            (v, dir)
        })
        .collect();
    if let Some(current) = &current {
        chain.push((next.clone(), current.dir.clone()));
    }
    for pair in chain.windows(2) {
        let [(old, old_dir), (new, new_dir)] = pair else {
            continue;
        };
        if !old_dir.is_dir() || !new_dir.is_dir() {
            continue;
        }
        let outcome = compare(
            compiler,
            old_dir,
            new_dir,
            CheckLevel::Compatible,
            dump::include_dirs(registry, iface, new),
        )?;
        if let CheckOutcome::Fail(detail) = outcome {
            violations.push(
                ApiCheckError::Incompatible {
                    interface: name.clone(),
                    old: old.clone(),
                    new: new.clone(),
                    detail,
                }
                .into(),
            );
        }
    }

    let orphan = iface.version_dir(&next);
    if orphan.is_dir() {
        violations.push(
            FreezeError::OrphanedVersionDirectory {
                interface: name,
                version: next,
                path: orphan,
            }
            .into(),
        );
    }

    tracing::debug!("checked {}: {} violations", iface.key, violations.len());
    Ok(violations)
}

/// Check every interface of the registry in parallel.
pub fn check_all(
    registry: &Registry,
    compiler: &dyn IdlCompiler,
    workspace: &Workspace,
) -> Result<Violations> {
    let interfaces: Vec<&Interface> = registry.interfaces().collect();
    let results: Vec<Result<Vec<Violation>>> = interfaces
        .par_iter()
        .map(|iface| {
            let out_dir = workspace.interface_out_dir(iface.namespace(), iface.name());
            check_interface(registry, compiler, iface, &out_dir)
        })
        .collect();

    let mut violations = Violations::default();
    for result in results {
        violations.extend(result?);
    }
    Ok(violations)
}
