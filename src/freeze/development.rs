//! Has-development decision.
//!
//! An interface has development when its tip is not identical to its latest
//! frozen version: it was never frozen, its resolved imports moved, or its
//! dump changed. The decision itself is [`decide`], a pure function of the
//! gathered [`Evidence`]; [`has_development`] gathers it.

use std::collections::BTreeMap;

use anyhow::Result;

use crate::api::compiler::{CheckLevel, CheckRequest, IdlCompiler};
use crate::api::dump::{self, Dump};
use crate::core::interface::Interface;
use crate::freeze::FreezeError;
use crate::registry::{resolve, Registry, Violations};

/// What is known about the tip relative to the latest frozen version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Evidence {
    NeverFrozen,
    ImportsDiffer {
        current: BTreeMap<String, String>,
        latest_version: String,
        latest: BTreeMap<String, String>,
    },
    /// Imports match; the dumps compared equal or not.
    ApiEqual(bool),
}

fn render_imports(imports: &BTreeMap<String, String>) -> String {
    let items: Vec<String> = imports.iter().map(|(k, v)| format!("{}:{}", k, v)).collect();
    format!("map[{}]", items.join(" "))
}

/// Decide has-development, rejecting contradictions with the declared
/// `frozen` flag.
pub fn decide(iface: &Interface, evidence: &Evidence) -> Result<bool, FreezeError> {
    let interface = iface.key.to_string();
    match evidence {
        Evidence::NeverFrozen => Ok(true),
        Evidence::ImportsDiffer {
            current,
            latest_version,
            latest,
        } => {
            if iface.is_frozen() {
                Err(FreezeError::FrozenButImportsChanged {
                    interface,
                    current: render_imports(current),
                    latest_version: latest_version.clone(),
                    latest: render_imports(latest),
                })
            } else {
                Ok(true)
            }
        }
        Evidence::ApiEqual(true) if iface.is_explicitly_unfrozen() => {
            Err(FreezeError::UnfrozenButNoChanges { interface })
        }
        Evidence::ApiEqual(false) if iface.is_frozen() => {
            Err(FreezeError::FrozenButChanged { interface })
        }
        Evidence::ApiEqual(equal) => Ok(!equal),
    }
}

/// Import evidence, when it alone settles the question.
fn import_evidence(registry: &Registry, iface: &Interface) -> Option<Evidence> {
    let Some(latest_version) = iface.latest_version() else {
        return Some(Evidence::NeverFrozen);
    };
    let current = resolve::pinned_imports(registry, iface, None);
    let latest = resolve::pinned_imports(registry, iface, Some(latest_version));
    if current != latest {
        return Some(Evidence::ImportsDiffer {
            current,
            latest_version: latest_version.to_string(),
            latest,
        });
    }
    None
}

/// Gather evidence for `iface` given its freshly dumped tip, then decide.
pub fn has_development(
    registry: &Registry,
    compiler: &dyn IdlCompiler,
    iface: &Interface,
    tot: &Dump,
) -> Result<bool> {
    let evidence = match import_evidence(registry, iface) {
        Some(evidence) => evidence,
        None => {
            let latest = Dump::latest(iface)
                .map_err(Violations::from)?
                .ok_or_else(|| anyhow::anyhow!("{} has no frozen version", iface.key))?;
            let outcome = compiler.check_api(&CheckRequest {
                old: latest.dir.clone(),
                new: tot.dir.clone(),
                level: CheckLevel::Equal,
                include_dirs: dump::include_dirs(registry, iface, &iface.next_version()),
            })?;
            Evidence::ApiEqual(outcome.passed())
        }
    };

    let has_dev = decide(iface, &evidence).map_err(Violations::from)?;
    tracing::debug!("{} has development: {} ({:?})", iface.key, has_dev, evidence);
    Ok(has_dev)
}

/// Has-development from what is on disk, without a compiler: the `current`
/// snapshot against the latest frozen dump. Flag contradictions are not
/// reported here.
pub fn has_development_on_disk(registry: &Registry, iface: &Interface) -> Result<bool> {
    if let Some(evidence) = import_evidence(registry, iface) {
        return Ok(!matches!(evidence, Evidence::ApiEqual(true)));
    }
    let latest = Dump::latest(iface).map_err(Violations::from)?;
    let current = Dump::current(iface).map_err(Violations::from)?;
    match (latest, current) {
        (Some(latest), Some(current)) => Ok(!latest.equal(&current)?),
        _ => Ok(false),
    }
}
