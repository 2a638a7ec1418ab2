//! The update-api / freeze-api transitions.
//!
//! ```text
//! Unfrozen-NoVersions --freeze--> Frozen
//! Unfrozen-Versioned  --freeze--> Frozen          (only with development)
//! Frozen              --update--> Unfrozen-Versioned
//! ```
//!
//! Every decision is taken against the immutable registry before anything
//! is written. Writes are limited to dump directories and the patches handed
//! to the [`ConfigPatcher`].

use std::collections::HashMap;
use std::fmt;

use anyhow::Result;

use crate::api::check::check_integrity;
use crate::api::compiler::IdlCompiler;
use crate::api::dump::{self, Dump};
use crate::core::interface::{Interface, InterfaceKey, HASH_FILE, VersionInfo};
use crate::core::version::{self, versioned_name};
use crate::core::workspace::Workspace;
use crate::freeze::development::has_development;
use crate::freeze::patcher::{ConfigPatcher, Patch, PatchValue};
use crate::freeze::FreezeError;
use crate::registry::{Registry, Violations};
use crate::util::fs::{copy_dir_all, mirror_dir, remove_dir_all_if_exists};

/// Result of one freeze-api on one interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FreezeOutcome {
    Frozen {
        interface: String,
        version: String,
        patches: Vec<Patch>,
    },
    /// No development: nothing copied, nothing patched.
    NothingChanged { interface: String },
}

impl FreezeOutcome {
    pub fn interface(&self) -> &str {
        match self {
            FreezeOutcome::Frozen { interface, .. } | FreezeOutcome::NothingChanged { interface } => {
                interface
            }
        }
    }

    pub fn is_frozen(&self) -> bool {
        matches!(self, FreezeOutcome::Frozen { .. })
    }
}

impl fmt::Display for FreezeOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FreezeOutcome::Frozen {
                interface, version, ..
            } => write!(f, "froze {}", versioned_name(interface, version)),
            FreezeOutcome::NothingChanged { interface } => {
                write!(f, "{} has no changes", interface)
            }
        }
    }
}

/// Result of one update-api.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateOutcome {
    pub interface: String,
    /// Whether anything under `current` was rewritten
    pub current_changed: bool,
    pub patches: Vec<Patch>,
}

/// Bookkeeping shared by the freezes of one invocation.
#[derive(Debug, Default)]
struct FreezeRun {
    /// Interfaces already handled, with whether they had development
    visited: HashMap<InterfaceKey, bool>,
    outcomes: Vec<FreezeOutcome>,
}

/// Drives update-api and freeze-api over a registry.
pub struct Orchestrator<'a> {
    registry: &'a Registry,
    compiler: &'a dyn IdlCompiler,
    patcher: &'a dyn ConfigPatcher,
    workspace: &'a Workspace,
}

impl<'a> Orchestrator<'a> {
    pub fn new(
        registry: &'a Registry,
        compiler: &'a dyn IdlCompiler,
        patcher: &'a dyn ConfigPatcher,
        workspace: &'a Workspace,
    ) -> Self {
        Orchestrator {
            registry,
            compiler,
            patcher,
            workspace,
        }
    }

    fn stable<'i>(&self, iface: &'i Interface) -> Result<&'i Interface, FreezeError> {
        if iface.unstable {
            return Err(FreezeError::UnstableInterface {
                interface: iface.key.to_string(),
            });
        }
        Ok(iface)
    }

    fn tip_dump(&self, iface: &Interface) -> Result<Dump> {
        let out_dir = self
            .workspace
            .interface_out_dir(iface.namespace(), iface.name())
            .join("dump");
        dump::dump_from_source(self.registry, self.compiler, iface, &out_dir)
    }

    fn apply(&self, iface: &Interface, patches: &[Patch]) -> Result<()> {
        if patches.is_empty() {
            return Ok(());
        }
        self.patcher.apply(patches).map_err(|e| {
            let mut properties: Vec<String> = Vec::new();
            for patch in patches {
                if !properties.contains(&patch.property) {
                    properties.push(patch.property.clone());
                }
            }
            anyhow::Error::from(Violations::from(FreezeError::PatchFailed {
                interface: iface.key.to_string(),
                properties,
                path: iface.decl_path.clone(),
                reason: format!("{:#}", e),
            }))
        })
    }

    /// Imports to record for the version being frozen.
    ///
    /// `frozen_imports` holds, for imports frozen in this run, whether they
    /// had development; it is empty for a non-transitive freeze.
    fn recorded_imports(
        &self,
        iface: &Interface,
        specs: &[String],
        transitive: Option<&HashMap<InterfaceKey, bool>>,
    ) -> Vec<String> {
        specs
            .iter()
            .map(|spec| {
                let (name, pinned) = version::parse_module_with_version(spec);
                if !pinned.is_empty() {
                    return spec.clone();
                }
                let Some(target) = self.registry.lookup(iface.namespace(), &name) else {
                    return spec.clone();
                };
                if target.unstable {
                    return spec.clone();
                }
                let latest = target.latest_version().map(str::to_string);
                let ver = match transitive {
                    Some(visited) => {
                        if visited.get(&target.key).copied().unwrap_or(false) {
                            target.next_version()
                        } else {
                            latest.unwrap_or_else(|| target.next_version())
                        }
                    }
                    None => match latest {
                        Some(latest) if !target.is_explicitly_unfrozen() => latest,
                        _ => target.next_version(),
                    },
                };
                versioned_name(&name, &ver)
            })
            .collect()
    }

    /// Patches folding a legacy `versions` list into `versions_with_info`.
    fn migration_patches(&self, iface: &Interface) -> Vec<Patch> {
        if !iface.legacy_versions {
            return Vec::new();
        }
        let name = iface.name();
        let mut patches = vec![Patch::new(
            name,
            "versions",
            PatchValue::Remove,
            &iface.decl_path,
        )];
        for version in iface.version_list() {
            let imports = self.recorded_imports(iface, iface.imports_for_version(&version), None);
            patches.push(Patch::new(
                name,
                "versions_with_info",
                PatchValue::AppendVersion(VersionInfo { version, imports }),
                &iface.decl_path,
            ));
        }
        patches
    }

    /// Regenerate the tip dump and mirror it into `current`.
    pub fn update_current(&self, iface: &Interface) -> Result<UpdateOutcome> {
        let iface = self.stable(iface).map_err(Violations::from)?;
        let tot = self.tip_dump(iface)?;

        let skip_hash = |p: &std::path::Path| p.file_name().is_some_and(|n| n == HASH_FILE);
        let current_changed = mirror_dir(&tot.dir, &iface.current_dir(), &skip_hash)?;

        let differs = match Dump::latest(iface).map_err(Violations::from)? {
            Some(latest) => !latest.equal(&tot)?,
            None => false,
        };

        let mut patches = Vec::new();
        if differs && !iface.is_explicitly_unfrozen() {
            patches.push(Patch::new(
                iface.name(),
                "frozen",
                PatchValue::Bool(false),
                &iface.decl_path,
            ));
        }
        patches.extend(self.migration_patches(iface));
        self.apply(iface, &patches)?;

        if current_changed {
            tracing::info!("Updated {} in {}", iface.key, self.workspace.display_path(&iface.current_dir()));
        } else {
            tracing::info!("{} is up to date", self.workspace.display_path(&iface.current_dir()));
        }
        Ok(UpdateOutcome {
            interface: iface.key.to_string(),
            current_changed,
            patches,
        })
    }

    /// Freeze `iface`, and first its tip-tracking imports when the policy
    /// asks for a transitive freeze. Outcomes are in the order the freezes
    /// happened, imports first.
    pub fn freeze_api(&self, iface: &Interface) -> Result<Vec<FreezeOutcome>> {
        let mut run = FreezeRun::default();
        self.freeze_one(iface, &mut run)?;
        Ok(run.outcomes)
    }

    /// Freeze every interface selected for the aggregate freeze target, in
    /// import order.
    pub fn freeze_all(&self) -> Result<Vec<FreezeOutcome>> {
        let policy = self.registry.policy();
        let mut run = FreezeRun::default();
        for iface in self.registry.build_order() {
            if iface.unstable || !policy.selects_for_freeze(iface.owner()) {
                continue;
            }
            if run.visited.contains_key(&iface.key) {
                continue;
            }
            self.freeze_one(iface, &mut run)?;
        }
        Ok(run.outcomes)
    }

    fn freeze_one(&self, iface: &Interface, run: &mut FreezeRun) -> Result<bool> {
        if let Some(&had_development) = run.visited.get(&iface.key) {
            return Ok(had_development);
        }
        let iface = self.stable(iface).map_err(Violations::from)?;
        let name = iface.key.to_string();
        let next = iface.next_version();
        let transitive = self.registry.policy().transitive_freeze;

        let broken = check_integrity(iface);
        if !broken.is_empty() {
            return Err(Violations::new(broken).into());
        }
        let target = iface.version_dir(&next);
        if target.exists() {
            return Err(Violations::from(FreezeError::OrphanedVersionDirectory {
                interface: name,
                version: next,
                path: target,
            })
            .into());
        }

        if transitive {
            for spec in &iface.imports {
                let (import, pinned) = version::parse_module_with_version(spec);
                let Some(other) = self.registry.lookup(iface.namespace(), &import) else {
                    continue;
                };
                if other.unstable || !(pinned.is_empty() || pinned == other.next_version()) {
                    continue;
                }
                tracing::info!(
                    "Call {}-freeze-api because {} depends on {}.",
                    other.key,
                    name,
                    other.key
                );
                self.freeze_one(other, run)?;
            }
        }

        let tot = self.tip_dump(iface)?;
        let has_dev = has_development(self.registry, self.compiler, iface, &tot)?;
        run.visited.insert(iface.key.clone(), has_dev);

        if !has_dev {
            tracing::info!(
                "There is no change from the latest stable version of {}. Nothing happened.",
                name
            );
            run.outcomes.push(FreezeOutcome::NothingChanged { interface: name });
            return Ok(false);
        }

        tracing::info!(
            "There is change between ToT version and the latest stable version. Freezing {}-V{}.",
            name,
            next
        );
        let imports = self.recorded_imports(
            iface,
            &iface.imports,
            transitive.then_some(&run.visited),
        );
        let mut patches = self.migration_patches(iface);
        patches.push(Patch::new(
            iface.name(),
            "versions_with_info",
            PatchValue::AppendVersion(VersionInfo {
                version: next.clone(),
                imports,
            }),
            &iface.decl_path,
        ));
        patches.push(Patch::new(
            iface.name(),
            "frozen",
            PatchValue::Bool(true),
            &iface.decl_path,
        ));

        // The new version directory only survives a successful patch.
        if let Err(e) = copy_dir_all(&tot.dir, &target).and_then(|_| self.apply(iface, &patches)) {
            remove_dir_all_if_exists(&target)?;
            return Err(e);
        }

        run.outcomes.push(FreezeOutcome::Frozen {
            interface: name,
            version: next,
            patches,
        });
        Ok(true)
    }
}
