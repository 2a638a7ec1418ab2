//! Build plan generation.
//!
//! Declares, for every interface of a registry, the dump and check actions
//! that guard its frozen history, the update/freeze entry points, and one
//! generation action per binding. Nothing runs here; see [`ActionGraph`].

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::api::compiler::{CheckLevel, CheckRequest, DumpRequest, ProcessCompiler};
use crate::api::dump;
use crate::api::hash::HashChain;
use crate::builder::action::{Action, ActionGraph, ActionKind};
use crate::core::binding::Binding;
use crate::core::interface::{Interface, CURRENT_DIR, HASH_FILE};
use crate::core::version;
use crate::core::workspace::Workspace;
use crate::registry::Registry;

/// Name of the aggregate freeze action.
pub const FREEZE_ALL: &str = "aidl-freeze-api";

const CHECK_EQUALITY_STAMP: &str = "checkapi_equal.timestamp";
const HAS_DEVELOPMENT_FILE: &str = "has_development";

/// Last link of the stored chain of a frozen version, if readable.
fn stored_hash(iface: &Interface, version: &str) -> Option<String> {
    HashChain::read(&iface.version_dir(version), iface.name(), version)
        .ok()
        .flatten()
        .and_then(|chain| chain.last().map(str::to_string))
}

/// Compiler flags for generating `binding`.
pub fn gen_flags(registry: &Registry, iface: &Interface, binding: &Binding) -> Vec<String> {
    let policy = registry.policy();
    let tip = binding.version == iface.next_version();
    let mut flags = vec![format!("--lang={}", binding.backend.lang_flag())];

    if tip && !iface.is_frozen() {
        flags.push("-Weverything".to_string());
        flags.push("-Wno-missing-permission-annotation".to_string());
        flags.extend(iface.flags.iter().cloned());
    }

    if !iface.unstable {
        flags.push("--structured".to_string());
        flags.push("--version".to_string());
        flags.push(binding.version.clone());
        let hash = if tip {
            None
        } else {
            stored_hash(iface, &binding.version)
        };
        flags.push("--hash".to_string());
        flags.push(hash.unwrap_or_else(|| "notfrozen".to_string()));
    }

    if let Some(stability) = &iface.stability {
        flags.push("--stability".to_string());
        flags.push(stability.clone());
    }

    // The tip of a previously frozen interface must also behave like its
    // latest frozen version at run time.
    if tip && !iface.unstable && !iface.use_unfrozen(policy) {
        if let Some(latest) = iface.latest_version() {
            flags.push(format!("--previous_api_dir={}", iface.version_dir(latest).display()));
            if let Some(hash) = stored_hash(iface, latest) {
                flags.push("--previous_hash".to_string());
                flags.push(hash);
            }
        }
    }

    flags
}

/// Names of the check actions declared for one interface.
#[derive(Debug, Default, Clone)]
struct Checks {
    names: Vec<String>,
}

/// Declares actions into an [`ActionGraph`].
pub struct Planner<'a> {
    registry: &'a Registry,
    workspace: &'a Workspace,
    compiler: ProcessCompiler,
    graph: ActionGraph,
    checks: HashMap<String, Checks>,
}

impl<'a> Planner<'a> {
    pub fn new(registry: &'a Registry, workspace: &'a Workspace, compiler: &Path) -> Self {
        Planner {
            registry,
            workspace,
            compiler: ProcessCompiler::new(compiler),
            graph: ActionGraph::new(),
            checks: HashMap::new(),
        }
    }

    /// Declare everything and hand back the graph.
    pub fn plan(mut self) -> Result<ActionGraph> {
        let registry = self.registry;
        // Imports first, so their check names are known to importers.
        for iface in registry.build_order() {
            if !iface.unstable {
                self.plan_checks(iface)?;
                self.plan_entry_points(iface)?;
            }
            for binding in registry.bindings().filter(|b| b.interface == iface.key) {
                self.plan_generation(iface, binding)?;
            }
        }

        let freeze_all = registry
            .interfaces()
            .filter(|i| !i.unstable && registry.policy().selects_for_freeze(i.owner()))
            .map(|i| format!("{}-freeze-api", i.key));
        self.graph
            .add(Action::new(FREEZE_ALL, ActionKind::Phony).deps(freeze_all))?;

        tracing::debug!("planned {} actions", self.graph.len());
        Ok(self.graph)
    }

    fn out_dir(&self, iface: &Interface) -> PathBuf {
        self.workspace
            .interface_out_dir(iface.namespace(), iface.name())
    }

    /// Check actions of everything `iface` imports.
    fn imported_checks(&self, iface: &Interface) -> Vec<String> {
        self.registry
            .direct_imports(&iface.key)
            .iter()
            .filter_map(|i| self.checks.get(&i.key.to_string()))
            .flat_map(|c| c.names.iter().cloned())
            .collect()
    }

    fn plan_checks(&mut self, iface: &Interface) -> Result<()> {
        let name = iface.key.to_string();
        let out = self.out_dir(iface);
        let dump_dir = out.join("dump");
        let next = iface.next_version();
        let upstream = self.imported_checks(iface);
        let mut checks = Checks::default();

        let request = DumpRequest {
            srcs: iface.src_paths(),
            include_root: iface.include_root(),
            include_dirs: dump::include_dirs(self.registry, iface, &next),
            stability: iface.stability.clone(),
            no_license: iface.no_license,
            out_dir: dump_dir.clone(),
        };
        self.graph.add(
            Action::new(format!("{}-api-dump", name), ActionKind::DumpApi)
                .interface(&name)
                .command(self.compiler.dump_command(&request).argv())
                .inputs(iface.src_paths())
                .output(&dump_dir)
                .output(dump_dir.join(HASH_FILE)),
        )?;

        let current = iface.current_dir();
        let equality = format!("{}-check-equality", name);
        let action = if current.is_dir() {
            let request = CheckRequest {
                old: current.clone(),
                new: dump_dir.clone(),
                level: CheckLevel::Equal,
                include_dirs: dump::include_dirs(self.registry, iface, &next),
            };
            Action::new(&equality, ActionKind::CheckEquality)
                .command(self.compiler.check_command(&request).argv())
                .input(&current)
        } else {
            Action::new(
                &equality,
                ActionKind::Fail {
                    message: format!(
                        "API dump for the current version of AIDL interface {} does not exist. \
                         Run `aidlgate update-api {}`, or add `unstable = true` if it does not \
                         need to be versioned",
                        name,
                        iface.name()
                    ),
                },
            )
        };
        self.graph.add(
            action
                .interface(&name)
                .input(&dump_dir)
                .output(out.join(CHECK_EQUALITY_STAMP))
                .deps(upstream.iter().cloned()),
        )?;
        checks.names.push(equality);

        // Frozen dumps with a hash, then `current` if it carries one.
        let mut hashed: Vec<(String, PathBuf)> = iface
            .version_list()
            .into_iter()
            .map(|v| {
                let dir = iface.version_dir(&v);
                (v, dir)
            })
            .collect();
        hashed.push((CURRENT_DIR.to_string(), current.clone()));
        for (ver, dir) in &hashed {
            if !dir.join(HASH_FILE).is_file() {
                continue;
            }
            let action_name = format!("{}-check-hash-{}", name, ver);
            self.graph.add(
                Action::new(&action_name, ActionKind::CheckHash { version: ver.clone() })
                    .interface(&name)
                    .input(dir)
                    .output(out.join(format!("checkhash_{}.timestamp", ver)))
                    .deps(upstream.iter().cloned()),
            )?;
            checks.names.push(action_name);
        }

        let mut windows: Vec<(String, PathBuf)> = iface
            .version_list()
            .into_iter()
            .map(|v| {
                let dir = iface.version_dir(&v);
                (v, dir)
            })
            .collect();
        if current.is_dir() {
            windows.push((next.clone(), current.clone()));
        }
        for pair in windows.windows(2) {
            let [(old, old_dir), (new, new_dir)] = pair else {
                continue;
            };
            if !old_dir.is_dir() || !new_dir.is_dir() {
                continue;
            }
            let request = CheckRequest {
                old: old_dir.clone(),
                new: new_dir.clone(),
                level: CheckLevel::Compatible,
                include_dirs: dump::include_dirs(self.registry, iface, new),
            };
            let action_name = format!("{}-check-compatibility-{}-{}", name, old, new);
            self.graph.add(
                Action::new(
                    &action_name,
                    ActionKind::CheckCompatibility {
                        old: old.clone(),
                        new: new.clone(),
                    },
                )
                .interface(&name)
                .command(self.compiler.check_command(&request).argv())
                .input(old_dir)
                .input(new_dir)
                .output(out.join(format!("checkapi_{}_{}.timestamp", old, new)))
                .deps(upstream.iter().cloned()),
            )?;
            checks.names.push(action_name);
        }

        let has_dev = format!("{}-has-development", name);
        let mut action = Action::new(&has_dev, ActionKind::HasDevelopment)
            .interface(&name)
            .input(&dump_dir)
            .output(out.join(HAS_DEVELOPMENT_FILE))
            .deps(upstream);
        if let Some(latest) = iface.latest_version() {
            action = action.input(iface.version_dir(latest));
        }
        self.graph.add(action)?;
        checks.names.push(has_dev);

        self.checks.insert(name, checks);
        Ok(())
    }

    fn plan_entry_points(&mut self, iface: &Interface) -> Result<()> {
        let name = iface.key.to_string();
        let dump_dir = self.out_dir(iface).join("dump");

        self.graph.add(
            Action::new(format!("{}-update-api", name), ActionKind::UpdateApi)
                .interface(&name)
                .command(vec!["aidlgate".into(), "update-api".into(), name.clone()])
                .input(&dump_dir),
        )?;

        let mut freeze = Action::new(format!("{}-freeze-api", name), ActionKind::FreezeApi)
            .interface(&name)
            .command(vec!["aidlgate".into(), "freeze-api".into(), name.clone()])
            .input(&dump_dir)
            .dep(format!("{}-has-development", name));
        if self.registry.policy().transitive_freeze {
            for spec in &iface.imports {
                let (import, pinned) = version::parse_module_with_version(spec);
                let Some(target) = self.registry.lookup(iface.namespace(), &import) else {
                    continue;
                };
                if !target.unstable && (pinned.is_empty() || pinned == target.next_version()) {
                    freeze = freeze.dep(format!("{}-freeze-api", target.key));
                }
            }
        }
        self.graph.add(freeze)?;
        Ok(())
    }

    fn plan_generation(&mut self, iface: &Interface, binding: &Binding) -> Result<()> {
        let out = self.out_dir(iface).join("gen").join(binding.name());
        let root = iface.source_root(&binding.version);
        let srcs: Vec<PathBuf> = iface.srcs.iter().map(|s| root.join(s)).collect();

        let mut command = vec![self.compiler.path().display().to_string()];
        command.extend(gen_flags(self.registry, iface, binding));
        command.push(format!("-I{}", root.display()));
        for dir in dump::include_dirs(self.registry, iface, &binding.version) {
            command.push(format!("-I{}", dir.display()));
        }
        command.push("--out".to_string());
        command.push(out.display().to_string());
        command.extend(srcs.iter().map(|s| s.display().to_string()));

        let deps = binding
            .deps
            .iter()
            .filter(|d| self.registry.binding(d).is_some())
            .map(|d| format!("{}-source", d));
        self.graph.add(
            Action::new(
                format!("{}-source", binding.id()),
                ActionKind::Generate {
                    backend: binding.backend.as_str().to_string(),
                    version: binding.version.clone(),
                },
            )
            .interface(iface.key.to_string())
            .command(command)
            .inputs(srcs)
            .output(out)
            .deps(deps),
        )?;
        Ok(())
    }
}

/// Declare every action for `registry`.
pub fn plan(registry: &Registry, workspace: &Workspace, compiler: &Path) -> Result<ActionGraph> {
    Planner::new(registry, workspace, compiler).plan()
}
