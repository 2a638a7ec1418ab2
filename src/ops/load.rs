//! Loading a workspace into a resolved registry.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};

use crate::api::ProcessCompiler;
use crate::core::policy::Policy;
use crate::core::workspace::Workspace;
use crate::registry::Registry;
use crate::util::config::{global_config_path, load_config, project_config_path, Config};
use crate::util::diagnostic::suggestions;

/// Everything a command needs: merged config, discovered workspace and the
/// registry built under the resolved policy.
#[derive(Debug)]
pub struct Project {
    pub config: Config,
    pub workspace: Workspace,
    pub registry: Registry,
}

impl Project {
    /// Load `root` with the user's global config and the process environment.
    pub fn load(root: &Path) -> Result<Project> {
        let global = global_config_path();
        Project::load_with(root, global.as_deref(), |key| std::env::var(key).ok())
    }

    /// Load `root` with an explicit global config and environment.
    pub fn load_with(
        root: &Path,
        global: Option<&Path>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Project> {
        let config = load_config(global, &project_config_path(root));
        let policy = Policy::resolve(&config.policy, env)?;
        tracing::debug!("policy: {:?}", policy);

        let workspace = Workspace::discover(root)?;
        let registry = Registry::build(&workspace, policy)?;
        Ok(Project {
            config,
            workspace,
            registry,
        })
    }

    /// The IDL compiler from config or `PATH`.
    pub fn compiler(&self) -> Result<ProcessCompiler> {
        ProcessCompiler::locate(&self.config)
            .ok_or_else(|| anyhow!("no IDL compiler found\nhelp: {}", suggestions::NO_COMPILER))
    }

    /// Compiler path for planned command lines; `aidl` when none is found.
    pub fn compiler_path(&self) -> PathBuf {
        ProcessCompiler::locate(&self.config)
            .map(|c| c.path().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("aidl"))
    }
}
