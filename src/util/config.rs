//! Configuration file support for aidlgate.
//!
//! aidlgate reads two configuration files:
//! - Global: `~/.config/aidlgate/config.toml` - User-wide defaults
//! - Project: `<workspace>/.aidlgate/config.toml` - Workspace overrides
//!
//! Project config takes precedence over global config. Release-policy
//! environment variables take precedence over both (see [`crate::core::policy`]).

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// aidlgate configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// IDL compiler settings
    pub compiler: CompilerConfig,

    /// Release policy defaults
    pub policy: PolicyConfig,
}

/// Settings for the external IDL compiler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Path to the `aidl` binary (located on PATH when unset)
    pub path: Option<PathBuf>,
}

/// Release-policy toggles as written in a config file.
///
/// Every field is optional so that a project file can override a single
/// toggle from the global file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    /// Platform-owned interfaces must be frozen (release branch)
    pub frozen_rel: Option<bool>,

    /// Owners whose interfaces must be frozen
    pub frozen_owners: Option<Vec<String>>,

    /// Owners included in the aggregate `aidl-freeze-api` target
    pub freeze_owners: Option<Vec<String>>,

    /// Freeze tip-tracking imports before their consumers
    pub transitive_freeze: Option<bool>,

    /// Force use-unfrozen on or off for every interface
    pub use_unfrozen_override: Option<bool>,

    /// Release default for use-unfrozen
    pub release_use_unfrozen: Option<bool>,

    /// Also generate the `ndk_platform` backend
    pub generate_ndk_platform: Option<bool>,

    /// Reject unversioned imports of stable interfaces
    pub strict_imports: Option<bool>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.compiler.path.is_some() {
            self.compiler.path = other.compiler.path;
        }

        let (mine, theirs) = (&mut self.policy, other.policy);
        if theirs.frozen_rel.is_some() {
            mine.frozen_rel = theirs.frozen_rel;
        }
        if theirs.frozen_owners.is_some() {
            mine.frozen_owners = theirs.frozen_owners;
        }
        if theirs.freeze_owners.is_some() {
            mine.freeze_owners = theirs.freeze_owners;
        }
        if theirs.transitive_freeze.is_some() {
            mine.transitive_freeze = theirs.transitive_freeze;
        }
        if theirs.use_unfrozen_override.is_some() {
            mine.use_unfrozen_override = theirs.use_unfrozen_override;
        }
        if theirs.release_use_unfrozen.is_some() {
            mine.release_use_unfrozen = theirs.release_use_unfrozen;
        }
        if theirs.generate_ndk_platform.is_some() {
            mine.generate_ndk_platform = theirs.generate_ndk_platform;
        }
        if theirs.strict_imports.is_some() {
            mine.strict_imports = theirs.strict_imports;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.aidlgate/config.toml)
/// 2. Global config (~/.config/aidlgate/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: &Path) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(Config::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(Config::load_or_default(project_path));
    }

    config
}

/// Get the global aidlgate config directory (~/.config/aidlgate).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.config_dir().join("aidlgate"))
}

/// Get the global config path (~/.config/aidlgate/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.aidlgate/config.toml).
pub fn project_config_path(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".aidlgate").join("config.toml")
}
