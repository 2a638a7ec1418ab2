//! Release policy toggles.
//!
//! Policies come from the config files and are overridden by the
//! environment, so that a CI job can flip a release toggle without touching
//! any checked-in file.

use thiserror::Error;

use crate::util::config::PolicyConfig;

pub const ENV_FROZEN_REL: &str = "AIDL_FROZEN_REL";
pub const ENV_FROZEN_OWNERS: &str = "AIDL_FROZEN_OWNERS";
pub const ENV_FREEZE_OWNERS: &str = "AIDL_FREEZE_OWNERS";
pub const ENV_TRANSITIVE_FREEZE: &str = "AIDL_TRANSITIVE_FREEZE";
pub const ENV_USE_UNFROZEN_OVERRIDE: &str = "AIDL_USE_UNFROZEN_OVERRIDE";
pub const ENV_RELEASE_USE_UNFROZEN: &str = "RELEASE_AIDL_USE_UNFROZEN";
pub const ENV_GENERATE_NDK_PLATFORM: &str = "AIDL_GENERATE_NDK_PLATFORM";
pub const ENV_STRICT_IMPORTS: &str = "AIDL_STRICT_IMPORTS";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PolicyError {
    #[error(
        "AIDL_USE_UNFROZEN_OVERRIDE has unexpected value of \"{0}\". Should be \"true\" or \"false\"."
    )]
    InvalidUnfrozenOverride(String),
}

/// Fully resolved release policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Policy {
    /// Release branch: platform-owned interfaces must be frozen.
    pub frozen_rel: bool,
    /// Owners whose interfaces must be frozen.
    pub frozen_owners: Vec<String>,
    /// Owners swept by the aggregate freeze target; unset or empty means
    /// platform-owned only.
    pub freeze_owners: Option<Vec<String>>,
    pub transitive_freeze: bool,
    pub use_unfrozen_override: Option<bool>,
    pub release_use_unfrozen: bool,
    pub generate_ndk_platform: bool,
    /// Reject unversioned imports of stable interfaces.
    pub strict_imports: bool,
}

impl Default for Policy {
    fn default() -> Self {
        Policy {
            frozen_rel: false,
            frozen_owners: Vec::new(),
            freeze_owners: None,
            transitive_freeze: false,
            use_unfrozen_override: None,
            release_use_unfrozen: true,
            generate_ndk_platform: false,
            strict_imports: false,
        }
    }
}

fn is_true(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "1" | "y" | "yes" | "on" | "true"
    )
}

fn owner_list(value: &str) -> Vec<String> {
    value.split_whitespace().map(str::to_string).collect()
}

impl Policy {
    /// Resolve the policy from config values, with `env` taking precedence.
    ///
    /// Empty environment values count as unset.
    pub fn resolve(
        config: &PolicyConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Policy, PolicyError> {
        let env = |key: &str| env(key).filter(|v| !v.is_empty());
        let defaults = Policy::default();

        let flag = |key: &str, configured: Option<bool>, default: bool| match env(key) {
            Some(v) => is_true(&v),
            None => configured.unwrap_or(default),
        };

        let use_unfrozen_override = match env(ENV_USE_UNFROZEN_OVERRIDE) {
            Some(v) if v == "true" => Some(true),
            Some(v) if v == "false" => Some(false),
            Some(v) => return Err(PolicyError::InvalidUnfrozenOverride(v)),
            None => config.use_unfrozen_override,
        };

        Ok(Policy {
            frozen_rel: flag(ENV_FROZEN_REL, config.frozen_rel, defaults.frozen_rel),
            frozen_owners: env(ENV_FROZEN_OWNERS)
                .map(|v| owner_list(&v))
                .or_else(|| config.frozen_owners.clone())
                .unwrap_or_default(),
            freeze_owners: env(ENV_FREEZE_OWNERS)
                .map(|v| owner_list(&v))
                .or_else(|| config.freeze_owners.clone()),
            transitive_freeze: flag(
                ENV_TRANSITIVE_FREEZE,
                config.transitive_freeze,
                defaults.transitive_freeze,
            ),
            use_unfrozen_override,
            release_use_unfrozen: flag(
                ENV_RELEASE_USE_UNFROZEN,
                config.release_use_unfrozen,
                defaults.release_use_unfrozen,
            ),
            generate_ndk_platform: flag(
                ENV_GENERATE_NDK_PLATFORM,
                config.generate_ndk_platform,
                defaults.generate_ndk_platform,
            ),
            strict_imports: flag(
                ENV_STRICT_IMPORTS,
                config.strict_imports,
                defaults.strict_imports,
            ),
        })
    }

    /// Resolve against the process environment.
    pub fn from_env(config: &PolicyConfig) -> Result<Policy, PolicyError> {
        Self::resolve(config, |key| std::env::var(key).ok())
    }

    /// Whether an interface may consume its own unfrozen tip.
    pub fn use_unfrozen(&self, always_use_unfrozen: bool) -> bool {
        always_use_unfrozen
            || self
                .use_unfrozen_override
                .unwrap_or(self.release_use_unfrozen)
    }

    /// Whether the aggregate freeze target includes an interface with this owner.
    pub fn selects_for_freeze(&self, owner: Option<&str>) -> bool {
        match (&self.freeze_owners, owner) {
            (Some(list), Some(owner)) if !list.is_empty() => list.iter().any(|o| o == owner),
            (Some(list), None) if !list.is_empty() => false,
            (_, owner) => owner.is_none(),
        }
    }
}
