//! Interface declarations.
//!
//! [`InterfaceDecl`] is an `[[interface]]` table exactly as written in an
//! `Aidl.toml`; [`Interface`] is the same declaration placed in its namespace
//! and directory, with the legacy `versions` form folded into
//! `versions_with_info`.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::backend::{Backend, BackendsConfig};
use crate::core::policy::Policy;
use crate::core::version::{self, LATEST};

/// Directory (next to the declaring `Aidl.toml`) holding frozen dumps.
pub const API_DIR: &str = "aidl_api";

/// Name of the mutable snapshot directory inside an interface's API dir.
pub const CURRENT_DIR: &str = "current";

/// Name of the hash sidecar inside a dump directory.
pub const HASH_FILE: &str = ".hash";

/// Root namespace.
pub const ROOT_NAMESPACE: &str = ".";

/// One frozen version with the imports recorded when it was frozen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VersionInfo {
    pub version: String,
    #[serde(default)]
    pub imports: Vec<String>,
}

/// `dumpapi` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DumpApiConfig {
    /// Strip the leading license comment from dumped files.
    pub no_license: bool,
}

/// Raw `[[interface]]` table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct InterfaceDecl {
    pub name: String,
    pub srcs: Vec<String>,
    pub local_include_dir: String,
    pub include_dirs: Vec<String>,
    pub owner: Option<String>,
    pub stability: Option<String>,
    pub unstable: bool,
    pub frozen: Option<bool>,
    pub versions: Vec<String>,
    pub versions_with_info: Vec<VersionInfo>,
    pub imports: Vec<String>,
    pub flags: Vec<String>,
    pub always_use_unfrozen: bool,
    pub headers: Vec<String>,
    pub dumpapi: DumpApiConfig,
    pub backend: BackendsConfig,
}

/// Identity of an interface: its name within a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct InterfaceKey {
    pub namespace: String,
    pub name: String,
}

impl InterfaceKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        InterfaceKey {
            namespace: namespace.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for InterfaceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.namespace == ROOT_NAMESPACE {
            write!(f, "{}", self.name)
        } else {
            write!(f, "//{}:{}", self.namespace, self.name)
        }
    }
}

/// Whether an interface must be frozen, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequireFrozen {
    pub required: bool,
    pub reason: &'static str,
}

pub const REASON_UNSTABLE: &str = "it's an unstable interface";
pub const REASON_EXPLICITLY_FROZEN: &str = "it's explicitly marked as `frozen: true`";
pub const REASON_FROZEN_REL: &str =
    "this is a release branch (simulated by setting AIDL_FROZEN_REL) - freeze it or set 'owner:'";
pub const REASON_FROZEN_OWNERS: &str =
    "the owner field is in environment variable AIDL_FROZEN_OWNERS";
pub const REASON_DEFAULT: &str = "by default, we don't require the interface to be frozen";
pub const REASON_KNOWN_FROZEN: &str = "this is a known frozen version";
pub const REASON_ANALYZER: &str = "analysis always uses latest version even if frozen";

/// A declared interface, placed in its namespace.
#[derive(Debug, Clone)]
pub struct Interface {
    pub key: InterfaceKey,
    /// Directory of the declaring `Aidl.toml`.
    pub dir: PathBuf,
    /// The declaring `Aidl.toml`.
    pub decl_path: PathBuf,
    pub srcs: Vec<String>,
    pub local_include_dir: String,
    pub include_dirs: Vec<String>,
    pub owner: Option<String>,
    pub stability: Option<String>,
    pub unstable: bool,
    pub frozen: Option<bool>,
    /// Declared with the legacy `versions` list.
    pub legacy_versions: bool,
    pub versions: Vec<VersionInfo>,
    /// Imports of the tip.
    pub imports: Vec<String>,
    pub flags: Vec<String>,
    pub always_use_unfrozen: bool,
    pub headers: Vec<String>,
    pub no_license: bool,
    pub backends: BackendsConfig,
}

impl Interface {
    /// Place a raw declaration.
    ///
    /// No validation happens here; declaration checks are the registry's job.
    /// When both version forms are present only `versions_with_info` is kept,
    /// and the registry reports the conflict from the raw declaration.
    pub fn from_decl(decl: InterfaceDecl, namespace: &str, decl_path: &Path) -> Interface {
        let dir = decl_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let legacy_versions = decl.versions_with_info.is_empty() && !decl.versions.is_empty();
        let versions = if legacy_versions {
            decl.versions
                .iter()
                .map(|v| VersionInfo {
                    version: v.clone(),
                    imports: decl.imports.clone(),
                })
                .collect()
        } else {
            decl.versions_with_info.clone()
        };

        Interface {
            key: InterfaceKey::new(namespace, decl.name),
            dir,
            decl_path: decl_path.to_path_buf(),
            srcs: decl.srcs,
            local_include_dir: decl.local_include_dir,
            include_dirs: decl.include_dirs,
            owner: decl.owner.filter(|o| !o.is_empty()),
            stability: decl.stability,
            unstable: decl.unstable,
            frozen: decl.frozen,
            legacy_versions,
            versions,
            imports: decl.imports,
            flags: decl.flags,
            always_use_unfrozen: decl.always_use_unfrozen,
            headers: decl.headers,
            no_license: decl.dumpapi.no_license,
            backends: decl.backend,
        }
    }

    pub fn name(&self) -> &str {
        &self.key.name
    }

    pub fn namespace(&self) -> &str {
        &self.key.namespace
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    /// Frozen version strings, ascending.
    pub fn version_list(&self) -> Vec<String> {
        self.versions.iter().map(|v| v.version.clone()).collect()
    }

    pub fn has_versions(&self) -> bool {
        !self.versions.is_empty()
    }

    /// Version a freeze would create; `""` for unstable interfaces.
    ///
    /// Registration rejects version lists without a successor, so the
    /// fallback is never taken for a registered interface.
    pub fn next_version(&self) -> String {
        if self.unstable {
            return String::new();
        }
        version::next_version(&self.version_list()).unwrap_or_default()
    }

    /// Highest frozen version.
    pub fn latest_version(&self) -> Option<&str> {
        self.versions.last().map(|v| v.version.as_str())
    }

    /// `frozen = true`.
    pub fn is_frozen(&self) -> bool {
        self.frozen == Some(true)
    }

    /// `frozen = false` written out explicitly.
    pub fn is_explicitly_unfrozen(&self) -> bool {
        self.frozen == Some(false)
    }

    pub fn versioned_name(&self, version: &str) -> String {
        version::versioned_name(self.name(), version)
    }

    /// Resolve `latest` and `""` to a concrete version of this interface.
    pub fn concrete_version(&self, version: &str) -> String {
        match version {
            "" => self.next_version(),
            LATEST => self
                .latest_version()
                .map(str::to_string)
                .unwrap_or_else(|| self.next_version()),
            other => other.to_string(),
        }
    }

    /// Imports as written for `version`: the tip's list, or what was recorded
    /// when `version` was frozen.
    pub fn imports_for_version(&self, version: &str) -> &[String] {
        self.versions
            .iter()
            .find(|v| v.version == version)
            .map(|v| v.imports.as_slice())
            .unwrap_or(&self.imports)
    }

    /// Imports of `version` as `(name, version)` pairs. Unpinned imports of a
    /// frozen version of a stable interface become `latest`; the tip keeps
    /// them unpinned.
    pub fn imports(&self, version: &str) -> Vec<(String, String)> {
        let use_latest_stable = !self.unstable && !version.is_empty() && version != self.next_version();
        self.imports_for_version(version)
            .iter()
            .map(|spec| {
                let (name, mut target) = version::parse_module_with_version(spec);
                if target.is_empty() && use_latest_stable {
                    target = LATEST.to_string();
                }
                (name, target)
            })
            .collect()
    }

    /// `<dir>/aidl_api/<name>`.
    pub fn api_dir(&self) -> PathBuf {
        self.dir.join(API_DIR).join(self.name())
    }

    pub fn version_dir(&self, version: &str) -> PathBuf {
        self.api_dir().join(version)
    }

    pub fn current_dir(&self) -> PathBuf {
        self.api_dir().join(CURRENT_DIR)
    }

    /// Root the tip's `srcs` are relative to.
    pub fn include_root(&self) -> PathBuf {
        if self.local_include_dir.is_empty() {
            self.dir.clone()
        } else {
            self.dir.join(&self.local_include_dir)
        }
    }

    /// Source root of a version: the include root for the tip, the frozen
    /// dump directory otherwise.
    pub fn source_root(&self, version: &str) -> PathBuf {
        if version.is_empty() || version == self.next_version() {
            self.include_root()
        } else {
            self.version_dir(version)
        }
    }

    /// Absolute paths of the tip's sources.
    pub fn src_paths(&self) -> Vec<PathBuf> {
        let root = self.include_root();
        self.srcs.iter().map(|s| root.join(s)).collect()
    }

    /// Fully-qualified type names declared by the tip's sources.
    pub fn types(&self) -> Vec<String> {
        self.srcs
            .iter()
            .map(|s| s.replace('/', ".").trim_end_matches(".aidl").to_string())
            .collect()
    }

    /// Backends generated for this interface under `policy`.
    pub fn enabled_backends(&self, policy: &Policy) -> Vec<Backend> {
        self.backends.enabled(policy.generate_ndk_platform)
    }

    pub fn generates(&self, backend: Backend) -> bool {
        self.backends.is_enabled(backend)
    }

    /// Whether the tip must be frozen before it can be consumed.
    pub fn require_frozen(&self, policy: &Policy) -> RequireFrozen {
        let (required, reason) = if self.unstable {
            (false, REASON_UNSTABLE)
        } else if self.is_frozen() {
            (true, REASON_EXPLICITLY_FROZEN)
        } else {
            match self.owner() {
                None if policy.frozen_rel => (true, REASON_FROZEN_REL),
                Some(owner) if policy.frozen_owners.iter().any(|o| o == owner) => {
                    (true, REASON_FROZEN_OWNERS)
                }
                _ => (false, REASON_DEFAULT),
            }
        };
        RequireFrozen { required, reason }
    }

    /// Whether generated code for the tip may run as the unfrozen version.
    pub fn use_unfrozen(&self, policy: &Policy) -> bool {
        policy.use_unfrozen(self.always_use_unfrozen)
    }
}
