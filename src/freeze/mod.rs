//! Freezing and updating interface versions.
//!
//! Two developer-invoked transitions exist per interface:
//! - `update-api` regenerates the tip dump and mirrors it into `current`;
//! - `freeze-api` snapshots the tip as a new numbered version and appends it
//!   to the declaration.
//!
//! All decisions are made from registry state and dump comparisons; the
//! only writes are dump directories and the patches handed to a
//! [`ConfigPatcher`].

pub mod development;
pub mod orchestrator;
pub mod patcher;

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

pub use development::{decide, has_development, Evidence};
pub use orchestrator::{FreezeOutcome, Orchestrator, UpdateOutcome};
pub use patcher::{ConfigPatcher, Patch, PatchValue, TomlPatcher};

/// Freeze-time errors. All of them need a developer decision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FreezeError {
    #[error("This interface is 'frozen: true' but the imports have changed. Set 'frozen: false' to allow changes: \n Version current imports: {current}\n Version {latest_version} imports: {latest}\n")]
    FrozenButImportsChanged {
        interface: String,
        current: String,
        latest_version: String,
        latest: String,
    },

    #[error("Interface {interface} can not be marked `frozen: true` because there are changes between the current version and the last frozen version.")]
    FrozenButChanged { interface: String },

    #[error("Interface {interface} can not be marked `frozen: false` if there are no changes or different imports between the current version and the last frozen version.")]
    UnfrozenButNoChanges { interface: String },

    #[error("API version {version} path {} does not exist", path.display())]
    MissingFrozenDump {
        interface: String,
        version: String,
        path: PathBuf,
    },

    #[error("A frozen aidl_interface must have '.hash' file, but {interface}-V{version} doesn't have it.")]
    MissingHashFile { interface: String, version: String },

    #[error("API Directory exists for version {version} path {} exists, but it is not specified in versions field.", path.display())]
    OrphanedVersionDirectory {
        interface: String,
        version: String,
        path: PathBuf,
    },

    #[error("{interface} is unstable and has no versions to freeze")]
    UnstableInterface { interface: String },

    #[error("failed to set `{}` of {interface} in {}: {reason}", properties.join("`, `"), path.display())]
    PatchFailed {
        interface: String,
        properties: Vec<String>,
        path: PathBuf,
        reason: String,
    },
}

impl FreezeError {
    pub fn interface(&self) -> &str {
        use FreezeError::*;
        match self {
            FrozenButImportsChanged { interface, .. }
            | FrozenButChanged { interface }
            | UnfrozenButNoChanges { interface }
            | MissingFrozenDump { interface, .. }
            | MissingHashFile { interface, .. }
            | OrphanedVersionDirectory { interface, .. }
            | UnstableInterface { interface }
            | PatchFailed { interface, .. } => interface,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        use FreezeError::*;
        let diag = Diagnostic::error(self.to_string()).with_subject(self.interface());
        match self {
            FrozenButImportsChanged { .. } | FrozenButChanged { .. } => diag
                .with_property("frozen")
                .with_suggestion("Set `frozen = false`, then run `aidlgate freeze-api` when ready"),
            UnfrozenButNoChanges { .. } => diag
                .with_property("frozen")
                .with_suggestion("Remove `frozen = false` or set it to `true`"),
            MissingFrozenDump { .. } => diag
                .with_property("versions")
                .with_suggestion(suggestions::RESTORE_DUMP),
            MissingHashFile { .. } => diag
                .with_property("versions")
                .with_context("the hash of a frozen version is written once, when it is frozen")
                .with_suggestion(suggestions::RESTORE_DUMP),
            OrphanedVersionDirectory { version, .. } => diag
                .with_property("versions_with_info")
                .with_suggestion(format!(
                    "Add version {} to `versions_with_info` or delete the directory",
                    version
                )),
            PatchFailed { path, .. } => diag.with_location(path.clone()),
            UnstableInterface { .. } => diag.with_property("unstable"),
        }
    }
}
