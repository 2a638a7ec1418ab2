//! Declaration and resolution error types, and the per-pass aggregate.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::api::{ApiCheckError, IntegrityError};
use crate::core::version::VersionError;
use crate::freeze::FreezeError;
use crate::util::diagnostic::{suggestions, Diagnostic};
use crate::validate::ConsumerViolation;

/// A structurally invalid declaration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeclarationError {
    #[error("interface without a name in {}", path.display())]
    MissingName { path: PathBuf },

    #[error("interface `{name}` is declared more than once")]
    DuplicateInterface {
        name: String,
        first: PathBuf,
        second: PathBuf,
    },

    #[error("aidl_interface should not have '-V<number> suffix")]
    VersionSuffixInName { name: String },

    #[error("must be relative path: {dir}")]
    NonRelativeIncludeDir { name: String, dir: String },

    #[error("must be empty or \"vintf\"")]
    InvalidStability { name: String, value: String },

    #[error("must be empty when \"unstable\" is true")]
    StabilityOnUnstable { name: String },

    #[error("{error}")]
    InvalidVersionList { name: String, error: VersionError },

    #[error(
        "versions:{versions:?} and versions_with_info cannot be used at the same time. Use versions_with_info instead of versions."
    )]
    ConflictingVersionFields { name: String, versions: Vec<String> },

    #[error(
        "imports in versions_with_info must specify its version, but {import}. Add a version suffix(such as {import}-V1)."
    )]
    UnversionedRecordedImport { name: String, import: String },

    #[error(
        "Unexpected flag type '{flag}'. Only flags starting with '-W' for diagnostics are supported."
    )]
    InvalidFlag { name: String, flag: String },

    #[error("cannot have versions for an unstable interface")]
    UnstableWithVersions { name: String },

    #[error("cannot be frozen without versions")]
    FrozenWithoutVersions { name: String },

    #[error("aidl_interface in a namespace must have the 'owner' property set.")]
    MissingOwnerInNamespace { name: String, namespace: String },

    #[error(
        "The interface is configured as unstable, but API dumps exist under {api_dir:?}. Unstable interface cannot have dumps."
    )]
    UnstableWithDumps { name: String, api_dir: String },

    #[error("import cycle between interfaces: {}", cycle.join(" -> "))]
    ImportCycle { cycle: Vec<String> },

    #[error("module `{name}` is declared more than once")]
    DuplicateModule { name: String },
}

impl DeclarationError {
    /// The interface or module the error is attributed to.
    pub fn subject(&self) -> Option<String> {
        use DeclarationError::*;
        match self {
            MissingName { .. } | ImportCycle { .. } => None,
            DuplicateInterface { name, .. }
            | VersionSuffixInName { name }
            | NonRelativeIncludeDir { name, .. }
            | InvalidStability { name, .. }
            | StabilityOnUnstable { name }
            | InvalidVersionList { name, .. }
            | ConflictingVersionFields { name, .. }
            | UnversionedRecordedImport { name, .. }
            | InvalidFlag { name, .. }
            | UnstableWithVersions { name }
            | FrozenWithoutVersions { name }
            | MissingOwnerInNamespace { name, .. }
            | UnstableWithDumps { name, .. }
            | DuplicateModule { name } => Some(name.clone()),
        }
    }

    /// The declaration property at fault.
    pub fn property(&self) -> Option<&'static str> {
        use DeclarationError::*;
        match self {
            MissingName { .. } | VersionSuffixInName { .. } | DuplicateInterface { .. } => {
                Some("name")
            }
            NonRelativeIncludeDir { .. } => Some("local_include_dir"),
            InvalidStability { .. } | StabilityOnUnstable { .. } => Some("stability"),
            InvalidVersionList { .. } | UnstableWithVersions { .. } => Some("versions"),
            ConflictingVersionFields { .. } | UnversionedRecordedImport { .. } => {
                Some("versions_with_info")
            }
            InvalidFlag { .. } => Some("flags"),
            UnstableWithDumps { .. } => Some("unstable"),
            FrozenWithoutVersions { .. } => Some("frozen"),
            MissingOwnerInNamespace { .. } => Some("owner"),
            ImportCycle { .. } => Some("imports"),
            DuplicateModule { .. } => None,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let mut diag = Diagnostic::error(self.to_string());
        if let Some(subject) = self.subject() {
            diag = diag.with_subject(subject);
        }
        if let Some(property) = self.property() {
            diag = diag.with_property(property);
        }

        match self {
            DeclarationError::DuplicateInterface { first, second, .. } => diag
                .with_context(format!("first declared in {}", first.display()))
                .with_context(format!("declared again in {}", second.display()))
                .with_suggestion("Rename one of them or move it into its own [namespace]"),
            DeclarationError::ConflictingVersionFields { .. } => diag
                .with_suggestion("Remove `versions`; `aidlgate freeze-api` migrates it for you"),
            DeclarationError::UnstableWithDumps { .. } => diag
                .with_suggestion("Delete the dumps or drop `unstable = true`"),
            DeclarationError::ImportCycle { .. } => {
                diag.with_suggestion("Break the cycle by removing or restructuring imports")
            }
            _ => diag,
        }
    }
}

/// A declaration that is well-formed on its own but does not resolve
/// against the rest of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolutionError {
    #[error("Import does not exist: {import}")]
    UnknownImport { interface: String, import: String },

    #[error("{interface:?} depends on {import:?} but does not specify a version (must be one of {candidates:?})")]
    UnversionedImport {
        interface: String,
        import: String,
        candidates: Vec<String>,
    },

    #[error("{interface:?} depends on {import:?} version {version:?}({spec:?}), which doesn't exist. The version must be one of {candidates:?}")]
    UnknownImportVersion {
        interface: String,
        import: String,
        version: String,
        spec: String,
        candidates: Vec<String>,
    },

    #[error("{backend} backend not enabled in the imported AIDL interface {import:?}")]
    BackendNotEnabled {
        interface: String,
        import: String,
        backend: String,
    },

    #[error("{interface:?} imports {import:?} which is not frozen. Either {interface:?} must set 'frozen: false' or must explicitly import \"{import}-V*\" where * is one of {candidates:?}")]
    FrozenImportsUnfrozen {
        interface: String,
        import: String,
        candidates: Vec<String>,
    },

    #[error("{interface:?} imports {import:?} which is an interface owned by {owner:?}. This is not allowed because the owned interface will not be frozen at the same time.")]
    CrossOwnerImport {
        interface: String,
        import: String,
        owner: String,
    },

    #[error("must be set (need to be frozen) because: {reason:?}")]
    MustBeFrozen { interface: String, reason: String },

    #[error("depends on unknown module `{dep}`")]
    UnknownDependency { module: String, dep: String },

    #[error("{kind} module cannot link `{dep}` ({backend} backend)")]
    BackendNotLinkable {
        module: String,
        kind: String,
        dep: String,
        backend: String,
    },
}

impl ResolutionError {
    pub fn subject(&self) -> &str {
        use ResolutionError::*;
        match self {
            UnknownImport { interface, .. }
            | UnversionedImport { interface, .. }
            | UnknownImportVersion { interface, .. }
            | BackendNotEnabled { interface, .. }
            | FrozenImportsUnfrozen { interface, .. }
            | CrossOwnerImport { interface, .. }
            | MustBeFrozen { interface, .. } => interface,
            UnknownDependency { module, .. } | BackendNotLinkable { module, .. } => module,
        }
    }

    pub fn property(&self) -> String {
        use ResolutionError::*;
        match self {
            BackendNotEnabled { backend, .. } => format!("backend.{}.enabled", backend),
            FrozenImportsUnfrozen { .. } => "frozen".to_string(),
            MustBeFrozen { .. } => "versions".to_string(),
            UnknownDependency { .. } | BackendNotLinkable { .. } => "deps".to_string(),
            _ => "imports".to_string(),
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string())
            .with_subject(self.subject())
            .with_property(self.property());

        match self {
            ResolutionError::UnknownImport { import, .. } => diag.with_suggestion(format!(
                "Declare `{}` in this namespace or in the root namespace",
                import
            )),
            ResolutionError::MustBeFrozen { .. } => diag.with_suggestion(suggestions::FREEZE_API),
            ResolutionError::BackendNotEnabled { import, backend, .. } => diag.with_suggestion(
                format!("Enable backend.{}.enabled in `{}`", backend, import),
            ),
            _ => diag,
        }
    }
}

/// Any violation reported by a pass.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error(transparent)]
    Declaration(#[from] DeclarationError),

    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Consumer(#[from] ConsumerViolation),

    #[error(transparent)]
    Freeze(#[from] FreezeError),

    #[error(transparent)]
    Integrity(#[from] IntegrityError),

    #[error(transparent)]
    ApiCheck(#[from] ApiCheckError),
}

impl Violation {
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            Violation::Declaration(e) => e.to_diagnostic(),
            Violation::Resolution(e) => e.to_diagnostic(),
            Violation::Consumer(e) => e.to_diagnostic(),
            Violation::Freeze(e) => e.to_diagnostic(),
            Violation::Integrity(e) => e.to_diagnostic(),
            Violation::ApiCheck(e) => e.to_diagnostic(),
        }
    }
}

/// Every violation found by one pass, reported together.
#[derive(Debug, Clone, PartialEq, Eq, Error, miette::Diagnostic)]
#[diagnostic(
    code(aidlgate::violations),
    help("fix every reported violation and run the command again")
)]
pub struct Violations {
    pub items: Vec<Violation>,
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.items.as_slice() {
            [only] => write!(f, "{}", only),
            items => write!(f, "{} violations found", items.len()),
        }
    }
}

impl Violations {
    pub fn new(items: Vec<Violation>) -> Self {
        Violations { items }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// `Ok(())` when nothing was collected.
    pub fn into_result(self) -> Result<(), Violations> {
        if self.items.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn push(&mut self, violation: impl Into<Violation>) {
        self.items.push(violation.into());
    }

    pub fn extend<V: Into<Violation>>(&mut self, violations: impl IntoIterator<Item = V>) {
        self.items.extend(violations.into_iter().map(Into::into));
    }

    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.items.iter().map(Violation::to_diagnostic).collect()
    }

    /// Whether any collected violation matches `pred`.
    pub fn any(&self, pred: impl Fn(&Violation) -> bool) -> bool {
        self.items.iter().any(pred)
    }
}

impl Default for Violations {
    fn default() -> Self {
        Violations::new(Vec::new())
    }
}

impl<V: Into<Violation>> From<V> for Violations {
    fn from(v: V) -> Self {
        Violations::new(vec![v.into()])
    }
}
