//! Declaration and import-compatibility checks.

use std::path::Path;

use crate::core::backend::Backend;
use crate::core::interface::{Interface, InterfaceDecl, ROOT_NAMESPACE};
use crate::core::version::{self, has_version_suffix};
use crate::registry::errors::{DeclarationError, ResolutionError};
use crate::registry::Registry;
use crate::util::fs::glob_files;

const VINTF: &str = "vintf";

/// A clean relative path: no leading `/`, no `..`, no empty or `.`
/// components. The empty path is accepted.
pub fn is_relative_path(path: &str) -> bool {
    if path.is_empty() || path == "." {
        return true;
    }
    if path.starts_with('/') {
        return false;
    }
    path.split('/')
        .all(|c| !c.is_empty() && c != "." && c != "..")
}

/// Structural checks on a raw `[[interface]]` table.
pub fn check_declaration(
    decl: &InterfaceDecl,
    namespace: &str,
    decl_path: &Path,
) -> Vec<DeclarationError> {
    if decl.name.is_empty() {
        return vec![DeclarationError::MissingName {
            path: decl_path.to_path_buf(),
        }];
    }

    let name = || decl.name.clone();
    let mut errors = Vec::new();

    if has_version_suffix(&decl.name) {
        errors.push(DeclarationError::VersionSuffixInName { name: name() });
    }

    for dir in std::iter::once(&decl.local_include_dir).chain(&decl.include_dirs) {
        if !is_relative_path(dir) {
            errors.push(DeclarationError::NonRelativeIncludeDir {
                name: name(),
                dir: dir.clone(),
            });
        }
    }

    if let Some(stability) = &decl.stability {
        if decl.unstable {
            errors.push(DeclarationError::StabilityOnUnstable { name: name() });
        }
        if stability != VINTF {
            errors.push(DeclarationError::InvalidStability {
                name: name(),
                value: stability.clone(),
            });
        }
    }

    if !decl.versions.is_empty() && !decl.versions_with_info.is_empty() {
        errors.push(DeclarationError::ConflictingVersionFields {
            name: name(),
            versions: decl.versions.clone(),
        });
    }

    let versions: Vec<String> = if decl.versions.is_empty() {
        for info in &decl.versions_with_info {
            if let Some(import) = info.imports.iter().find(|i| !has_version_suffix(i)) {
                errors.push(DeclarationError::UnversionedRecordedImport {
                    name: name(),
                    import: import.clone(),
                });
            }
        }
        decl.versions_with_info
            .iter()
            .map(|v| v.version.clone())
            .collect()
    } else {
        decl.versions.clone()
    };

    if let Err(version_errors) = version::validate_versions(&versions) {
        errors.extend(
            version_errors
                .into_iter()
                .map(|error| DeclarationError::InvalidVersionList { name: name(), error }),
        );
    }

    for flag in &decl.flags {
        if !flag.starts_with("-W") {
            errors.push(DeclarationError::InvalidFlag {
                name: name(),
                flag: flag.clone(),
            });
        }
    }

    if !errors.is_empty() {
        return errors;
    }

    if decl.unstable && !versions.is_empty() {
        errors.push(DeclarationError::UnstableWithVersions { name: name() });
    } else if decl.frozen == Some(true) && versions.is_empty() {
        errors.push(DeclarationError::FrozenWithoutVersions { name: name() });
    }

    let has_owner = decl.owner.as_deref().is_some_and(|o| !o.is_empty());
    if !decl.unstable && namespace != ROOT_NAMESPACE && !has_owner {
        errors.push(DeclarationError::MissingOwnerInNamespace {
            name: name(),
            namespace: namespace.to_string(),
        });
    }

    errors
}

/// An unstable interface must not have anything under its API directory.
pub fn check_unstable_dumps(iface: &Interface) -> Option<DeclarationError> {
    if !iface.unstable {
        return None;
    }
    let api_dir = iface.api_dir();
    if !api_dir.is_dir() {
        return None;
    }
    match glob_files(&api_dir, &["**/*.aidl".to_string()]) {
        Ok(dumps) if !dumps.is_empty() => Some(DeclarationError::UnstableWithDumps {
            name: iface.name().to_string(),
            api_dir: api_dir.display().to_string(),
        }),
        Ok(_) => None,
        Err(e) => {
            tracing::warn!("could not scan {}: {:#}", api_dir.display(), e);
            None
        }
    }
}

/// Versions an import of `other` may pin: its frozen versions, plus its
/// next version unless it is `frozen = true`.
pub fn candidate_versions(other: &Interface) -> Vec<String> {
    let mut candidates = other.version_list();
    if !other.is_frozen() {
        candidates.push(other.next_version());
    }
    candidates
}

/// Compatibility of every import of `iface` against the imported interface.
pub fn check_imports(registry: &Registry, iface: &Interface) -> Vec<ResolutionError> {
    let mut errors = Vec::new();
    let policy = registry.policy();
    let name = || iface.key.to_string();

    for spec in &iface.imports {
        let (import, pinned) = version::parse_module_with_version(spec);
        let Some(other) = registry.lookup(iface.namespace(), &import) else {
            continue;
        };
        let candidates = candidate_versions(other);

        if pinned.is_empty() {
            if !other.unstable && policy.strict_imports {
                errors.push(ResolutionError::UnversionedImport {
                    interface: name(),
                    import: import.clone(),
                    candidates: candidates.clone(),
                });
            }
        } else if !candidates.contains(&pinned) {
            errors.push(ResolutionError::UnknownImportVersion {
                interface: name(),
                import: import.clone(),
                version: pinned.clone(),
                spec: spec.clone(),
                candidates: candidates.clone(),
            });
        }

        for backend in Backend::DECLARABLE {
            if iface.generates(backend) && !other.generates(backend) {
                errors.push(ResolutionError::BackendNotEnabled {
                    interface: name(),
                    import: import.clone(),
                    backend: backend.to_string(),
                });
            }
        }

        if iface.is_frozen() && other.is_explicitly_unfrozen() && pinned.is_empty() {
            errors.push(ResolutionError::FrozenImportsUnfrozen {
                interface: name(),
                import: import.clone(),
                candidates: candidates.clone(),
            });
        }

        if let (None, Some(owner)) = (iface.owner(), other.owner()) {
            errors.push(ResolutionError::CrossOwnerImport {
                interface: name(),
                import: import.clone(),
                owner: owner.to_string(),
            });
        }
    }

    // Recorded imports of frozen versions must still point at something
    // the imported interface knows about.
    for info in &iface.versions {
        for spec in &info.imports {
            let (import, pinned) = version::parse_module_with_version(spec);
            let Some(other) = registry.lookup(iface.namespace(), &import) else {
                continue;
            };
            if pinned.is_empty() {
                continue;
            }
            let candidates = candidate_versions(other);
            if !candidates.contains(&pinned) {
                errors.push(ResolutionError::UnknownImportVersion {
                    interface: name(),
                    import,
                    version: pinned,
                    spec: spec.clone(),
                    candidates,
                });
            }
        }
    }

    let require = iface.require_frozen(policy);
    if require.required && !iface.has_versions() {
        errors.push(ResolutionError::MustBeFrozen {
            interface: name(),
            reason: require.reason.to_string(),
        });
    }

    errors
}
