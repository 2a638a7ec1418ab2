//! Import resolution and binding computation.
//!
//! A tip always tracks the tip of what it imports; a frozen version pins its
//! unversioned imports to the latest frozen version of the import.

use std::collections::BTreeMap;

use crate::core::backend::Backend;
use crate::core::binding::{Binding, BindingId};
use crate::core::interface::{Interface, REASON_ANALYZER, REASON_KNOWN_FROZEN};
use crate::core::version::{self, versioned_module_name, LATEST};
use crate::registry::Registry;

/// Resolve one import spec of `consumer` at `consumer_version` to the
/// imported interface and a concrete version (`""` for unstable imports).
///
/// Returns `None` when the import name does not resolve.
pub fn resolve_import<'r>(
    registry: &'r Registry,
    consumer: &Interface,
    consumer_version: &str,
    spec: &str,
) -> Option<(&'r Interface, String)> {
    let (name, pinned) = version::parse_module_with_version(spec);
    let target = registry.lookup(consumer.namespace(), &name)?;

    let resolved = if !pinned.is_empty() {
        pinned
    } else if target.unstable {
        String::new()
    } else if consumer_version == consumer.next_version() || !target.has_versions() {
        target.next_version()
    } else {
        target
            .latest_version()
            .map(str::to_string)
            .unwrap_or_else(|| target.next_version())
    };
    Some((target, resolved))
}

/// Resolve every import of `consumer` at `version`, skipping unknown names.
pub fn resolve_imports<'r>(
    registry: &'r Registry,
    consumer: &Interface,
    version: &str,
) -> Vec<(&'r Interface, String)> {
    consumer
        .imports_for_version(version)
        .iter()
        .filter_map(|spec| resolve_import(registry, consumer, version, spec))
        .collect()
}

/// For each tip import, the version the tip would be frozen against:
/// the latest frozen version, the next one when the import is explicitly
/// unfrozen, or `1` for an import that was never frozen.
pub fn latest_import_versions(registry: &Registry, iface: &Interface) -> BTreeMap<String, String> {
    iface
        .imports
        .iter()
        .filter_map(|spec| {
            let (name, _) = version::parse_module_with_version(spec);
            let target = registry.lookup(iface.namespace(), &name)?;
            let ver = match target.latest_version() {
                Some(latest) if target.frozen.unwrap_or(true) => latest.to_string(),
                Some(_) => target.next_version(),
                None => "1".to_string(),
            };
            Some((name, ver))
        })
        .collect()
}

/// Imports of a version as a name → version map, with `latest` replaced
/// by [`latest_import_versions`]. `None` reads the tip as if it were about
/// to be frozen.
pub fn pinned_imports(
    registry: &Registry,
    iface: &Interface,
    version: Option<&str>,
) -> BTreeMap<String, String> {
    let latest = latest_import_versions(registry, iface);
    let pairs = match version {
        Some(v) => iface.imports(v),
        None => iface
            .imports
            .iter()
            .map(|spec| {
                let (name, pinned) = version::parse_module_with_version(spec);
                let pinned = if pinned.is_empty() {
                    LATEST.to_string()
                } else {
                    pinned
                };
                (name, pinned)
            })
            .collect(),
    };

    pairs
        .into_iter()
        .map(|(name, ver)| {
            let ver = if ver == LATEST {
                latest.get(&name).cloned().unwrap_or(ver)
            } else {
                ver
            };
            (name, ver)
        })
        .collect()
}

/// Every binding generated for `iface`.
pub fn bindings_for(registry: &Registry, iface: &Interface) -> Vec<Binding> {
    let policy = registry.policy();
    let backends = iface.enabled_backends(policy);
    let tip = iface.next_version();
    let require = iface.require_frozen(policy);

    let mut versions: Vec<(String, bool, &str)> = iface
        .version_list()
        .into_iter()
        .map(|v| (v, false, REASON_KNOWN_FROZEN))
        .collect();
    versions.push((tip.clone(), require.required, require.reason));

    let mut bindings = Vec::new();
    for backend in backends {
        for (ver, not_frozen, reason) in &versions {
            bindings.push(make_binding(registry, iface, ver, backend, *not_frozen, reason));
        }
    }

    if iface.generates(Backend::Cpp) && iface.imports.is_empty() {
        bindings.push(make_binding(
            registry,
            iface,
            &tip,
            Backend::CppAnalyzer,
            false,
            REASON_ANALYZER,
        ));
    }

    bindings
}

fn make_binding(
    registry: &Registry,
    iface: &Interface,
    ver: &str,
    backend: Backend,
    not_frozen: bool,
    reason: &str,
) -> Binding {
    let deps = resolve_imports(registry, iface, ver)
        .into_iter()
        .map(|(target, target_ver)| {
            BindingId::new(
                target.namespace(),
                versioned_module_name(target.name(), &target_ver, backend.as_str()),
            )
        })
        .collect();

    Binding {
        interface: iface.key.clone(),
        version: ver.to_string(),
        backend,
        not_frozen,
        require_frozen_reason: reason.to_string(),
        deps,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::policy::Policy;
    use crate::test_support::fixtures::WorkspaceBuilder;

    fn registry(ws: &WorkspaceBuilder) -> Registry {
        ws.registry(Policy::default())
    }

    #[test]
    fn test_resolve_import_tip_tracks_tip() {
        let ws = WorkspaceBuilder::new()
            .manifest(
                "Aidl.toml",
                r#"
[[interface]]
name = "bar"
versions = ["1", "2"]

[[interface]]
name = "foo"
versions_with_info = [{ version = "1", imports = ["bar-V1"] }]
imports = ["bar"]
"#,
            );
        let reg = registry(&ws);
        let foo = reg.lookup(".", "foo").unwrap();

        let (bar, ver) = resolve_import(&reg, foo, "2", "bar").unwrap();
        assert_eq!(bar.name(), "bar");
        assert_eq!(ver, "3");

        // A frozen consumer version pins to the latest frozen import.
        let (_, ver) = resolve_import(&reg, foo, "1", "bar").unwrap();
        assert_eq!(ver, "2");

        let (_, ver) = resolve_import(&reg, foo, "2", "bar-V1").unwrap();
        assert_eq!(ver, "1");
    }

    #[test]
    fn test_resolve_import_unstable_and_unfrozen_targets() {
        let ws = WorkspaceBuilder::new().manifest(
            "Aidl.toml",
            r#"
[[interface]]
name = "scratch"
unstable = true

[[interface]]
name = "fresh"

[[interface]]
name = "foo"
versions = ["1"]
imports = ["scratch", "fresh"]
"#,
        );
        let reg = registry(&ws);
        let foo = reg.lookup(".", "foo").unwrap();

        assert_eq!(resolve_import(&reg, foo, "1", "scratch").unwrap().1, "");
        assert_eq!(resolve_import(&reg, foo, "1", "fresh").unwrap().1, "1");
        assert!(resolve_import(&reg, foo, "1", "missing").is_none());
    }

    #[test]
    fn test_latest_import_versions() {
        let ws = WorkspaceBuilder::new().manifest(
            "Aidl.toml",
            r#"
[[interface]]
name = "a"
versions = ["1", "2"]

[[interface]]
name = "b"
versions = ["1"]
frozen = false

[[interface]]
name = "c"

[[interface]]
name = "foo"
imports = ["a", "b-V1", "c"]
"#,
        );
        let reg = registry(&ws);
        let foo = reg.lookup(".", "foo").unwrap();
        let latest = latest_import_versions(&reg, foo);
        assert_eq!(latest["a"], "2");
        assert_eq!(latest["b"], "2");
        assert_eq!(latest["c"], "1");

        let tip = pinned_imports(&reg, foo, None);
        assert_eq!(tip["a"], "2");
        assert_eq!(tip["b"], "1");
        assert_eq!(tip["c"], "1");
    }

    #[test]
    fn test_bindings_for_stable_interface() {
        let ws = WorkspaceBuilder::new().manifest(
            "Aidl.toml",
            r#"
[[interface]]
name = "bar"
versions = ["1"]
backend = { java = { enabled = false }, rust = { enabled = false }, cpp = { enabled = false } }

[[interface]]
name = "foo"
versions_with_info = [{ version = "1", imports = ["bar-V1"] }]
imports = ["bar"]
backend = { java = { enabled = false }, rust = { enabled = false }, cpp = { enabled = false } }
"#,
        );
        let reg = registry(&ws);
        let foo = reg.lookup(".", "foo").unwrap();
        let names: Vec<String> = bindings_for(&reg, foo).iter().map(Binding::name).collect();
        assert_eq!(names, vec!["foo-V1-ndk", "foo-V2-ndk"]);

        let tip = bindings_for(&reg, foo).pop().unwrap();
        assert_eq!(tip.deps, vec![BindingId::new(".", "bar-V2-ndk")]);
        assert!(!tip.not_frozen);
    }

    #[test]
    fn test_analyzer_only_without_imports() {
        let ws = WorkspaceBuilder::new().manifest(
            "Aidl.toml",
            r#"
[[interface]]
name = "foo"
unstable = true
backend = { java = { enabled = false }, rust = { enabled = false }, ndk = { enabled = false } }
"#,
        );
        let reg = registry(&ws);
        let foo = reg.lookup(".", "foo").unwrap();
        let bindings = bindings_for(&reg, foo);
        let names: Vec<String> = bindings.iter().map(Binding::name).collect();
        assert_eq!(names, vec!["foo-cpp", "foo-cpp-analyzer"]);
        assert_eq!(bindings[1].require_frozen_reason, REASON_ANALYZER);
    }
}
