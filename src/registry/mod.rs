//! Interface registry - the immutable import graph.
//!
//! A [`Registry`] is built once from a discovered [`Workspace`]. Declaration
//! checks run first and abort the build before any import is resolved; then
//! imports are linked into a graph and checked for compatibility. Once built,
//! the registry is read-only and is passed explicitly to every later pass.

pub mod checks;
pub mod errors;
pub mod resolve;

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::PathBuf;

use petgraph::algo::kosaraju_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Topo;

use crate::core::binding::{Binding, BindingId};
use crate::core::interface::{Interface, InterfaceKey, ROOT_NAMESPACE};
use crate::core::module::ConsumerModule;
use crate::core::policy::Policy;
use crate::core::version;
use crate::core::workspace::Workspace;

pub use errors::{DeclarationError, ResolutionError, Violation, Violations};

/// A consumer module placed in its namespace.
#[derive(Debug, Clone)]
pub struct Consumer {
    pub namespace: String,
    pub module: ConsumerModule,
    pub decl_path: PathBuf,
}

impl Consumer {
    pub fn name(&self) -> &str {
        self.module.name()
    }
}

/// Every declared interface and consumer, with imports linked.
#[derive(Debug)]
pub struct Registry {
    policy: Policy,

    root: PathBuf,

    interfaces: BTreeMap<InterfaceKey, Interface>,

    /// Edges point from an importer to what it imports
    graph: DiGraph<InterfaceKey, ()>,

    nodes: HashMap<InterfaceKey, NodeIndex>,

    consumers: Vec<Consumer>,

    bindings: BTreeMap<BindingId, Binding>,
}

impl Registry {
    /// Register and link everything declared in `workspace`.
    pub fn build(workspace: &Workspace, policy: Policy) -> Result<Registry, Violations> {
        let mut violations = Violations::default();
        let mut interfaces: BTreeMap<InterfaceKey, Interface> = BTreeMap::new();
        let mut consumers: Vec<Consumer> = Vec::new();

        for package in workspace.packages() {
            let path = &package.manifest.path;
            for decl in &package.manifest.interfaces {
                let errors = checks::check_declaration(decl, &package.namespace, path);
                if !errors.is_empty() {
                    violations.extend(errors);
                    continue;
                }

                let iface = Interface::from_decl(decl.clone(), &package.namespace, path);
                if let Some(existing) = interfaces.get(&iface.key) {
                    violations.push(DeclarationError::DuplicateInterface {
                        name: iface.key.to_string(),
                        first: existing.decl_path.clone(),
                        second: path.clone(),
                    });
                    continue;
                }
                if let Some(e) = checks::check_unstable_dumps(&iface) {
                    violations.push(e);
                }
                interfaces.insert(iface.key.clone(), iface);
            }

            for decl in &package.manifest.modules {
                let duplicate = consumers
                    .iter()
                    .any(|c| c.namespace == package.namespace && c.name() == decl.name);
                if duplicate {
                    violations.push(DeclarationError::DuplicateModule {
                        name: decl.name.clone(),
                    });
                    continue;
                }
                consumers.push(Consumer {
                    namespace: package.namespace.clone(),
                    module: ConsumerModule::from_decl(decl.clone()),
                    decl_path: path.clone(),
                });
            }
        }

        if !violations.is_empty() {
            return Err(violations);
        }

        let mut registry = Registry {
            policy,
            root: workspace.root().to_path_buf(),
            interfaces,
            graph: DiGraph::new(),
            nodes: HashMap::new(),
            consumers,
            bindings: BTreeMap::new(),
        };

        registry.link(&mut violations);
        if !violations.is_empty() {
            return Err(violations);
        }

        for iface in registry.interfaces.values() {
            violations.extend(checks::check_imports(&registry, iface));
        }
        if !violations.is_empty() {
            return Err(violations);
        }

        let bindings: Vec<Binding> = registry
            .interfaces
            .values()
            .flat_map(|iface| resolve::bindings_for(&registry, iface))
            .collect();
        registry.bindings = bindings.into_iter().map(|b| (b.id(), b)).collect();

        tracing::debug!(
            "registered {} interfaces, {} bindings, {} consumer modules",
            registry.interfaces.len(),
            registry.bindings.len(),
            registry.consumers.len()
        );
        Ok(registry)
    }

    /// Add graph nodes and import edges, reporting unknown imports and cycles.
    fn link(&mut self, violations: &mut Violations) {
        for key in self.interfaces.keys() {
            let node = self.graph.add_node(key.clone());
            self.nodes.insert(key.clone(), node);
        }

        let mut edges = Vec::new();
        for iface in self.interfaces.values() {
            let specs = iface
                .imports
                .iter()
                .chain(iface.versions.iter().flat_map(|v| v.imports.iter()));

            let mut seen = HashSet::new();
            for spec in specs {
                let (name, _) = version::parse_module_with_version(spec);
                if !seen.insert(name.clone()) {
                    continue;
                }
                match self.lookup(iface.namespace(), &name) {
                    Some(target) => edges.push((iface.key.clone(), target.key.clone())),
                    None => violations.push(ResolutionError::UnknownImport {
                        interface: iface.key.to_string(),
                        import: name,
                    }),
                }
            }
        }

        for (from, to) in edges {
            let (a, b) = (self.nodes[&from], self.nodes[&to]);
            if !self.graph.contains_edge(a, b) {
                self.graph.add_edge(a, b, ());
            }
        }

        for component in kosaraju_scc(&self.graph) {
            let self_loop = component.len() == 1 && self.graph.contains_edge(component[0], component[0]);
            if component.len() > 1 || self_loop {
                let mut cycle: Vec<String> = component
                    .iter()
                    .map(|n| self.graph[*n].to_string())
                    .collect();
                cycle.sort();
                violations.push(DeclarationError::ImportCycle { cycle });
            }
        }
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Workspace root the registry was built from.
    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub fn interface(&self, key: &InterfaceKey) -> Option<&Interface> {
        self.interfaces.get(key)
    }

    /// Find `name` as seen from `namespace`: that namespace first, then root.
    pub fn lookup(&self, namespace: &str, name: &str) -> Option<&Interface> {
        self.interfaces
            .get(&InterfaceKey::new(namespace, name))
            .or_else(|| self.interfaces.get(&InterfaceKey::new(ROOT_NAMESPACE, name)))
    }

    /// Find an interface by `name` or `//namespace:name`.
    pub fn find(&self, spec: &str) -> Option<&Interface> {
        match spec.strip_prefix("//").and_then(|s| s.rsplit_once(':')) {
            Some((namespace, name)) => self.interfaces.get(&InterfaceKey::new(namespace, name)),
            None => self.lookup(ROOT_NAMESPACE, spec).or_else(|| {
                let mut matches = self.interfaces.values().filter(|i| i.name() == spec);
                match (matches.next(), matches.next()) {
                    (Some(only), None) => Some(only),
                    _ => None,
                }
            }),
        }
    }

    /// All interfaces in key order.
    pub fn interfaces(&self) -> impl Iterator<Item = &Interface> {
        self.interfaces.values()
    }

    pub fn consumers(&self) -> &[Consumer] {
        &self.consumers
    }

    pub fn bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings.values()
    }

    pub fn binding(&self, id: &BindingId) -> Option<&Binding> {
        self.bindings.get(id)
    }

    /// Find a binding by name as seen from `namespace`.
    pub fn lookup_binding(&self, namespace: &str, name: &str) -> Option<&Binding> {
        self.bindings
            .get(&BindingId::new(namespace, name))
            .or_else(|| self.bindings.get(&BindingId::new(ROOT_NAMESPACE, name)))
    }

    /// Interfaces directly imported by `key`.
    pub fn direct_imports(&self, key: &InterfaceKey) -> Vec<&Interface> {
        let Some(&node) = self.nodes.get(key) else {
            return Vec::new();
        };
        let mut imports: Vec<&Interface> = self
            .graph
            .neighbors(node)
            .filter_map(|n| self.interfaces.get(&self.graph[n]))
            .collect();
        imports.sort_by(|a, b| a.key.cmp(&b.key));
        imports
    }

    /// Interfaces ordered so that every import comes before its importers.
    pub fn build_order(&self) -> Vec<&Interface> {
        let mut topo = Topo::new(&self.graph);
        let mut order = Vec::new();
        while let Some(node) = topo.next(&self.graph) {
            if let Some(iface) = self.interfaces.get(&self.graph[node]) {
                order.push(iface);
            }
        }
        order.reverse();
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::fixtures::WorkspaceBuilder;

    #[test]
    fn test_build_simple_registry() {
        let ws = WorkspaceBuilder::new().manifest(
            "Aidl.toml",
            r#"
[[interface]]
name = "bar"
versions = ["1"]

[[interface]]
name = "foo"
imports = ["bar"]

[[module]]
name = "client"
kind = "cc_binary"
deps = ["foo-V1-ndk"]
"#,
        );
        let reg = ws.registry(Policy::default());
        assert_eq!(reg.interfaces().count(), 2);
        assert_eq!(reg.consumers().len(), 1);

        let foo = reg.find("foo").unwrap();
        let order: Vec<&str> = reg.build_order().iter().map(|i| i.name()).collect();
        assert_eq!(order, vec!["bar", "foo"]);
        assert_eq!(reg.direct_imports(&foo.key)[0].name(), "bar");
        assert!(reg.lookup_binding(".", "foo-V1-java").is_some());
        assert!(reg.lookup_binding(".", "bar-V2-rust").is_some());
    }

    #[test]
    fn test_declaration_errors_are_collected() {
        let ws = WorkspaceBuilder::new()
            .manifest(
                "Aidl.toml",
                r#"
[[interface]]
name = "foo"
frozen = true

[[interface]]
name = "bar"
unstable = true
versions = ["1"]
"#,
            )
            .manifest("other/Aidl.toml", "[[interface]]\nname = \"baz\"\n[[interface]]\nname = \"baz\"\n");

        let err = ws.registry_err(Policy::default());
        assert_eq!(err.len(), 3);
        assert!(err.any(|v| matches!(
            v,
            Violation::Declaration(DeclarationError::DuplicateInterface { .. })
        )));
    }

    #[test]
    fn test_unknown_import_and_cycle() {
        let ws = WorkspaceBuilder::new().manifest(
            "Aidl.toml",
            r#"
[[interface]]
name = "a"
imports = ["b", "nope"]

[[interface]]
name = "b"
imports = ["a"]
"#,
        );
        let err = ws.registry_err(Policy::default());
        let messages: Vec<String> = err.items.iter().map(|v| v.to_string()).collect();
        assert!(messages.contains(&"Import does not exist: nope".to_string()));
        assert!(messages.contains(&"import cycle between interfaces: a -> b".to_string()));
    }

    #[test]
    fn test_import_compatibility() {
        let ws = WorkspaceBuilder::new().manifest(
            "Aidl.toml",
            r#"
[[interface]]
name = "owned"
owner = "vendor"
versions = ["1"]
frozen = false
backend = { java = { enabled = false } }

[[interface]]
name = "platform"
versions = ["1"]
frozen = true
imports = ["owned", "owned-V7"]
"#,
        );
        let err = ws.registry_err(Policy::default());
        let messages: Vec<String> = err.items.iter().map(|v| v.to_string()).collect();

        assert!(messages.iter().any(|m| m.contains("which doesn't exist")
            && m.contains(r#"must be one of ["1", "2"]"#)));
        assert!(messages
            .iter()
            .any(|m| m == r#"java backend not enabled in the imported AIDL interface "owned""#));
        assert!(messages.iter().any(|m| m.contains("which is not frozen")));
        assert!(messages
            .iter()
            .any(|m| m.contains("which is an interface owned by \"vendor\"")));
    }

    #[test]
    fn test_strict_imports_policy() {
        let ws = WorkspaceBuilder::new().manifest(
            "Aidl.toml",
            r#"
[[interface]]
name = "bar"
versions = ["1"]

[[interface]]
name = "foo"
imports = ["bar"]
"#,
        );
        assert!(ws.try_registry(Policy::default()).is_ok());

        let strict = Policy {
            strict_imports: true,
            ..Default::default()
        };
        let err = ws.registry_err(strict);
        assert_eq!(
            err.items[0].to_string(),
            r#""foo" depends on "bar" but does not specify a version (must be one of ["1", "2"])"#
        );
    }

    #[test]
    fn test_release_requires_frozen_versions() {
        let ws = WorkspaceBuilder::new().manifest("Aidl.toml", "[[interface]]\nname = \"foo\"\n");
        let release = Policy {
            frozen_rel: true,
            ..Default::default()
        };
        let err = ws.registry_err(release);
        assert!(matches!(
            &err.items[..],
            [Violation::Resolution(ResolutionError::MustBeFrozen { .. })]
        ));
    }

    #[test]
    fn test_namespaces_are_isolated() {
        let ws = WorkspaceBuilder::new()
            .manifest(
                "a/Aidl.toml",
                r#"
[namespace]

[[interface]]
name = "common"
owner = "a"
versions = ["1", "2", "3"]

[[interface]]
name = "foo"
owner = "a"
imports = ["common-V3"]
"#,
            )
            .manifest(
                "b/Aidl.toml",
                r#"
[namespace]

[[interface]]
name = "common"
owner = "b"
versions = ["1"]

[[interface]]
name = "foo"
owner = "b"
imports = ["common-V1"]
"#,
            );
        let reg = ws.registry(Policy::default());
        assert_eq!(reg.interfaces().count(), 4);

        let foo_a = reg.find("//a:foo").unwrap();
        let foo_b = reg.find("//b:foo").unwrap();
        assert_eq!(reg.direct_imports(&foo_a.key)[0].version_list().len(), 3);
        assert_eq!(reg.direct_imports(&foo_b.key)[0].version_list().len(), 1);
        assert!(reg.find("foo").is_none());

        let tip = reg.lookup_binding("b", "foo-V1-java").unwrap();
        assert_eq!(tip.deps, vec![BindingId::new("b", "common-V1-java")]);
    }

    #[test]
    fn test_build_order_puts_imports_first() {
        let ws = WorkspaceBuilder::new().manifest(
            "Aidl.toml",
            r#"
[[interface]]
name = "a"
unstable = true

[[interface]]
name = "b"
unstable = true
imports = ["a"]

[[interface]]
name = "c"
unstable = true
imports = ["b"]
"#,
        );
        let reg = ws.registry(Policy::default());
        let order: Vec<&str> = reg.build_order().iter().map(|i| i.name()).collect();
        assert_eq!(order, vec!["a", "b", "c"]);
    }
}
