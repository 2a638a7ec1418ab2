//! Dependency walk over consumer modules and bindings.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::binding::BindingId;
use crate::core::interface::ROOT_NAMESPACE;
use crate::registry::{Registry, ResolutionError, Violations};
use crate::validate::ConsumerViolation;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DepNode {
    Binding(usize),
    Module(usize),
}

/// What a node sees through its dependencies.
#[derive(Debug, Clone, Default)]
struct UsageInfo {
    /// `(binding name, reason)` of every reachable unfrozen tip.
    not_frozen: Vec<(String, String)>,
    /// Interface family to the generation action of the version in use.
    sources: BTreeMap<String, String>,
}

impl UsageInfo {
    /// Merge `other` in, returning the sorted pairs of clashing sources.
    fn merge(&mut self, other: &UsageInfo) -> Vec<[String; 2]> {
        for entry in &other.not_frozen {
            if !self.not_frozen.contains(entry) {
                self.not_frozen.push(entry.clone());
            }
        }
        let mut conflicts = Vec::new();
        for (family, source) in &other.sources {
            match self.sources.get(family) {
                Some(existing) if existing != source => {
                    let mut pair = [existing.clone(), source.clone()];
                    pair.sort();
                    conflicts.push(pair);
                }
                Some(_) => {}
                None => {
                    self.sources.insert(family.clone(), source.clone());
                }
            }
        }
        conflicts
    }
}

struct DepGraph<'r> {
    registry: &'r Registry,
    bindings: Vec<BindingId>,
    graph: DiGraph<DepNode, ()>,
}

impl<'r> DepGraph<'r> {
    /// Link every consumer dependency; unresolvable ones are reported.
    fn build(registry: &'r Registry, violations: &mut Violations) -> DepGraph<'r> {
        let mut graph = DiGraph::new();
        let mut binding_nodes: HashMap<BindingId, NodeIndex> = HashMap::new();
        let mut bindings = Vec::new();

        for (i, binding) in registry.bindings().enumerate() {
            let id = binding.id();
            binding_nodes.insert(id.clone(), graph.add_node(DepNode::Binding(i)));
            bindings.push(id);
        }
        for binding in registry.bindings() {
            let from = binding_nodes[&binding.id()];
            for dep in &binding.deps {
                // Missing deps name a backend the import does not generate,
                // which the registry already rejected.
                if let Some(&to) = binding_nodes.get(dep) {
                    graph.add_edge(from, to, ());
                }
            }
        }

        let consumers = registry.consumers();
        let module_nodes: Vec<NodeIndex> = (0..consumers.len())
            .map(|i| graph.add_node(DepNode::Module(i)))
            .collect();
        let find_module = |namespace: &str, name: &str| {
            [namespace, ROOT_NAMESPACE].iter().find_map(|ns| {
                consumers
                    .iter()
                    .position(|c| c.namespace == *ns && c.name() == name)
            })
        };

        for (i, consumer) in consumers.iter().enumerate() {
            let module = &consumer.module;
            for dep in module.deps() {
                if let Some(j) = find_module(&consumer.namespace, dep) {
                    graph.add_edge(module_nodes[i], module_nodes[j], ());
                    continue;
                }
                let Some(binding) = registry.lookup_binding(&consumer.namespace, dep) else {
                    violations.push(ResolutionError::UnknownDependency {
                        module: module.name().to_string(),
                        dep: dep.clone(),
                    });
                    continue;
                };
                let linkable = module.capabilities().resolves_imports_as(
                    &binding.interface.name,
                    &binding.version,
                    binding.backend,
                );
                if !linkable {
                    violations.push(ResolutionError::BackendNotLinkable {
                        module: module.name().to_string(),
                        kind: module.kind().to_string(),
                        dep: dep.clone(),
                        backend: binding.backend.to_string(),
                    });
                    continue;
                }
                graph.add_edge(module_nodes[i], binding_nodes[&binding.id()], ());
            }
        }

        DepGraph {
            registry,
            bindings,
            graph,
        }
    }

    fn name(&self, node: NodeIndex) -> String {
        match self.graph[node] {
            DepNode::Binding(i) => self.bindings[i].to_string(),
            DepNode::Module(i) => self.registry.consumers()[i].name().to_string(),
        }
    }

    fn source_name(&self, node: NodeIndex) -> Option<String> {
        match self.graph[node] {
            DepNode::Binding(i) => self
                .registry
                .binding(&self.bindings[i])
                .map(|b| b.source_name()),
            DepNode::Module(_) => None,
        }
    }

    /// Shortest path from `start` to the binding generated by `source`.
    fn path_to(&self, start: NodeIndex, source: &str) -> Option<String> {
        let mut parents: HashMap<NodeIndex, NodeIndex> = HashMap::new();
        let mut queue = VecDeque::from([start]);
        while let Some(node) = queue.pop_front() {
            if node != start && self.source_name(node).as_deref() == Some(source) {
                let mut path = vec![self.name(node)];
                let mut cur = node;
                while let Some(&parent) = parents.get(&cur) {
                    path.push(self.name(parent));
                    cur = parent;
                }
                path.reverse();
                return Some(path.join(" -> "));
            }
            for next in self.graph.neighbors(node) {
                if next != start && !parents.contains_key(&next) {
                    parents.insert(next, node);
                    queue.push_back(next);
                }
            }
        }
        None
    }
}

/// Check every consumer module against the resolved registry.
///
/// Reports each module that sees two versions of one interface in the same
/// language, and, unless its kind is exempt, each unfrozen tip it uses while
/// that tip is required to be frozen. All findings are collected.
pub fn validate_consumers(registry: &Registry) -> Violations {
    let mut violations = Violations::default();
    let deps = DepGraph::build(registry, &mut violations);

    let order = match toposort(&deps.graph, None) {
        Ok(order) => order,
        Err(cycle) => {
            violations.push(ConsumerViolation::DependencyCycle {
                module: deps.name(cycle.node_id()),
            });
            return violations;
        }
    };

    let mut infos: HashMap<NodeIndex, UsageInfo> = HashMap::new();
    // Dependencies come after their dependents in `order`.
    for &node in order.iter().rev() {
        let mut info = UsageInfo::default();
        if let DepNode::Binding(i) = deps.graph[node] {
            if let Some(binding) = registry.binding(&deps.bindings[i]) {
                info.sources.insert(binding.family(), binding.source_name());
                if binding.not_frozen {
                    info.not_frozen
                        .push((binding.name(), binding.require_frozen_reason.clone()));
                }
            }
        }

        let mut conflicts = BTreeSet::new();
        let mut children: Vec<NodeIndex> = deps.graph.neighbors(node).collect();
        children.sort();
        for child in children {
            if let Some(child_info) = infos.get(&child) {
                conflicts.extend(info.merge(child_info));
            }
        }

        if let DepNode::Module(i) = deps.graph[node] {
            let consumer = &registry.consumers()[i];
            let module = consumer.name().to_string();
            for violators in conflicts {
                let paths = violators
                    .iter()
                    .filter_map(|source| deps.path_to(node, source))
                    .collect();
                violations.push(ConsumerViolation::MultipleVersions {
                    module: module.clone(),
                    violators: violators.to_vec(),
                    paths,
                });
            }
            if !consumer.module.capabilities().exempt_from_frozen_check() {
                for (binding, reason) in &info.not_frozen {
                    violations.push(ConsumerViolation::UsingUnfrozen {
                        module: module.clone(),
                        binding: binding.clone(),
                        reason: reason.clone(),
                    });
                }
            }
        }
        infos.insert(node, info);
    }

    if !violations.is_empty() {
        tracing::debug!("consumer validation found {} violations", violations.len());
    }
    violations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::policy::Policy;
    use crate::registry::Violation;
    use crate::test_support::fixtures::WorkspaceBuilder;

    const FOO: &str = "[[interface]]\nname = \"foo\"\nversions = [\"1\"]\n";

    fn validate(manifest: &str, policy: Policy) -> Vec<Violation> {
        let ws = WorkspaceBuilder::new().manifest("Aidl.toml", manifest);
        validate_consumers(&ws.registry(policy)).items
    }

    fn release() -> Policy {
        Policy {
            frozen_rel: true,
            ..Policy::default()
        }
    }

    #[test]
    fn test_unfrozen_tip_under_release_policy() {
        let manifest = format!(
            "{}\n[[module]]\nname = \"client\"\nkind = \"java_library\"\ndeps = [\"foo-V2-java\"]\n",
            FOO
        );
        assert_eq!(validate(&manifest, Policy::default()), vec![]);

        let violations = validate(&manifest, release());
        assert_eq!(violations.len(), 1);
        let message = violations[0].to_string();
        assert!(message.starts_with("foo-V2-java is an unfrozen development version"));

        let frozen_dep = format!(
            "{}\n[[module]]\nname = \"client\"\nkind = \"java_library\"\ndeps = [\"foo-V1-java\"]\n",
            FOO
        );
        assert_eq!(validate(&frozen_dep, release()), vec![]);
    }

    #[test]
    fn test_unstable_and_exempt_modules_pass() {
        let manifest = r#"
[[interface]]
name = "scratch"
unstable = true

[[interface]]
name = "foo"
versions = ["1"]

[[module]]
name = "unit"
kind = "cc_test"
deps = ["foo-V2-ndk", "scratch-ndk"]

[[module]]
name = "app"
kind = "cc_binary"
deps = ["scratch-cpp"]
"#;
        assert_eq!(validate(manifest, release()), vec![]);
    }

    #[test]
    fn test_exempt_library_still_propagates() {
        let manifest = format!(
            r#"{}
[[module]]
name = "helpers"
kind = "cc_test_library"
deps = ["foo-V2-ndk"]

[[module]]
name = "server"
kind = "cc_binary"
deps = ["helpers"]
"#,
            FOO
        );
        let violations = validate(&manifest, release());
        assert_eq!(violations.len(), 1);
        assert!(matches!(
            &violations[0],
            Violation::Consumer(ConsumerViolation::UsingUnfrozen { module, binding, .. })
                if module == "server" && binding == "foo-V2-ndk"
        ));
    }

    #[test]
    fn test_multiple_versions_through_library() {
        let manifest = format!(
            r#"{}
[[module]]
name = "lib"
kind = "java_library"
deps = ["foo-V1-java"]

[[module]]
name = "app"
kind = "android_app"
deps = ["lib", "foo-V2-java"]
"#,
            FOO
        );
        let violations = validate(&manifest, Policy::default());
        assert_eq!(violations.len(), 1);
        match &violations[0] {
            Violation::Consumer(ConsumerViolation::MultipleVersions {
                module,
                violators,
                paths,
            }) => {
                assert_eq!(module, "app");
                assert_eq!(violators, &["foo-V1-java-source", "foo-V2-java-source"]);
                assert_eq!(paths, &["app -> lib -> foo-V1-java", "app -> foo-V2-java"]);
            }
            other => panic!("unexpected violation: {:?}", other),
        }
    }

    #[test]
    fn test_versions_of_different_backends_do_not_clash() {
        let manifest = format!(
            "{}\n[[module]]\nname = \"client\"\nkind = \"cc_binary\"\ndeps = [\"foo-V1-ndk\", \"foo-V2-cpp\"]\n",
            FOO
        );
        assert_eq!(validate(&manifest, Policy::default()), vec![]);
    }

    #[test]
    fn test_imported_version_clash() {
        // bar-V1 pins foo-V1, the client also links foo's tip.
        let manifest = r#"
[[interface]]
name = "foo"
versions = ["1"]

[[interface]]
name = "bar"
imports = ["foo-V1"]

[[module]]
name = "client"
kind = "rust_binary"
deps = ["bar-V1-rust", "foo-V2-rust"]
"#;
        let violations = validate(manifest, Policy::default());
        assert_eq!(violations.len(), 1);
        assert!(violations[0]
            .to_string()
            .ends_with("foo-V1-rust-source, foo-V2-rust-source"));
    }

    #[test]
    fn test_unknown_dependency_and_backend() {
        let manifest = format!(
            "{}\n[[module]]\nname = \"client\"\nkind = \"java_library\"\ndeps = [\"foo-V1-ndk\", \"nope\"]\n",
            FOO
        );
        let violations = validate(&manifest, Policy::default());
        let messages: Vec<String> = violations.iter().map(|v| v.to_string()).collect();
        assert_eq!(messages.len(), 2);
        assert!(matches!(
            &violations[0],
            Violation::Resolution(ResolutionError::BackendNotLinkable { backend, .. }) if backend == "ndk"
        ));
        assert!(matches!(
            &violations[1],
            Violation::Resolution(ResolutionError::UnknownDependency { dep, .. }) if dep == "nope"
        ));
    }

    #[test]
    fn test_module_cycle() {
        let manifest = r#"
[[module]]
name = "a"
kind = "cc_library"
deps = ["b"]

[[module]]
name = "b"
kind = "cc_library"
deps = ["a"]
"#;
        let violations = validate(manifest, Policy::default());
        assert!(matches!(
            &violations[..],
            [Violation::Consumer(ConsumerViolation::DependencyCycle { .. })]
        ));
    }
}
