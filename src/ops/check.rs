//! Implementation of `aidlgate check`.

use anyhow::Result;

use crate::api::check::check_all;
use crate::api::IdlCompiler;
use crate::ops::load::Project;
use crate::validate::validate_consumers;

/// What a passing check covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckReport {
    pub interfaces: usize,
    pub bindings: usize,
    pub modules: usize,
    /// Whether dumps were checked through the compiler
    pub dumps_checked: bool,
}

/// Validate consumers and, given a compiler, run every dump check.
///
/// All violations of both passes are returned together.
pub fn check(project: &Project, compiler: Option<&dyn IdlCompiler>) -> Result<CheckReport> {
    let registry = &project.registry;
    let mut violations = validate_consumers(registry);

    if let Some(compiler) = compiler {
        let found = check_all(registry, compiler, &project.workspace)?;
        violations.extend(found.items);
    }
    violations.into_result()?;

    Ok(CheckReport {
        interfaces: registry.interfaces().count(),
        bindings: registry.bindings().count(),
        modules: registry.consumers().len(),
        dumps_checked: compiler.is_some(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Violations;
    use crate::test_support::fixtures::WorkspaceBuilder;
    use crate::test_support::MockCompiler;

    const MANIFEST: &str = r#"
[[interface]]
name = "foo"
srcs = ["IFoo.aidl"]
versions = ["1"]

[[module]]
name = "client"
kind = "cc_binary"
deps = ["foo-V2-ndk"]
"#;

    fn project(ws: &WorkspaceBuilder, env: &[(&str, &str)]) -> Project {
        let env: Vec<(String, String)> = env
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Project::load_with(ws.path(), None, move |key| {
            env.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    #[test]
    fn test_consumers_only() {
        let ws = WorkspaceBuilder::new()
            .manifest("Aidl.toml", MANIFEST)
            .file("IFoo.aidl", "interface IFoo {}\n");

        let report = check(&project(&ws, &[]), None).unwrap();
        assert_eq!(report.interfaces, 1);
        assert_eq!(report.modules, 1);
        assert!(!report.dumps_checked);

        let err = check(&project(&ws, &[("AIDL_FROZEN_REL", "true")]), None).unwrap_err();
        let violations = err.downcast_ref::<Violations>().unwrap();
        assert_eq!(violations.len(), 1);
        assert!(violations.to_string().contains("is an unfrozen development version"));
    }

    #[test]
    fn test_run_collects_dump_and_consumer_violations() {
        let ws = WorkspaceBuilder::new()
            .manifest("Aidl.toml", MANIFEST)
            .file("IFoo.aidl", "interface IFoo {}\n")
            .frozen_dump("aidl_api/foo/1", &[("IFoo.aidl", "interface IFoo {}\n")]);
        let compiler = MockCompiler::new();

        let err = check(&project(&ws, &[("AIDL_FROZEN_REL", "1")]), Some(&compiler)).unwrap_err();
        let violations = err.downcast_ref::<Violations>().unwrap();
        let messages: Vec<String> = violations.items.iter().map(|v| v.to_string()).collect();
        assert_eq!(messages.len(), 2);
        assert!(messages[0].contains("unfrozen development version"));
        assert!(messages[1].contains("current version of AIDL interface foo does not exist"));

        let ws = ws.unhashed_dump("aidl_api/foo/current", &[("IFoo.aidl", "interface IFoo {}\n")]);
        let report = check(&project(&ws, &[]), Some(&compiler)).unwrap();
        assert!(report.dumps_checked);
    }
}
