//! On-disk workspace fixtures.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::api::hash::{self, HashChain};
use crate::core::policy::Policy;
use crate::core::workspace::Workspace;
use crate::registry::{Registry, Violations};

/// A temporary workspace populated file by file.
pub struct WorkspaceBuilder {
    dir: TempDir,
}

impl Default for WorkspaceBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkspaceBuilder {
    pub fn new() -> Self {
        WorkspaceBuilder {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Add a declaration file.
    pub fn manifest(self, rel: &str, content: &str) -> Self {
        self.file(rel, content)
    }

    pub fn file(self, rel: &str, content: &str) -> Self {
        self.write(rel, content);
        self
    }

    /// Add a frozen dump with a valid `.hash`, chained onto the dump of the
    /// previous version in the same directory when there is one.
    pub fn frozen_dump(self, dir: &str, files: &[(&str, &str)]) -> Self {
        let ws = self.unhashed_dump(dir, files);
        let dump_dir = ws.path().join(dir);
        let version = dump_dir
            .file_name()
            .and_then(|n| n.to_str())
            .expect("dump dir has a version name")
            .to_string();

        let previous = version
            .parse::<u32>()
            .ok()
            .filter(|n| *n > 1)
            .and_then(|n| {
                let sibling: PathBuf = dump_dir.with_file_name((n - 1).to_string());
                HashChain::read(&sibling, "fixture", &(n - 1).to_string()).unwrap()
            })
            .unwrap_or_default();
        let link = hash::compute_link(&dump_dir, &version, previous.last()).unwrap();
        previous.extended(link).write(&dump_dir).unwrap();
        ws
    }

    /// Add a dump without a `.hash`.
    pub fn unhashed_dump(self, dir: &str, files: &[(&str, &str)]) -> Self {
        std::fs::create_dir_all(self.path().join(dir)).unwrap();
        for (rel, content) in files {
            self.write(&format!("{}/{}", dir, rel), content);
        }
        self
    }

    /// Write a file, replacing any previous content.
    pub fn write(&self, rel: &str, content: &str) {
        let path = self.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
    }

    pub fn read(&self, rel: &str) -> String {
        std::fs::read_to_string(self.path().join(rel)).unwrap()
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::discover(self.path()).unwrap()
    }

    pub fn try_registry(&self, policy: Policy) -> Result<Registry, Violations> {
        Registry::build(&self.workspace(), policy)
    }

    pub fn registry(&self, policy: Policy) -> Registry {
        match self.try_registry(policy) {
            Ok(registry) => registry,
            Err(violations) => panic!("registry failed to build:\n{:#?}", violations.items),
        }
    }

    pub fn registry_err(&self, policy: Policy) -> Violations {
        match self.try_registry(policy) {
            Ok(_) => panic!("expected the registry to fail"),
            Err(violations) => violations,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frozen_dumps_chain() {
        let ws = WorkspaceBuilder::new()
            .frozen_dump("api/1", &[("IFoo.aidl", "a\n")])
            .frozen_dump("api/2", &[("IFoo.aidl", "b\n")]);
        let first = HashChain::read(&ws.path().join("api/1"), "foo", "1").unwrap().unwrap();
        let second = HashChain::read(&ws.path().join("api/2"), "foo", "2").unwrap().unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(second.prefix(), first.links());
    }
}
