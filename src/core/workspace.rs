//! Workspace - declaration discovery.
//!
//! A workspace is a directory tree containing `Aidl.toml` files. Each file is
//! assigned the namespace of its nearest ancestor (or itself) that declares
//! `[namespace]`; everything else lives in the root namespace `.`.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::{DirEntry, WalkDir};

use crate::core::interface::{API_DIR, ROOT_NAMESPACE};
use crate::core::manifest::{Manifest, MANIFEST_NAME};
use crate::util::diagnostic::suggestions;
use crate::util::fs::{relative_path, slash_path};

/// Directory below the workspace root receiving generated output.
pub const OUT_DIR: &str = "out";

/// A loaded declaration file with its namespace.
#[derive(Debug, Clone)]
pub struct Package {
    pub namespace: String,
    pub manifest: Manifest,
}

/// A workspace with all its declaration files.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    packages: Vec<Package>,
    out_dir: PathBuf,
}

fn is_skipped(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return false;
    }
    let name = entry.file_name().to_string_lossy();
    name.starts_with('.') || name == API_DIR || (entry.depth() == 1 && name == OUT_DIR)
}

impl Workspace {
    /// Discover every declaration file below `root`.
    pub fn discover(root: &Path) -> Result<Self> {
        let root = root
            .canonicalize()
            .with_context(|| format!("workspace root does not exist: {}", root.display()))?;

        let mut manifests = Vec::new();
        for entry in WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !is_skipped(e))
        {
            let entry = entry.with_context(|| format!("failed to walk {}", root.display()))?;
            if entry.file_type().is_file() && entry.file_name() == MANIFEST_NAME {
                manifests.push(Manifest::load(entry.path())?);
            }
        }

        if manifests.is_empty() {
            bail!(
                "no {} found below {}\nhelp: {}",
                MANIFEST_NAME,
                root.display(),
                suggestions::NO_DECLARATIONS
            );
        }

        let namespace_roots: BTreeSet<PathBuf> = manifests
            .iter()
            .filter(|m| m.is_namespace_root)
            .map(|m| m.dir().to_path_buf())
            .collect();

        let packages = manifests
            .into_iter()
            .map(|manifest| {
                let namespace = namespace_of(&root, &namespace_roots, manifest.dir());
                tracing::debug!(
                    "found {} in namespace `{}`",
                    manifest.path.display(),
                    namespace
                );
                Package { namespace, manifest }
            })
            .collect();

        let out_dir = root.join(OUT_DIR);
        Ok(Workspace {
            root,
            packages,
            out_dir,
        })
    }

    /// Override the output directory.
    pub fn with_out_dir(mut self, out_dir: PathBuf) -> Self {
        self.out_dir = out_dir;
        self
    }

    /// Get the workspace root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All declaration files, in path order.
    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    /// Get the output directory.
    pub fn out_dir(&self) -> &Path {
        &self.out_dir
    }

    /// Output directory for an interface's generated actions.
    pub fn interface_out_dir(&self, namespace: &str, name: &str) -> PathBuf {
        if namespace == ROOT_NAMESPACE {
            self.out_dir.join(name)
        } else {
            self.out_dir.join(namespace).join(name)
        }
    }

    /// Workspace-relative rendering of a path, for messages and plans.
    pub fn display_path(&self, path: &Path) -> String {
        slash_path(&relative_path(&self.root, path))
    }
}

/// Namespace of `dir`: the nearest namespace root at or above it.
fn namespace_of(root: &Path, namespace_roots: &BTreeSet<PathBuf>, dir: &Path) -> String {
    dir.ancestors()
        .take_while(|d| d.starts_with(root))
        .find(|d| namespace_roots.contains(*d) && *d != root)
        .map(|d| slash_path(&relative_path(root, d)))
        .unwrap_or_else(|| ROOT_NAMESPACE.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, contents: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_discover_assigns_namespaces() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Aidl.toml", "[[interface]]\nname = \"common\"\n");
        write(
            tmp.path(),
            "vendor/a/Aidl.toml",
            "[namespace]\n[[interface]]\nname = \"foo\"\nowner = \"a\"\n",
        );
        write(
            tmp.path(),
            "vendor/a/sub/Aidl.toml",
            "[[interface]]\nname = \"bar\"\nowner = \"a\"\n",
        );
        write(tmp.path(), "platform/Aidl.toml", "[[interface]]\nname = \"baz\"\n");

        let ws = Workspace::discover(tmp.path()).unwrap();
        let namespaces: Vec<(&str, &str)> = ws
            .packages()
            .iter()
            .map(|p| (p.manifest.interfaces[0].name.as_str(), p.namespace.as_str()))
            .collect();

        assert!(namespaces.contains(&("common", ".")));
        assert!(namespaces.contains(&("foo", "vendor/a")));
        assert!(namespaces.contains(&("bar", "vendor/a")));
        assert!(namespaces.contains(&("baz", ".")));
    }

    #[test]
    fn test_discover_skips_dump_and_hidden_dirs() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Aidl.toml", "[[interface]]\nname = \"foo\"\n");
        write(tmp.path(), "aidl_api/foo/1/Aidl.toml", "not toml at all [");
        write(tmp.path(), ".git/Aidl.toml", "not toml at all [");
        write(tmp.path(), "out/foo/Aidl.toml", "not toml at all [");

        let ws = Workspace::discover(tmp.path()).unwrap();
        assert_eq!(ws.packages().len(), 1);
    }

    #[test]
    fn test_discover_requires_declarations() {
        let tmp = TempDir::new().unwrap();
        let err = Workspace::discover(tmp.path()).unwrap_err();
        assert!(err.to_string().contains("no Aidl.toml"));
    }

    #[test]
    fn test_interface_out_dir() {
        let tmp = TempDir::new().unwrap();
        write(tmp.path(), "Aidl.toml", "");
        let ws = Workspace::discover(tmp.path()).unwrap();
        assert!(ws.interface_out_dir(".", "foo").ends_with("out/foo"));
        assert!(ws
            .interface_out_dir("vendor/a", "foo")
            .ends_with("out/vendor/a/foo"));
    }
}
