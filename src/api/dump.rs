//! API dumps.
//!
//! A dump is a directory of canonical `.aidl` fragments, one per declared
//! type, plus an optional `.hash` sidecar. Frozen dumps live under
//! `aidl_api/<name>/<version>`; the mutable snapshot under
//! `aidl_api/<name>/current`; the tip dump is regenerated into the output
//! directory on demand.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::api::compiler::{DumpRequest, IdlCompiler};
use crate::api::hash::{self, HashChain};
use crate::core::interface::{Interface, HASH_FILE};
use crate::freeze::FreezeError;
use crate::registry::{resolve, Registry, Violation};
use crate::util::fs::{ensure_dir, read_tree, remove_dir_all_if_exists};

/// One version's dump on disk.
#[derive(Debug, Clone)]
pub struct Dump {
    pub interface: String,
    pub version: String,
    pub dir: PathBuf,
    pub hash: Option<HashChain>,
}

fn is_hash_file(path: &Path) -> bool {
    path.file_name().is_some_and(|n| n == HASH_FILE)
}

impl Dump {
    fn at(iface: &Interface, version: &str, dir: PathBuf) -> Result<Dump, Violation> {
        let name = iface.key.to_string();
        let hash = HashChain::read(&dir, &name, version)?;
        Ok(Dump {
            interface: name,
            version: version.to_string(),
            dir,
            hash,
        })
    }

    /// The stored dump of a declared frozen version.
    pub fn frozen(iface: &Interface, version: &str) -> Result<Dump, Violation> {
        let dir = iface.version_dir(version);
        if !dir.is_dir() {
            return Err(FreezeError::MissingFrozenDump {
                interface: iface.key.to_string(),
                version: version.to_string(),
                path: dir,
            }
            .into());
        }
        Dump::at(iface, version, dir)
    }

    /// The `current` snapshot, if one exists. Its version is the next one.
    pub fn current(iface: &Interface) -> Result<Option<Dump>, Violation> {
        let dir = iface.current_dir();
        if !dir.is_dir() {
            return Ok(None);
        }
        Dump::at(iface, &iface.next_version(), dir).map(Some)
    }

    /// The latest frozen dump, if the interface has versions.
    pub fn latest(iface: &Interface) -> Result<Option<Dump>, Violation> {
        match iface.latest_version() {
            Some(v) => Dump::frozen(iface, v).map(Some),
            None => Ok(None),
        }
    }

    /// Fragment files by relative path, without the hash sidecar.
    pub fn files(&self) -> Result<BTreeMap<PathBuf, Vec<u8>>> {
        read_tree(&self.dir, &is_hash_file)
    }

    /// Same set of fragments with the same contents.
    pub fn equal(&self, other: &Dump) -> Result<bool> {
        Ok(self.files()? == other.files()?)
    }
}

/// `-I` roots for `version` of `iface`: its declared include dirs plus the
/// source root of every resolved import.
pub fn include_dirs(registry: &Registry, iface: &Interface, version: &str) -> Vec<PathBuf> {
    let mut dirs: Vec<PathBuf> = iface.include_dirs.iter().map(|d| iface.dir.join(d)).collect();
    for (target, target_version) in resolve::resolve_imports(registry, iface, version) {
        let root = target.source_root(&target_version);
        if !dirs.contains(&root) {
            dirs.push(root);
        }
    }
    dirs
}

/// Dump the tip of `iface` into `out_dir`, replacing whatever was there,
/// and write its `.hash` as the next link of the latest frozen chain.
pub fn dump_from_source(
    registry: &Registry,
    compiler: &dyn IdlCompiler,
    iface: &Interface,
    out_dir: &Path,
) -> Result<Dump> {
    let version = iface.next_version();
    remove_dir_all_if_exists(out_dir)?;
    ensure_dir(out_dir)?;

    let request = DumpRequest {
        srcs: iface.src_paths(),
        include_root: iface.include_root(),
        include_dirs: include_dirs(registry, iface, &version),
        stability: iface.stability.clone(),
        no_license: iface.no_license,
        out_dir: out_dir.to_path_buf(),
    };
    compiler
        .dump_api(&request)
        .with_context(|| format!("failed to dump the API of {}", iface.key))?;

    let previous = match iface.latest_version() {
        Some(latest) => HashChain::read(&iface.version_dir(latest), iface.name(), latest)?,
        None => None,
    };
    let previous = previous.unwrap_or_default();
    let link = hash::compute_link(out_dir, &version, previous.last())?;
    let chain = previous.extended(link);
    chain.write(out_dir)?;

    tracing::debug!("dumped {} into {}", iface.key, out_dir.display());
    Ok(Dump {
        interface: iface.key.to_string(),
        version,
        dir: out_dir.to_path_buf(),
        hash: Some(chain),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::policy::Policy;
    use crate::test_support::fixtures::WorkspaceBuilder;
    use crate::test_support::MockCompiler;

    fn workspace() -> WorkspaceBuilder {
        WorkspaceBuilder::new()
            .manifest(
                "Aidl.toml",
                r#"
[[interface]]
name = "foo"
srcs = ["a/IFoo.aidl"]
local_include_dir = "src"
versions_with_info = [{ version = "1" }]
"#,
            )
            .file("src/a/IFoo.aidl", "package a;\ninterface IFoo { void a(); void b(); }\n")
            .frozen_dump(
                "aidl_api/foo/1",
                &[("a/IFoo.aidl", "package a;\ninterface IFoo { void a(); }\n")],
            )
    }

    #[test]
    fn test_dump_from_source_chains_hash() {
        let ws = workspace();
        let reg = ws.registry(Policy::default());
        let foo = reg.find("foo").unwrap();
        let out = ws.path().join("out/foo/dump");

        let dump = dump_from_source(&reg, &MockCompiler::new(), foo, &out).unwrap();
        assert_eq!(dump.version, "2");
        assert!(out.join("a/IFoo.aidl").is_file());

        let chain = dump.hash.unwrap();
        let latest = Dump::latest(foo).unwrap().unwrap();
        assert_eq!(chain.len(), 2);
        assert_eq!(chain.prefix(), latest.hash.unwrap().links());
    }

    #[test]
    fn test_missing_frozen_dump() {
        let ws = WorkspaceBuilder::new().manifest(
            "Aidl.toml",
            "[[interface]]\nname = \"foo\"\nversions = [\"1\"]\n",
        );
        let reg = ws.registry(Policy::default());
        let foo = reg.find("foo").unwrap();
        assert!(matches!(
            Dump::frozen(foo, "1"),
            Err(Violation::Freeze(FreezeError::MissingFrozenDump { .. }))
        ));
        assert!(Dump::current(foo).unwrap().is_none());
    }

    #[test]
    fn test_equal_ignores_hash_file() {
        let ws = workspace();
        let reg = ws.registry(Policy::default());
        let foo = reg.find("foo").unwrap();

        let frozen = Dump::frozen(foo, "1").unwrap();
        let copy = ws.path().join("copy");
        crate::util::fs::copy_dir_filtered(&frozen.dir, &copy, &is_hash_file).unwrap();
        let other = Dump {
            dir: copy,
            hash: None,
            ..frozen.clone()
        };
        assert!(frozen.equal(&other).unwrap());

        std::fs::write(other.dir.join("a/IFoo.aidl"), "changed").unwrap();
        assert!(!frozen.equal(&other).unwrap());
    }
}
