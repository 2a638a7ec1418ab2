//! `Aidl.toml` declaration files.
//!
//! A declaration file holds any number of `[[interface]]` and `[[module]]`
//! tables. An optional `[namespace]` table makes its directory the root of
//! an isolated namespace.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::core::interface::InterfaceDecl;
use crate::core::module::ModuleDecl;

/// Canonical declaration file name.
pub const MANIFEST_NAME: &str = "Aidl.toml";

/// `[namespace]` marker table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamespaceMarker {}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawManifest {
    #[serde(default)]
    namespace: Option<NamespaceMarker>,

    #[serde(default)]
    interface: Vec<InterfaceDecl>,

    #[serde(default)]
    module: Vec<ModuleDecl>,
}

/// A parsed declaration file.
#[derive(Debug, Clone)]
pub struct Manifest {
    /// Whether this file opens a namespace
    pub is_namespace_root: bool,

    pub interfaces: Vec<InterfaceDecl>,

    pub modules: Vec<ModuleDecl>,

    /// Path of this file
    pub path: PathBuf,
}

impl Manifest {
    /// Load a declaration file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read declarations: {}", path.display()))?;

        Self::parse(&content, path)
    }

    /// Parse declaration file content.
    pub fn parse(content: &str, path: &Path) -> Result<Self> {
        let raw: RawManifest = toml::from_str(content)
            .with_context(|| format!("failed to parse {}", path.display()))?;

        Ok(Manifest {
            is_namespace_root: raw.namespace.is_some(),
            interfaces: raw.interface,
            modules: raw.module,
            path: path.to_path_buf(),
        })
    }

    /// Directory containing this file.
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::module::ModuleKind;

    #[test]
    fn test_parse_full_declaration() {
        let m = Manifest::parse(
            r#"
[namespace]

[[interface]]
name = "foo"
srcs = ["a/IFoo.aidl"]
owner = "vendor"
stability = "vintf"
frozen = true
versions_with_info = [{ version = "1", imports = ["bar-V1"] }]
imports = ["bar-V2"]
backend = { java = { enabled = false } }
dumpapi = { no_license = true }

[[module]]
name = "client"
kind = "cc_binary"
deps = ["foo-V1-ndk"]
"#,
            Path::new("/ws/vendor/Aidl.toml"),
        )
        .unwrap();

        assert!(m.is_namespace_root);
        assert_eq!(m.dir(), Path::new("/ws/vendor"));
        let foo = &m.interfaces[0];
        assert_eq!(foo.name, "foo");
        assert_eq!(foo.frozen, Some(true));
        assert_eq!(foo.versions_with_info[0].imports, vec!["bar-V1"]);
        assert!(foo.dumpapi.no_license);
        assert_eq!(foo.backend.java.enabled, Some(false));
        assert_eq!(m.modules[0].kind, ModuleKind::CcBinary);
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let err = Manifest::parse(
            "[[interface]]\nname = \"foo\"\nversion = \"1\"\n",
            Path::new("Aidl.toml"),
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("unknown field"));
    }

    #[test]
    fn test_empty_file() {
        let m = Manifest::parse("", Path::new("Aidl.toml")).unwrap();
        assert!(!m.is_namespace_root);
        assert!(m.interfaces.is_empty());
        assert!(m.modules.is_empty());
    }
}
