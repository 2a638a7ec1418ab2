//! Implementation of `aidlgate metadata`.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::api::dump;
use crate::api::hash::HashChain;
use crate::api::IdlCompiler;
use crate::core::interface::Interface;
use crate::freeze::development::{has_development, has_development_on_disk};
use crate::ops::load::Project;
use crate::util::fs::write_string;

/// One entry of the metadata export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterfaceMetadata {
    pub name: String,
    pub stability: String,
    pub types: Vec<String>,
    /// Last link of each frozen version's `.hash`
    pub hashes: Vec<String>,
    pub has_development: bool,
    pub use_unfrozen: bool,
    pub versions: Vec<String>,
}

fn hashes(iface: &Interface) -> Result<Vec<String>> {
    let mut hashes = Vec::new();
    for version in iface.version_list() {
        let chain = HashChain::read(&iface.version_dir(&version), iface.name(), &version)?;
        if let Some(last) = chain.as_ref().and_then(HashChain::last) {
            hashes.push(last.to_string());
        }
    }
    Ok(hashes)
}

fn development(
    project: &Project,
    compiler: Option<&dyn IdlCompiler>,
    iface: &Interface,
) -> Result<bool> {
    if iface.unstable {
        return Ok(false);
    }
    let registry = &project.registry;
    match compiler {
        Some(compiler) => {
            let out_dir = project
                .workspace
                .interface_out_dir(iface.namespace(), iface.name())
                .join("dump");
            let tot = dump::dump_from_source(registry, compiler, iface, &out_dir)?;
            has_development(registry, compiler, iface, &tot)
        }
        None => has_development_on_disk(registry, iface),
    }
}

/// Metadata of every interface, sorted by name.
pub fn metadata(
    project: &Project,
    compiler: Option<&dyn IdlCompiler>,
) -> Result<Vec<InterfaceMetadata>> {
    if compiler.is_none() {
        tracing::warn!(
            "no IDL compiler available; has_development compares `current` with the latest frozen dump"
        );
    }

    let policy = project.registry.policy();
    let mut entries = Vec::new();
    for iface in project.registry.interfaces() {
        entries.push(InterfaceMetadata {
            name: iface.key.to_string(),
            stability: iface.stability.clone().unwrap_or_default(),
            types: iface.types(),
            hashes: hashes(iface)?,
            has_development: development(project, compiler, iface)?,
            use_unfrozen: iface.use_unfrozen(policy),
            versions: iface.version_list(),
        });
    }
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(entries)
}

/// Render `entries` as JSON, into `out` or as a string.
pub fn write_metadata(entries: &[InterfaceMetadata], out: Option<&Path>) -> Result<String> {
    let json = serde_json::to_string_pretty(entries).context("failed to serialize metadata")?;
    if let Some(path) = out {
        write_string(path, &format!("{}\n", json))?;
    }
    Ok(json)
}
