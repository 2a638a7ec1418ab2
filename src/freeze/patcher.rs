//! Declaration file patching.
//!
//! Freezing records new versions in the human-maintained `Aidl.toml`. Every
//! edit goes through [`ConfigPatcher`] as one batch, applied all or nothing.
//! [`TomlPatcher`] edits with `toml_edit`, so comments and layout of the rest
//! of the file survive.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use toml_edit::{value, Array, ArrayOfTables, DocumentMut, InlineTable, Item, Table, Value};

use crate::core::interface::VersionInfo;
use crate::util::fs;

/// The literal written to a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchValue {
    Bool(bool),
    /// Append an entry to a `versions_with_info`-style list.
    AppendVersion(VersionInfo),
    /// Delete the property.
    Remove,
}

impl fmt::Display for PatchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PatchValue::Bool(b) => write!(f, "{}", b),
            PatchValue::AppendVersion(info) => write!(
                f,
                "+{{ version = {:?}, imports = {:?} }}",
                info.version, info.imports
            ),
            PatchValue::Remove => write!(f, "<removed>"),
        }
    }
}

/// One edit: set `property` of interface `module` in `file`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Patch {
    pub module: String,
    pub property: String,
    pub value: PatchValue,
    pub file: PathBuf,
}

impl Patch {
    pub fn new(
        module: impl Into<String>,
        property: impl Into<String>,
        value: PatchValue,
        file: impl Into<PathBuf>,
    ) -> Self {
        Patch {
            module: module.into(),
            property: property.into(),
            value,
            file: file.into(),
        }
    }
}

impl fmt::Display for Patch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}.{} = {}",
            self.file.display(),
            self.module,
            self.property,
            self.value
        )
    }
}

pub trait ConfigPatcher {
    /// Apply every patch or none of them.
    fn apply(&self, patches: &[Patch]) -> Result<()>;
}

/// Patches `Aidl.toml` files in place.
#[derive(Debug, Clone, Copy, Default)]
pub struct TomlPatcher;

impl TomlPatcher {
    pub fn new() -> Self {
        TomlPatcher
    }

    /// Apply `patches` to the text of one document.
    pub fn patch_str(&self, content: &str, path: &Path, patches: &[&Patch]) -> Result<String> {
        let mut doc: DocumentMut = content
            .parse()
            .with_context(|| format!("failed to parse {}", path.display()))?;
        for patch in patches {
            patch_doc(&mut doc, patch).with_context(|| format!("failed to apply {}", patch))?;
        }
        Ok(doc.to_string())
    }
}

impl ConfigPatcher for TomlPatcher {
    fn apply(&self, patches: &[Patch]) -> Result<()> {
        let mut by_file: BTreeMap<&Path, Vec<&Patch>> = BTreeMap::new();
        for patch in patches {
            by_file.entry(patch.file.as_path()).or_default().push(patch);
        }

        // Nothing is written until every file patched cleanly.
        let mut rendered = Vec::with_capacity(by_file.len());
        for (file, patches) in by_file {
            let content = fs::read_to_string(file)?;
            rendered.push((file, self.patch_str(&content, file, &patches)?));
        }
        for (file, text) in rendered {
            fs::write_string(file, &text)?;
        }
        for patch in patches {
            tracing::debug!("patched {}", patch);
        }
        Ok(())
    }
}

fn patch_doc(doc: &mut DocumentMut, patch: &Patch) -> Result<()> {
    let table = find_interface(doc, &patch.module)?;
    match &patch.value {
        PatchValue::Bool(b) => {
            table[patch.property.as_str()] = value(*b);
        }
        PatchValue::Remove => {
            table.remove(&patch.property);
        }
        PatchValue::AppendVersion(info) => append_version(table, &patch.property, info)?,
    }
    Ok(())
}

fn find_interface<'d>(doc: &'d mut DocumentMut, name: &str) -> Result<&'d mut Table> {
    let interfaces = doc
        .get_mut("interface")
        .and_then(Item::as_array_of_tables_mut)
        .ok_or_else(|| anyhow!("no [[interface]] tables"))?;

    interfaces
        .iter_mut()
        .find(|t| t.get("name").and_then(Item::as_str) == Some(name))
        .ok_or_else(|| anyhow!("interface `{}` is not declared here", name))
}

fn version_entry(info: &VersionInfo) -> InlineTable {
    let mut entry = InlineTable::new();
    entry.insert("version", info.version.clone().into());
    let imports: Array = info.imports.iter().map(String::as_str).collect();
    entry.insert("imports", Value::Array(imports));
    entry
}

fn append_version(table: &mut Table, property: &str, info: &VersionInfo) -> Result<()> {
    match table.get_mut(property) {
        None => {
            let mut list = Array::new();
            list.push(version_entry(info));
            table.insert(property, value(list));
        }
        Some(Item::Value(Value::Array(list))) => {
            list.push(version_entry(info));
        }
        Some(Item::ArrayOfTables(list)) => {
            list.push(version_entry(info).into_table());
        }
        Some(Item::None) => {
            let mut list = ArrayOfTables::new();
            list.push(version_entry(info).into_table());
            table.insert(property, Item::ArrayOfTables(list));
        }
        Some(_) => bail!("`{}` is not a list", property),
    }
    Ok(())
}
