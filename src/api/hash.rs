//! Chained content hashes of API dumps.
//!
//! A `.hash` file holds one hex SHA-256 link per line; line `k` is the link
//! of the `k`-th frozen version. A link covers the dump's own files, a
//! version marker and the previous link, so editing any earlier version
//! breaks every later one.

use std::path::Path;

use anyhow::{Context, Result};

use crate::api::errors::IntegrityError;
use crate::core::interface::HASH_FILE;
use crate::core::version::{parse_version, FIRST_VERSION_MARKER};
use crate::util::fs::{read_tree, slash_path};
use crate::util::hash::{sha256_bytes, sha256_str};

/// Marker hashed into a version's link: the previous version number, or
/// `latest-version` for version 1 and the never-frozen tip.
pub fn version_marker(version: &str) -> String {
    match parse_version(version).ok().and_then(|v| v.number()) {
        Some(n) if n > 1 => (n - 1).to_string(),
        _ => FIRST_VERSION_MARKER.to_string(),
    }
}

fn is_dump_file(path: &Path) -> bool {
    path.extension().is_some_and(|e| e == "aidl")
}

/// Sorted `<sha256>  ./<path>` lines for every `.aidl` file under `dir`.
pub fn content_lines(dir: &Path) -> Result<String> {
    let tree = read_tree(dir, &|p| !is_dump_file(p))?;
    let mut out = String::new();
    for (rel, bytes) in &tree {
        out.push_str(&sha256_bytes(bytes));
        out.push_str("  ./");
        out.push_str(&slash_path(rel));
        out.push('\n');
    }
    Ok(out)
}

/// Link for the dump in `dir` frozen as `version`.
pub fn compute_link(dir: &Path, version: &str, previous: Option<&str>) -> Result<String> {
    let mut input = content_lines(dir)
        .with_context(|| format!("failed to hash dump: {}", dir.display()))?;
    input.push_str(&version_marker(version));
    input.push('\n');
    if let Some(previous) = previous {
        input.push_str(previous);
        input.push('\n');
    }
    Ok(sha256_str(&input))
}

/// The ordered links stored in a `.hash` file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HashChain {
    links: Vec<String>,
}

impl HashChain {
    pub fn new(links: Vec<String>) -> Self {
        HashChain { links }
    }

    /// Parse `.hash` content; returns the 1-based line number of the first
    /// line that is not a hex SHA-256.
    pub fn parse(text: &str) -> std::result::Result<HashChain, usize> {
        let mut links = Vec::new();
        for (idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if line.len() != 64 || !line.bytes().all(|b| b.is_ascii_hexdigit()) {
                return Err(idx + 1);
            }
            links.push(line.to_ascii_lowercase());
        }
        if links.is_empty() {
            return Err(1);
        }
        Ok(HashChain { links })
    }

    /// Read `<dir>/.hash`, `None` when the file does not exist.
    pub fn read(
        dir: &Path,
        interface: &str,
        version: &str,
    ) -> std::result::Result<Option<HashChain>, IntegrityError> {
        let path = dir.join(HASH_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(|e| IntegrityError::Unreadable {
            interface: interface.to_string(),
            version: version.to_string(),
            reason: e.to_string(),
        })?;
        HashChain::parse(&text)
            .map(Some)
            .map_err(|line| IntegrityError::MalformedHashFile {
                interface: interface.to_string(),
                version: version.to_string(),
                path,
                line,
            })
    }

    pub fn links(&self) -> &[String] {
        &self.links
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// The link of the version this chain belongs to.
    pub fn last(&self) -> Option<&str> {
        self.links.last().map(String::as_str)
    }

    /// Links of the versions before this one.
    pub fn prefix(&self) -> &[String] {
        match self.links.split_last() {
            Some((_, prefix)) => prefix,
            None => &[],
        }
    }

    /// This chain with `link` appended.
    pub fn extended(&self, link: String) -> HashChain {
        let mut links = self.links.clone();
        links.push(link);
        HashChain { links }
    }

    pub fn to_text(&self) -> String {
        let mut out = self.links.join("\n");
        out.push('\n');
        out
    }

    /// Write to `<dir>/.hash`.
    pub fn write(&self, dir: &Path) -> Result<()> {
        let path = dir.join(HASH_FILE);
        std::fs::write(&path, self.to_text())
            .with_context(|| format!("failed to write {}", path.display()))
    }
}

/// Verify the dump in `dir` against its stored chain.
///
/// The last link must match the content, hashed onto the stored previous
/// link; when the previous version's chain is known, the stored prefix must
/// equal it.
pub fn verify(
    dir: &Path,
    interface: &str,
    version: &str,
    stored: &HashChain,
    previous: Option<(&str, &HashChain)>,
) -> std::result::Result<(), IntegrityError> {
    let Some(expected) = stored.last() else {
        return Err(IntegrityError::MalformedHashFile {
            interface: interface.to_string(),
            version: version.to_string(),
            path: dir.join(HASH_FILE),
            line: 1,
        });
    };

    let previous_link = stored.prefix().last().map(String::as_str);
    let actual =
        compute_link(dir, version, previous_link).map_err(|e| IntegrityError::Unreadable {
            interface: interface.to_string(),
            version: version.to_string(),
            reason: format!("{:#}", e),
        })?;

    if actual != expected {
        return Err(IntegrityError::HashMismatch {
            interface: interface.to_string(),
            version: version.to_string(),
            expected: expected.to_string(),
            actual,
        });
    }

    if let Some((previous_version, previous_chain)) = previous {
        if stored.prefix() != previous_chain.links() {
            return Err(IntegrityError::BrokenChain {
                interface: interface.to_string(),
                version: version.to_string(),
                previous: previous_version.to_string(),
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn dump(files: &[(&str, &str)]) -> TempDir {
        let tmp = TempDir::new().unwrap();
        for (rel, content) in files {
            let path = tmp.path().join(rel);
            std::fs::create_dir_all(path.parent().unwrap()).unwrap();
            std::fs::write(path, content).unwrap();
        }
        tmp
    }

    #[test]
    fn test_version_marker() {
        assert_eq!(version_marker("1"), "latest-version");
        assert_eq!(version_marker("2"), "1");
        assert_eq!(version_marker("10"), "9");
    }

    #[test]
    fn test_content_lines_are_sorted_and_filtered() {
        let d = dump(&[
            ("b/IB.aidl", "interface IB {}"),
            ("a/IA.aidl", "interface IA {}"),
            ("notes.txt", "ignored"),
            (".hash", "ignored"),
        ]);
        let lines = content_lines(d.path()).unwrap();
        let paths: Vec<&str> = lines
            .lines()
            .map(|l| l.split("  ").nth(1).unwrap())
            .collect();
        assert_eq!(paths, vec!["./a/IA.aidl", "./b/IB.aidl"]);
    }

    #[test]
    fn test_link_depends_on_previous() {
        let d = dump(&[("IFoo.aidl", "interface IFoo {}")]);
        let first = compute_link(d.path(), "1", None).unwrap();
        let second = compute_link(d.path(), "2", Some(&first)).unwrap();
        let unchained = compute_link(d.path(), "2", None).unwrap();
        assert_ne!(second, unchained);
        assert_eq!(first, compute_link(d.path(), "1", None).unwrap());
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let good = "a".repeat(64);
        assert_eq!(HashChain::parse(&format!("{}\n", good)).unwrap().len(), 1);
        assert_eq!(HashChain::parse(&format!("{}\nnope\n", good)), Err(2));
        assert_eq!(HashChain::parse(""), Err(1));
    }

    #[test]
    fn test_verify_detects_edits_and_broken_chains() {
        let v1 = dump(&[("IFoo.aidl", "interface IFoo { void a(); }")]);
        let chain1 = HashChain::default().extended(compute_link(v1.path(), "1", None).unwrap());
        chain1.write(v1.path()).unwrap();

        let v2 = dump(&[("IFoo.aidl", "interface IFoo { void a(); void b(); }")]);
        let link2 = compute_link(v2.path(), "2", chain1.last()).unwrap();
        let chain2 = chain1.extended(link2);
        chain2.write(v2.path()).unwrap();

        let stored1 = HashChain::read(v1.path(), "foo", "1").unwrap().unwrap();
        let stored2 = HashChain::read(v2.path(), "foo", "2").unwrap().unwrap();
        assert!(verify(v1.path(), "foo", "1", &stored1, None).is_ok());
        assert!(verify(v2.path(), "foo", "2", &stored2, Some(("1", &stored1))).is_ok());

        std::fs::write(v1.path().join("IFoo.aidl"), "interface IFoo { void z(); }").unwrap();
        assert!(matches!(
            verify(v1.path(), "foo", "1", &stored1, None),
            Err(IntegrityError::HashMismatch { .. })
        ));

        let forged = HashChain::new(vec!["0".repeat(64)]);
        assert!(matches!(
            verify(v2.path(), "foo", "2", &stored2, Some(("1", &forged))),
            Err(IntegrityError::BrokenChain { .. })
        ));
    }

    #[test]
    fn test_read_missing_hash() {
        let d = dump(&[("IFoo.aidl", "")]);
        assert_eq!(HashChain::read(d.path(), "foo", "1").unwrap(), None);
    }
}
