//! Filesystem utilities.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use glob::glob;
use walkdir::WalkDir;

/// Recursively copy a directory, skipping entries for which `skip` returns true.
pub fn copy_dir_filtered(src: &Path, dst: &Path, skip: &dyn Fn(&Path) -> bool) -> Result<()> {
    fs::create_dir_all(dst)
        .with_context(|| format!("failed to create directory: {}", dst.display()))?;

    for entry in fs::read_dir(src)
        .with_context(|| format!("failed to read directory: {}", src.display()))?
    {
        let entry = entry?;
        let ty = entry.file_type()?;
        let src_path = entry.path();
        if skip(&src_path) {
            continue;
        }
        let dst_path = dst.join(entry.file_name());

        if ty.is_dir() {
            copy_dir_filtered(&src_path, &dst_path, skip)?;
        } else {
            fs::copy(&src_path, &dst_path).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    src_path.display(),
                    dst_path.display()
                )
            })?;
        }
    }
    Ok(())
}

/// Recursively copy a directory.
pub fn copy_dir_all(src: &Path, dst: &Path) -> Result<()> {
    copy_dir_filtered(src, dst, &|_| false)
}

/// Make `dst` an exact mirror of `src`: files are added or rewritten when their
/// contents differ, and files or directories missing from `src` are deleted.
///
/// Files for which `skip` returns true are neither copied nor deleted.
/// Returns true if anything on disk changed.
pub fn mirror_dir(src: &Path, dst: &Path, skip: &dyn Fn(&Path) -> bool) -> Result<bool> {
    let wanted = read_tree(src, skip)?;
    let existing = if dst.exists() {
        read_tree(dst, skip)?
    } else {
        BTreeMap::new()
    };

    let mut changed = false;
    ensure_dir(dst)?;

    for (rel, contents) in &wanted {
        if existing.get(rel) != Some(contents) {
            let target = dst.join(rel);
            if let Some(parent) = target.parent() {
                ensure_dir(parent)?;
            }
            fs::write(&target, contents)
                .with_context(|| format!("failed to write file: {}", target.display()))?;
            changed = true;
        }
    }

    for rel in existing.keys() {
        if !wanted.contains_key(rel) {
            let target = dst.join(rel);
            fs::remove_file(&target)
                .with_context(|| format!("failed to remove file: {}", target.display()))?;
            changed = true;
        }
    }

    // Prune directories left empty, deepest first.
    let mut dirs: Vec<PathBuf> = WalkDir::new(dst)
        .min_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect();
    dirs.sort_by_key(|d| std::cmp::Reverse(d.components().count()));
    for dir in dirs {
        let empty = fs::read_dir(&dir)
            .map(|mut it| it.next().is_none())
            .unwrap_or(false);
        if empty {
            fs::remove_dir(&dir)
                .with_context(|| format!("failed to remove directory: {}", dir.display()))?;
            changed = true;
        }
    }

    Ok(changed)
}

/// Read every file below `root` into a map of relative path to contents.
pub fn read_tree(root: &Path, skip: &dyn Fn(&Path) -> bool) -> Result<BTreeMap<PathBuf, Vec<u8>>> {
    let mut files = BTreeMap::new();
    for entry in WalkDir::new(root).min_depth(1) {
        let entry =
            entry.with_context(|| format!("failed to walk directory: {}", root.display()))?;
        if !entry.file_type().is_file() || skip(entry.path()) {
            continue;
        }
        let rel = relative_path(root, entry.path());
        let contents = fs::read(entry.path())
            .with_context(|| format!("failed to read file: {}", entry.path().display()))?;
        files.insert(rel, contents);
    }
    Ok(files)
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Read a file to string, with nice error messages.
pub fn read_to_string(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read file: {}", path.display()))
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).with_context(|| format!("failed to write file: {}", path.display()))
}

/// Find files matching glob patterns relative to a base directory.
pub fn glob_files(base: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut results = Vec::new();

    for pattern in patterns {
        let full_pattern = base.join(pattern);
        let pattern_str = full_pattern.to_string_lossy();

        for entry in
            glob(&pattern_str).with_context(|| format!("invalid glob pattern: {}", pattern))?
        {
            match entry {
                Ok(path) => {
                    if path.is_file() {
                        results.push(path);
                    }
                }
                Err(e) => {
                    tracing::warn!("glob error: {}", e);
                }
            }
        }
    }

    results.sort();
    results.dedup();
    Ok(results)
}

/// Get the relative path from `base` to `path`.
pub fn relative_path(base: &Path, path: &Path) -> PathBuf {
    pathdiff::diff_paths(path, base).unwrap_or_else(|| path.to_path_buf())
}

/// Render a relative path with forward slashes, as written into hash files.
pub fn slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_glob_files() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src/a");
        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("IFoo.aidl"), "interface IFoo {}").unwrap();
        fs::write(src.join("Bar.aidl"), "parcelable Bar {}").unwrap();
        fs::write(src.join("readme.txt"), "readme").unwrap();

        let files = glob_files(tmp.path(), &["src/**/*.aidl".to_string()]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_copy_dir_all() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");

        fs::create_dir_all(&src).unwrap();
        fs::write(src.join("file.txt"), "content").unwrap();

        copy_dir_all(&src, &dst).unwrap();

        assert!(dst.join("file.txt").exists());
        assert_eq!(fs::read_to_string(dst.join("file.txt")).unwrap(), "content");
    }

    #[test]
    fn test_mirror_dir_adds_updates_and_deletes() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(src.join("a")).unwrap();
        fs::create_dir_all(dst.join("stale")).unwrap();
        fs::write(src.join("a/IFoo.aidl"), "new").unwrap();
        fs::write(dst.join("stale/Old.aidl"), "old").unwrap();

        assert!(mirror_dir(&src, &dst, &|_| false).unwrap());
        assert_eq!(fs::read_to_string(dst.join("a/IFoo.aidl")).unwrap(), "new");
        assert!(!dst.join("stale").exists());

        // Second run is a no-op.
        assert!(!mirror_dir(&src, &dst, &|_| false).unwrap());
    }

    #[test]
    fn test_mirror_dir_respects_skip() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        fs::create_dir_all(&src).unwrap();
        fs::create_dir_all(&dst).unwrap();
        fs::write(src.join("IFoo.aidl"), "x").unwrap();
        fs::write(src.join(".hash"), "abc").unwrap();

        let skip = |p: &Path| p.file_name().is_some_and(|n| n == ".hash");
        mirror_dir(&src, &dst, &skip).unwrap();
        assert!(dst.join("IFoo.aidl").exists());
        assert!(!dst.join(".hash").exists());
    }

    #[test]
    fn test_slash_path() {
        assert_eq!(slash_path(Path::new("a/b/C.aidl")), "a/b/C.aidl");
    }
}
