//! Version algebra.
//!
//! Versions are positive integer strings. The empty string names the tip of
//! tree (the mutable, not yet numbered version) and `latest` is an alias that
//! only means something once resolved against a particular interface.

use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// Alias for the highest frozen version (or tip when nothing is frozen).
pub const LATEST: &str = "latest";

/// Marker hashed into the first version's link of a hash chain.
pub const FIRST_VERSION_MARKER: &str = "latest-version";

static VERSION_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.+)-V(\d+)$").expect("version suffix pattern is valid"));

/// Errors from parsing or validating version strings.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VersionError {
    #[error("{0:?} is not an integer")]
    NotAnInteger(String),

    #[error("should be > 0, but is {0}")]
    NotPositive(String),

    #[error("duplicate found: {0}")]
    DuplicateVersion(String),

    #[error("should be sorted, but is {0:?}")]
    UnsortedVersions(Vec<String>),

    #[error("{0} is the highest representable version, so nothing can be frozen after it")]
    InvalidVersion(String),
}

/// A parsed version identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Version {
    /// A frozen, immutable version.
    Frozen(u32),
    /// The tip of tree.
    Tip,
    /// Alias that must be resolved in context before it can be ordered.
    Latest,
}

impl Version {
    /// The version number, if this is a frozen version.
    pub fn number(&self) -> Option<u32> {
        match self {
            Version::Frozen(n) => Some(*n),
            _ => None,
        }
    }
}

impl PartialOrd for Version {
    /// Frozen versions order numerically and sit below the tip. `latest`
    /// is unordered against everything but itself.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Version::Frozen(a), Version::Frozen(b)) => Some(a.cmp(b)),
            (Version::Frozen(_), Version::Tip) => Some(Ordering::Less),
            (Version::Tip, Version::Frozen(_)) => Some(Ordering::Greater),
            (Version::Tip, Version::Tip) | (Version::Latest, Version::Latest) => {
                Some(Ordering::Equal)
            }
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Version::Frozen(n) => write!(f, "{}", n),
            Version::Tip => write!(f, ""),
            Version::Latest => write!(f, "{}", LATEST),
        }
    }
}

/// Parse a version string.
pub fn parse_version(s: &str) -> Result<Version, VersionError> {
    match s {
        "" => Ok(Version::Tip),
        LATEST => Ok(Version::Latest),
        _ => {
            let n: i64 = s
                .parse()
                .map_err(|_| VersionError::NotAnInteger(s.to_string()))?;
            if n <= 0 {
                return Err(VersionError::NotPositive(s.to_string()));
            }
            u32::try_from(n)
                .map(Version::Frozen)
                .map_err(|_| VersionError::NotAnInteger(s.to_string()))
        }
    }
}

/// Validate a declared version list.
///
/// Every entry must be a positive integer, appear once, and the list must be
/// ascending with room for a next version. All problems are reported, except that the ordering check only
/// runs once every entry is individually valid.
pub fn validate_versions(versions: &[String]) -> Result<Vec<u32>, Vec<VersionError>> {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut numbers = Vec::with_capacity(versions.len());

    for ver in versions {
        if !seen.insert(ver.as_str()) {
            errors.push(VersionError::DuplicateVersion(ver.clone()));
            continue;
        }
        match parse_version(ver) {
            Ok(Version::Frozen(n)) => numbers.push(n),
            Ok(_) => errors.push(VersionError::NotAnInteger(ver.clone())),
            Err(e) => errors.push(e),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }
    if numbers.windows(2).any(|w| w[0] > w[1]) {
        return Err(vec![VersionError::UnsortedVersions(versions.to_vec())]);
    }
    next_version(versions).map_err(|e| vec![e])?;
    Ok(numbers)
}

/// The version a freeze would create: `"1"` for an empty list, else max + 1.
pub fn next_version(versions: &[String]) -> Result<String, VersionError> {
    let max = versions
        .iter()
        .filter_map(|v| parse_version(v).ok().and_then(|v| v.number()))
        .max();
    match max {
        Some(n) => n
            .checked_add(1)
            .map(|next| next.to_string())
            .ok_or_else(|| VersionError::InvalidVersion(n.to_string())),
        None => Ok("1".to_string()),
    }
}

/// `<base>-V<version>`, or just `<base>` for the unversioned tip.
pub fn versioned_name(base: &str, version: &str) -> String {
    if version.is_empty() {
        base.to_string()
    } else {
        format!("{}-V{}", base, version)
    }
}

/// `<base>[-V<version>]-<backend>`.
pub fn versioned_module_name(base: &str, version: &str, backend: &str) -> String {
    format!("{}-{}", versioned_name(base, version), backend)
}

/// Whether a module name ends in `-V<digits>`.
pub fn has_version_suffix(name: &str) -> bool {
    VERSION_SUFFIX.is_match(name)
}

/// Split `foo-V3` into `("foo", "3")`; names without a suffix get `""`.
pub fn parse_module_with_version(name: &str) -> (String, String) {
    match VERSION_SUFFIX.captures(name) {
        Some(caps) => (caps[1].to_string(), caps[2].to_string()),
        None => (name.to_string(), String::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_next_version() {
        assert_eq!(next_version(&[]), Ok("1".to_string()));
        assert_eq!(next_version(&strs(&["1"])), Ok("2".to_string()));
        assert_eq!(next_version(&strs(&["1", "2", "7"])), Ok("8".to_string()));
    }

    #[test]
    fn test_next_version_overflow() {
        let max = u32::MAX.to_string();
        assert_eq!(
            next_version(&strs(&["1", &max])),
            Err(VersionError::InvalidVersion(max.clone()))
        );
        assert_eq!(
            validate_versions(&strs(&["1", &max])),
            Err(vec![VersionError::InvalidVersion(max)])
        );
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("3"), Ok(Version::Frozen(3)));
        assert_eq!(parse_version(""), Ok(Version::Tip));
        assert_eq!(parse_version("latest"), Ok(Version::Latest));
        assert_eq!(
            parse_version("abc"),
            Err(VersionError::NotAnInteger("abc".to_string()))
        );
        assert_eq!(
            parse_version("0"),
            Err(VersionError::NotPositive("0".to_string()))
        );
    }

    #[test]
    fn test_version_ordering() {
        assert!(Version::Frozen(1) < Version::Frozen(2));
        assert!(Version::Frozen(9) < Version::Tip);
        assert_eq!(Version::Latest.partial_cmp(&Version::Frozen(1)), None);
    }

    #[test]
    fn test_validate_versions() {
        assert_eq!(validate_versions(&strs(&["1", "2", "4"])), Ok(vec![1, 2, 4]));

        let errs = validate_versions(&strs(&["1", "1", "x", "-2"])).unwrap_err();
        assert_eq!(
            errs,
            vec![
                VersionError::DuplicateVersion("1".to_string()),
                VersionError::NotAnInteger("x".to_string()),
                VersionError::NotPositive("-2".to_string()),
            ]
        );

        let errs = validate_versions(&strs(&["2", "1"])).unwrap_err();
        assert!(matches!(errs[0], VersionError::UnsortedVersions(_)));
    }

    #[test]
    fn test_versioned_names() {
        assert_eq!(versioned_name("foo", ""), "foo");
        assert_eq!(versioned_name("foo", "1"), "foo-V1");
        assert_eq!(versioned_module_name("foo", "2", "java"), "foo-V2-java");
        assert_eq!(versioned_module_name("foo", "", "cpp"), "foo-cpp");
    }

    #[test]
    fn test_version_suffix() {
        assert!(has_version_suffix("foo-V1"));
        assert!(has_version_suffix("a.b-V12"));
        assert!(!has_version_suffix("foo"));
        assert!(!has_version_suffix("foo-V"));
        assert!(!has_version_suffix("foo-Vx"));

        assert_eq!(
            parse_module_with_version("foo-bar-V3"),
            ("foo-bar".to_string(), "3".to_string())
        );
        assert_eq!(
            parse_module_with_version("foo"),
            ("foo".to_string(), String::new())
        );
    }
}
