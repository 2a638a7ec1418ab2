//! Consumer validation.
//!
//! Runs once the registry is fully resolved. Every consumer module is
//! checked for two rules, and all violations are reported together:
//! - a module sees at most one version of each interface per backend;
//! - outside exempt (test-only) kinds, no module uses a development version
//!   of an interface that is required to be frozen.

mod consumers;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

pub use consumers::validate_consumers;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConsumerViolation {
    #[error("depends on multiple versions of the same aidl_interface: {}", violators.join(", "))]
    MultipleVersions {
        module: String,
        /// Generation actions of the clashing versions, sorted
        violators: Vec<String>,
        /// One rendered dependency path per violator
        paths: Vec<String>,
    },

    #[error("{binding} is an unfrozen development version, and it can't be used because {reason:?}")]
    UsingUnfrozen {
        module: String,
        binding: String,
        reason: String,
    },

    #[error("dependency cycle through `{module}`")]
    DependencyCycle { module: String },
}

impl ConsumerViolation {
    pub fn module(&self) -> &str {
        match self {
            ConsumerViolation::MultipleVersions { module, .. }
            | ConsumerViolation::UsingUnfrozen { module, .. }
            | ConsumerViolation::DependencyCycle { module } => module,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string())
            .with_subject(self.module())
            .with_property("deps");
        match self {
            ConsumerViolation::MultipleVersions { paths, .. } => paths
                .iter()
                .fold(diag, |d, p| d.with_context(format!("Dependency path: {}", p)))
                .with_suggestion("Depend on a single version of each interface"),
            ConsumerViolation::UsingUnfrozen { .. } => diag
                .with_suggestion("Depend on a frozen version instead")
                .with_suggestion(suggestions::FREEZE_API),
            ConsumerViolation::DependencyCycle { .. } => diag,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let multi = ConsumerViolation::MultipleVersions {
            module: "client".to_string(),
            violators: vec!["foo-V1-ndk-source".to_string(), "foo-V2-ndk-source".to_string()],
            paths: vec!["client -> foo-V1-ndk".to_string()],
        };
        assert_eq!(
            multi.to_string(),
            "depends on multiple versions of the same aidl_interface: foo-V1-ndk-source, foo-V2-ndk-source"
        );
        let output = multi.to_diagnostic().format(false);
        assert!(output.starts_with("error: client [deps]: depends on multiple versions"));
        assert!(output.contains("Dependency path: client -> foo-V1-ndk"));

        let unfrozen = ConsumerViolation::UsingUnfrozen {
            module: "client".to_string(),
            binding: "foo-V2-java".to_string(),
            reason: "it's explicitly marked as `frozen: true`".to_string(),
        };
        assert_eq!(
            unfrozen.to_string(),
            "foo-V2-java is an unfrozen development version, and it can't be used because \"it's explicitly marked as `frozen: true`\""
        );
    }
}
