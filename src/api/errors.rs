//! Errors raised while checking API dumps.

use std::path::PathBuf;

use thiserror::Error;

use crate::util::diagnostic::{suggestions, Diagnostic};

/// A stored hash that does not match its dump.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("hash file {} of {interface}-V{version} is malformed at line {line}", path.display())]
    MalformedHashFile {
        interface: String,
        version: String,
        path: PathBuf,
        line: usize,
    },

    #[error("{interface}-V{version} has been modified: its content hashes to {actual}, but .hash says {expected}")]
    HashMismatch {
        interface: String,
        version: String,
        expected: String,
        actual: String,
    },

    #[error("hash chain of {interface}-V{version} does not extend the chain of {interface}-V{previous}")]
    BrokenChain {
        interface: String,
        version: String,
        previous: String,
    },

    #[error("could not hash {interface}-V{version}: {reason}")]
    Unreadable {
        interface: String,
        version: String,
        reason: String,
    },
}

impl IntegrityError {
    pub fn interface(&self) -> &str {
        match self {
            IntegrityError::MalformedHashFile { interface, .. }
            | IntegrityError::HashMismatch { interface, .. }
            | IntegrityError::BrokenChain { interface, .. }
            | IntegrityError::Unreadable { interface, .. } => interface,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string())
            .with_subject(self.interface())
            .with_property("versions");
        match self {
            IntegrityError::HashMismatch { .. } | IntegrityError::BrokenChain { .. } => diag
                .with_context("frozen dumps must never change after they are created")
                .with_suggestion(suggestions::RESTORE_DUMP)
                .with_suggestion(
                    "If you meant to change the API, revert the frozen dump and change the tip instead",
                ),
            _ => diag,
        }
    }
}

/// A failed equality or compatibility check between two dumps.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiCheckError {
    #[error("API dump for the current version of AIDL interface {interface} does not exist.")]
    MissingCurrentDump { interface: String },

    #[error("API dump of the current version of {interface} differs from its sources")]
    CurrentOutOfDate {
        interface: String,
        frozen: bool,
        detail: String,
    },

    #[error("{interface}-V{new} is not backward compatible with {interface}-V{old}")]
    Incompatible {
        interface: String,
        old: String,
        new: String,
        detail: String,
    },
}

impl ApiCheckError {
    pub fn interface(&self) -> &str {
        match self {
            ApiCheckError::MissingCurrentDump { interface }
            | ApiCheckError::CurrentOutOfDate { interface, .. }
            | ApiCheckError::Incompatible { interface, .. } => interface,
        }
    }

    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string()).with_subject(self.interface());
        match self {
            ApiCheckError::MissingCurrentDump { interface } => diag
                .with_suggestion(format!(
                    "Run the command \"aidlgate update-api {}\" or add \"unstable = true\" to the interface if it does not need to be versioned",
                    interface
                )),
            ApiCheckError::CurrentOutOfDate {
                interface,
                frozen,
                detail,
            } => {
                let diag = with_detail(diag, detail);
                if *frozen {
                    diag.with_context(format!("{} is `frozen = true`", interface))
                        .with_suggestion(format!(
                            "Set `frozen = false` and run \"aidlgate update-api {}\"",
                            interface
                        ))
                } else {
                    diag.with_suggestion(format!(
                        "Run `aidlgate update-api {}` to refresh `current`",
                        interface
                    ))
                }
            }
            ApiCheckError::Incompatible { detail, .. } => with_detail(diag, detail)
                .with_context(
                    "changes such as removing a method or a field, or changing an argument, break compatibility",
                )
                .with_suggestion("Add new methods or fields instead of changing existing ones"),
        }
    }
}

fn with_detail(diag: Diagnostic, detail: &str) -> Diagnostic {
    detail
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .fold(diag, |d, line| d.with_context(line.to_string()))
}
