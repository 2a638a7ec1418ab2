//! User-friendly diagnostic messages.
//!
//! Every violation reported by aidlgate is attributed: the module it was found
//! in, the property at fault, and what the developer can do about it.

use std::fmt;
use std::path::PathBuf;

/// Common suggestion messages for consistent error handling.
pub mod suggestions {
    /// Suggestion when no declaration file is found.
    pub const NO_DECLARATIONS: &str =
        "Create an `Aidl.toml` with at least one [[interface]] table";

    /// Suggestion when tip differs from a frozen interface.
    pub const FREEZE_API: &str =
        "Run `aidlgate freeze-api <name>` to publish a new version";

    /// Suggestion when a frozen dump was edited by hand.
    pub const RESTORE_DUMP: &str =
        "Restore the dump from version control; frozen versions must never change";

    /// Suggestion when the IDL compiler cannot be found.
    pub const NO_COMPILER: &str =
        "Put `aidl` on PATH or set [compiler] path in .aidlgate/config.toml";
}

/// An error message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Offending module (interface or consumer)
    pub subject: Option<String>,
    /// Offending property of the subject
    pub property: Option<String>,
    /// Additional context lines
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
    /// Related location (file path)
    pub location: Option<PathBuf>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            subject: None,
            property: None,
            context: Vec::new(),
            suggestions: Vec::new(),
            location: None,
        }
    }

    /// Attribute the diagnostic to a module.
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    /// Attribute the diagnostic to a property of the module.
    pub fn with_property(mut self, property: impl Into<String>) -> Self {
        self.property = Some(property.into());
        self
    }

    /// Add context to the diagnostic.
    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Add a suggestion for fixing the issue.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestions.push(suggestion.into());
        self
    }

    /// Add a file location.
    pub fn with_location(mut self, path: impl Into<PathBuf>) -> Self {
        self.location = Some(path.into());
        self
    }

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let mut output = String::new();

        let label = if color { "\x1b[1;31merror\x1b[0m" } else { "error" };

        let attribution = match (&self.subject, &self.property) {
            (Some(subject), Some(property)) => format!("{} [{}]: ", subject, property),
            (Some(subject), None) => format!("{}: ", subject),
            _ => String::new(),
        };
        output.push_str(&format!("{}: {}{}\n", label, attribution, self.message));

        if let Some(ref path) = self.location {
            output.push_str(&format!("  --> {}\n", path.display()));
        }

        for ctx in &self.context {
            output.push_str(&format!("  → {}\n", ctx));
        }

        if !self.suggestions.is_empty() {
            output.push('\n');
            let help_prefix = if color {
                "\x1b[1;32mhelp\x1b[0m"
            } else {
                "help"
            };
            output.push_str(&format!("{}: consider:\n", help_prefix));
            for (i, suggestion) in self.suggestions.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", i + 1, suggestion));
            }
        }

        output
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format(false))
    }
}

/// Print a diagnostic to stderr.
pub fn emit(diagnostic: &Diagnostic, color: bool) {
    eprint!("{}", diagnostic.format(color));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("foo-V2-java is an unfrozen development version")
            .with_subject("client")
            .with_property("deps")
            .with_context("foo is at versions [1]")
            .with_suggestion("Depend on foo-V1-java")
            .with_suggestion(suggestions::FREEZE_API);

        let output = diag.format(false);
        assert!(output.starts_with("error: client [deps]: foo-V2-java"));
        assert!(output.contains("foo is at versions [1]"));
        assert!(output.contains("consider:"));
        assert!(output.contains("1. Depend on foo-V1-java"));
    }

    #[test]
    fn test_unattributed_error() {
        let diag = Diagnostic::error("no compiler found");
        assert_eq!(diag.format(false), "error: no compiler found\n");
        assert_eq!(diag.to_string(), diag.format(false));
    }

    #[test]
    fn test_colored_labels() {
        let diag = Diagnostic::error("no compiler found").with_suggestion(suggestions::NO_COMPILER);
        let output = diag.format(true);
        assert!(output.starts_with("\x1b[1;31merror\x1b[0m: no compiler found\n"));
        assert!(output.contains("\x1b[1;32mhelp\x1b[0m: consider:"));
    }
}
