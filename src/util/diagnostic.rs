//! Rendering of fatal errors for the terminal.
//!
//! An `anyhow` chain becomes one `error:` line for the outermost message,
//! one `caused by:` line per underlying cause, and the `help` text of any
//! [`PortError`] found in the chain.

use std::fmt;

use miette::Diagnostic as MietteDiagnostic;

use crate::core::port_error;

/// A fatal error message with optional suggestions.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    /// Primary message
    pub message: String,
    /// Underlying causes, outermost first
    pub context: Vec<String>,
    /// Suggested fixes
    pub suggestions: Vec<String>,
}

impl Diagnostic {
    /// Create a new error diagnostic.
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            message: message.into(),
            context: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    /// Build a diagnostic from an error chain.
    pub fn from_error(err: &anyhow::Error) -> Self {
        let mut chain = err.chain();
        let message = chain
            .next()
            .map(|e| e.to_string())
            .unwrap_or_else(|| err.to_string());

        let mut diag = Diagnostic::error(message);
        for cause in chain {
            diag = diag.with_context(cause.to_string());
        }

        if let Some(help) = port_error(err).and_then(|e| e.help()) {
            diag = diag.with_suggestion(help.to_string());
        }
        diag
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

    /// Format the diagnostic for terminal output.
    pub fn format(&self, color: bool) -> String {
        let label = if color { "\x1b[1;31merror\x1b[0m" } else { "error" };
        let mut output = format!("{}: {}\n", label, self.message);

        for ctx in &self.context {
            output.push_str(&format!("  caused by: {}\n", ctx));
        }

        let help = if color { "\x1b[1;32mhelp\x1b[0m" } else { "help" };
        for suggestion in &self.suggestions {
            output.push_str(&format!("{}: {}\n", help, suggestion));
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
    use crate::core::PortError;
    use anyhow::Context;

    #[test]
    fn test_diagnostic_formatting() {
        let diag = Diagnostic::error("failed to build foo-1.2-1")
            .with_context("build script failed with exit code 2")
            .with_suggestion("Rerun with --verbose");

        let output = diag.format(false);
        assert!(output.starts_with("error: failed to build foo-1.2-1\n"));
        assert!(output.contains("  caused by: build script failed"));
        assert!(output.contains("help: Rerun with --verbose"));
    }

    #[test]
    fn test_from_error_carries_help() {
        let err: anyhow::Error = Err::<(), _>(PortError::OptionalToolDeclined {
            tool: "patch".into(),
            package: "patch".into(),
            installer: "installoptionalpackage".into(),
        })
        .context("failed to patch foo-1.2-1")
        .unwrap_err();

        let diag = Diagnostic::from_error(&err);
        assert_eq!(diag.message, "failed to patch foo-1.2-1");
        assert_eq!(diag.context, vec!["required tool `patch` is not installed"]);
        assert!(diag.suggestions[0].contains("installoptionalpackage patch"));
    }
}
