use serde::{Deserialize, Serialize};
use std::fmt;

/// The category of a problem found while scanning question source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A `{` without its `}` (or the reverse). Fatal for the whole document.
    UnbalancedBraces,
    /// A `[` without its `]` (or the reverse). Fatal for the whole document.
    UnbalancedBrackets,
    /// An expected environment is absent or not closed.
    MissingEnvironment,
    /// An answer entry could not be read cleanly.
    MalformedAnswer,
    /// An identifier token or command argument has the wrong shape.
    MalformedIdentifier,
}

impl DiagnosticKind {
    /// Severity used when a diagnostic of this kind is created without an explicit one.
    pub fn default_severity(self) -> Severity {
        match self {
            DiagnosticKind::UnbalancedBraces | DiagnosticKind::UnbalancedBrackets => {
                Severity::Error
            }
            DiagnosticKind::MalformedAnswer | DiagnosticKind::MalformedIdentifier => {
                Severity::Warning
            }
            DiagnosticKind::MissingEnvironment => Severity::Information,
        }
    }

    /// Structural kinds abort the document-wide parse.
    pub fn is_structural(self) -> bool {
        matches!(
            self,
            DiagnosticKind::UnbalancedBraces | DiagnosticKind::UnbalancedBrackets
        )
    }
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DiagnosticKind::UnbalancedBraces => "unbalanced braces",
            DiagnosticKind::UnbalancedBrackets => "unbalanced brackets",
            DiagnosticKind::MissingEnvironment => "missing environment",
            DiagnosticKind::MalformedAnswer => "malformed answer",
            DiagnosticKind::MalformedIdentifier => "malformed identifier",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
    Information,
    Hint,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Information => "info",
            Severity::Hint => "hint",
        };
        f.write_str(name)
    }
}

/// A recoverable problem found in question source.
///
/// Diagnostics are accumulated rather than thrown, so one malformed question
/// does not stop the others from being extracted. `position` is a byte
/// offset into the text that was handed to the producing function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ParseDiagnostic {
    pub kind: DiagnosticKind,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
}

impl ParseDiagnostic {
    /// Creates a diagnostic with the default severity of `kind` and no position.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            severity: kind.default_severity(),
            message: message.into(),
            position: None,
        }
    }

    pub fn at(mut self, position: usize) -> Self {
        self.position = Some(position);
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Rebases the position onto an enclosing text that starts at `base`.
    pub fn offset_by(mut self, base: usize) -> Self {
        self.position = self.position.map(|p| p + base);
        self
    }

    pub fn is_fatal(&self) -> bool {
        self.kind.is_structural()
    }
}
