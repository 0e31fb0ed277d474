//! Diagnostics
//!
//! Collects problems found while loading, linking, and validating profiles.
//! Call sites append to an [`ErrorCollector`] and keep going with a
//! best-effort value; [`ErrorCollector::throw_if_non_empty`] is the single
//! checkpoint that turns the accumulated list into a hard failure.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Result, SchemaError};
use crate::location::Location;

// =============================================================================
// Diagnostic Codes
// =============================================================================

/// Diagnostic code for categorizing issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // === Resolution ===
    /// Import not found on any proto path root
    PathNotFound,
    /// Import resolved by more than one root
    AmbiguousImport,
    /// File path disagrees with its package-derived import path
    ImportPathMismatch,
    /// File could not be parsed
    ParseFailure,
    /// Source path is empty
    NoSources,

    // === Linking ===
    /// Referenced type is not declared anywhere in the schema
    UnresolvedType,
    /// Referenced type is declared in a file that is not imported
    MissingImport,
    /// Two declarations share one qualified name
    DuplicateType,
    /// Packages import each other
    PackageCycle,

    // === Profiles ===
    /// Profile overrides a type without importing its declaring file
    MissingProfileImport,
    /// Profile override is incomplete
    InvalidProfileOverride,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PathNotFound => "E001",
            Self::AmbiguousImport => "E002",
            Self::ImportPathMismatch => "E003",
            Self::ParseFailure => "E004",
            Self::NoSources => "E005",
            Self::UnresolvedType => "E101",
            Self::MissingImport => "E102",
            Self::DuplicateType => "E103",
            Self::PackageCycle => "E104",
            Self::MissingProfileImport => "E201",
            Self::InvalidProfileOverride => "E202",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Diagnostic
// =============================================================================

/// A single diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    /// File the problem was found in, when there is one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Location>,
    /// Additional lines (candidate paths, cycle members)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub context: Vec<String>,
}

impl Diagnostic {
    pub fn new(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            location: None,
            context: Vec::new(),
        }
    }

    pub fn at(mut self, location: &Location) -> Self {
        self.location = Some(location.clone());
        self
    }

    pub fn with_context(mut self, ctx: impl Into<String>) -> Self {
        self.context.push(ctx.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        for ctx in &self.context {
            write!(f, "\n    {}", ctx)?;
        }
        Ok(())
    }
}

// =============================================================================
// Diagnostics Collection
// =============================================================================

/// Ordered list of diagnostics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: Diagnostic) {
        self.items.push(item);
    }

    pub fn all(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Diagnostics carrying `code`
    pub fn with_code(&self, code: DiagnosticCode) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(move |item| item.code == code)
    }

    /// Format all diagnostics for display
    pub fn format_all(&self) -> String {
        let mut output = String::new();
        for item in &self.items {
            output.push_str(&format!("{}\n", item));
        }
        output.push_str(&format!("\n{} error(s)\n", self.items.len()));
        output
    }
}

impl fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_all())
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

// =============================================================================
// Error Collector
// =============================================================================

/// Append-only accumulator shared by every phase of one run
#[derive(Debug, Default)]
pub struct ErrorCollector {
    diagnostics: Diagnostics,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(code = %diagnostic.code, "{}", diagnostic.message);
        self.diagnostics.push(diagnostic);
    }

    /// Shorthand for pushing a diagnostic with no context lines
    pub fn error(&mut self, code: DiagnosticCode, location: Option<&Location>, message: impl Into<String>) {
        let mut diagnostic = Diagnostic::new(code, message);
        diagnostic.location = location.cloned();
        self.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Checkpoint: fail with everything collected so far.
    ///
    /// The collector is drained, so a later checkpoint only reports newer
    /// diagnostics.
    pub fn throw_if_non_empty(&mut self) -> Result<()> {
        if self.diagnostics.is_empty() {
            return Ok(());
        }
        Err(SchemaError::Diagnostics(std::mem::take(&mut self.diagnostics)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_collects_in_order() {
        let mut errors = ErrorCollector::new();
        errors.error(DiagnosticCode::PathNotFound, None, "unable to find a.proto");
        errors.error(DiagnosticCode::AmbiguousImport, None, "b.proto is ambiguous");

        let messages: Vec<_> = errors.diagnostics().all().iter().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, vec!["unable to find a.proto", "b.proto is ambiguous"]);
    }

    #[test]
    fn test_checkpoint_is_ok_when_empty() {
        let mut errors = ErrorCollector::new();
        assert!(errors.throw_if_non_empty().is_ok());
    }

    #[test]
    fn test_checkpoint_reports_everything_once() {
        let mut errors = ErrorCollector::new();
        errors.error(DiagnosticCode::UnresolvedType, None, "unable to resolve Foo");
        errors.error(DiagnosticCode::UnresolvedType, None, "unable to resolve Bar");

        let err = errors.throw_if_non_empty().unwrap_err();
        let diagnostics = err.diagnostics().unwrap();
        assert_eq!(diagnostics.len(), 2);
        assert!(err.to_string().contains("unable to resolve Foo"));
        assert!(err.to_string().contains("unable to resolve Bar"));

        assert!(errors.is_empty());
        assert!(errors.throw_if_non_empty().is_ok());
    }

    #[test]
    fn test_display_includes_context() {
        let diagnostic = Diagnostic::new(DiagnosticCode::AmbiguousImport, "a.proto is ambiguous:")
            .with_context("one/a.proto")
            .with_context("two/a.proto");
        assert_eq!(
            diagnostic.to_string(),
            "[E002] a.proto is ambiguous:\n    one/a.proto\n    two/a.proto"
        );
    }
}
