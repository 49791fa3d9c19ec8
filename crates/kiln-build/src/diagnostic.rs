//! Build diagnostics
//!
//! Every recoverable problem found during a pass (unresolved tags, bundler
//! failures, warnings emitted while combining modules) is recorded as a
//! [`Diagnostic`] value rather than returned as an error, so a partial build
//! still reports everything that went wrong.

use crate::error::{BuildError, BuildResult};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::sync::Mutex;

/// Diagnostic code registry
///
/// KB0xxx codes are errors, KW0xxx codes are warnings.
pub mod codes {
    /// A declared tag has no matching component
    pub const UNRESOLVED_COMPONENT: &str = "KB0001";
    /// No tag of a bundle could be resolved
    pub const EMPTY_BUNDLE: &str = "KB0002";
    /// The module bundler rejected the bundle
    pub const BUNDLER_FAILURE: &str = "KB0003";
    /// The minifier reported a problem
    pub const MINIFY_FAILURE: &str = "KB0004";

    /// Warning forwarded from the module bundler
    pub const BUNDLER_WARNING: &str = "KW0001";
    /// The same component set is declared more than once
    pub const DUPLICATE_BUNDLE: &str = "KW0002";
    /// Two bundles produced the same output file name
    pub const OUTPUT_NAME_COLLISION: &str = "KW0003";
}

/// Severity level of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Error,
    Warning,
}

impl fmt::Display for DiagnosticLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticLevel::Error => write!(f, "error"),
            DiagnosticLevel::Warning => write!(f, "warning"),
        }
    }
}

/// A build error or warning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity level
    pub level: DiagnosticLevel,
    /// Diagnostic code (e.g., "KB0001")
    pub code: String,
    /// Main diagnostic message
    pub message: String,
    /// Tag list of the bundle this diagnostic belongs to
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub bundle: Option<String>,
    /// Additional notes
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub notes: Vec<String>,
}

impl Diagnostic {
    /// Create an error diagnostic with code
    pub fn error_with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            code: code.into(),
            message: message.into(),
            bundle: None,
            notes: Vec::new(),
        }
    }

    /// Create a warning diagnostic with code
    pub fn warning_with_code(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            code: code.into(),
            message: message.into(),
            bundle: None,
            notes: Vec::new(),
        }
    }

    /// Attach the bundle label
    pub fn with_bundle(mut self, bundle: impl Into<String>) -> Self {
        self.bundle = Some(bundle.into());
        self
    }

    /// Add a note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }

    pub fn is_warning(&self) -> bool {
        self.level == DiagnosticLevel::Warning
    }

    /// Format as human-readable string
    pub fn to_human_string(&self) -> String {
        // Header: error[KB0001]: Unable to find component ...
        let mut output = format!("{}[{}]: {}\n", self.level, self.code, self.message);

        if let Some(bundle) = &self.bundle {
            output.push_str(&format!("  --> bundle [{}]\n", bundle));
        }

        for note in &self.notes {
            output.push_str(&format!("   = note: {}\n", note));
        }

        output
    }

    /// Format as JSON string
    pub fn to_json_string(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}[{}]: {}", self.level, self.code, self.message)
    }
}

/// Append-only diagnostics collection shared by the tasks of one pass
#[derive(Debug, Default)]
pub struct DiagnosticsSink {
    records: Mutex<Vec<Diagnostic>>,
}

impl DiagnosticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one diagnostic
    pub fn push(&self, diagnostic: Diagnostic) -> BuildResult<()> {
        self.lock()?.push(diagnostic);
        Ok(())
    }

    /// Append a batch, keeping it contiguous
    pub fn extend(&self, diagnostics: impl IntoIterator<Item = Diagnostic>) -> BuildResult<()> {
        self.lock()?.extend(diagnostics);
        Ok(())
    }

    pub fn len(&self) -> BuildResult<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> BuildResult<bool> {
        Ok(self.lock()?.is_empty())
    }

    /// Take the collected diagnostics
    pub fn into_inner(self) -> BuildResult<Vec<Diagnostic>> {
        self.records
            .into_inner()
            .map_err(|_| BuildError::LockPoisoned("diagnostics sink"))
    }

    fn lock(&self) -> BuildResult<std::sync::MutexGuard<'_, Vec<Diagnostic>>> {
        self.records
            .lock()
            .map_err(|_| BuildError::LockPoisoned("diagnostics sink"))
    }
}

/// Suppresses repeated warning messages within one bundle invocation
///
/// Created fresh for every bundle task; warnings from different bundles are
/// never compared.
#[derive(Debug, Default)]
pub struct WarningDeduplicator {
    seen: HashSet<String>,
}

impl WarningDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` the first time a message is observed
    pub fn observe(&mut self, message: &str) -> bool {
        if self.seen.contains(message) {
            return false;
        }
        self.seen.insert(message.to_string())
    }

    /// Number of distinct messages seen
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Sort diagnostics: errors first, then by bundle label
///
/// The sort is stable, so a bundle's own diagnostics keep their order.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by(|a, b| match (a.level, b.level) {
        (DiagnosticLevel::Error, DiagnosticLevel::Warning) => std::cmp::Ordering::Less,
        (DiagnosticLevel::Warning, DiagnosticLevel::Error) => std::cmp::Ordering::Greater,
        _ => a.bundle.cmp(&b.bundle),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_deduplicator_suppresses_repeats() {
        let mut dedup = WarningDeduplicator::new();
        assert!(dedup.observe("unused import"));
        assert!(!dedup.observe("unused import"));
        assert!(dedup.observe("other warning"));
        assert_eq!(dedup.len(), 2);
    }

    #[test]
    fn test_fresh_deduplicators_are_independent() {
        let mut first = WarningDeduplicator::new();
        let mut second = WarningDeduplicator::new();
        assert!(first.observe("same"));
        assert!(second.observe("same"));
    }

    #[test]
    fn test_sink_concurrent_batches_stay_contiguous() {
        let sink = Arc::new(DiagnosticsSink::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let sink = Arc::clone(&sink);
                thread::spawn(move || {
                    let batch = (0..4).map(|j| {
                        Diagnostic::warning_with_code(codes::BUNDLER_WARNING, format!("{}-{}", i, j))
                            .with_bundle(format!("b{}", i))
                    });
                    sink.extend(batch).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let records = Arc::try_unwrap(sink).unwrap().into_inner().unwrap();
        assert_eq!(records.len(), 32);
        for chunk in records.chunks(4) {
            let bundle = &chunk[0].bundle;
            assert!(chunk.iter().all(|d| &d.bundle == bundle));
        }
    }

    #[test]
    fn test_human_string() {
        let diag = Diagnostic::error_with_code(codes::EMPTY_BUNDLE, "No components found to bundle")
            .with_bundle("x-a")
            .with_note("check the manifest");
        let text = diag.to_human_string();
        assert!(text.starts_with("error[KB0002]: No components found to bundle"));
        assert!(text.contains("bundle [x-a]"));
        assert!(text.contains("= note: check the manifest"));
    }

    #[test]
    fn test_sort_errors_first() {
        let mut diags = vec![
            Diagnostic::warning_with_code(codes::BUNDLER_WARNING, "w").with_bundle("a"),
            Diagnostic::error_with_code(codes::UNRESOLVED_COMPONENT, "e").with_bundle("b"),
        ];
        sort_diagnostics(&mut diags);
        assert!(diags[0].is_error());
        assert!(diags[1].is_warning());
    }
}
