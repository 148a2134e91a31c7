//! Severity classification for analyzer findings.
//!
//! Resolution order: exact language+type table entry, then the persisted toy
//! text model, then keyword lists checked most-severe-first, then `medium`.
//! `classify` is total: every input maps to one of the four tiers.

pub mod model;

use std::path::Path;

use crate::models::bug::Severity;
use model::NaiveBayesModel;

pub struct BugClassifier {
    model: Option<NaiveBayesModel>,
}

impl BugClassifier {
    /// Load the persisted model, or train a fresh one and persist it.
    /// A failed save is logged and ignored: classification still works from
    /// the in-memory model.
    pub fn load_or_train(model_path: &Path) -> Self {
        let model = match NaiveBayesModel::load(model_path) {
            Ok(model) => model,
            Err(_) => {
                let model = NaiveBayesModel::train(TRAINING_EXAMPLES);
                if let Err(e) = model.save(model_path) {
                    tracing::warn!(
                        path = %model_path.display(),
                        error = %e,
                        "Could not persist classifier model"
                    );
                }
                model
            }
        };
        Self { model: Some(model) }
    }

    /// Classifier restricted to the table and keyword stages.
    pub fn without_model() -> Self {
        Self { model: None }
    }

    /// Assign a severity tier to a finding. Never fails.
    pub fn classify(&self, language: &str, kind: &str, message: &str) -> Severity {
        if let Some(severity) = table_severity(language, kind) {
            return severity;
        }
        if let Some(model) = &self.model {
            if let Some(severity) = model.predict(message) {
                return severity;
            }
        }
        keyword_severity(message).unwrap_or(Severity::Medium)
    }
}

/// Exact language+type lookup. Pylint message categories keep their
/// single-letter codes alongside the spelled-out names.
fn table_severity(language: &str, kind: &str) -> Option<Severity> {
    use Severity::{High, Low, Medium};

    let severity = match (language.to_lowercase().as_str(), kind) {
        ("python", "error") => High,
        ("python", "warning") => Medium,
        ("python", "convention") | ("python", "refactor") => Low,
        ("python", "F") | ("python", "E") => High,
        ("python", "W") => Medium,
        ("python", "C") | ("python", "R") => Low,

        ("javascript", "error") => High,
        ("javascript", "warning") => Medium,
        ("javascript", "suggestion") => Low,

        ("java", "error") => High,
        ("java", "warning") => Medium,
        ("java", "info") => Low,

        ("cpp", "error") => High,
        ("cpp", "warning") => Medium,
        ("cpp", "style") => Low,
        ("cpp", "performance") | ("cpp", "portability") => Medium,
        ("cpp", "information") => Low,

        ("go", "error") => High,
        ("go", "warning") => Medium,
        ("go", "info") => Low,

        _ => return None,
    };
    Some(severity)
}

/// Substring keyword fallback, checked in tier order. First match wins.
fn keyword_severity(message: &str) -> Option<Severity> {
    let message = message.to_lowercase();
    for tier in Severity::ALL {
        if keywords_for(tier).iter().any(|kw| message.contains(kw)) {
            return Some(tier);
        }
    }
    None
}

fn keywords_for(tier: Severity) -> &'static [&'static str] {
    match tier {
        Severity::Critical => &[
            "segmentation fault",
            "memory leak",
            "buffer overflow",
            "null pointer",
            "race condition",
            "deadlock",
            "security",
            "vulnerability",
            "crash",
            "exception",
            "infinite loop",
            "resource leak",
            "data loss",
        ],
        Severity::High => &[
            "performance",
            "memory usage",
            "thread safety",
            "concurrency",
            "resource",
            "timeout",
            "error handling",
            "undefined behavior",
            "uninitialized",
            "memory corruption",
        ],
        Severity::Medium => &[
            "code style",
            "maintainability",
            "readability",
            "naming convention",
            "documentation",
            "deprecated",
            "warning",
            "unused",
            "complexity",
        ],
        Severity::Low => &[
            "whitespace",
            "formatting",
            "comment",
            "typo",
            "style guide",
            "minor",
            "cosmetic",
            "trivial",
        ],
    }
}

/// Hand-written training sentences, ten per tier.
pub(crate) const TRAINING_EXAMPLES: &[(&str, Severity)] = &[
    ("Segmentation fault when accessing null pointer", Severity::Critical),
    ("Memory leak in allocation routine", Severity::Critical),
    ("Buffer overflow vulnerability in string handling", Severity::Critical),
    ("Race condition in concurrent access", Severity::Critical),
    ("Deadlock in thread synchronization", Severity::Critical),
    ("Security vulnerability in input validation", Severity::Critical),
    ("Application crashes when processing malformed input", Severity::Critical),
    ("Unhandled exception in critical path", Severity::Critical),
    ("Infinite loop in main processing routine", Severity::Critical),
    ("Resource leak in file handling", Severity::Critical),
    ("Performance degradation in sorting algorithm", Severity::High),
    ("Excessive memory usage in data processing", Severity::High),
    ("Thread safety issue in shared resource access", Severity::High),
    ("Timeout in network communication", Severity::High),
    ("Missing error handling in file operations", Severity::High),
    ("Undefined behavior when using uninitialized variable", Severity::High),
    ("Memory corruption in array manipulation", Severity::High),
    ("Resource exhaustion under heavy load", Severity::High),
    ("Incorrect error propagation", Severity::High),
    ("Improper exception handling", Severity::High),
    ("Code style violation in class naming", Severity::Medium),
    ("Poor maintainability due to complex method", Severity::Medium),
    ("Readability issues in nested conditionals", Severity::Medium),
    ("Using deprecated API", Severity::Medium),
    ("Warning about potential side effects", Severity::Medium),
    ("Unused variable in function", Severity::Medium),
    ("High cyclomatic complexity in method", Severity::Medium),
    ("Missing documentation for public API", Severity::Medium),
    ("Inconsistent return values", Severity::Medium),
    ("Redundant code that could be simplified", Severity::Medium),
    ("Inconsistent whitespace in indentation", Severity::Low),
    ("Formatting issues in code alignment", Severity::Low),
    ("Missing or outdated comments", Severity::Low),
    ("Typo in variable name", Severity::Low),
    ("Style guide violation in brace placement", Severity::Low),
    ("Minor optimization opportunity", Severity::Low),
    ("Cosmetic issue in UI component", Severity::Low),
    ("Trivial code duplication", Severity::Low),
    ("Unnecessary import or include", Severity::Low),
    ("Inconsistent line endings", Severity::Low),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_takes_precedence_over_everything() {
        let dir = tempfile::tempdir().unwrap();
        let classifier = BugClassifier::load_or_train(&dir.path().join("model.json"));
        // The message screams "critical", but the table entry wins.
        assert_eq!(
            classifier.classify("python", "F", "security vulnerability crash"),
            Severity::High
        );
        assert_eq!(classifier.classify("python", "F", "x"), Severity::High);
        assert_eq!(classifier.classify("PYTHON", "W", "x"), Severity::Medium);
        assert_eq!(classifier.classify("cpp", "style", "x"), Severity::Low);
        assert_eq!(classifier.classify("go", "error", "x"), Severity::High);
    }

    #[test]
    fn keyword_fallback_in_tier_order() {
        let classifier = BugClassifier::without_model();
        assert_eq!(
            classifier.classify("unknown", "other", "possible deadlock detected"),
            Severity::Critical
        );
        assert_eq!(
            classifier.classify("unknown", "other", "request timeout observed"),
            Severity::High
        );
        assert_eq!(
            classifier.classify("unknown", "other", "unused parameter"),
            Severity::Medium
        );
        assert_eq!(
            classifier.classify("unknown", "other", "trailing whitespace"),
            Severity::Low
        );
    }

    #[test]
    fn defaults_to_medium_when_nothing_matches() {
        let classifier = BugClassifier::without_model();
        assert_eq!(
            classifier.classify("unknown", "other", "zzzz qqqq"),
            Severity::Medium
        );
        assert_eq!(classifier.classify("", "", ""), Severity::Medium);
    }

    #[test]
    fn classify_is_total_with_model() {
        let dir = tempfile::tempdir().unwrap();
        let classifier = BugClassifier::load_or_train(&dir.path().join("model.json"));
        for (language, kind, message) in [
            ("python", "E", "anything"),
            ("rust", "weird", "no keywords here"),
            ("", "", ""),
            ("go", "unused_var", "Variable 'x' declared but not used"),
        ] {
            // Must return one of the four tiers, never panic.
            let _ = classifier.classify(language, kind, message);
        }
    }

    #[test]
    fn model_is_persisted_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let _ = BugClassifier::load_or_train(&path);
        assert!(path.exists());
        // Second load reads the persisted file.
        let classifier = BugClassifier::load_or_train(&path);
        assert_eq!(
            classifier.classify("unknown", "other", "Memory leak in allocation routine"),
            Severity::Critical
        );
    }
}
