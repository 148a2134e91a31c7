//! Per-language analyzers wrapping external linters and manual heuristics.
//!
//! Each analyzer implements the `Analyzer` trait, producing normalized
//! `Finding` records from tool-specific output (JSON for pylint, XML for
//! cppcheck, positional text for the Go and Java tools). Missing binaries and
//! unparsable output degrade to a single synthetic `error` finding; nothing
//! here returns an error or panics.

pub mod cpp;
pub mod go;
pub mod java;
pub mod javascript;
pub mod python;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::models::bug::Severity;

/// A single issue reported by an analyzer, ephemeral until persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Finding {
    pub line: i64,
    pub column: i64,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Option<Severity>,
    pub symbol: Option<String>,
}

impl Finding {
    pub fn new(line: i64, column: i64, message: impl Into<String>, kind: impl Into<String>) -> Self {
        Self {
            line,
            column,
            message: message.into(),
            kind: kind.into(),
            severity: None,
            symbol: None,
        }
    }

    /// Synthetic finding reported when an external tool is unavailable or its
    /// output cannot be parsed.
    pub fn tool_error(message: impl Into<String>) -> Self {
        Self::new(1, 1, message, "error")
    }
}

/// Supported analysis languages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
    Java,
    Cpp,
    Go,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Python => "python",
            Self::JavaScript => "javascript",
            Self::Java => "java",
            Self::Cpp => "cpp",
            Self::Go => "go",
        }
    }

    /// Case-insensitive lookup against the fixed language set.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "python" => Some(Self::Python),
            "javascript" => Some(Self::JavaScript),
            "java" => Some(Self::Java),
            "cpp" => Some(Self::Cpp),
            "go" => Some(Self::Go),
            _ => None,
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Map a file extension to its language tag.
pub fn detect_language(path: &Path) -> Option<Language> {
    let ext = path.extension()?.to_str()?.to_lowercase();
    match ext.as_str() {
        "py" => Some(Language::Python),
        "js" | "jsx" | "ts" | "tsx" => Some(Language::JavaScript),
        "java" => Some(Language::Java),
        "cpp" | "cc" | "cxx" | "c" | "h" | "hpp" | "hxx" => Some(Language::Cpp),
        "go" => Some(Language::Go),
        _ => None,
    }
}

/// Trait for per-language analyzers.
pub trait Analyzer: Send + Sync {
    /// The language this analyzer handles.
    fn language(&self) -> Language;

    /// Analyze a file, returning every finding the tools and heuristics
    /// produce. Infallible: tool failures surface as `error` findings.
    fn analyze(&self, path: &Path) -> Vec<Finding>;
}

/// Flag division by a literal zero on a single source line. Shared by the
/// manual Go and JavaScript passes. Purely textual: only a bare `0` token
/// directly after a slash counts.
pub(crate) fn literal_zero_division(line: &str, line_num: i64) -> Option<Finding> {
    let mut parts = line.split('/');
    parts.next()?;
    for part in parts {
        let divisor = part.trim().split_whitespace().next().unwrap_or("");
        if divisor == "0" {
            return Some(Finding {
                line: line_num,
                column: line.find('/').map_or(0, |p| (p + 1) as i64),
                message: "Division by zero".to_string(),
                kind: "div_zero".to_string(),
                severity: Some(Severity::High),
                symbol: None,
            });
        }
    }
    None
}

/// Resolve a language tag to its analyzer. Callers must handle `None` for
/// unknown languages.
pub fn analyzer_for(language: &str) -> Option<Box<dyn Analyzer>> {
    let language = Language::parse(language)?;
    Some(analyzer_for_language(language))
}

pub fn analyzer_for_language(language: Language) -> Box<dyn Analyzer> {
    match language {
        Language::Python => Box::new(python::PythonAnalyzer::default()),
        Language::JavaScript => Box::new(javascript::JavaScriptAnalyzer::default()),
        Language::Java => Box::new(java::JavaAnalyzer::default()),
        Language::Cpp => Box::new(cpp::CppAnalyzer::default()),
        Language::Go => Box::new(go::GoAnalyzer::default()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn detects_known_extensions() {
        let cases = [
            ("main.py", Language::Python),
            ("app.js", Language::JavaScript),
            ("app.jsx", Language::JavaScript),
            ("app.ts", Language::JavaScript),
            ("app.tsx", Language::JavaScript),
            ("Main.java", Language::Java),
            ("main.cpp", Language::Cpp),
            ("main.cc", Language::Cpp),
            ("main.cxx", Language::Cpp),
            ("main.c", Language::Cpp),
            ("main.h", Language::Cpp),
            ("main.hpp", Language::Cpp),
            ("main.hxx", Language::Cpp),
            ("main.go", Language::Go),
        ];
        for (name, expected) in cases {
            assert_eq!(detect_language(&PathBuf::from(name)), Some(expected), "{name}");
        }
    }

    #[test]
    fn unknown_extension_is_none() {
        assert_eq!(detect_language(&PathBuf::from("lib.rs")), None);
        assert_eq!(detect_language(&PathBuf::from("README.md")), None);
        assert_eq!(detect_language(&PathBuf::from("Makefile")), None);
    }

    #[test]
    fn extension_case_is_ignored() {
        assert_eq!(detect_language(&PathBuf::from("MAIN.PY")), Some(Language::Python));
        assert_eq!(detect_language(&PathBuf::from("Main.GO")), Some(Language::Go));
    }

    #[test]
    fn factory_is_case_insensitive() {
        for name in ["python", "Python", "PYTHON", "JavaScript", "GO", "cpp", "Java"] {
            assert!(analyzer_for(name).is_some(), "{name}");
        }
    }

    #[test]
    fn factory_unknown_language_is_none() {
        assert!(analyzer_for("rust").is_none());
        assert!(analyzer_for("").is_none());
    }

    #[test]
    fn factory_returns_matching_analyzer() {
        let analyzer = analyzer_for("go").unwrap();
        assert_eq!(analyzer.language(), Language::Go);
    }

    #[test]
    fn literal_zero_division_detection() {
        assert!(literal_zero_division("x = y / 0", 1).is_some());
        assert!(literal_zero_division("return total / 0", 2).is_some());
        assert!(literal_zero_division("x = y / 2", 1).is_none());
        assert!(literal_zero_division("// comment", 1).is_none());
        assert!(literal_zero_division("no slash here", 1).is_none());
    }

    #[test]
    fn finding_serializes_kind_as_type() {
        let finding = Finding::new(3, 1, "Missing semicolon", "semi");
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["type"], "semi");
        assert_eq!(json["line"], 3);
    }
}
