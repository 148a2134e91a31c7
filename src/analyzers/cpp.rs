//! C/C++ analyzer backed by cppcheck's XML report.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use super::{Analyzer, Finding, Language};

pub struct CppAnalyzer {
    cppcheck_cmd: String,
}

impl Default for CppAnalyzer {
    fn default() -> Self {
        Self {
            cppcheck_cmd: "cppcheck".to_string(),
        }
    }
}

impl CppAnalyzer {
    /// Override the cppcheck binary. Used by tests to simulate a missing tool.
    pub fn with_command(cppcheck_cmd: impl Into<String>) -> Self {
        Self {
            cppcheck_cmd: cppcheck_cmd.into(),
        }
    }
}

impl Analyzer for CppAnalyzer {
    fn language(&self) -> Language {
        Language::Cpp
    }

    fn analyze(&self, path: &Path) -> Vec<Finding> {
        tracing::debug!(path = %path.display(), "Analyzing C/C++ file");

        let report = match tempfile::Builder::new().suffix(".xml").tempfile() {
            Ok(report) => report,
            Err(e) => {
                return vec![Finding::tool_error(format!(
                    "Error preparing cppcheck output file: {e}"
                ))]
            }
        };

        let output = match Command::new(&self.cppcheck_cmd)
            .arg("--enable=all")
            .arg("--xml")
            .arg(format!("--output-file={}", report.path().display()))
            .arg(path)
            .output()
        {
            Ok(output) => output,
            Err(_) => {
                return vec![Finding::tool_error(
                    "Cppcheck not found. Install it from http://cppcheck.sourceforge.net/",
                )]
            }
        };

        // Cppcheck can exit non-zero while still writing a usable report, so
        // the XML is parsed regardless of status.
        let xml = std::fs::read_to_string(report.path()).unwrap_or_default();
        match parse_cppcheck_xml(&xml) {
            Some(findings) => findings,
            None => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                vec![Finding::tool_error(format!(
                    "Error running Cppcheck: {}",
                    stderr.trim()
                ))]
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct CppcheckResults {
    errors: Option<CppcheckErrors>,
}

#[derive(Debug, Deserialize)]
struct CppcheckErrors {
    #[serde(default, rename = "error")]
    errors: Vec<CppcheckError>,
}

#[derive(Debug, Deserialize)]
struct CppcheckError {
    #[serde(default, rename = "@id")]
    id: String,
    #[serde(default, rename = "@severity")]
    severity: String,
    #[serde(default, rename = "@msg")]
    msg: String,
    #[serde(default, rename = "location")]
    locations: Vec<CppcheckLocation>,
}

#[derive(Debug, Deserialize)]
struct CppcheckLocation {
    #[serde(default, rename = "@line")]
    line: i64,
}

/// Parse a cppcheck XML report. Returns `None` when the document is not
/// valid cppcheck output; records without a location are skipped (cppcheck
/// emits location-less informational entries).
fn parse_cppcheck_xml(xml: &str) -> Option<Vec<Finding>> {
    let results: CppcheckResults = quick_xml::de::from_str(xml).ok()?;
    let errors = match results.errors {
        Some(errors) => errors.errors,
        None => Vec::new(),
    };

    let findings = errors
        .into_iter()
        .filter_map(|error| {
            let location = error.locations.first()?;
            let kind = if error.severity.is_empty() {
                "warning".to_string()
            } else {
                error.severity
            };
            Some(Finding {
                line: location.line,
                // Cppcheck provides no reliable column info.
                column: 0,
                message: error.msg,
                kind,
                severity: None,
                symbol: (!error.id.is_empty()).then_some(error.id),
            })
        })
        .collect();
    Some(findings)
}
