//! Python analyzer backed by pylint (JSON reporter) and flake8.

use std::path::Path;
use std::process::Command;

use serde::Deserialize;

use super::{Analyzer, Finding, Language};

pub struct PythonAnalyzer {
    pylint_cmd: String,
    flake8_cmd: String,
}

impl Default for PythonAnalyzer {
    fn default() -> Self {
        Self {
            pylint_cmd: "pylint".to_string(),
            flake8_cmd: "flake8".to_string(),
        }
    }
}

impl PythonAnalyzer {
    /// Override the tool binaries. Used by tests to simulate missing tools.
    pub fn with_commands(pylint_cmd: impl Into<String>, flake8_cmd: impl Into<String>) -> Self {
        Self {
            pylint_cmd: pylint_cmd.into(),
            flake8_cmd: flake8_cmd.into(),
        }
    }

    fn run_pylint(&self, path: &Path) -> Vec<Finding> {
        // Pylint signals "issues found" through its exit code, so the output
        // is parsed regardless of status.
        let output = match Command::new(&self.pylint_cmd)
            .arg("--output-format=json")
            .arg(path)
            .output()
        {
            Ok(output) => output,
            Err(_) => {
                return vec![Finding::tool_error(
                    "Pylint not found. Install it with 'pip install pylint'",
                )]
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let text = stdout.trim();
        if text.is_empty() {
            return Vec::new();
        }

        match serde_json::from_str::<Vec<PylintIssue>>(text) {
            Ok(issues) => issues.into_iter().map(PylintIssue::into_finding).collect(),
            Err(_) => vec![Finding::tool_error(format!("Error running pylint: {text}"))],
        }
    }

    fn run_flake8(&self, path: &Path) -> Vec<Finding> {
        let output = match Command::new(&self.flake8_cmd)
            .arg("--format=default")
            .arg(path)
            .output()
        {
            Ok(output) => output,
            Err(_) => {
                return vec![Finding::tool_error(
                    "Flake8 not found. Install it with 'pip install flake8'",
                )]
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_flake8_output(&stdout)
    }
}

impl Analyzer for PythonAnalyzer {
    fn language(&self) -> Language {
        Language::Python
    }

    fn analyze(&self, path: &Path) -> Vec<Finding> {
        tracing::debug!(path = %path.display(), "Analyzing Python file");
        let mut findings = self.run_pylint(path);
        findings.extend(self.run_flake8(path));
        findings
    }
}

/// Issue record from `pylint --output-format=json`.
#[derive(Debug, Deserialize)]
struct PylintIssue {
    #[serde(default)]
    line: i64,
    #[serde(default)]
    column: i64,
    #[serde(default)]
    message: String,
    #[serde(default, rename = "type")]
    kind: String,
    #[serde(default)]
    symbol: String,
}

impl PylintIssue {
    fn into_finding(self) -> Finding {
        Finding {
            line: self.line,
            column: self.column,
            message: self.message,
            kind: self.kind,
            severity: None,
            symbol: (!self.symbol.is_empty()).then_some(self.symbol),
        }
    }
}

/// Parse flake8 default output: `path:line:col: CODE message`.
fn parse_flake8_output(output: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for line in output.lines() {
        let mut parts = line.splitn(4, ':');
        let (Some(_file), Some(line_num), Some(col), Some(rest)) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            continue;
        };
        let (Ok(line_num), Ok(col)) = (line_num.trim().parse::<i64>(), col.trim().parse::<i64>())
        else {
            continue;
        };
        let rest = rest.trim();
        let (code, message) = rest.split_once(' ').unwrap_or((rest, ""));
        let kind = if code.starts_with('E') { "style" } else { "warning" };
        findings.push(Finding {
            line: line_num,
            column: col,
            message: message.trim().to_string(),
            kind: kind.to_string(),
            severity: None,
            symbol: Some(code.to_string()),
        });
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_flake8_lines() {
        let output = "\
app.py:3:1: E302 expected 2 blank lines, got 1\n\
app.py:10:80: W291 trailing whitespace\n";
        let findings = parse_flake8_output(output);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].line, 3);
        assert_eq!(findings[0].column, 1);
        assert_eq!(findings[0].kind, "style");
        assert_eq!(findings[0].symbol.as_deref(), Some("E302"));
        assert_eq!(findings[0].message, "expected 2 blank lines, got 1");
        assert_eq!(findings[1].kind, "warning");
    }

    #[test]
    fn flake8_garbage_lines_are_skipped() {
        let findings = parse_flake8_output("not a finding\n:::\n");
        assert!(findings.is_empty());
    }

    #[test]
    fn pylint_issue_maps_to_finding() {
        let raw = r#"[{"line": 4, "column": 0, "message": "Unused variable 'x'",
                       "type": "warning", "symbol": "unused-variable"}]"#;
        let issues: Vec<PylintIssue> = serde_json::from_str(raw).unwrap();
        let finding = issues.into_iter().next().unwrap().into_finding();
        assert_eq!(finding.line, 4);
        assert_eq!(finding.kind, "warning");
        assert_eq!(finding.symbol.as_deref(), Some("unused-variable"));
    }

    #[test]
    fn missing_tools_degrade_to_error_findings() {
        let analyzer =
            PythonAnalyzer::with_commands("pylint-missing-for-test", "flake8-missing-for-test");
        let mut file = tempfile::Builder::new().suffix(".py").tempfile().unwrap();
        writeln!(file, "x = 1").unwrap();

        let findings = analyzer.analyze(file.path());
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.kind == "error"));
        assert!(findings[0].message.contains("Pylint not found"));
        assert!(findings[1].message.contains("Flake8 not found"));
    }
}
