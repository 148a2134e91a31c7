//! Java analyzer backed by PMD, javac, and SpotBugs.

use std::path::Path;
use std::process::Command;

use super::{Analyzer, Finding, Language};

pub struct JavaAnalyzer {
    pmd_cmd: String,
    javac_cmd: String,
    spotbugs_cmd: String,
}

impl Default for JavaAnalyzer {
    fn default() -> Self {
        Self {
            pmd_cmd: "pmd".to_string(),
            javac_cmd: "javac".to_string(),
            spotbugs_cmd: "spotbugs".to_string(),
        }
    }
}

impl JavaAnalyzer {
    /// Override the tool binaries. Used by tests to simulate missing tools.
    pub fn with_commands(
        pmd_cmd: impl Into<String>,
        javac_cmd: impl Into<String>,
        spotbugs_cmd: impl Into<String>,
    ) -> Self {
        Self {
            pmd_cmd: pmd_cmd.into(),
            javac_cmd: javac_cmd.into(),
            spotbugs_cmd: spotbugs_cmd.into(),
        }
    }

    fn run_pmd(&self, path: &Path) -> Vec<Finding> {
        let output = match Command::new(&self.pmd_cmd)
            .args(["check", "-R", "pmd.xml", "-f", "text"])
            .arg(path)
            .output()
        {
            Ok(output) => output,
            Err(_) => {
                return vec![Finding::tool_error(
                    "PMD not found. Install it from https://pmd.github.io/",
                )]
            }
        };

        // PMD exits non-zero when violations are found; both streams carry
        // report lines depending on the version.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        parse_pmd_output(&text, &path.to_string_lossy())
    }

    fn run_javac(&self, path: &Path) -> Vec<Finding> {
        let Ok(out_dir) = tempfile::tempdir() else {
            return Vec::new();
        };

        let output = match Command::new(&self.javac_cmd)
            .arg("-d")
            .arg(out_dir.path())
            .arg(path)
            .output()
        {
            Ok(output) => output,
            Err(_) => {
                return vec![Finding::tool_error(
                    "Java compiler not found. Install a JDK",
                )]
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        parse_javac_output(&stderr)
    }

    /// Compile to a scratch dir and run SpotBugs over the class file.
    /// SpotBugs problems are not critical: every failure here is silent.
    fn run_spotbugs(&self, path: &Path) -> Vec<Finding> {
        let Ok(out_dir) = tempfile::tempdir() else {
            return Vec::new();
        };
        let compiled = Command::new(&self.javac_cmd)
            .arg("-d")
            .arg(out_dir.path())
            .arg(path)
            .output();
        if !compiled.map_or(false, |out| out.status.success()) {
            return Vec::new();
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let class_file = out_dir.path().join(format!("{stem}.class"));

        let Ok(output) = Command::new(&self.spotbugs_cmd)
            .args(["-textui", "-low"])
            .arg(&class_file)
            .output()
        else {
            return Vec::new();
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_spotbugs_output(&stdout)
    }
}

impl Analyzer for JavaAnalyzer {
    fn language(&self) -> Language {
        Language::Java
    }

    fn analyze(&self, path: &Path) -> Vec<Finding> {
        tracing::debug!(path = %path.display(), "Analyzing Java file");
        let mut findings = self.run_pmd(path);
        findings.extend(self.run_javac(path));
        findings.extend(self.run_spotbugs(path));
        findings
    }
}

/// Scrape PMD text output: `path:line: message` for the analyzed file.
fn parse_pmd_output(output: &str, path: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for line in output.lines() {
        if !line.contains(path) {
            continue;
        }
        let Some((_, rest)) = line.split_once(path) else {
            continue;
        };
        let rest = rest.trim_start_matches(':').trim();
        let Some((line_num, message)) = rest.split_once(':') else {
            continue;
        };
        let Ok(line_num) = line_num.trim().parse::<i64>() else {
            continue;
        };
        findings.push(Finding {
            line: line_num,
            column: 1,
            message: message.trim().to_string(),
            kind: "error".to_string(),
            severity: None,
            symbol: Some("pmd".to_string()),
        });
    }
    findings
}

/// Scrape javac diagnostics: `path:line: error: message`.
fn parse_javac_output(output: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for line in output.lines() {
        if !line.contains(':') || !line.contains("error:") {
            continue;
        }
        let parts: Vec<&str> = line.split(':').collect();
        if parts.len() < 4 {
            continue;
        }
        let Ok(line_num) = parts[1].trim().parse::<i64>() else {
            continue;
        };
        let message = parts[3..].join(":").trim().to_string();
        findings.push(Finding {
            line: line_num,
            column: 1,
            message,
            kind: "error".to_string(),
            severity: None,
            symbol: Some("javac".to_string()),
        });
    }
    findings
}

/// Scrape SpotBugs text output, free-form lines carrying `[... line N]`.
fn parse_spotbugs_output(output: &str) -> Vec<Finding> {
    let mut findings = Vec::new();
    for line in output.lines() {
        if !line.contains('[') || !line.contains(']') || !line.to_lowercase().contains("line") {
            continue;
        }
        let Some(pos) = line.find("line") else {
            continue;
        };
        let start = pos + 4;
        let Some(end) = line[start..].find(']').map(|e| start + e) else {
            continue;
        };
        let Ok(line_num) = line[start..end].trim().parse::<i64>() else {
            continue;
        };
        let message = line[end + 1..].trim().to_string();
        findings.push(Finding {
            line: line_num,
            column: 1,
            message,
            kind: "warning".to_string(),
            severity: None,
            symbol: Some("spotbugs".to_string()),
        });
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_pmd_lines() {
        let output = "\
/tmp/Main.java:15: UnusedLocalVariable: Avoid unused local variables such as 'tmp'.\n\
some unrelated header line\n";
        let findings = parse_pmd_output(output, "/tmp/Main.java");
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 15);
        assert!(findings[0].message.contains("UnusedLocalVariable"));
        assert_eq!(findings[0].symbol.as_deref(), Some("pmd"));
    }

    #[test]
    fn parses_javac_errors() {
        let output = "\
Main.java:8: error: ';' expected\n        int x = 1\n                 ^\n\
Main.java:12: error: cannot find symbol\n";
        let findings = parse_javac_output(output);
        assert_eq!(findings.len(), 2);
        assert_eq!(findings[0].line, 8);
        assert_eq!(findings[0].message, "';' expected");
        assert_eq!(findings[1].line, 12);
        assert_eq!(findings[1].symbol.as_deref(), Some("javac"));
    }

    #[test]
    fn parses_spotbugs_lines() {
        let output =
            "M D NP: Possible null pointer dereference in Main.work() [Main] At Main.java:[line 23] dereferenced here\n";
        let findings = parse_spotbugs_output(output);
        assert_eq!(findings.len(), 1);
        assert_eq!(findings[0].line, 23);
        assert_eq!(findings[0].kind, "warning");
    }

    #[test]
    fn missing_tools_degrade_to_error_findings() {
        let analyzer = JavaAnalyzer::with_commands(
            "pmd-missing-for-test",
            "javac-missing-for-test",
            "spotbugs-missing-for-test",
        );
        let mut file = tempfile::Builder::new().suffix(".java").tempfile().unwrap();
        writeln!(file, "class Main {{}}").unwrap();

        let findings = analyzer.analyze(file.path());
        // PMD and javac each report one error finding; SpotBugs failures are
        // silent by design.
        assert_eq!(findings.len(), 2);
        assert!(findings.iter().all(|f| f.kind == "error"));
        assert!(findings.iter().any(|f| f.message.contains("PMD not found")));
        assert!(findings
            .iter()
            .any(|f| f.message.contains("Java compiler not found")));
    }
}
