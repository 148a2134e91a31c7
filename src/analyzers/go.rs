//! Go analyzer backed by go vet, golint, and staticcheck, plus a manual
//! line-by-line heuristic pass.
//!
//! The heuristics are textual pattern matches, not a parse of the grammar.
//! They can both over- and under-report and are kept deliberately simple.

use std::path::Path;
use std::process::Command;

use regex::Regex;

use super::{Analyzer, Finding, Language};
use crate::models::bug::Severity;

pub struct GoAnalyzer {
    go_cmd: String,
    golint_cmd: String,
    staticcheck_cmd: String,
}

impl Default for GoAnalyzer {
    fn default() -> Self {
        Self {
            go_cmd: "go".to_string(),
            golint_cmd: "golint".to_string(),
            staticcheck_cmd: "staticcheck".to_string(),
        }
    }
}

impl GoAnalyzer {
    /// Override the tool binaries. Used by tests to simulate missing tools.
    pub fn with_commands(
        go_cmd: impl Into<String>,
        golint_cmd: impl Into<String>,
        staticcheck_cmd: impl Into<String>,
    ) -> Self {
        Self {
            go_cmd: go_cmd.into(),
            golint_cmd: golint_cmd.into(),
            staticcheck_cmd: staticcheck_cmd.into(),
        }
    }

    fn run_go_vet(&self, path: &Path) -> Vec<Finding> {
        let Some(scratch) = copy_to_scratch_dir(path) else {
            return Vec::new();
        };
        let (dir, file) = scratch;

        let output = match Command::new(&self.go_cmd).arg("vet").arg(&file).output() {
            Ok(output) => output,
            Err(_) => {
                return vec![Finding::tool_error(
                    "Go not found. Install Go to analyze Go files",
                )]
            }
        };
        drop(dir);

        let file_name = base_name(path);
        let stderr = String::from_utf8_lossy(&output.stderr);
        parse_positional_output(&stderr, &file_name, "go_vet", Severity::High)
    }

    fn run_golint(&self, path: &Path) -> Vec<Finding> {
        let output = match Command::new(&self.golint_cmd).arg(path).output() {
            Ok(output) => output,
            Err(_) => {
                return vec![Finding::tool_error(
                    "golint not found. Install it with 'go install golang.org/x/lint/golint@latest'",
                )]
            }
        };

        let file_name = base_name(path);
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_positional_output(&stdout, &file_name, "golint", Severity::Medium)
    }

    fn run_staticcheck(&self, path: &Path) -> Vec<Finding> {
        let Some((dir, _file)) = copy_to_scratch_dir(path) else {
            return Vec::new();
        };

        // Staticcheck refuses to run outside a module.
        let _ = Command::new(&self.go_cmd)
            .args(["mod", "init", "tempmod"])
            .current_dir(dir.path())
            .output();

        let output = match Command::new(&self.staticcheck_cmd)
            .arg(".")
            .current_dir(dir.path())
            .output()
        {
            Ok(output) => output,
            Err(_) => {
                return vec![Finding::tool_error(
                    "staticcheck not found. Install it with 'go install honnef.co/go/tools/cmd/staticcheck@latest'",
                )]
            }
        };

        let file_name = base_name(path);
        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_positional_output(&stdout, &file_name, "staticcheck", Severity::High)
    }
}

impl Analyzer for GoAnalyzer {
    fn language(&self) -> Language {
        Language::Go
    }

    fn analyze(&self, path: &Path) -> Vec<Finding> {
        tracing::debug!(path = %path.display(), "Analyzing Go file");
        let mut findings = self.run_go_vet(path);
        findings.extend(self.run_golint(path));
        findings.extend(self.run_staticcheck(path));
        findings.extend(manual_analyze(path));
        findings
    }
}

/// Copy the file into a fresh scratch directory so the Go tools see a clean
/// single-file package. Returns the directory guard and the copied path.
fn copy_to_scratch_dir(path: &Path) -> Option<(tempfile::TempDir, std::path::PathBuf)> {
    let dir = tempfile::tempdir().ok()?;
    let file = dir.path().join(path.file_name()?);
    std::fs::copy(path, &file).ok()?;
    Some((dir, file))
}

fn base_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Scrape `file:line:col: message` style output, keeping only lines that
/// mention the analyzed file.
fn parse_positional_output(
    output: &str,
    file_name: &str,
    kind: &str,
    severity: Severity,
) -> Vec<Finding> {
    let re = Regex::new(r"(\d+)(?::(\d+))?:\s*(.*)").expect("valid regex");
    let mut findings = Vec::new();
    for line in output.lines() {
        if line.is_empty() || !line.contains(file_name) {
            continue;
        }
        let Some(caps) = re.captures(line) else {
            continue;
        };
        let Ok(line_num) = caps[1].parse::<i64>() else {
            continue;
        };
        let column = caps
            .get(2)
            .and_then(|c| c.as_str().parse::<i64>().ok())
            .unwrap_or(1);
        findings.push(Finding {
            line: line_num,
            column,
            message: caps[3].trim().to_string(),
            kind: kind.to_string(),
            severity: Some(severity),
            symbol: None,
        });
    }
    findings
}

fn manual_analyze(path: &Path) -> Vec<Finding> {
    match std::fs::read_to_string(path) {
        Ok(code) => manual_scan(&code),
        Err(_) => Vec::new(),
    }
}

/// Manual heuristic pass over the source text.
pub(crate) fn manual_scan(code: &str) -> Vec<Finding> {
    let lines: Vec<&str> = code.split('\n').collect();
    let mut findings = Vec::new();

    let open_re = Regex::new(r"(\w+)\s*:?=\s*os\.(Open|Create)").expect("valid regex");
    let deref_re = Regex::new(r"\*(\w+)\s*=").expect("valid regex");

    for (i, line) in lines.iter().enumerate() {
        let line_num = (i + 1) as i64;

        // Unchecked error assignment: the same or next line must test err.
        if line.contains("err :=") || line.contains("err =") {
            let checked_here = line.contains("if err != nil");
            let checked_next = lines
                .get(i + 1)
                .map_or(false, |next| next.contains("if err != nil"));
            if !checked_here && !checked_next {
                findings.push(Finding {
                    line: line_num,
                    column: column_of(line, "err"),
                    message: "Error not checked".to_string(),
                    kind: "error_check".to_string(),
                    severity: Some(Severity::High),
                    symbol: None,
                });
            }
        }

        // Declared-but-unused: substring absence in the remaining source.
        if let Some((lhs, _)) = line.split_once(":=") {
            let rest = lines[i + 1..].join(" ");
            for part in lhs.split(',') {
                let var = part.split_whitespace().last().unwrap_or("");
                if !var.is_empty() && var != "_" && !rest.contains(var) {
                    findings.push(Finding {
                        line: line_num,
                        column: column_of(line, var),
                        message: format!("Variable '{var}' declared but not used"),
                        kind: "unused_var".to_string(),
                        severity: Some(Severity::Medium),
                        symbol: None,
                    });
                }
            }
        }

        if let Some(finding) = super::literal_zero_division(line, line_num) {
            findings.push(finding);
        }

        // os.Open/os.Create without a deferred Close within 10 lines.
        if line.contains("os.Open(") || line.contains("os.Create(") {
            if let Some(caps) = open_re.captures(line) {
                let var = &caps[1];
                let close = format!("defer {var}.Close()");
                let window_end = (i + 10).min(lines.len());
                let deferred = lines[i + 1..window_end].iter().any(|l| l.contains(&close));
                if !deferred {
                    findings.push(Finding {
                        line: line_num,
                        column: column_of(line, "os."),
                        message: format!("File '{var}' opened but not deferred for closing"),
                        kind: "missing_defer".to_string(),
                        severity: Some(Severity::Medium),
                        symbol: None,
                    });
                }
            }
        }

        // Pointer store without a nil check in the previous 5 lines.
        if line.contains('*') && line.contains('=') {
            if let Some(caps) = deref_re.captures(line) {
                let var = &caps[1];
                let nil_eq = format!("if {var} == nil");
                let nil_ne = format!("if {var} != nil");
                let start = i.saturating_sub(5);
                let guarded = lines[start..i]
                    .iter()
                    .any(|l| l.contains(&nil_eq) || l.contains(&nil_ne));
                if !guarded {
                    findings.push(Finding {
                        line: line_num,
                        column: column_of(line, "*"),
                        message: format!("Possible nil pointer dereference of '{var}'"),
                        kind: "nil_deref".to_string(),
                        severity: Some(Severity::High),
                        symbol: None,
                    });
                }
            }
        }
    }

    findings
}

fn column_of(line: &str, pattern: &str) -> i64 {
    line.find(pattern).map_or(0, |p| p as i64)
}
