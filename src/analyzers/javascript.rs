//! JavaScript/TypeScript analyzer.
//!
//! Runs no external tool: the pass is a manual line-by-line heuristic scan,
//! textual by design. It can both over- and under-report.

use std::path::Path;

use super::{Analyzer, Finding, Language};
use crate::models::bug::Severity;

const CONTROL_KEYWORDS: [&str; 4] = ["if", "else", "for", "while"];
const STATEMENT_KEYWORDS: [&str; 7] = [
    "if", "for", "while", "function", "class", "import", "export",
];
const BUILTIN_VALUES: [&str; 5] = ["true", "false", "null", "undefined", "this"];

#[derive(Default)]
pub struct JavaScriptAnalyzer;

impl JavaScriptAnalyzer {
    pub fn new() -> Self {
        Self
    }
}

impl Analyzer for JavaScriptAnalyzer {
    fn language(&self) -> Language {
        Language::JavaScript
    }

    fn analyze(&self, path: &Path) -> Vec<Finding> {
        tracing::debug!(path = %path.display(), "Analyzing JavaScript file");
        match std::fs::read_to_string(path) {
            Ok(code) => manual_scan(&code),
            Err(e) => vec![Finding::tool_error(format!(
                "Error reading JavaScript file: {e}"
            ))],
        }
    }
}

/// Manual heuristic pass over the source text.
pub(crate) fn manual_scan(code: &str) -> Vec<Finding> {
    let lines: Vec<&str> = code.split('\n').collect();
    let mut findings = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let line_num = (i + 1) as i64;
        let trimmed = line.trim();

        // Missing trailing semicolon on statement-looking lines.
        if !trimmed.is_empty()
            && !trimmed.starts_with("//")
            && !trimmed.ends_with(';')
            && !trimmed.ends_with('{')
            && !trimmed.ends_with('}')
            && !trimmed.ends_with(':')
            && !STATEMENT_KEYWORDS.iter().any(|kw| line.contains(kw))
        {
            findings.push(Finding {
                line: line_num,
                column: line.trim_end().len() as i64,
                message: "Missing semicolon".to_string(),
                kind: "semi".to_string(),
                severity: Some(Severity::Low),
                symbol: None,
            });
        }

        // Control statement without an opening brace on this or the next line.
        if CONTROL_KEYWORDS.iter().any(|kw| line.contains(kw)) && line.contains(')') {
            let next_has_brace = lines.get(i + 1).map_or(true, |next| next.contains('{'));
            if !line.contains('{') && !next_has_brace {
                findings.push(Finding {
                    line: line_num,
                    column: 1,
                    message: "Missing curly braces for control statement".to_string(),
                    kind: "curly".to_string(),
                    severity: Some(Severity::High),
                    symbol: None,
                });
            }
        }

        if let Some(col) = line.find("console.log") {
            findings.push(Finding {
                line: line_num,
                column: col as i64,
                message: "Unexpected console statement".to_string(),
                kind: "no-console".to_string(),
                severity: Some(Severity::Low),
                symbol: None,
            });
        }

        if let Some(col) = line.find("alert(") {
            findings.push(Finding {
                line: line_num,
                column: col as i64,
                message: "Unexpected alert".to_string(),
                kind: "no-alert".to_string(),
                severity: Some(Severity::Medium),
                symbol: None,
            });
        }

        if let Some(col) = line.find("eval(") {
            findings.push(Finding {
                line: line_num,
                column: col as i64,
                message: "eval can be harmful".to_string(),
                kind: "no-eval".to_string(),
                severity: Some(Severity::High),
                symbol: None,
            });
        }

        if line.contains("return") {
            findings.extend(check_returned_identifier(&lines, i, line_num));
        }

        if let Some(finding) = super::literal_zero_division(line, line_num) {
            findings.push(finding);
        }
    }

    findings
}

/// Flag identifiers returned without a visible `const`/`let`/`var`
/// declaration earlier in the file, with a crude most-of-the-name-matches
/// "did you mean" suggestion.
fn check_returned_identifier(lines: &[&str], index: usize, line_num: i64) -> Option<Finding> {
    let line = lines[index];
    let cleaned = line.replace([';', '(', ')'], " ");
    let words: Vec<&str> = cleaned
        .split_whitespace()
        .map(|w| w.trim_matches(','))
        .collect();
    let pos = words.iter().position(|w| *w == "return")?;
    let var_name = words.get(pos + 1)?.to_string();

    // Only bare identifiers are worth checking; literals and expressions
    // would drown the signal.
    let mut chars = var_name.chars();
    let first = chars.next()?;
    if !(first.is_ascii_alphabetic() || first == '_')
        || !var_name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return None;
    }
    if BUILTIN_VALUES.contains(&var_name.as_str()) {
        return None;
    }

    let declared = lines[..index].iter().any(|prev| {
        ["const ", "let ", "var "]
            .iter()
            .any(|decl| prev.contains(&format!("{decl}{var_name}")))
    });
    if declared {
        return None;
    }

    // Crude similarity: most of the name matches a declared variable.
    let mut similar = None;
    for prev in &lines[..index] {
        for decl in ["const ", "let ", "var "] {
            let Some(rest) = prev.split_once(decl).map(|(_, rest)| rest) else {
                continue;
            };
            let declared_var = rest.split('=').next().unwrap_or("").trim();
            if var_name.len() > 2 && declared_var.len() > 2 && declared_var.is_ascii() {
                let head = &var_name[..var_name.len() - 2];
                let declared_head = &declared_var[..declared_var.len() - 2];
                if head == declared_head {
                    similar = Some(declared_var.to_string());
                }
            }
        }
    }

    let column = line.find(&var_name).map_or(0, |p| (p + 1) as i64);
    let message = match similar {
        Some(similar) => format!("'{var_name}' is not defined. Did you mean '{similar}'?"),
        None => format!("'{var_name}' is not defined"),
    };
    Some(Finding {
        line: line_num,
        column,
        message,
        kind: "no-undef".to_string(),
        severity: Some(Severity::High),
        symbol: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_missing_semicolon() {
        let findings = manual_scan("const x = 1\n");
        // `const` is not in the statement keyword list, so the bare line is
        // flagged.
        assert!(findings.iter().any(|f| f.kind == "semi" && f.line == 1));
    }

    #[test]
    fn terminated_lines_are_clean() {
        let findings = manual_scan("const x = 1;\n");
        assert!(!findings.iter().any(|f| f.kind == "semi"));
    }

    #[test]
    fn flags_braceless_control_statement() {
        let code = "if (ready)\n  start();\n";
        let findings = manual_scan(code);
        assert!(findings.iter().any(|f| f.kind == "curly" && f.line == 1));
    }

    #[test]
    fn braced_control_statement_is_clean() {
        let code = "if (ready) {\n  start();\n}\n";
        let findings = manual_scan(code);
        assert!(!findings.iter().any(|f| f.kind == "curly"));
    }

    #[test]
    fn flags_console_alert_and_eval() {
        let code = "console.log('x');\nalert('y');\neval(input);\n";
        let findings = manual_scan(code);
        assert!(findings.iter().any(|f| f.kind == "no-console" && f.line == 1));
        assert!(findings.iter().any(|f| f.kind == "no-alert" && f.line == 2));
        assert!(findings.iter().any(|f| f.kind == "no-eval" && f.line == 3));
    }

    #[test]
    fn flags_undeclared_return_identifier() {
        let code = "const total = 1;\nreturn result;\n";
        let findings = manual_scan(code);
        assert!(findings
            .iter()
            .any(|f| f.kind == "no-undef" && f.message == "'result' is not defined"));
    }

    #[test]
    fn suggests_similar_declared_variable() {
        let code = "const counter = 1;\nreturn countes;\n";
        let findings = manual_scan(code);
        assert!(findings.iter().any(|f| f.kind == "no-undef"
            && f.message.contains("Did you mean 'counter'?")));
    }

    #[test]
    fn declared_return_identifier_is_clean() {
        let code = "const result = compute();\nreturn result;\n";
        let findings = manual_scan(code);
        assert!(!findings.iter().any(|f| f.kind == "no-undef"));
    }

    #[test]
    fn returned_literals_are_ignored() {
        let code = "return 42;\nreturn true;\n";
        let findings = manual_scan(code);
        assert!(!findings.iter().any(|f| f.kind == "no-undef"));
    }

    #[test]
    fn flags_division_by_zero() {
        let findings = manual_scan("const share = total / 0\n");
        assert!(findings.iter().any(|f| f.kind == "div_zero"));
    }
}
