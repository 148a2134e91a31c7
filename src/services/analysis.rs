//! The ingest pipeline: detect → analyze → classify → persist → AI fix.
//!
//! Analyzer and git work is blocking subprocess code and runs on the
//! blocking pool; everything else stays on the async runtime.

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;

use serde::Serialize;

use crate::analyzers::{self, Finding, Language};
use crate::errors::AppError;
use crate::services::ai_fix::{AiCodeFixer, DEFAULT_CONTEXT_LINES};
use crate::services::bug;
use crate::AppState;

/// Where the AI fixer finds code context for a bug.
#[derive(Debug, Clone, Copy)]
pub enum FixContextSource<'a> {
    /// Read a window around the flagged line from this file.
    File(&'a Path),
    /// Use the pasted code directly.
    Snippet(&'a str),
    /// Resolve the bug's file path against the upload directory.
    Stored,
}

/// Outcome of a repository scan.
#[derive(Debug, Serialize)]
pub struct RepoScanSummary {
    pub files_analyzed: usize,
    pub bugs_created: usize,
}

/// Run the analyzer for one file on the blocking pool.
pub async fn analyze_file(path: PathBuf, language: Language) -> Result<Vec<Finding>, AppError> {
    tokio::task::spawn_blocking(move || {
        let analyzer = analyzers::analyzer_for_language(language);
        analyzer.analyze(&path)
    })
    .await
    .map_err(|e| AppError::Internal(format!("Analyzer task failed: {e}")))
}

/// Classify findings and persist them as open bugs under `file_label`.
pub async fn ingest_findings(
    state: &AppState,
    file_label: &str,
    language: Language,
    findings: Vec<Finding>,
) -> Result<Vec<i64>, AppError> {
    let new_bugs: Vec<bug::NewBug> = findings
        .into_iter()
        .map(|finding| {
            let severity =
                state
                    .classifier
                    .classify(language.as_str(), &finding.kind, &finding.message);
            bug::NewBug {
                file_path: file_label.to_string(),
                language: language.as_str().to_string(),
                line_number: finding.line,
                column_number: finding.column,
                message: finding.message,
                kind: finding.kind,
                severity,
            }
        })
        .collect();
    bug::insert_bugs(&state.db, &new_bugs).await
}

/// Analyze one file end-to-end: findings, classification, persistence, and
/// (when enabled) AI fix suggestions.
pub async fn run_pipeline(
    state: &AppState,
    path: &Path,
    file_label: &str,
    language: Language,
) -> Result<Vec<i64>, AppError> {
    let findings = analyze_file(path.to_path_buf(), language).await?;
    let bug_ids = ingest_findings(state, file_label, language, findings).await?;
    generate_fixes_for_bugs(state, &bug_ids, FixContextSource::File(path)).await;
    Ok(bug_ids)
}

/// Generate and store one suggested fix per bug. Failures are logged and
/// never fail the request; disabled or unavailable AI is a no-op.
pub async fn generate_fixes_for_bugs(
    state: &AppState,
    bug_ids: &[i64],
    source: FixContextSource<'_>,
) {
    if !state.ai_enabled.load(Ordering::Relaxed) || !state.fixer.is_available() {
        return;
    }
    for &bug_id in bug_ids {
        if let Err(e) = generate_fix_for_bug(state, bug_id, source).await {
            tracing::warn!(bug_id, error = %e, "Error generating AI fix");
        }
    }
}

/// Generate one fix for a bug and persist it.
pub async fn generate_fix_for_bug(
    state: &AppState,
    bug_id: i64,
    source: FixContextSource<'_>,
) -> Result<(), AppError> {
    let bug = bug::get(&state.db, bug_id).await?;

    let snippet = match source {
        FixContextSource::Snippet(code) => code.to_string(),
        FixContextSource::File(path) => {
            AiCodeFixer::extract_code_context(path, bug.line_number, DEFAULT_CONTEXT_LINES)
        }
        FixContextSource::Stored => {
            if bug.file_path.starts_with("pasted_code_") {
                String::new()
            } else {
                let path = Path::new(&state.config.upload_dir).join(&bug.file_path);
                AiCodeFixer::extract_code_context(&path, bug.line_number, DEFAULT_CONTEXT_LINES)
            }
        }
    };

    let fix = state
        .fixer
        .generate_fix(&snippet, &bug.message, &bug.language, bug.line_number)
        .await;
    bug::insert_fix(&state.db, bug_id, &bug.language, &fix).await
}

/// Collect every recognized source file under a directory tree.
pub fn collect_source_files(root: &Path) -> Vec<(PathBuf, Language)> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| {
            let language = analyzers::detect_language(entry.path())?;
            Some((entry.path().to_path_buf(), language))
        })
        .collect()
}

/// Walk a cloned repository and run the per-file pipeline across every
/// recognized file, storing paths relative to the clone root.
pub async fn scan_repository(
    state: &AppState,
    repo_path: &Path,
) -> Result<RepoScanSummary, AppError> {
    let files = {
        let root = repo_path.to_path_buf();
        tokio::task::spawn_blocking(move || collect_source_files(&root))
            .await
            .map_err(|e| AppError::Internal(format!("Repository walk failed: {e}")))?
    };

    let mut files_analyzed = 0;
    let mut bugs_created = 0;
    for (path, language) in files {
        let findings = analyze_file(path.clone(), language).await?;
        let relative = path
            .strip_prefix(repo_path)
            .unwrap_or(&path)
            .to_string_lossy()
            .into_owned();
        let ids = ingest_findings(state, &relative, language, findings).await?;
        generate_fixes_for_bugs(state, &ids, FixContextSource::File(&path)).await;
        files_analyzed += 1;
        bugs_created += ids.len();
    }

    Ok(RepoScanSummary {
        files_analyzed,
        bugs_created,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::test_state;
    use std::io::Write;

    #[tokio::test]
    async fn pipeline_persists_classified_findings() {
        let state = test_state().await;
        let mut file = tempfile::Builder::new().suffix(".js").tempfile().unwrap();
        writeln!(file, "console.log('debug');").unwrap();
        writeln!(file, "eval(userInput);").unwrap();

        let ids = run_pipeline(&state, file.path(), "pasted_code_javascript", Language::JavaScript)
            .await
            .unwrap();
        assert!(!ids.is_empty());

        let bugs = bug::bugs_for_file(&state.db, "pasted_code_javascript")
            .await
            .unwrap();
        assert_eq!(bugs.len(), ids.len());
        assert!(bugs.iter().all(|b| b.bug.language == "javascript"));
        assert!(bugs.iter().any(|b| b.bug.kind == "no-console"));
        assert!(bugs.iter().any(|b| b.bug.kind == "no-eval"));
    }

    #[tokio::test]
    async fn repo_scan_walks_recognized_files() {
        let state = test_state().await;
        let repo = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(repo.path().join("src")).unwrap();
        std::fs::write(repo.path().join("src/app.js"), "console.log('x');\n").unwrap();
        std::fs::write(repo.path().join("README.md"), "# readme\n").unwrap();

        let summary = scan_repository(&state, repo.path()).await.unwrap();
        assert_eq!(summary.files_analyzed, 1);
        assert!(summary.bugs_created >= 1);

        let bugs = bug::bugs_for_file(&state.db, "src/app.js").await.unwrap();
        assert!(!bugs.is_empty());
    }

    #[test]
    fn source_collection_skips_unknown_extensions() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.py"), "x = 1\n").unwrap();
        std::fs::write(dir.path().join("b.rs"), "fn main() {}\n").unwrap();

        let files = collect_source_files(dir.path());
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].1, Language::Python);
    }
}
