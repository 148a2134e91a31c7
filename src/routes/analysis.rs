//! Analysis intake routes: file upload, pasted code, repository scan, the
//! per-file results view, and the AI-suggestions toggle.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::Ordering;

use axum::extract::{Multipart, Path as UrlPath, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analyzers::{self, Language};
use crate::errors::{ApiResponse, AppError};
use crate::models::bug::BugWithAssignee;
use crate::services::analysis::{self, FixContextSource, RepoScanSummary};
use crate::services::bug;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct UploadResult {
    pub filename: String,
    pub original_filename: String,
    pub language: Language,
    pub bugs_created: usize,
}

#[derive(Debug, Deserialize)]
pub struct AnalyzeCodeRequest {
    pub code: String,
    pub language: String,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeCodeResult {
    pub language: Language,
    pub results: Vec<BugWithAssignee>,
}

#[derive(Debug, Deserialize)]
pub struct GitRepoRequest {
    pub repo_url: String,
}

#[derive(Debug, Serialize)]
pub struct ResultsPayload {
    pub filename: String,
    pub results: Vec<BugWithAssignee>,
}

#[derive(Debug, Serialize)]
pub struct AiToggleState {
    pub ai_suggestions_enabled: bool,
}

/// POST /upload — multipart file upload into the full pipeline. The stored
/// name gets a random prefix to avoid collisions; bugs are recorded under
/// the original filename.
pub async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<ApiResponse<UploadResult>>, AppError> {
    let mut file: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {e}")))?
    {
        if field.name() == Some("file") {
            let original = field.file_name().map(sanitize_filename).unwrap_or_default();
            let data = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("Could not read upload: {e}")))?;
            file = Some((original, data.to_vec()));
            break;
        }
    }

    let Some((original, data)) = file else {
        return Err(AppError::Validation("No file part in request".to_string()));
    };
    if original.is_empty() {
        return Err(AppError::Validation("No selected file".to_string()));
    }

    let language = analyzers::detect_language(Path::new(&original)).ok_or_else(|| {
        AppError::Unsupported("Could not detect language of the uploaded file".to_string())
    })?;

    let stored_name = format!("{}_{}", Uuid::new_v4(), original);
    let stored_path = Path::new(&state.config.upload_dir).join(&stored_name);
    tokio::fs::create_dir_all(&state.config.upload_dir)
        .await
        .map_err(|e| AppError::Internal(format!("Could not create upload directory: {e}")))?;
    tokio::fs::write(&stored_path, &data)
        .await
        .map_err(|e| AppError::Internal(format!("Could not store upload: {e}")))?;

    let bug_ids = analysis::run_pipeline(&state, &stored_path, &original, language).await?;

    Ok(ApiResponse::success(UploadResult {
        filename: stored_name,
        original_filename: original,
        language,
        bugs_created: bug_ids.len(),
    }))
}

/// GET /results/{filename} — bugs recorded for an uploaded file. The random
/// prefix is stripped to recover the original filename.
pub async fn results(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> Result<Json<ApiResponse<ResultsPayload>>, AppError> {
    let stored_path = Path::new(&state.config.upload_dir).join(&filename);
    if !stored_path.exists() {
        return Err(AppError::NotFound("File not found".to_string()));
    }

    let original = filename
        .split_once('_')
        .map(|(_, rest)| rest.to_string())
        .unwrap_or(filename);
    let results = bug::bugs_for_file(&state.db, &original).await?;

    Ok(ApiResponse::success(ResultsPayload {
        filename: original,
        results,
    }))
}

/// POST /analyze-code — run the pipeline over pasted code via an ephemeral
/// temp file, recording bugs under `pasted_code_<language>`.
pub async fn analyze_code(
    State(state): State<AppState>,
    Json(request): Json<AnalyzeCodeRequest>,
) -> Result<Json<ApiResponse<AnalyzeCodeResult>>, AppError> {
    if request.code.is_empty() {
        return Err(AppError::Validation("No code provided".to_string()));
    }
    let language = Language::parse(&request.language).ok_or_else(|| {
        AppError::Unsupported(format!("No analyzer available for {}", request.language))
    })?;

    let mut temp = tempfile::NamedTempFile::new()
        .map_err(|e| AppError::Internal(format!("Could not create temp file: {e}")))?;
    temp.write_all(request.code.as_bytes())
        .map_err(|e| AppError::Internal(format!("Could not write temp file: {e}")))?;

    let file_label = format!("pasted_code_{language}");
    let findings = analysis::analyze_file(temp.path().to_path_buf(), language).await?;
    let bug_ids = analysis::ingest_findings(&state, &file_label, language, findings).await?;
    analysis::generate_fixes_for_bugs(&state, &bug_ids, FixContextSource::Snippet(&request.code))
        .await;

    let results = bug::bugs_for_file(&state.db, &file_label).await?;
    Ok(ApiResponse::success(AnalyzeCodeResult { language, results }))
}

/// POST /git-repo — clone a repository and scan every recognized file.
pub async fn git_repo(
    State(state): State<AppState>,
    Json(request): Json<GitRepoRequest>,
) -> Result<Json<ApiResponse<RepoScanSummary>>, AppError> {
    if request.repo_url.is_empty() {
        return Err(AppError::Validation("No repository URL provided".to_string()));
    }

    let repo_path = {
        let git = state.git.clone();
        let url = request.repo_url.clone();
        tokio::task::spawn_blocking(move || git.clone_repository(&url))
            .await
            .map_err(|e| AppError::Internal(format!("Clone task failed: {e}")))?
    };
    let Some(repo_path) = repo_path else {
        return Err(AppError::Validation("Failed to clone repository".to_string()));
    };

    let summary = analysis::scan_repository(&state, &repo_path).await?;
    Ok(ApiResponse::success(summary))
}

/// POST /toggle-ai-suggestions — flip the in-process AI toggle.
pub async fn toggle_ai_suggestions(
    State(state): State<AppState>,
) -> Json<ApiResponse<AiToggleState>> {
    let enabled = !state.ai_enabled.fetch_xor(true, Ordering::Relaxed);
    tracing::info!(enabled, "AI-powered fix suggestions toggled");
    ApiResponse::success(AiToggleState {
        ai_suggestions_enabled: enabled,
    })
}

/// Strip path components and unexpected characters from an uploaded name.
fn sanitize_filename(name: &str) -> String {
    let base = Path::new(name)
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    base.chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_upload_names() {
        assert_eq!(sanitize_filename("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_filename("my file (1).py"), "myfile1.py");
        assert_eq!(sanitize_filename("app.js"), "app.js");
        assert_eq!(sanitize_filename(""), "");
    }
}
