//! Raw listing and export routes.

use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;

use crate::errors::{ApiResponse, AppError};
use crate::services::export::{self, BugExportRow};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
}

/// GET /api/bugs — every bug as JSON, newest first.
pub async fn api_bugs(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Vec<BugExportRow>>>, AppError> {
    let rows = export::export_rows(&state.db).await?;
    Ok(ApiResponse::success(rows))
}

/// GET /export/bugs?format=json|csv — export artifact download. Both
/// formats render the same row set.
pub async fn export_bugs(
    State(state): State<AppState>,
    Query(params): Query<ExportParams>,
) -> Result<Response, AppError> {
    let rows = export::export_rows(&state.db).await?;
    match params.format.as_deref().unwrap_or("json") {
        "json" => Ok(Json(rows).into_response()),
        "csv" => {
            let csv_text = export::to_csv(&rows)?;
            let headers = [
                (header::CONTENT_TYPE, "text/csv"),
                (
                    header::CONTENT_DISPOSITION,
                    "attachment; filename=bugs_export.csv",
                ),
            ];
            Ok((headers, csv_text).into_response())
        }
        other => Err(AppError::Unsupported(format!(
            "Unsupported export format '{other}'"
        ))),
    }
}
