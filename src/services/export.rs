//! Bug export in JSON and CSV. Both formats render the same row set, so the
//! record counts always agree.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::models::bug::{BugStatus, Severity};

/// One exported bug row, shared by both formats.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct BugExportRow {
    pub id: i64,
    pub file_path: String,
    pub language: String,
    pub line_number: i64,
    pub column_number: i64,
    pub message: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub kind: String,
    pub severity: Severity,
    pub status: BugStatus,
    pub assigned_to_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Fetch every bug in export order, newest first.
pub async fn export_rows(pool: &SqlitePool) -> Result<Vec<BugExportRow>, AppError> {
    let rows = sqlx::query_as::<_, BugExportRow>(
        "SELECT bugs.*, users.username AS assigned_to_name FROM bugs \
         LEFT JOIN users ON bugs.assigned_to = users.id \
         ORDER BY bugs.created_at DESC",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}

/// Render export rows as CSV with a header line.
pub fn to_csv(rows: &[BugExportRow]) -> Result<String, AppError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    for row in rows {
        writer
            .serialize(row)
            .map_err(|e| AppError::Internal(format!("CSV serialization failed: {e}")))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| AppError::Internal(format!("CSV buffer error: {e}")))?;
    String::from_utf8(bytes).map_err(|e| AppError::Internal(format!("CSV encoding error: {e}")))
}
