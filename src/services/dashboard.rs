//! Dashboard statistics aggregation queries.

use std::collections::BTreeMap;

use serde::Serialize;
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::models::bug::BugWithAssignee;

/// Aggregated dashboard payload for the overview page.
#[derive(Debug, Serialize)]
pub struct DashboardStats {
    pub stats: CountSummary,
    pub recent_bugs: Vec<BugWithAssignee>,
    pub language_distribution: Vec<GroupCount>,
    pub status_distribution: Vec<GroupCount>,
}

/// Bug counts by severity tier and workflow status.
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct CountSummary {
    pub total: i64,
    pub critical: i64,
    pub high: i64,
    pub medium: i64,
    pub low: i64,
    pub open: i64,
    pub in_progress: i64,
    pub fixed: i64,
    pub closed: i64,
}

/// Count for one group value (language or status).
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct GroupCount {
    pub name: String,
    pub count: i64,
}

/// Flat stats payload for the JSON API.
#[derive(Debug, Serialize)]
pub struct ApiStats {
    pub total: i64,
    pub by_severity: BTreeMap<String, i64>,
    pub by_status: BTreeMap<String, i64>,
    pub by_language: BTreeMap<String, i64>,
}

/// Fetch all dashboard statistics.
pub async fn get_stats(pool: &SqlitePool) -> Result<DashboardStats, AppError> {
    let stats = fetch_count_summary(pool).await?;
    let recent_bugs = fetch_recent_bugs(pool).await?;
    let language_distribution = fetch_group_counts(pool, "language").await?;
    let status_distribution = fetch_group_counts(pool, "status").await?;

    Ok(DashboardStats {
        stats,
        recent_bugs,
        language_distribution,
        status_distribution,
    })
}

/// Flat aggregate payload for `/api/stats`.
pub async fn get_api_stats(pool: &SqlitePool) -> Result<ApiStats, AppError> {
    let summary = fetch_count_summary(pool).await?;
    let by_language = fetch_group_counts(pool, "language")
        .await?
        .into_iter()
        .map(|g| (g.name, g.count))
        .collect();

    let by_severity = BTreeMap::from([
        ("critical".to_string(), summary.critical),
        ("high".to_string(), summary.high),
        ("medium".to_string(), summary.medium),
        ("low".to_string(), summary.low),
    ]);
    let by_status = BTreeMap::from([
        ("open".to_string(), summary.open),
        ("in_progress".to_string(), summary.in_progress),
        ("fixed".to_string(), summary.fixed),
        ("closed".to_string(), summary.closed),
    ]);

    Ok(ApiStats {
        total: summary.total,
        by_severity,
        by_status,
        by_language,
    })
}

/// Conditional aggregation keeps this to a single scan of the table.
async fn fetch_count_summary(pool: &SqlitePool) -> Result<CountSummary, AppError> {
    let summary = sqlx::query_as::<_, CountSummary>(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(CASE WHEN severity = 'critical' THEN 1 ELSE 0 END), 0) AS critical,
            COALESCE(SUM(CASE WHEN severity = 'high' THEN 1 ELSE 0 END), 0) AS high,
            COALESCE(SUM(CASE WHEN severity = 'medium' THEN 1 ELSE 0 END), 0) AS medium,
            COALESCE(SUM(CASE WHEN severity = 'low' THEN 1 ELSE 0 END), 0) AS low,
            COALESCE(SUM(CASE WHEN status = 'open' THEN 1 ELSE 0 END), 0) AS open,
            COALESCE(SUM(CASE WHEN status = 'in_progress' THEN 1 ELSE 0 END), 0) AS in_progress,
            COALESCE(SUM(CASE WHEN status = 'fixed' THEN 1 ELSE 0 END), 0) AS fixed,
            COALESCE(SUM(CASE WHEN status = 'closed' THEN 1 ELSE 0 END), 0) AS closed
        FROM bugs
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(summary)
}

async fn fetch_recent_bugs(pool: &SqlitePool) -> Result<Vec<BugWithAssignee>, AppError> {
    let bugs = sqlx::query_as::<_, BugWithAssignee>(
        "SELECT bugs.*, users.username AS assigned_to_name FROM bugs \
         LEFT JOIN users ON bugs.assigned_to = users.id \
         ORDER BY bugs.created_at DESC LIMIT 10",
    )
    .fetch_all(pool)
    .await?;
    Ok(bugs)
}

async fn fetch_group_counts(pool: &SqlitePool, column: &str) -> Result<Vec<GroupCount>, AppError> {
    // `column` is a compile-time constant at every call site, never user input.
    let counts = sqlx::query_as::<_, GroupCount>(&format!(
        "SELECT {column} AS name, COUNT(*) AS count FROM bugs GROUP BY {column}"
    ))
    .fetch_all(pool)
    .await?;
    Ok(counts)
}
