//! Bug service: CRUD, filtering, search, comments, tags, history logging,
//! and manual cascade deletion.
//!
//! Referential integrity on delete is maintained by hand: dependent rows are
//! removed inside the same transaction before the bug itself, no ON DELETE
//! CASCADE is relied upon.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::errors::AppError;
use crate::models::bug::{
    Bug, BugComment, BugHistory, BugStatus, BugWithAssignee, Severity, SuggestedFix, Tag,
};
use crate::models::user::{User, DEFAULT_USER_ID};
use crate::services::ai_fix::FixSuggestion;

/// Filters accepted by the bug list endpoint.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BugFilters {
    pub status: Option<BugStatus>,
    pub severity: Option<Severity>,
    pub language: Option<String>,
    pub search: Option<String>,
}

/// Distinct values available for the list filters.
#[derive(Debug, Serialize)]
pub struct FilterOptions {
    pub statuses: Vec<String>,
    pub severities: Vec<String>,
    pub languages: Vec<String>,
}

/// A new bug row produced by the ingest pipeline.
#[derive(Debug, Clone)]
pub struct NewBug {
    pub file_path: String,
    pub language: String,
    pub line_number: i64,
    pub column_number: i64,
    pub message: String,
    pub kind: String,
    pub severity: Severity,
}

/// Update request for status, assignee, and severity. `assigned_to` takes a
/// user id or the literal `none` to clear the assignment.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct UpdateBugRequest {
    pub status: Option<BugStatus>,
    pub assigned_to: Option<String>,
    pub severity: Option<Severity>,
}

/// Full detail view: the bug plus every dependent collection.
#[derive(Debug, Serialize)]
pub struct BugDetail {
    pub bug: BugWithAssignee,
    pub fixes: Vec<SuggestedFix>,
    pub comments: Vec<BugComment>,
    pub history: Vec<BugHistory>,
    pub tags: Vec<Tag>,
    pub all_tags: Vec<Tag>,
    pub users: Vec<User>,
}

const SELECT_WITH_ASSIGNEE: &str = "SELECT bugs.*, users.username AS assigned_to_name \
     FROM bugs LEFT JOIN users ON bugs.assigned_to = users.id";

/// The seeded user every request acts as until real authentication lands.
pub async fn current_user(pool: &SqlitePool) -> Result<User, AppError> {
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(DEFAULT_USER_ID)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::Internal("Default user is missing".to_string()))
}

pub async fn list_users(pool: &SqlitePool) -> Result<Vec<User>, AppError> {
    let users = sqlx::query_as::<_, User>("SELECT * FROM users ORDER BY username")
        .fetch_all(pool)
        .await?;
    Ok(users)
}

/// Insert analysis results as open bugs in a single transaction, returning
/// the new row ids. Empty kinds and languages are defaulted to `unknown`.
pub async fn insert_bugs(pool: &SqlitePool, new_bugs: &[NewBug]) -> Result<Vec<i64>, AppError> {
    let mut tx = pool.begin().await?;
    let now = Utc::now();
    let mut ids = Vec::with_capacity(new_bugs.len());

    for bug in new_bugs {
        let kind = if bug.kind.is_empty() {
            "unknown"
        } else {
            bug.kind.as_str()
        };
        let language = if bug.language.is_empty() {
            "unknown"
        } else {
            bug.language.as_str()
        };
        let result = sqlx::query(
            "INSERT INTO bugs (file_path, language, line_number, column_number, \
             message, type, severity, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&bug.file_path)
        .bind(language)
        .bind(bug.line_number)
        .bind(bug.column_number)
        .bind(&bug.message)
        .bind(kind)
        .bind(bug.severity)
        .bind(BugStatus::Open)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        ids.push(result.last_insert_rowid());
    }

    tx.commit().await?;
    Ok(ids)
}

/// List bugs with optional filters, newest first.
pub async fn list(pool: &SqlitePool, filters: &BugFilters) -> Result<Vec<BugWithAssignee>, AppError> {
    let mut sql = format!("{SELECT_WITH_ASSIGNEE} WHERE 1=1");
    if filters.status.is_some() {
        sql.push_str(" AND bugs.status = ?");
    }
    if filters.severity.is_some() {
        sql.push_str(" AND bugs.severity = ?");
    }
    if filters.language.is_some() {
        sql.push_str(" AND bugs.language = ?");
    }
    if filters.search.is_some() {
        sql.push_str(" AND (bugs.message LIKE ? OR bugs.file_path LIKE ?)");
    }
    sql.push_str(" ORDER BY bugs.created_at DESC");

    let mut query = sqlx::query_as::<_, BugWithAssignee>(&sql);
    if let Some(status) = filters.status {
        query = query.bind(status);
    }
    if let Some(severity) = filters.severity {
        query = query.bind(severity);
    }
    if let Some(language) = &filters.language {
        query = query.bind(language);
    }
    if let Some(search) = &filters.search {
        let pattern = format!("%{search}%");
        query = query.bind(pattern.clone()).bind(pattern);
    }

    Ok(query.fetch_all(pool).await?)
}

/// Distinct filter option sets for the list view.
pub async fn filter_options(pool: &SqlitePool) -> Result<FilterOptions, AppError> {
    let statuses = sqlx::query_scalar::<_, String>("SELECT DISTINCT status FROM bugs")
        .fetch_all(pool)
        .await?;
    let severities = sqlx::query_scalar::<_, String>("SELECT DISTINCT severity FROM bugs")
        .fetch_all(pool)
        .await?;
    let languages = sqlx::query_scalar::<_, String>("SELECT DISTINCT language FROM bugs")
        .fetch_all(pool)
        .await?;
    Ok(FilterOptions {
        statuses,
        severities,
        languages,
    })
}

/// Free-text search across message, file path, and type.
pub async fn search(pool: &SqlitePool, query: &str) -> Result<Vec<BugWithAssignee>, AppError> {
    let pattern = format!("%{query}%");
    let bugs = sqlx::query_as::<_, BugWithAssignee>(&format!(
        "{SELECT_WITH_ASSIGNEE} \
         WHERE bugs.message LIKE ? OR bugs.file_path LIKE ? OR bugs.type LIKE ? \
         ORDER BY bugs.created_at DESC"
    ))
    .bind(&pattern)
    .bind(&pattern)
    .bind(&pattern)
    .fetch_all(pool)
    .await?;
    Ok(bugs)
}

/// Bugs recorded for a single analyzed file, ordered for the results view.
pub async fn bugs_for_file(
    pool: &SqlitePool,
    file_path: &str,
) -> Result<Vec<BugWithAssignee>, AppError> {
    let bugs = sqlx::query_as::<_, BugWithAssignee>(&format!(
        "{SELECT_WITH_ASSIGNEE} WHERE bugs.file_path = ? ORDER BY bugs.severity, bugs.line_number"
    ))
    .bind(file_path)
    .fetch_all(pool)
    .await?;
    Ok(bugs)
}

pub async fn get(pool: &SqlitePool, id: i64) -> Result<Bug, AppError> {
    sqlx::query_as::<_, Bug>("SELECT * FROM bugs WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Bug not found".to_string()))
}

pub async fn get_with_assignee(pool: &SqlitePool, id: i64) -> Result<BugWithAssignee, AppError> {
    sqlx::query_as::<_, BugWithAssignee>(&format!("{SELECT_WITH_ASSIGNEE} WHERE bugs.id = ?"))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Bug not found".to_string()))
}

/// Full detail view with fixes, comments, history, tags, and lookup lists.
pub async fn detail(pool: &SqlitePool, id: i64) -> Result<BugDetail, AppError> {
    let bug = get_with_assignee(pool, id).await?;
    let fixes = fixes_for(pool, id).await?;
    let comments = list_comments(pool, id).await?;
    let history = get_history(pool, id).await?;
    let tags = tags_for(pool, id).await?;
    let all_tags = sqlx::query_as::<_, Tag>("SELECT * FROM tags ORDER BY name")
        .fetch_all(pool)
        .await?;
    let users = list_users(pool).await?;
    Ok(BugDetail {
        bug,
        fixes,
        comments,
        history,
        tags,
        all_tags,
        users,
    })
}

/// Apply status/assignee/severity changes, logging each change to history.
pub async fn update(
    pool: &SqlitePool,
    id: i64,
    request: &UpdateBugRequest,
    actor: &User,
) -> Result<Bug, AppError> {
    let bug = get(pool, id).await?;
    let now = Utc::now();

    if let Some(status) = request.status {
        if status != bug.status {
            sqlx::query("UPDATE bugs SET status = ?, updated_at = ? WHERE id = ?")
                .bind(status)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await?;
            log_history(
                pool,
                id,
                Some(actor.id),
                "status",
                Some(bug.status.as_str()),
                Some(status.as_str()),
            )
            .await?;
        }
    }

    if let Some(assigned_to) = &request.assigned_to {
        let new_assignee = parse_assignee(assigned_to)?;
        if new_assignee != bug.assigned_to {
            sqlx::query("UPDATE bugs SET assigned_to = ?, updated_at = ? WHERE id = ?")
                .bind(new_assignee)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await?;
            let old = bug.assigned_to.map(|v| v.to_string());
            let new = new_assignee.map(|v| v.to_string());
            log_history(
                pool,
                id,
                Some(actor.id),
                "assigned_to",
                old.as_deref(),
                new.as_deref(),
            )
            .await?;
        }
    }

    if let Some(severity) = request.severity {
        if severity != bug.severity {
            sqlx::query("UPDATE bugs SET severity = ?, updated_at = ? WHERE id = ?")
                .bind(severity)
                .bind(now)
                .bind(id)
                .execute(pool)
                .await?;
            log_history(
                pool,
                id,
                Some(actor.id),
                "severity",
                Some(bug.severity.as_str()),
                Some(severity.as_str()),
            )
            .await?;
        }
    }

    get(pool, id).await
}

fn parse_assignee(raw: &str) -> Result<Option<i64>, AppError> {
    if raw == "none" || raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<i64>()
        .map(Some)
        .map_err(|_| AppError::Validation(format!("Invalid assignee '{raw}'")))
}

/// Append a field change to the audit log.
pub async fn log_history(
    pool: &SqlitePool,
    bug_id: i64,
    user_id: Option<i64>,
    field: &str,
    old_value: Option<&str>,
    new_value: Option<&str>,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO bug_history (bug_id, user_id, field_changed, old_value, new_value, created_at) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(bug_id)
    .bind(user_id)
    .bind(field)
    .bind(old_value)
    .bind(new_value)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn get_history(pool: &SqlitePool, bug_id: i64) -> Result<Vec<BugHistory>, AppError> {
    let history = sqlx::query_as::<_, BugHistory>(
        "SELECT bug_history.*, users.username FROM bug_history \
         LEFT JOIN users ON bug_history.user_id = users.id \
         WHERE bug_id = ? ORDER BY bug_history.created_at DESC",
    )
    .bind(bug_id)
    .fetch_all(pool)
    .await?;
    Ok(history)
}

/// Add a comment as the given user, returning the stored row.
pub async fn add_comment(
    pool: &SqlitePool,
    bug_id: i64,
    user: &User,
    comment: &str,
) -> Result<BugComment, AppError> {
    if comment.trim().is_empty() {
        return Err(AppError::Validation("Comment cannot be empty".to_string()));
    }
    // 404 before insert: comments must not attach to deleted bugs.
    get(pool, bug_id).await?;

    let result = sqlx::query(
        "INSERT INTO bug_comments (bug_id, user_id, comment, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(bug_id)
    .bind(user.id)
    .bind(comment)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    let stored = sqlx::query_as::<_, BugComment>(
        "SELECT bug_comments.*, users.username FROM bug_comments \
         JOIN users ON bug_comments.user_id = users.id WHERE bug_comments.id = ?",
    )
    .bind(result.last_insert_rowid())
    .fetch_one(pool)
    .await?;
    Ok(stored)
}

pub async fn list_comments(pool: &SqlitePool, bug_id: i64) -> Result<Vec<BugComment>, AppError> {
    let comments = sqlx::query_as::<_, BugComment>(
        "SELECT bug_comments.*, users.username FROM bug_comments \
         JOIN users ON bug_comments.user_id = users.id \
         WHERE bug_id = ? ORDER BY bug_comments.created_at",
    )
    .bind(bug_id)
    .fetch_all(pool)
    .await?;
    Ok(comments)
}

pub async fn tags_for(pool: &SqlitePool, bug_id: i64) -> Result<Vec<Tag>, AppError> {
    let tags = sqlx::query_as::<_, Tag>(
        "SELECT tags.* FROM tags JOIN bug_tags ON tags.id = bug_tags.tag_id \
         WHERE bug_tags.bug_id = ?",
    )
    .bind(bug_id)
    .fetch_all(pool)
    .await?;
    Ok(tags)
}

/// Attach a tag, logging the addition. Attaching an already-present tag is a
/// no-op.
pub async fn add_tag(
    pool: &SqlitePool,
    bug_id: i64,
    tag_id: i64,
    actor: &User,
) -> Result<(), AppError> {
    get(pool, bug_id).await?;
    let tag_name = sqlx::query_scalar::<_, String>("SELECT name FROM tags WHERE id = ?")
        .bind(tag_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT bug_id FROM bug_tags WHERE bug_id = ? AND tag_id = ?",
    )
    .bind(bug_id)
    .bind(tag_id)
    .fetch_optional(pool)
    .await?;
    if existing.is_some() {
        return Ok(());
    }

    sqlx::query("INSERT INTO bug_tags (bug_id, tag_id) VALUES (?, ?)")
        .bind(bug_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    log_history(pool, bug_id, Some(actor.id), "tag", None, Some(&tag_name)).await?;
    Ok(())
}

/// Detach a tag, logging the removal.
pub async fn remove_tag(
    pool: &SqlitePool,
    bug_id: i64,
    tag_id: i64,
    actor: &User,
) -> Result<(), AppError> {
    let tag_name = sqlx::query_scalar::<_, String>("SELECT name FROM tags WHERE id = ?")
        .bind(tag_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Tag not found".to_string()))?;

    sqlx::query("DELETE FROM bug_tags WHERE bug_id = ? AND tag_id = ?")
        .bind(bug_id)
        .bind(tag_id)
        .execute(pool)
        .await?;
    log_history(pool, bug_id, Some(actor.id), "tag", Some(&tag_name), None).await?;
    Ok(())
}

pub async fn fixes_for(pool: &SqlitePool, bug_id: i64) -> Result<Vec<SuggestedFix>, AppError> {
    let fixes = sqlx::query_as::<_, SuggestedFix>(
        "SELECT * FROM suggested_fixes WHERE bug_id = ?",
    )
    .bind(bug_id)
    .fetch_all(pool)
    .await?;
    Ok(fixes)
}

pub async fn insert_fix(
    pool: &SqlitePool,
    bug_id: i64,
    language: &str,
    fix: &FixSuggestion,
) -> Result<(), AppError> {
    sqlx::query(
        "INSERT INTO suggested_fixes (bug_id, language, suggestion, code_example, created_at) \
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(bug_id)
    .bind(language)
    .bind(&fix.suggestion)
    .bind(&fix.code_example)
    .bind(Utc::now())
    .execute(pool)
    .await?;
    Ok(())
}

/// Delete a bug and every dependent row in one transaction.
pub async fn delete(pool: &SqlitePool, id: i64) -> Result<(), AppError> {
    get(pool, id).await?;

    let mut tx = pool.begin().await?;
    delete_children(&mut tx, id).await?;
    sqlx::query("DELETE FROM bugs WHERE id = ?")
        .bind(id)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(())
}

/// Delete a batch of bugs and their dependent rows, returning how many bug
/// rows were removed.
pub async fn bulk_delete(pool: &SqlitePool, ids: &[i64]) -> Result<usize, AppError> {
    if ids.is_empty() {
        return Err(AppError::Validation(
            "No bugs selected for deletion".to_string(),
        ));
    }

    let mut tx = pool.begin().await?;
    for &id in ids {
        delete_children(&mut tx, id).await?;
    }

    let placeholders = vec!["?"; ids.len()].join(",");
    let sql = format!("DELETE FROM bugs WHERE id IN ({placeholders})");
    let mut query = sqlx::query(&sql);
    for &id in ids {
        query = query.bind(id);
    }
    let result = query.execute(&mut *tx).await?;
    tx.commit().await?;
    Ok(result.rows_affected() as usize)
}

async fn delete_children(
    tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
    bug_id: i64,
) -> Result<(), AppError> {
    for table in ["bug_comments", "bug_history", "bug_tags", "suggested_fixes"] {
        sqlx::query(&format!("DELETE FROM {table} WHERE bug_id = ?"))
            .bind(bug_id)
            .execute(&mut **tx)
            .await?;
    }
    Ok(())
}
