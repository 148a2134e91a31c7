//! Bug workflow routes: listing, detail, updates, comments, tags, search,
//! and deletion.

use axum::extract::{Path as UrlPath, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::{ApiResponse, AppError};
use crate::models::bug::{Bug, BugComment, BugWithAssignee, Tag};
use crate::services::analysis::{self, FixContextSource};
use crate::services::bug::{
    self as bug_service, BugDetail, BugFilters, FilterOptions, UpdateBugRequest,
};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct BugListPayload {
    pub bugs: Vec<BugWithAssignee>,
    pub filters: FilterOptions,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub comment: String,
}

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub tag_id: i64,
}

#[derive(Debug, Deserialize)]
pub struct BulkDeleteRequest {
    pub bug_ids: Vec<i64>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResult {
    pub deleted: usize,
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchPayload {
    pub query: String,
    pub results: Vec<BugWithAssignee>,
}

/// GET /bugs — list with optional status/severity/language/search filters,
/// plus the distinct filter option sets.
pub async fn list(
    State(state): State<AppState>,
    Query(filters): Query<BugFilters>,
) -> Result<Json<ApiResponse<BugListPayload>>, AppError> {
    let bugs = bug_service::list(&state.db, &filters).await?;
    let filters = bug_service::filter_options(&state.db).await?;
    Ok(ApiResponse::success(BugListPayload { bugs, filters }))
}

/// GET /bug/{id} — full detail view. When no fix suggestions exist yet and
/// AI generation is available, one is generated lazily from the stored file.
pub async fn detail(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<i64>,
) -> Result<Json<ApiResponse<BugDetail>>, AppError> {
    let mut detail = bug_service::detail(&state.db, id).await?;

    if detail.fixes.is_empty() {
        analysis::generate_fixes_for_bugs(&state, &[id], FixContextSource::Stored).await;
        detail.fixes = bug_service::fixes_for(&state.db, id).await?;
    }

    Ok(ApiResponse::success(detail))
}

/// POST /bug/{id}/update — status/assignee/severity changes, each logged to
/// history.
pub async fn update(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<i64>,
    Json(request): Json<UpdateBugRequest>,
) -> Result<Json<ApiResponse<Bug>>, AppError> {
    let actor = bug_service::current_user(&state.db).await?;
    let bug = bug_service::update(&state.db, id, &request, &actor).await?;
    Ok(ApiResponse::success(bug))
}

/// POST /bug/{id}/comment — add a comment as the current user.
pub async fn add_comment(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<i64>,
    Json(request): Json<CommentRequest>,
) -> Result<Json<ApiResponse<BugComment>>, AppError> {
    let actor = bug_service::current_user(&state.db).await?;
    let comment = bug_service::add_comment(&state.db, id, &actor, &request.comment).await?;
    Ok(ApiResponse::success(comment))
}

/// POST /bug/{id}/tag — attach a tag, returning the bug's tags.
pub async fn add_tag(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<i64>,
    Json(request): Json<TagRequest>,
) -> Result<Json<ApiResponse<Vec<Tag>>>, AppError> {
    let actor = bug_service::current_user(&state.db).await?;
    bug_service::add_tag(&state.db, id, request.tag_id, &actor).await?;
    let tags = bug_service::tags_for(&state.db, id).await?;
    Ok(ApiResponse::success(tags))
}

/// POST /bug/{id}/tag/{tag_id}/remove — detach a tag, returning the bug's
/// remaining tags.
pub async fn remove_tag(
    State(state): State<AppState>,
    UrlPath((id, tag_id)): UrlPath<(i64, i64)>,
) -> Result<Json<ApiResponse<Vec<Tag>>>, AppError> {
    let actor = bug_service::current_user(&state.db).await?;
    bug_service::remove_tag(&state.db, id, tag_id, &actor).await?;
    let tags = bug_service::tags_for(&state.db, id).await?;
    Ok(ApiResponse::success(tags))
}

/// POST /bug/{id}/delete — delete the bug and all dependent rows.
pub async fn delete(
    State(state): State<AppState>,
    UrlPath(id): UrlPath<i64>,
) -> Result<Json<ApiResponse<DeleteResult>>, AppError> {
    bug_service::delete(&state.db, id).await?;
    Ok(ApiResponse::success(DeleteResult { deleted: 1 }))
}

/// POST /bugs/bulk-delete — delete a batch of bugs with manual cascade.
pub async fn bulk_delete(
    State(state): State<AppState>,
    Json(request): Json<BulkDeleteRequest>,
) -> Result<Json<ApiResponse<DeleteResult>>, AppError> {
    let deleted = bug_service::bulk_delete(&state.db, &request.bug_ids).await?;
    Ok(ApiResponse::success(DeleteResult { deleted }))
}

/// GET /search?q= — free-text search over message, file path, and type.
/// An empty query returns an empty result set.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<SearchPayload>>, AppError> {
    let query = params.q.unwrap_or_default();
    let results = if query.is_empty() {
        Vec::new()
    } else {
        bug_service::search(&state.db, &query).await?
    };
    Ok(ApiResponse::success(SearchPayload { query, results }))
}
