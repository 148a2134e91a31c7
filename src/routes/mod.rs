//! Route definitions for the bugtrackd API.

pub mod analysis;
pub mod bugs;
pub mod dashboard;
pub mod export;
pub mod health;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::AppState;

pub fn router(state: AppState) -> Router {
    let max_upload = state.config.max_upload_bytes;
    Router::new()
        .route("/", get(health::index))
        .route("/health/live", get(health::live))
        .route("/dashboard", get(dashboard::dashboard))
        .route("/upload", post(analysis::upload))
        .route("/results/{filename}", get(analysis::results))
        .route("/analyze-code", post(analysis::analyze_code))
        .route("/git-repo", post(analysis::git_repo))
        .route("/toggle-ai-suggestions", post(analysis::toggle_ai_suggestions))
        .route("/bugs", get(bugs::list))
        .route("/bugs/bulk-delete", post(bugs::bulk_delete))
        .route("/bug/{id}", get(bugs::detail))
        .route("/bug/{id}/update", post(bugs::update))
        .route("/bug/{id}/comment", post(bugs::add_comment))
        .route("/bug/{id}/tag", post(bugs::add_tag))
        .route("/bug/{id}/tag/{tag_id}/remove", post(bugs::remove_tag))
        .route("/bug/{id}/delete", post(bugs::delete))
        .route("/search", get(bugs::search))
        .route("/api/bugs", get(export::api_bugs))
        .route("/api/stats", get(dashboard::api_stats))
        .route("/export/bugs", get(export::export_bugs))
        .layer(DefaultBodyLimit::max(max_upload))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
