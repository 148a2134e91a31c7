//! Dashboard and aggregate statistics routes.

use axum::extract::State;
use axum::Json;

use crate::errors::{ApiResponse, AppError};
use crate::services::dashboard::{self, ApiStats, DashboardStats};
use crate::AppState;

/// GET /dashboard — aggregate counts, recent bugs, and distributions.
pub async fn dashboard(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<DashboardStats>>, AppError> {
    let stats = dashboard::get_stats(&state.db).await?;
    Ok(ApiResponse::success(stats))
}

/// GET /api/stats — flat severity/status/language aggregates.
pub async fn api_stats(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<ApiStats>>, AppError> {
    let stats = dashboard::get_api_stats(&state.db).await?;
    Ok(ApiResponse::success(stats))
}
