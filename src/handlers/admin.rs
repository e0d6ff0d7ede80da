//! Admin reporting and account handlers

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use crate::middleware::AuthUser;
use crate::models::{AdminStats, EventAttendanceSummary, User};
use crate::state::AppState;
use crate::utils::errors::Result;

/// Handle GET /api/admin/stats
pub async fn stats(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<AdminStats>> {
    Ok(Json(state.services.report_service.admin_stats(&identity).await?))
}

/// Handle GET /api/admin/events/:event_id/attendance
pub async fn event_attendance(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<EventAttendanceSummary>> {
    let summary = state
        .services
        .report_service
        .event_attendance(&identity, event_id)
        .await?;

    Ok(Json(summary))
}

/// Handle GET /api/admin/users
pub async fn list_users(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<User>>> {
    Ok(Json(state.services.user_service.list_users(&identity).await?))
}

/// Handle PATCH /api/admin/users/:user_id/toggle-active
pub async fn toggle_user_active(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(user_id): Path<Uuid>,
) -> Result<Json<User>> {
    Ok(Json(state.services.user_service.toggle_active(&identity, user_id).await?))
}
