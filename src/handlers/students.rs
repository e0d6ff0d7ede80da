//! Student dashboard handler

use axum::extract::State;
use axum::Json;

use crate::middleware::AuthUser;
use crate::models::StudentDashboard;
use crate::state::AppState;
use crate::utils::errors::Result;

/// Handle GET /api/students/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<StudentDashboard>> {
    Ok(Json(state.services.report_service.student_dashboard(&identity).await?))
}
