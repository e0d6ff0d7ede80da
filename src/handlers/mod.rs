//! HTTP handlers module
//!
//! This module contains the axum handlers organized by area:
//! - Club management and membership requests
//! - Event lifecycle, registration and attendance
//! - Payment checkout and verification
//! - Admin and student reporting, account administration

pub mod admin;
pub mod clubs;
pub mod events;
pub mod payments;
pub mod students;

use std::path::PathBuf;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::routing::{get, patch, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tower_http::services::ServeDir;

use crate::middleware::trace_layer;
use crate::state::AppState;

/// Room for the text fields sent alongside a poster
const FORM_OVERHEAD_BYTES: usize = 64 * 1024;

/// Handle GET /health
pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let status = state.services.health_check().await;
    let code = if status.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        code,
        Json(json!({
            "healthy": status.is_healthy(),
            "issues": status.get_issues(),
        })),
    )
}

/// Build the application router. `blob_root` is the directory served under
/// `/blobs` when posters and QR images live on the local filesystem.
pub fn router(state: AppState, blob_root: Option<PathBuf>) -> Router {
    let clubs = Router::new()
        .route("/", post(clubs::create_club))
        .route("/browse", get(clubs::list_for_student))
        .route("/requests", get(clubs::pending_requests))
        .route("/requests/:request_id/review", patch(clubs::review_request))
        .route("/:club_id/leader", patch(clubs::assign_leader))
        .route("/:club_id/join", post(clubs::request_join));

    let events = Router::new()
        .route(
            "/",
            post(events::create_event)
                .layer(DefaultBodyLimit::max(events::MAX_POSTER_BYTES + FORM_OVERHEAD_BYTES)),
        )
        .route("/mine", get(events::list_leader_events))
        .route("/pending", get(events::list_pending_events))
        .route("/upcoming", get(events::list_eligible_upcoming))
        .route("/registered", get(events::registered_upcoming))
        .route("/attended", get(events::attended_history))
        .route("/attendance", post(events::mark_attendance))
        .route("/:event_id/review", patch(events::review_event))
        .route("/:event_id/register", post(events::register_for_event))
        .route("/:event_id/attendees", get(events::list_attendees));

    let payments = Router::new()
        .route("/checkout/:event_id", get(payments::checkout))
        .route("/orders", post(payments::create_order))
        .route("/verify", post(payments::verify_payment));

    let admin = Router::new()
        .route("/stats", get(admin::stats))
        .route("/events/:event_id/attendance", get(admin::event_attendance))
        .route("/users", get(admin::list_users))
        .route("/users/:user_id/toggle-active", patch(admin::toggle_user_active));

    let students = Router::new().route("/dashboard", get(students::dashboard));

    let mut router = Router::new()
        .route("/health", get(health))
        .nest("/api/clubs", clubs)
        .nest("/api/events", events)
        .nest("/api/payments", payments)
        .nest("/api/admin", admin)
        .nest("/api/students", students);

    if let Some(root) = blob_root {
        router = router.nest_service("/blobs", ServeDir::new(root));
    }

    router.layer(trace_layer()).with_state(state)
}
