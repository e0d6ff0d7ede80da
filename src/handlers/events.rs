//! Event handlers

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{NaiveDate, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::middleware::AuthUser;
use crate::models::*;
use crate::services::PosterUpload;
use crate::state::AppState;
use crate::utils::errors::{ClubHubError, Result};

/// Largest poster accepted with a new event
pub const MAX_POSTER_BYTES: usize = 5 * 1024 * 1024;

fn invalid(field: &str, value: &str) -> ClubHubError {
    ClubHubError::Validation(format!("invalid {}: {}", field, value))
}

fn parse_visibility(value: &str) -> Result<Visibility> {
    match value.trim() {
        "club-only" => Ok(Visibility::ClubOnly),
        "open-to-all" => Ok(Visibility::OpenToAll),
        other => Err(invalid("visibility", other)),
    }
}

fn parse_date(field: &str, value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| invalid(field, value))
}

/// Read the multipart form of a new event: text fields plus an optional `poster` file
async fn read_event_form(mut multipart: Multipart) -> Result<(CreateEventRequest, Option<PosterUpload>)> {
    let mut request = CreateEventRequest::default();
    let mut poster = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ClubHubError::Validation(format!("unreadable form: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == "poster" {
            let filename = field.file_name().unwrap_or("poster").to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ClubHubError::Validation(format!("unreadable poster: {}", e)))?;
            if !bytes.is_empty() {
                poster = Some(PosterUpload {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            continue;
        }

        let value = field
            .text()
            .await
            .map_err(|e| ClubHubError::Validation(format!("unreadable field {}: {}", name, e)))?;
        if value.trim().is_empty() {
            continue;
        }

        match name.as_str() {
            "title" => request.title = Some(value),
            "description" => request.description = Some(value),
            "date" => request.date = Some(parse_date("date", &value)?),
            "time" => request.time = Some(value),
            "venue" => request.venue = Some(value),
            "visibility" => request.visibility = Some(parse_visibility(&value)?),
            "is_paid" => {
                request.is_paid = Some(value.trim().parse().map_err(|_| invalid("is_paid", &value))?)
            }
            "price" => request.price = Some(value.trim().parse().map_err(|_| invalid("price", &value))?),
            "max_participants" => {
                request.max_participants =
                    Some(value.trim().parse().map_err(|_| invalid("max_participants", &value))?)
            }
            "registration_deadline" => {
                request.registration_deadline = Some(parse_date("registration_deadline", &value)?)
            }
            other => debug!(field = other, "Ignoring unknown event form field"),
        }
    }

    Ok((request, poster))
}

/// Handle POST /api/events - create a pending event for the leader's club
pub async fn create_event(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    multipart: Multipart,
) -> Result<(StatusCode, Json<Event>)> {
    let (request, poster) = read_event_form(multipart).await?;
    let event = state
        .services
        .event_service
        .create_event(&identity, request, poster)
        .await?;

    Ok((StatusCode::CREATED, Json(event)))
}

/// Handle GET /api/events/mine - events of the leader's club
pub async fn list_leader_events(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<Event>>> {
    Ok(Json(state.services.event_service.list_leader_events(&identity).await?))
}

/// Handle GET /api/events/pending - events awaiting admin review
pub async fn list_pending_events(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<Event>>> {
    Ok(Json(state.services.event_service.list_pending_events(&identity).await?))
}

/// Handle PATCH /api/events/:event_id/review
pub async fn review_event(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(event_id): Path<Uuid>,
    Json(review): Json<ReviewEventRequest>,
) -> Result<Json<Event>> {
    let event = state
        .services
        .event_service
        .review_event(&identity, event_id, review.action)
        .await?;

    Ok(Json(event))
}

/// Handle GET /api/events/upcoming - approved events the student can register for
pub async fn list_eligible_upcoming(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<Event>>> {
    let events = state
        .services
        .event_service
        .list_eligible_upcoming(&identity, Utc::now().date_naive())
        .await?;

    Ok(Json(events))
}

/// Handle POST /api/events/:event_id/register - free registration
pub async fn register_for_event(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Registration>)> {
    let registration = state
        .services
        .registration_service
        .register_for_event(&identity, event_id)
        .await?;

    Ok((StatusCode::CREATED, Json(registration)))
}

/// Handle GET /api/events/registered
pub async fn registered_upcoming(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<RegisteredEvent>>> {
    Ok(Json(state.services.registration_service.registered_upcoming(&identity).await?))
}

/// Handle GET /api/events/attended
pub async fn attended_history(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<RegisteredEvent>>> {
    Ok(Json(state.services.registration_service.attended_history(&identity).await?))
}

/// Handle POST /api/events/attendance - leader scans a student's QR code
pub async fn mark_attendance(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(scan): Json<MarkAttendanceRequest>,
) -> Result<Json<AttendanceReceipt>> {
    let receipt = state
        .services
        .registration_service
        .mark_attendance(&identity, &scan.qr_data)
        .await?;

    Ok(Json(receipt))
}

/// Handle GET /api/events/:event_id/attendees
pub async fn list_attendees(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Json<Vec<Registration>>> {
    let attendees = state
        .services
        .registration_service
        .list_attendees(&identity, event_id)
        .await?;

    Ok(Json(attendees))
}
