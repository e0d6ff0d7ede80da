//! Club handlers

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use uuid::Uuid;

use crate::middleware::AuthUser;
use crate::models::*;
use crate::state::AppState;
use crate::utils::errors::Result;

/// Handle POST /api/clubs
pub async fn create_club(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Json(request): Json<CreateClubRequest>,
) -> Result<(StatusCode, Json<Club>)> {
    let club = state.services.club_service.create_club(&identity, request).await?;
    Ok((StatusCode::CREATED, Json(club)))
}

/// Handle PATCH /api/clubs/:club_id/leader
pub async fn assign_leader(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(club_id): Path<Uuid>,
    Json(request): Json<AssignLeaderRequest>,
) -> Result<Json<Club>> {
    let club = state
        .services
        .club_service
        .assign_leader(&identity, club_id, request.user_id)
        .await?;

    Ok(Json(club))
}

/// Handle GET /api/clubs/browse
pub async fn list_for_student(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<ClubListing>>> {
    Ok(Json(state.services.club_service.list_for_student(&identity).await?))
}

/// Handle POST /api/clubs/:club_id/join
pub async fn request_join(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(club_id): Path<Uuid>,
    Json(request): Json<JoinClubRequest>,
) -> Result<(StatusCode, Json<MembershipRequest>)> {
    let request = state
        .services
        .club_service
        .request_join(&identity, club_id, request)
        .await?;

    Ok((StatusCode::CREATED, Json(request)))
}

/// Handle GET /api/clubs/requests
pub async fn pending_requests(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<Json<Vec<MembershipRequest>>> {
    Ok(Json(state.services.club_service.pending_requests(&identity).await?))
}

/// Handle PATCH /api/clubs/requests/:request_id/review
pub async fn review_request(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    Path(request_id): Path<Uuid>,
    Json(review): Json<ReviewMembershipRequest>,
) -> Result<Json<MembershipRequest>> {
    let reviewed = state
        .services
        .club_service
        .review_request(&identity, request_id, review)
        .await?;

    Ok(Json(reviewed))
}
