//! Club and membership service
//!
//! Clubs are created by admins, led by at most one leader, and joined by
//! students through leader-reviewed membership requests.

use std::collections::HashSet;

use tracing::info;
use uuid::Uuid;

use crate::database::store::{ClubStore, Stores};
use crate::models::*;
use crate::services::auth::Identity;
use crate::utils::errors::{ClubHubError, Result};
use crate::utils::helpers::{non_blank, normalize_whitespace};
use crate::utils::logging::log_admin_action;

/// Shortest join reason accepted when one is given
pub const MIN_REASON_LENGTH: usize = 10;

/// The club `identity` leads, or `Authorization` when it leads none
pub(crate) async fn led_club(clubs: &dyn ClubStore, identity: &Identity) -> Result<Club> {
    identity.require_leader()?;
    clubs
        .find_club_by_leader(identity.user_id)
        .await?
        .ok_or_else(|| ClubHubError::Authorization("leader has no associated club".to_string()))
}

/// `Authorization` unless `identity` is the leader of `club_id`
pub(crate) async fn ensure_club_leader(clubs: &dyn ClubStore, identity: &Identity, club_id: Uuid) -> Result<Club> {
    let club = clubs
        .find_club(club_id)
        .await?
        .ok_or_else(|| ClubHubError::not_found("club", club_id))?;

    if club.leader_id != Some(identity.user_id) {
        return Err(ClubHubError::Authorization(
            "only the leader of this club may do that".to_string(),
        ));
    }
    Ok(club)
}

#[derive(Clone)]
pub struct ClubService {
    stores: Stores,
}

impl ClubService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub async fn create_club(&self, identity: &Identity, request: CreateClubRequest) -> Result<Club> {
        identity.require_admin()?;

        let name = non_blank(Some(request.name))
            .map(|n| normalize_whitespace(&n))
            .ok_or_else(|| ClubHubError::Validation("club name is required".to_string()))?;
        let description = non_blank(Some(request.description))
            .ok_or_else(|| ClubHubError::Validation("club description is required".to_string()))?;

        let club = self
            .stores
            .clubs
            .insert_club(CreateClubRequest { name, description })
            .await?;

        log_admin_action(identity.user_id, "create_club", Some(&club.id.to_string()), Some(&club.name));
        Ok(club)
    }

    pub async fn assign_leader(&self, identity: &Identity, club_id: Uuid, user_id: Uuid) -> Result<Club> {
        identity.require_admin()?;

        self.stores
            .clubs
            .find_club(club_id)
            .await?
            .ok_or_else(|| ClubHubError::not_found("club", club_id))?;
        let user = self
            .stores
            .users
            .find_user(user_id)
            .await?
            .ok_or_else(|| ClubHubError::not_found("user", user_id))?;

        if user.role != Role::Student {
            return Err(ClubHubError::Validation(format!(
                "only students can be made leaders, user is {}",
                user.role
            )));
        }

        let club = self.stores.clubs.assign_leader(club_id, user_id).await?;
        log_admin_action(
            identity.user_id,
            "assign_leader",
            Some(&club_id.to_string()),
            Some(&user_id.to_string()),
        );
        Ok(club)
    }

    pub async fn request_join(&self, identity: &Identity, club_id: Uuid, request: JoinClubRequest) -> Result<MembershipRequest> {
        identity.require_student()?;

        let reason = non_blank(request.reason);
        if let Some(reason) = &reason {
            if reason.chars().count() < MIN_REASON_LENGTH {
                return Err(ClubHubError::Validation(format!(
                    "reason must be at least {} characters",
                    MIN_REASON_LENGTH
                )));
            }
        }

        self.stores
            .clubs
            .find_club(club_id)
            .await?
            .ok_or_else(|| ClubHubError::not_found("club", club_id))?;

        if self.stores.clubs.is_member(club_id, identity.user_id).await? {
            return Err(ClubHubError::Conflict("already a member of this club".to_string()));
        }

        let request = self
            .stores
            .clubs
            .insert_request(club_id, identity.user_id, reason)
            .await?;
        info!(club_id = %club_id, student_id = %identity.user_id, request_id = %request.id, "Join request submitted");
        Ok(request)
    }

    pub async fn pending_requests(&self, identity: &Identity) -> Result<Vec<MembershipRequest>> {
        let club = led_club(self.stores.clubs.as_ref(), identity).await?;
        self.stores.clubs.pending_requests(club.id).await
    }

    pub async fn review_request(
        &self,
        identity: &Identity,
        request_id: Uuid,
        review: ReviewMembershipRequest,
    ) -> Result<MembershipRequest> {
        let request = self
            .stores
            .clubs
            .find_request(request_id)
            .await?
            .ok_or_else(|| ClubHubError::not_found("membership request", request_id))?;

        identity.require_leader()?;
        ensure_club_leader(self.stores.clubs.as_ref(), identity, request.club_id).await?;

        if request.status != RequestStatus::Pending {
            return Err(ClubHubError::Conflict("request has already been reviewed".to_string()));
        }

        let (status, rejection_reason) = match review.action {
            RequestDecision::Approve => (RequestStatus::Approved, None),
            RequestDecision::Reject => (RequestStatus::Rejected, non_blank(review.rejection_reason)),
        };

        let reviewed = self
            .stores
            .clubs
            .review_request(request_id, status, identity.user_id, rejection_reason)
            .await?
            .ok_or_else(|| ClubHubError::Conflict("request has already been reviewed".to_string()))?;

        info!(
            request_id = %request_id,
            club_id = %reviewed.club_id,
            student_id = %reviewed.student_id,
            leader_id = %identity.user_id,
            approved = reviewed.status == RequestStatus::Approved,
            "Join request reviewed"
        );
        Ok(reviewed)
    }

    /// Every club with the caller's membership state
    pub async fn list_for_student(&self, identity: &Identity) -> Result<Vec<ClubListing>> {
        identity.require_student()?;

        let member_of: HashSet<Uuid> = self
            .stores
            .clubs
            .member_club_ids(identity.user_id)
            .await?
            .into_iter()
            .collect();

        let mut listings = Vec::new();
        for club in self.stores.clubs.list_clubs().await? {
            let member_count = self.stores.clubs.member_count(club.id).await?;
            let is_member = member_of.contains(&club.id);
            let has_pending_request = !is_member
                && self
                    .stores
                    .clubs
                    .has_pending_request(club.id, identity.user_id)
                    .await?;

            listings.push(ClubListing {
                club,
                member_count,
                is_member,
                has_pending_request,
            });
        }

        Ok(listings)
    }
}
