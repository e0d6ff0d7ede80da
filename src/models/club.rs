//! Club and membership models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Club {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub leader_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Club as listed to a student browsing for clubs to join
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClubListing {
    #[serde(flatten)]
    pub club: Club,
    pub member_count: i64,
    pub is_member: bool,
    pub has_pending_request: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MembershipRequest {
    pub id: Uuid,
    pub club_id: Uuid,
    pub student_id: Uuid,
    pub status: RequestStatus,
    pub reason: Option<String>,
    pub rejection_reason: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateClubRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinClubRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestDecision {
    Approve,
    Reject,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReviewMembershipRequest {
    pub action: RequestDecision,
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignLeaderRequest {
    pub user_id: Uuid,
}
