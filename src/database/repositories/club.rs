//! Club and membership repository implementation

use async_trait::async_trait;
use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::database::connection::conflict_on_unique;
use crate::database::store::ClubStore;
use crate::models::club::{Club, CreateClubRequest, MembershipRequest, RequestStatus};
use crate::utils::errors::{ClubHubError, Result};

const CLUB_COLUMNS: &str = "id, name, description, leader_id, created_at";

#[derive(Clone, Debug)]
pub struct ClubRepository {
    pool: PgPool,
}

impl ClubRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClubStore for ClubRepository {
    /// Create a new club without a leader
    async fn insert_club(&self, request: CreateClubRequest) -> Result<Club> {
        sqlx::query_as::<_, Club>(&format!(
            "INSERT INTO clubs (id, name, description, created_at) VALUES ($1, $2, $3, $4) RETURNING {CLUB_COLUMNS}"
        ))
        .bind(Uuid::new_v4())
        .bind(request.name)
        .bind(request.description)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a club with this name already exists"))
    }

    async fn find_club(&self, id: Uuid) -> Result<Option<Club>> {
        let club = sqlx::query_as::<_, Club>(&format!("SELECT {CLUB_COLUMNS} FROM clubs WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(club)
    }

    async fn find_club_by_leader(&self, leader_id: Uuid) -> Result<Option<Club>> {
        let club = sqlx::query_as::<_, Club>(&format!("SELECT {CLUB_COLUMNS} FROM clubs WHERE leader_id = $1"))
            .bind(leader_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(club)
    }

    async fn list_clubs(&self) -> Result<Vec<Club>> {
        let clubs = sqlx::query_as::<_, Club>(&format!("SELECT {CLUB_COLUMNS} FROM clubs ORDER BY name ASC"))
            .fetch_all(&self.pool)
            .await?;

        Ok(clubs)
    }

    async fn assign_leader(&self, club_id: Uuid, user_id: Uuid) -> Result<Club> {
        let mut tx = self.pool.begin().await?;

        // Demote whoever led the club before
        sqlx::query(
            r#"
            UPDATE users SET role = 'student', club_id = NULL
            WHERE id = (SELECT leader_id FROM clubs WHERE id = $1) AND id <> $2
            "#,
        )
        .bind(club_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?;

        let club = sqlx::query_as::<_, Club>(&format!(
            "UPDATE clubs SET leader_id = $2 WHERE id = $1 RETURNING {CLUB_COLUMNS}"
        ))
        .bind(club_id)
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "user already leads another club"))?
        .ok_or_else(|| ClubHubError::not_found("club", club_id))?;

        sqlx::query("UPDATE users SET role = 'leader', club_id = $1 WHERE id = $2")
            .bind(club_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("INSERT INTO club_members (club_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(club_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(club)
    }

    async fn add_member(&self, club_id: Uuid, user_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "INSERT INTO club_members (club_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(club_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn is_member(&self, club_id: Uuid, user_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM club_members WHERE club_id = $1 AND user_id = $2)",
        )
        .bind(club_id)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn member_club_ids(&self, user_id: Uuid) -> Result<Vec<Uuid>> {
        let ids: Vec<Uuid> = sqlx::query_scalar("SELECT club_id FROM club_members WHERE user_id = $1")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(ids)
    }

    async fn member_count(&self, club_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM club_members WHERE club_id = $1")
            .bind(club_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn insert_request(&self, club_id: Uuid, student_id: Uuid, reason: Option<String>) -> Result<MembershipRequest> {
        sqlx::query_as::<_, MembershipRequest>(
            r#"
            INSERT INTO membership_requests (id, club_id, student_id, reason, requested_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, club_id, student_id, status, reason, rejection_reason, requested_at, reviewed_at, reviewed_by
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(club_id)
        .bind(student_id)
        .bind(reason)
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "a join request for this club is already pending"))
    }

    async fn find_request(&self, id: Uuid) -> Result<Option<MembershipRequest>> {
        let request = sqlx::query_as::<_, MembershipRequest>(
            "SELECT id, club_id, student_id, status, reason, rejection_reason, requested_at, reviewed_at, reviewed_by FROM membership_requests WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(request)
    }

    async fn has_pending_request(&self, club_id: Uuid, student_id: Uuid) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM membership_requests WHERE club_id = $1 AND student_id = $2 AND status = 'pending')",
        )
        .bind(club_id)
        .bind(student_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn pending_requests(&self, club_id: Uuid) -> Result<Vec<MembershipRequest>> {
        let requests = sqlx::query_as::<_, MembershipRequest>(
            r#"
            SELECT id, club_id, student_id, status, reason, rejection_reason, requested_at, reviewed_at, reviewed_by
            FROM membership_requests
            WHERE club_id = $1 AND status = 'pending'
            ORDER BY requested_at DESC
            "#,
        )
        .bind(club_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(requests)
    }

    async fn review_request(
        &self,
        id: Uuid,
        status: RequestStatus,
        reviewer: Uuid,
        rejection_reason: Option<String>,
    ) -> Result<Option<MembershipRequest>> {
        let mut tx = self.pool.begin().await?;

        let reviewed = sqlx::query_as::<_, MembershipRequest>(
            r#"
            UPDATE membership_requests
            SET status = $2, reviewed_at = $3, reviewed_by = $4, rejection_reason = $5
            WHERE id = $1 AND status = 'pending'
            RETURNING id, club_id, student_id, status, reason, rejection_reason, requested_at, reviewed_at, reviewed_by
            "#,
        )
        .bind(id)
        .bind(status)
        .bind(Utc::now())
        .bind(reviewer)
        .bind(rejection_reason)
        .fetch_optional(&mut *tx)
        .await?;

        if let Some(request) = &reviewed {
            if request.status == RequestStatus::Approved {
                sqlx::query("INSERT INTO club_members (club_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
                    .bind(request.club_id)
                    .bind(request.student_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(reviewed)
    }
}
